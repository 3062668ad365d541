//! Entity Trails
//!
//! This module records the movement of traced entities as fading trails of
//! point entities on the host surface.
//!
//! # Features
//!
//! - Bounded per-entity history with FIFO eviction
//! - Distance/interval throttling of new points
//! - Tail-to-head color, opacity and size gradient
//! - Fade-in, fade-out and a staggered removal cadence for expired points
//! - One deadline heap for all fades instead of a timer per point
//!
//! # Example
//!
//! ```rust
//! use wayline_core::host::memory::MemoryHost;
//! use wayline_core::plugin::Standalone;
//! use wayline_core::trails::{TraceConfig, TraceEngine, TraceOptions};
//! use wayline_core::{EntityId, Position};
//!
//! let mut host = MemoryHost::new();
//! let ship = EntityId::new("ship");
//! host.spawn(ship.clone(), Position::new(4.0, 52.0, 0.0));
//!
//! let mut engine = TraceEngine::new(&mut host, TraceConfig::default());
//! engine.trace(&mut host, &ship, &TraceOptions::default());
//!
//! host.move_entity(&ship, Position::new(4.0, 52.01, 0.0)).unwrap();
//! host.advance(16);
//! host.step(&mut Standalone(&mut engine));
//!
//! assert_eq!(engine.get_trace(&ship).unwrap().len(), 2);
//! ```

mod config;
mod engine;
mod gradient;
mod history;

pub use config::*;
pub use engine::*;
pub use gradient::*;
pub use history::*;
