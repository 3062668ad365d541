//! Wayline Core
//!
//! Interaction plugins for a host map surface, independent of any particular
//! map engine. The host is reached only through the narrow traits in [`host`]
//! and drives everything: clicks, position changes, frames and timers are pushed
//! in, each call handing the host over as `&mut dyn MapHost`.
//!
//! # Architecture
//!
//! - **events**: typed publish/subscribe channels, also used for votes
//! - **host**: host capability traits plus the in-memory [`MemoryHost`]
//! - **plugin**: the [`Plugin`] capability trait and hook routing
//! - **selection**: "pick a source, then a target" state machine
//! - **trails**: per-entity fading traces
//! - **animation**: interpolated transit of one entity toward another
//! - **layer**: [`InteractionLayer`], wiring the three plugins together
//!
//! # Usage
//!
//! ```rust
//! use wayline_core::host::memory::MemoryHost;
//! use wayline_core::{EntityId, InteractionLayer, LayerConfig, Position};
//!
//! let mut host = MemoryHost::new();
//! host.spawn("ship", Position::new(4.0, 52.0, 0.0));
//! host.spawn("buoy", Position::new(4.0, 52.01, 0.0));
//!
//! let mut layer = InteractionLayer::new(&mut host, LayerConfig::default());
//! let events = layer.selection().events();
//! events.entity_source.subscribe_fn(|id| id.as_str() == "ship");
//! events.entity_target.subscribe_fn(|id| id.as_str() == "buoy");
//!
//! host.click(&mut layer, Some(&EntityId::new("ship")));
//! host.click(&mut layer, Some(&EntityId::new("buoy")));
//! assert!(layer.animation().is_running());
//!
//! host.run_for(&mut layer, 5_000, 16);
//! assert!(!layer.animation().is_running());
//! ```
//!
//! [`MemoryHost`]: host::memory::MemoryHost

pub mod animation;
pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod host;
pub mod layer;
pub mod plugin;
pub mod selection;
pub mod style;
pub mod trails;

pub use animation::{AnimationComplete, AnimationController, AnimationOptions};
pub use config::LayerConfig;
pub use error::{HostError, LayerError};
pub use events::{EventChannel, Subscription};
pub use geo::{GeoMath, Position, Wgs84};
pub use host::{Click, ClickResponse, ClickRouter, EntityId, HostHooks, MapHost};
pub use layer::InteractionLayer;
pub use plugin::{HookSet, Plugin};
pub use selection::{SelectionChanged, SelectionCoordinator, SelectionState, TargetSet};
pub use style::{PointStyle, Rgb};
pub use trails::{TraceChange, TraceConfig, TraceEngine, TraceOptions};
