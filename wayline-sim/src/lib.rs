//! Wayline Simulator
//!
//! Drives the wayline interaction layer against an in-memory map host on a
//! wall clock: a vessel is picked as source, a waypoint as target, the vessel
//! moves there leaving a fading trail, and every event comes out as a JSON
//! line.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wayline_sim::{drive, load_config, DriverOptions, Scenario};
//!
//! let config = load_config(None);
//! let mut sim = Scenario::default().build(config);
//! let summary = drive(&mut sim, &DriverOptions::default(), &mut std::io::stdout()).await?;
//! ```

pub mod driver;
pub mod scenario;
pub mod settings;

pub use driver::{drive, DriverOptions, RunSummary};
pub use scenario::{Scenario, SimEvent, SimRecord, Simulation};
pub use settings::{load_config, Overrides};
