//! Entity Transit Animation
//!
//! Moves a source entity toward the position its target had when the run
//! started, writing interpolated positions through the host every frame.
//!
//! A run ends when the full duration has elapsed or the source is within the
//! stopping distance of the target snapshot, whichever comes first. Starting a
//! new run drops the in-flight one without completing it, and a source that
//! disappears mid-run aborts it silently.
//!
//! Interpolation is linear in longitude, latitude and height, which is only a
//! fair approximation of the geodesic over short distances.

mod controller;

pub use controller::*;
