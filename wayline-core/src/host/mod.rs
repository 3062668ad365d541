//! Host Map Engine Contract
//!
//! The interaction layer never talks to a concrete map engine. Each host
//! capability is a narrow trait, and a host implements all of them behind
//! [`MapHost`]:
//!
//! | Trait | Capability |
//! |-------|------------|
//! | [`EntityStore`] | entity lookup, position writes, trail point CRUD |
//! | [`ChangeFeed`] | position-changed notification subscription |
//! | [`FrameScheduler`] | repeating frame callbacks, one-shot timers, clock |
//! | [`GeoMath`] | distance between positions |
//!
//! Calls flow the other way through [`ClickRouter`] and [`HostHooks`]: the host
//! owns the event loop and pushes clicks, changes, frames and timer expiries
//! into the layer, handing itself over as `&mut dyn MapHost` each time.
//!
//! # Event loop contract
//!
//! - A frame handle returned by [`FrameScheduler::start_frames`] receives one
//!   [`HostHooks::frame`] call per rendered frame until cancelled.
//! - A timer returned by [`FrameScheduler::schedule_once`] receives exactly one
//!   [`HostHooks::timer`] call unless cancelled first.
//! - Position changes are delivered through [`HostHooks::entity_changed`] only
//!   while at least one [`ChangeFeed`] watch is active.
//! - For a click, [`ClickRouter::selecting`] is consulted first, then
//!   [`ClickRouter::click`], then [`ClickRouter::selected`] if selection was
//!   allowed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HostError;
use crate::geo::Position;
use crate::style::PointStyle;

pub use crate::geo::GeoMath;

pub mod memory;

/// Stable id of an entity on the host surface
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId(s)
    }
}

/// Handle of a repeating frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(pub u64);

/// Handle of a one-shot timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// Handle of a position-changed watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(pub u64);

/// Entity CRUD by id
pub trait EntityStore {
    /// Whether the host knows this entity
    fn contains(&self, id: &EntityId) -> bool;

    /// Current resolvable position, `None` if unknown or unpositioned
    fn position(&self, id: &EntityId) -> Option<Position>;

    /// Move an entity
    fn set_position(&mut self, id: &EntityId, position: Position) -> Result<(), HostError>;

    /// Create a trail point entity
    fn add_point(
        &mut self,
        id: &EntityId,
        position: Position,
        style: PointStyle,
    ) -> Result<(), HostError>;

    /// Restyle a trail point entity
    fn set_point_style(&mut self, id: &EntityId, style: PointStyle) -> Result<(), HostError>;

    /// Remove an entity. Returns false if it did not exist.
    fn remove(&mut self, id: &EntityId) -> bool;

    /// Ids of every entity currently on the surface
    fn entity_ids(&self) -> Vec<EntityId>;
}

/// Position-changed notification subscription
pub trait ChangeFeed {
    fn watch_changes(&mut self) -> WatchId;
    fn unwatch_changes(&mut self, watch: WatchId);
}

/// Frame and timer scheduling
pub trait FrameScheduler {
    /// Monotonic clock in milliseconds
    fn now_ms(&self) -> u64;

    /// Register a repeating per-frame callback
    fn start_frames(&mut self) -> FrameHandle;

    /// Cancel a frame callback. Cancelling twice is a no-op.
    fn cancel_frames(&mut self, handle: FrameHandle);

    /// Register a one-shot callback `delay_ms` from now
    fn schedule_once(&mut self, delay_ms: u64) -> TimerId;

    /// Cancel a one-shot callback. Cancelling a fired timer is a no-op.
    fn cancel_timer(&mut self, timer: TimerId);
}

/// Everything the interaction layer consumes from a map engine
pub trait MapHost: EntityStore + ChangeFeed + FrameScheduler + GeoMath {
    /// Whether the map surface has been torn down
    fn is_destroyed(&self) -> bool;
}

/// A click on the surface, already hit-tested by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Click {
    /// Entity under the cursor, `None` for empty space
    pub entity: Option<EntityId>,
    /// Screen position, informational only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<(f64, f64)>,
}

impl Click {
    pub fn on(entity: impl Into<EntityId>) -> Self {
        Click {
            entity: Some(entity.into()),
            screen: None,
        }
    }

    pub fn empty() -> Self {
        Click::default()
    }
}

/// What the host should do with a click after the layer saw it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickResponse {
    /// Run the native click behavior (popups, default actions)
    #[default]
    Allow,
    /// Swallow the click
    Suppress,
}

impl ClickResponse {
    /// Suppress wins when combining responses from several handlers
    pub fn combine(self, other: ClickResponse) -> ClickResponse {
        if self == ClickResponse::Suppress || other == ClickResponse::Suppress {
            ClickResponse::Suppress
        } else {
            ClickResponse::Allow
        }
    }
}

/// Click interception hooks. Each boolean return is "allow native behavior".
pub trait ClickRouter {
    /// May the host select (highlight) `candidate`?
    fn selecting(&mut self, host: &mut dyn MapHost, candidate: Option<&EntityId>) -> bool;

    /// A click landed on `click.entity` (or empty space)
    fn click(&mut self, host: &mut dyn MapHost, click: &Click) -> ClickResponse;

    /// The host selected `entity`. Returning false vetoes follow-up behavior.
    fn selected(&mut self, host: &mut dyn MapHost, entity: Option<&EntityId>) -> bool;
}

/// Everything a host pushes into the layer
pub trait HostHooks: ClickRouter {
    /// An entity's position changed (only while a watch is active)
    fn entity_changed(&mut self, host: &mut dyn MapHost, id: &EntityId);

    /// A registered frame callback fired
    fn frame(&mut self, host: &mut dyn MapHost, handle: FrameHandle);

    /// A one-shot timer fired
    fn timer(&mut self, host: &mut dyn MapHost, timer: TimerId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_serde_transparent() {
        let id = EntityId::new("vessel-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"vessel-7\"");
        assert_eq!(id.to_string(), "vessel-7");
        assert_eq!(EntityId::from("vessel-7"), id);
    }

    #[test]
    fn test_click_response_combine() {
        use ClickResponse::*;
        assert_eq!(Allow.combine(Allow), Allow);
        assert_eq!(Allow.combine(Suppress), Suppress);
        assert_eq!(Suppress.combine(Allow), Suppress);
    }
}
