//! In-memory implementation of the host contract.
//!
//! `MemoryHost` keeps entities in a map, runs on a manual millisecond clock and
//! queues position-changed notifications until the next [`MemoryHost::step`].
//! It is deterministic, which makes it the host of choice for tests; the
//! simulator drives it from a wall clock.
//!
//! # Usage
//!
//! ```rust
//! use wayline_core::host::memory::MemoryHost;
//! use wayline_core::{InteractionLayer, LayerConfig, Position};
//!
//! let mut host = MemoryHost::new();
//! host.spawn("ship", Position::new(4.0, 52.0, 0.0));
//! let mut layer = InteractionLayer::new(&mut host, LayerConfig::default());
//!
//! // In your main loop:
//! host.advance(16);
//! host.step(&mut layer);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use super::{
    ChangeFeed, Click, ClickResponse, EntityId, EntityStore, FrameHandle, FrameScheduler,
    HostHooks, MapHost, TimerId, WatchId,
};
use crate::error::HostError;
use crate::geo::{GeoMath, Position, Wgs84};
use crate::style::PointStyle;

/// What kind of entity a record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A regular map entity (vessel, vehicle, marker)
    Model,
    /// A trail point created through [`EntityStore::add_point`]
    Point,
}

/// Stored state of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub position: Option<Position>,
    pub style: Option<PointStyle>,
}

/// Outcome of a simulated click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickReport {
    /// Whether the selecting hook allowed native selection
    pub selection_allowed: bool,
    /// Response of the click hook
    pub response: ClickResponse,
}

/// Counts of what one [`MemoryHost::step`] delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub changes: usize,
    pub timers: usize,
    pub frames: usize,
}

/// Deterministic in-memory map host
#[derive(Debug, Default)]
pub struct MemoryHost {
    now_ms: u64,
    next_handle: u64,
    entities: BTreeMap<EntityId, EntityRecord>,
    frames: BTreeSet<FrameHandle>,
    timers: BTreeMap<TimerId, u64>,
    watches: BTreeSet<WatchId>,
    pending_changes: Vec<EntityId>,
    failing_writes: BTreeSet<EntityId>,
    selected: Option<EntityId>,
    destroyed: bool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    // -------------------------------------------------------------------------
    // Scene setup
    // -------------------------------------------------------------------------

    /// Add a positioned entity
    pub fn spawn(&mut self, id: impl Into<EntityId>, position: Position) {
        self.entities.insert(
            id.into(),
            EntityRecord {
                kind: EntityKind::Model,
                position: Some(position),
                style: None,
            },
        );
    }

    /// Add an entity that has no resolvable position
    pub fn spawn_unpositioned(&mut self, id: impl Into<EntityId>) {
        self.entities.insert(
            id.into(),
            EntityRecord {
                kind: EntityKind::Model,
                position: None,
                style: None,
            },
        );
    }

    /// Move an entity from outside the layer (a feed update, a user drag)
    pub fn move_entity(&mut self, id: &EntityId, position: Position) -> Result<(), HostError> {
        self.set_position(id, position)
    }

    /// Make every subsequent write to `id` fail
    pub fn fail_writes(&mut self, id: impl Into<EntityId>) {
        self.failing_writes.insert(id.into());
    }

    /// Tear the surface down. Everything after this is a no-op or an error.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.frames.clear();
        self.timers.clear();
        self.watches.clear();
        self.pending_changes.clear();
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn entity(&self, id: &EntityId) -> Option<&EntityRecord> {
        self.entities.get(id)
    }

    /// Ids of all trail point entities
    pub fn point_ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, record)| record.kind == EntityKind::Point)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn active_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_watched(&self) -> bool {
        !self.watches.is_empty()
    }

    /// Entity currently highlighted by native selection
    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    // -------------------------------------------------------------------------
    // Clock and event loop
    // -------------------------------------------------------------------------

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    pub fn set_time(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Deliver queued changes, then due timers, then one frame to every
    /// active frame handle.
    ///
    /// Changes raised while delivering (e.g. animation writes during a frame)
    /// are queued for the next step.
    pub fn step<H: HostHooks + ?Sized>(&mut self, hooks: &mut H) -> StepReport {
        let mut report = StepReport::default();
        if self.destroyed {
            return report;
        }

        let mut seen = BTreeSet::new();
        let changes: Vec<EntityId> = std::mem::take(&mut self.pending_changes)
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        for id in changes {
            if self.watches.is_empty() {
                break;
            }
            hooks.entity_changed(self, &id);
            report.changes += 1;
        }

        let mut due: Vec<(u64, TimerId)> = self
            .timers
            .iter()
            .filter(|(_, at)| **at <= self.now_ms)
            .map(|(timer, at)| (*at, *timer))
            .collect();
        due.sort();
        for (_, timer) in due {
            // An earlier timer may have cancelled this one
            if self.timers.remove(&timer).is_some() {
                hooks.timer(self, timer);
                report.timers += 1;
            }
        }

        let frames: Vec<FrameHandle> = self.frames.iter().copied().collect();
        for handle in frames {
            if self.frames.contains(&handle) {
                hooks.frame(self, handle);
                report.frames += 1;
            }
        }

        report
    }

    /// Advance the clock in `frame_ms` increments for `duration_ms`, stepping
    /// after each increment
    pub fn run_for<H: HostHooks + ?Sized>(
        &mut self,
        hooks: &mut H,
        duration_ms: u64,
        frame_ms: u64,
    ) {
        let frame_ms = frame_ms.max(1);
        let end = self.now_ms + duration_ms;
        while self.now_ms < end {
            self.advance(frame_ms.min(end - self.now_ms));
            self.step(hooks);
        }
    }

    /// Simulate a click: selecting, click, then selected if allowed
    pub fn click<H: HostHooks + ?Sized>(
        &mut self,
        hooks: &mut H,
        entity: Option<&EntityId>,
    ) -> ClickReport {
        let click = Click {
            entity: entity.cloned(),
            screen: None,
        };
        let selection_allowed = hooks.selecting(self, entity);
        let response = hooks.click(self, &click);
        if selection_allowed {
            self.selected = entity.cloned();
            hooks.selected(self, entity);
        }
        ClickReport {
            selection_allowed,
            response,
        }
    }

    fn check_alive(&self) -> Result<(), HostError> {
        if self.destroyed {
            Err(HostError::destroyed())
        } else {
            Ok(())
        }
    }
}

impl EntityStore for MemoryHost {
    fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    fn position(&self, id: &EntityId) -> Option<Position> {
        self.entities.get(id).and_then(|record| record.position)
    }

    fn set_position(&mut self, id: &EntityId, position: Position) -> Result<(), HostError> {
        self.check_alive()?;
        if self.failing_writes.contains(id) {
            return Err(HostError::new(-1, format!("write to {} rejected", id)));
        }
        let record = self
            .entities
            .get_mut(id)
            .ok_or_else(|| HostError::unknown_entity(id))?;
        record.position = Some(position);
        if !self.watches.is_empty() {
            self.pending_changes.push(id.clone());
        }
        Ok(())
    }

    fn add_point(
        &mut self,
        id: &EntityId,
        position: Position,
        style: PointStyle,
    ) -> Result<(), HostError> {
        self.check_alive()?;
        if self.entities.contains_key(id) {
            return Err(HostError::new(-4, format!("entity {} already exists", id)));
        }
        self.entities.insert(
            id.clone(),
            EntityRecord {
                kind: EntityKind::Point,
                position: Some(position),
                style: Some(style),
            },
        );
        Ok(())
    }

    fn set_point_style(&mut self, id: &EntityId, style: PointStyle) -> Result<(), HostError> {
        self.check_alive()?;
        if self.failing_writes.contains(id) {
            return Err(HostError::new(-1, format!("write to {} rejected", id)));
        }
        let record = self
            .entities
            .get_mut(id)
            .ok_or_else(|| HostError::unknown_entity(id))?;
        record.style = Some(style);
        Ok(())
    }

    fn remove(&mut self, id: &EntityId) -> bool {
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        self.entities.remove(id).is_some()
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().cloned().collect()
    }
}

impl ChangeFeed for MemoryHost {
    fn watch_changes(&mut self) -> WatchId {
        let watch = WatchId(self.alloc_handle());
        self.watches.insert(watch);
        watch
    }

    fn unwatch_changes(&mut self, watch: WatchId) {
        self.watches.remove(&watch);
        if self.watches.is_empty() {
            self.pending_changes.clear();
        }
    }
}

impl FrameScheduler for MemoryHost {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn start_frames(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.alloc_handle());
        self.frames.insert(handle);
        handle
    }

    fn cancel_frames(&mut self, handle: FrameHandle) {
        self.frames.remove(&handle);
    }

    fn schedule_once(&mut self, delay_ms: u64) -> TimerId {
        let timer = TimerId(self.alloc_handle());
        self.timers.insert(timer, self.now_ms.saturating_add(delay_ms));
        timer
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }
}

impl GeoMath for MemoryHost {
    fn distance(&self, a: &Position, b: &Position) -> f64 {
        Wgs84.distance(a, b)
    }
}

impl MapHost for MemoryHost {
    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
