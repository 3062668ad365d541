//! Trace engine
//!
//! Records positions of traced entities as trail point entities on the host,
//! ages them, restyles them along the tail-to-head gradient and removes them.
//!
//! # Lifecycle
//!
//! - The frame loop and the host change watch are active exactly while at
//!   least one entity is traced.
//! - Host marker removals are deferred to a zero-delay timer, so nothing is
//!   removed from the host in the middle of the frame that decided it.
//! - Shortly after construction a one-time sweep removes trail markers left
//!   behind by a previous engine that was not torn down cleanly. Markers of an
//!   entity are also cleared when tracing of it starts, since point ids restart
//!   with every engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::config::{TraceConfig, TraceOptions};
use super::gradient::{fade_factor, gradient_style, removal_interval};
use super::history::{FadeSchedule, FadeStep, PointId, Trace, TraceCoordinate};
use crate::error::LayerError;
use crate::events::EventChannel;
use crate::host::{EntityId, FrameHandle, MapHost, TimerId, WatchId};
use crate::plugin::{HookSet, Plugin};

/// Prefix of every trail marker id created by a trace engine
pub const TRACE_MARKER_PREFIX: &str = "wayline-trace:";

/// Delay of the stale marker sweep after construction
pub const STALE_SWEEP_DELAY_MS: u64 = 1_000;

/// Structural change to a trace
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TraceChange {
    /// Entity is now traced
    Started { entity: EntityId },
    /// A point was recorded
    #[serde(rename_all = "camelCase")]
    PointAdded {
        entity: EntityId,
        birth_index: usize,
        len: usize,
    },
    /// The oldest point was pushed out by a newer one and is fading
    PointEvicted { entity: EntityId },
    /// A point finished fading and is gone
    PointRemoved { entity: EntityId, len: usize },
    /// Entity is no longer traced
    Stopped { entity: EntityId },
}

/// Summary of one restyle pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPass {
    pub timestamp_ms: u64,
    pub traces: usize,
    pub points: usize,
}

/// Observable events of the trace engine
#[derive(Debug, Clone, Default)]
pub struct TraceEvents {
    pub on_change: EventChannel<TraceChange>,
    pub on_render: EventChannel<RenderPass>,
}

/// Per-entity fading trails
pub struct TraceEngine {
    defaults: TraceConfig,
    marker_prefix: String,
    traces: BTreeMap<EntityId, Trace>,
    schedule: FadeSchedule,
    frame: Option<FrameHandle>,
    watch: Option<WatchId>,
    sweep_timer: Option<TimerId>,
    flush_timer: Option<TimerId>,
    pending_removals: Vec<EntityId>,
    next_point: u64,
    events: TraceEvents,
    destroyed: bool,
}

impl TraceEngine {
    /// Create an engine and schedule the stale marker sweep
    pub fn new(host: &mut dyn MapHost, defaults: TraceConfig) -> Self {
        Self::with_prefix(host, defaults, TRACE_MARKER_PREFIX)
    }

    /// Create an engine whose markers use a custom id prefix
    pub fn with_prefix(host: &mut dyn MapHost, defaults: TraceConfig, prefix: &str) -> Self {
        let sweep_timer = if host.is_destroyed() {
            None
        } else {
            Some(host.schedule_once(STALE_SWEEP_DELAY_MS))
        };
        TraceEngine {
            defaults: defaults.normalized(),
            marker_prefix: prefix.to_string(),
            traces: BTreeMap::new(),
            schedule: FadeSchedule::default(),
            frame: None,
            watch: None,
            sweep_timer,
            flush_timer: None,
            pending_removals: Vec::new(),
            next_point: 0,
            events: TraceEvents::default(),
            destroyed: false,
        }
    }

    pub fn events(&self) -> &TraceEvents {
        &self.events
    }

    pub fn defaults(&self) -> &TraceConfig {
        &self.defaults
    }

    pub fn marker_prefix(&self) -> &str {
        &self.marker_prefix
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Start tracing `entity`. Returns false if nothing changed (already
    /// traced, unknown entity, torn-down host).
    pub fn trace(
        &mut self,
        host: &mut dyn MapHost,
        entity: &EntityId,
        options: &TraceOptions,
    ) -> bool {
        match self.try_trace(host, entity, options) {
            Ok(()) => true,
            Err(e) => {
                log_skipped("trace", entity, &e);
                false
            }
        }
    }

    /// Stop tracing `entity` and remove its points
    pub fn untrace(&mut self, host: &mut dyn MapHost, entity: &EntityId) -> bool {
        if let Err(e) = self.check_host(host) {
            log_skipped("untrace", entity, &e);
            return false;
        }
        let Some(mut trace) = self.traces.remove(entity) else {
            log::debug!("trace: untrace {}: not traced", entity);
            return false;
        };
        self.schedule.cancel_entity(entity);
        let markers = trace.drain_all().into_iter().map(|c| c.marker);
        self.pending_removals.extend(markers);
        self.request_flush(host);
        self.events.on_change.emit(&TraceChange::Stopped {
            entity: entity.clone(),
        });
        log::debug!("trace: stopped tracing {}", entity);
        self.stop_if_idle(host);
        true
    }

    /// Stop tracing every entity. Returns how many were traced.
    pub fn untrace_all(&mut self, host: &mut dyn MapHost) -> usize {
        let ids: Vec<EntityId> = self.traces.keys().cloned().collect();
        let mut count = 0;
        for id in &ids {
            if self.untrace(host, id) {
                count += 1;
            }
        }
        count
    }

    pub fn get_trace(&self, entity: &EntityId) -> Option<&Trace> {
        self.traces.get(entity)
    }

    pub fn is_tracing(&self, entity: &EntityId) -> bool {
        self.traces.contains_key(entity)
    }

    pub fn traced(&self) -> impl Iterator<Item = &EntityId> {
        self.traces.keys()
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Whether the engine currently holds a frame callback
    pub fn is_running(&self) -> bool {
        self.frame.is_some()
    }

    /// Number of pending fade deadlines for `entity`
    pub fn pending_fades(&self, entity: &EntityId) -> usize {
        self.schedule.pending_for(entity)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn check_host(&self, host: &dyn MapHost) -> Result<(), LayerError> {
        if self.destroyed || host.is_destroyed() {
            Err(LayerError::HostTornDown)
        } else {
            Ok(())
        }
    }

    fn try_trace(
        &mut self,
        host: &mut dyn MapHost,
        entity: &EntityId,
        options: &TraceOptions,
    ) -> Result<(), LayerError> {
        self.check_host(host)?;
        if self.traces.contains_key(entity) {
            return Err(LayerError::Redundant(format!("{} already traced", entity)));
        }
        if !host.contains(entity) {
            return Err(LayerError::MissingEntity(entity.clone()));
        }

        let leftovers = self.stale_markers(host, &self.entity_marker_prefix(entity));
        for marker in &leftovers {
            host.remove(marker);
        }
        if !leftovers.is_empty() {
            log::info!("trace: {}: removed {} leftover trail markers", entity, leftovers.len());
        }

        let config = self.defaults.merged(options);
        log::debug!(
            "trace: tracing {} (max {} points, lifetime {}ms)",
            entity,
            config.max_coordinates,
            config.coordinate_lifetime
        );
        self.traces
            .insert(entity.clone(), Trace::new(entity.clone(), config));
        self.events.on_change.emit(&TraceChange::Started {
            entity: entity.clone(),
        });
        self.ensure_running(host);

        // Start the trail where the entity is now
        if let Err(e) = self.record_point(host, entity) {
            log_skipped("initial point", entity, &e);
        }
        Ok(())
    }

    fn ensure_running(&mut self, host: &mut dyn MapHost) {
        if self.frame.is_none() {
            self.frame = Some(host.start_frames());
        }
        if self.watch.is_none() {
            self.watch = Some(host.watch_changes());
        }
    }

    fn stop_if_idle(&mut self, host: &mut dyn MapHost) {
        if !self.traces.is_empty() {
            return;
        }
        if let Some(frame) = self.frame.take() {
            host.cancel_frames(frame);
        }
        if let Some(watch) = self.watch.take() {
            host.unwatch_changes(watch);
        }
    }

    fn request_flush(&mut self, host: &mut dyn MapHost) {
        if self.flush_timer.is_none() && !self.pending_removals.is_empty() && !host.is_destroyed()
        {
            self.flush_timer = Some(host.schedule_once(0));
        }
    }

    fn entity_marker_prefix(&self, entity: &EntityId) -> String {
        format!("{}{}:", self.marker_prefix, entity)
    }

    /// Host entities under `prefix` that no trace of this engine owns
    fn stale_markers(&self, host: &dyn MapHost, prefix: &str) -> Vec<EntityId> {
        let live: BTreeSet<&EntityId> = self
            .traces
            .values()
            .flat_map(|trace| trace.markers())
            .chain(self.pending_removals.iter())
            .collect();
        host.entity_ids()
            .into_iter()
            .filter(|id| id.as_str().starts_with(prefix) && !live.contains(id))
            .collect()
    }

    /// Record the entity's current position if the throttle allows.
    /// Returns whether a point was recorded.
    fn record_point(
        &mut self,
        host: &mut dyn MapHost,
        entity: &EntityId,
    ) -> Result<bool, LayerError> {
        let now = host.now_ms();
        let position = host
            .position(entity)
            .ok_or_else(|| LayerError::UnresolvablePosition(entity.clone()))?;
        let marker_prefix = self.entity_marker_prefix(entity);
        let Some(trace) = self.traces.get_mut(entity) else {
            return Ok(false);
        };

        let distance = trace.last().map(|last| host.distance(&last.position, &position));
        if !trace.should_record(distance, now) {
            log::trace!("trace: {} moved {:?}m, throttled", entity, distance);
            return Ok(false);
        }

        let id = PointId(self.next_point);
        self.next_point += 1;
        let marker = EntityId::new(format!("{}{}", marker_prefix, id.0));
        let birth_index = trace.len();
        let coordinate = TraceCoordinate {
            id,
            marker: marker.clone(),
            position,
            timestamp_created: now,
            birth_index,
            fade_out_started: None,
        };
        let config = trace.config().clone();
        let style = gradient_style(&config, birth_index, birth_index + 1)
            .faded(fade_factor(&config, &coordinate, now));
        host.add_point(&marker, position, style)?;

        let evicted = trace.push(coordinate, now);
        let len = trace.len();
        self.schedule.push(
            now.saturating_add(config.coordinate_lifetime - config.fade_out_duration),
            entity,
            id,
            FadeStep::BeginFadeOut,
        );
        self.events.on_change.emit(&TraceChange::PointAdded {
            entity: entity.clone(),
            birth_index,
            len,
        });

        if let Some((oldest, started_now)) = evicted {
            if started_now {
                self.schedule.push(
                    now.saturating_add(config.fade_out_duration),
                    entity,
                    oldest,
                    FadeStep::Finalize,
                );
            }
            log::trace!(
                "trace: {} over {} points, evicting oldest",
                entity,
                config.max_coordinates
            );
            self.events.on_change.emit(&TraceChange::PointEvicted {
                entity: entity.clone(),
            });
        }
        Ok(true)
    }

    /// One frame: run due fade deadlines, then the throttled restyle pass
    fn tick(&mut self, host: &mut dyn MapHost) {
        let now = host.now_ms();

        while let Some(deadline) = self.schedule.pop_due(now) {
            let Some(trace) = self.traces.get_mut(&deadline.entity) else {
                continue;
            };
            match deadline.step {
                FadeStep::BeginFadeOut => {
                    let fade_out = trace.config().fade_out_duration;
                    let lifetime = trace.config().coordinate_lifetime;
                    let Some(coordinate) = trace.find_mut(deadline.point) else {
                        continue;
                    };
                    // Missed by more than the whole fade window (frames were
                    // paused): leave it to the staggered removal.
                    if coordinate.is_fading() || coordinate.age(now) > lifetime {
                        continue;
                    }
                    coordinate.fade_out_started = Some(now);
                    self.schedule.push(
                        now.saturating_add(fade_out),
                        &deadline.entity,
                        deadline.point,
                        FadeStep::Finalize,
                    );
                }
                FadeStep::Finalize => {
                    let Some(coordinate) = trace.take(deadline.point) else {
                        continue;
                    };
                    self.pending_removals.push(coordinate.marker);
                    self.events.on_change.emit(&TraceChange::PointRemoved {
                        entity: deadline.entity.clone(),
                        len: trace.len(),
                    });
                }
            }
        }

        let mut pass = RenderPass {
            timestamp_ms: now,
            traces: 0,
            points: 0,
        };
        for (entity, trace) in self.traces.iter_mut() {
            let interval = trace.config().color_update_interval;
            if let Some(last) = trace.last_refresh {
                if now.saturating_sub(last) < interval {
                    continue;
                }
            }
            trace.last_refresh = Some(now);

            let cadence = removal_interval(trace.config(), trace.len());
            if let Some(point) = trace.start_staggered_fade(now, cadence) {
                log::trace!(
                    "trace: {} expiring point {} (next in {}ms)",
                    entity,
                    point.0,
                    cadence
                );
                self.schedule.push(
                    now.saturating_add(trace.config().fade_out_duration),
                    entity,
                    point,
                    FadeStep::Finalize,
                );
            }

            pass.traces += 1;
            pass.points += restyle(host, trace, now);
        }
        if pass.traces > 0 {
            self.events.on_render.emit(&pass);
        }

        self.request_flush(host);
    }

    fn flush_removals(&mut self, host: &mut dyn MapHost) {
        let markers = std::mem::take(&mut self.pending_removals);
        if host.is_destroyed() {
            return;
        }
        let removed = markers.iter().filter(|marker| host.remove(marker)).count();
        if removed > 0 {
            log::trace!("trace: removed {} markers", removed);
        }
    }

    fn sweep_stale(&mut self, host: &mut dyn MapHost) {
        if self.check_host(host).is_err() {
            return;
        }
        let stale = self.stale_markers(host, &self.marker_prefix);
        for id in &stale {
            host.remove(id);
        }
        if !stale.is_empty() {
            log::info!("trace: removed {} stale trail markers", stale.len());
        }
    }
}

/// Push current styles of every point of `trace` to the host. Failures are
/// logged per point and do not stop the pass.
fn restyle(host: &mut dyn MapHost, trace: &Trace, now: u64) -> usize {
    let config = trace.config();
    let len = trace.len();
    let mut styled = 0;

    let live = trace
        .coordinates()
        .iter()
        .enumerate()
        .map(|(index, c)| (gradient_style(config, index, len), c));
    let fading = trace
        .evicted()
        .iter()
        .map(|c| (gradient_style(config, 0, len.max(2)), c));

    for (style, coordinate) in live.chain(fading) {
        let style = style.faded(fade_factor(config, coordinate, now));
        match host.set_point_style(&coordinate.marker, style) {
            Ok(()) => styled += 1,
            Err(e) => log::warn!("trace: {}: restyle failed: {}", coordinate.marker, e),
        }
    }
    styled
}

fn log_skipped(action: &str, entity: &EntityId, error: &LayerError) {
    if error.is_benign() {
        log::debug!("trace: {} {} skipped: {}", action, entity, error);
    } else {
        log::warn!("trace: {} {} failed: {}", action, entity, error);
    }
}

impl Plugin for TraceEngine {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn hooks(&self) -> HookSet {
        HookSet::ENTITY_CHANGED | HookSet::FRAMES | HookSet::TIMERS
    }

    /// Stop the frame loop and cancel all scheduled work, then clear state.
    /// Marker removal happens on the next timer tick.
    fn destroy(&mut self, host: &mut dyn MapHost) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        let alive = !host.is_destroyed();
        if let Some(frame) = self.frame.take() {
            if alive {
                host.cancel_frames(frame);
            }
        }
        if let Some(watch) = self.watch.take() {
            if alive {
                host.unwatch_changes(watch);
            }
        }
        if let Some(timer) = self.sweep_timer.take() {
            if alive {
                host.cancel_timer(timer);
            }
        }
        self.schedule.clear();

        let traces = std::mem::take(&mut self.traces);
        for (entity, mut trace) in traces.into_iter() {
            let markers = trace.drain_all().into_iter().map(|c| c.marker);
            self.pending_removals.extend(markers);
            self.events.on_change.emit(&TraceChange::Stopped { entity });
        }
        self.request_flush(host);
        log::debug!(
            "trace: destroyed, {} markers to remove",
            self.pending_removals.len()
        );
    }

    fn on_entity_changed(&mut self, host: &mut dyn MapHost, id: &EntityId) {
        if self.check_host(host).is_err() || !self.traces.contains_key(id) {
            return;
        }
        if let Err(e) = self.record_point(host, id) {
            log_skipped("record point", id, &e);
        }
    }

    fn on_frame(&mut self, host: &mut dyn MapHost, handle: FrameHandle) {
        if self.frame != Some(handle) || self.check_host(host).is_err() {
            return;
        }
        self.tick(host);
    }

    fn on_timer(&mut self, host: &mut dyn MapHost, timer: TimerId) {
        if self.flush_timer == Some(timer) {
            self.flush_timer = None;
            self.flush_removals(host);
        } else if self.sweep_timer == Some(timer) {
            self.sweep_timer = None;
            self.sweep_stale(host);
        }
    }
}
