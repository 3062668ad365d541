//! Trace history storage
//!
//! A [`Trace`] is the rolling position history of one entity. Live points sit
//! in a FIFO bounded by `max_coordinates`; points pushed out by a newer point
//! move to a fading list until their fade-out completes.
//!
//! Fade deadlines of every point across all traces live in one
//! [`FadeSchedule`] min-heap that the engine sweeps once per frame, instead of
//! one host timer per point.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use super::config::TraceConfig;
use crate::geo::Position;
use crate::host::EntityId;

/// Engine-unique id of a trace point
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointId(pub u64);

/// One recorded position
#[derive(Debug, Clone, PartialEq)]
pub struct TraceCoordinate {
    pub id: PointId,
    /// Host entity that renders this point
    pub marker: EntityId,
    pub position: Position,
    pub timestamp_created: u64,
    /// Trace length when this point was recorded
    pub birth_index: usize,
    /// When fade-out began, if it has
    pub fade_out_started: Option<u64>,
}

impl TraceCoordinate {
    pub fn age(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_created)
    }

    pub fn is_fading(&self) -> bool {
        self.fade_out_started.is_some()
    }
}

/// Position history of a single entity
#[derive(Debug, Clone)]
pub struct Trace {
    entity_id: EntityId,
    config: TraceConfig,
    coordinates: VecDeque<TraceCoordinate>,
    evicted: Vec<TraceCoordinate>,
    pub(crate) last_refresh: Option<u64>,
    pub(crate) last_staggered_removal: Option<u64>,
}

impl Trace {
    pub fn new(entity_id: EntityId, config: TraceConfig) -> Self {
        Trace {
            entity_id,
            coordinates: VecDeque::with_capacity(
                config.max_coordinates.saturating_add(1).min(1_024),
            ),
            config,
            evicted: Vec::new(),
            last_refresh: None,
            last_staggered_removal: None,
        }
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Live points, oldest first
    pub fn coordinates(&self) -> &VecDeque<TraceCoordinate> {
        &self.coordinates
    }

    /// Points pushed out by newer ones, still fading
    pub fn evicted(&self) -> &[TraceCoordinate] {
        &self.evicted
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Newest live point
    pub fn last(&self) -> Option<&TraceCoordinate> {
        self.coordinates.back()
    }

    /// Positions of the live points, oldest first
    pub fn positions(&self) -> Vec<Position> {
        self.coordinates.iter().map(|c| c.position).collect()
    }

    /// Every host marker this trace owns, live or fading
    pub fn markers(&self) -> impl Iterator<Item = &EntityId> {
        self.coordinates
            .iter()
            .chain(self.evicted.iter())
            .map(|c| &c.marker)
    }

    /// Throttle: skip only when the entity is both too close to and too soon
    /// after the last point. `distance` is meters to the last point.
    pub fn should_record(&self, distance: Option<f64>, now_ms: u64) -> bool {
        match (self.last(), distance) {
            (Some(last), Some(distance)) => {
                let too_close = distance < self.config.min_point_distance;
                let too_soon = last.age(now_ms) < self.config.min_point_interval;
                !(too_close && too_soon)
            }
            _ => true,
        }
    }

    /// Append a point. If that exceeds `max_coordinates`, the oldest point is
    /// evicted into the fading list and returned as `(id, fade_started_now)`.
    pub(crate) fn push(
        &mut self,
        coordinate: TraceCoordinate,
        now_ms: u64,
    ) -> Option<(PointId, bool)> {
        self.coordinates.push_back(coordinate);
        if self.coordinates.len() <= self.config.max_coordinates {
            return None;
        }
        let mut oldest = self.coordinates.pop_front()?;
        let started_now = oldest.fade_out_started.is_none();
        if started_now {
            oldest.fade_out_started = Some(now_ms);
        }
        let id = oldest.id;
        self.evicted.push(oldest);
        Some((id, started_now))
    }

    pub(crate) fn find_mut(&mut self, id: PointId) -> Option<&mut TraceCoordinate> {
        self.coordinates
            .iter_mut()
            .chain(self.evicted.iter_mut())
            .find(|c| c.id == id)
    }

    /// Remove a point from wherever it lives
    pub(crate) fn take(&mut self, id: PointId) -> Option<TraceCoordinate> {
        if let Some(index) = self.evicted.iter().position(|c| c.id == id) {
            return Some(self.evicted.remove(index));
        }
        let index = self.coordinates.iter().position(|c| c.id == id)?;
        self.coordinates.remove(index)
    }

    /// Staggered expiry: start fading the oldest non-fading point whose age
    /// exceeds the lifetime, if the removal cadence allows it now.
    pub(crate) fn start_staggered_fade(
        &mut self,
        now_ms: u64,
        interval_ms: u64,
    ) -> Option<PointId> {
        if let Some(last) = self.last_staggered_removal {
            if now_ms.saturating_sub(last) < interval_ms {
                return None;
            }
        }
        let lifetime = self.config.coordinate_lifetime;
        let candidate = self.coordinates.iter_mut().find(|c| !c.is_fading())?;
        if candidate.age(now_ms) <= lifetime {
            return None;
        }
        candidate.fade_out_started = Some(now_ms);
        self.last_staggered_removal = Some(now_ms);
        Some(candidate.id)
    }

    pub(crate) fn drain_all(&mut self) -> Vec<TraceCoordinate> {
        let mut all: Vec<TraceCoordinate> = self.coordinates.drain(..).collect();
        all.append(&mut self.evicted);
        all
    }
}

/// What happens when a deadline is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum FadeStep {
    /// Natural end of life: start fading out
    BeginFadeOut,
    /// Fade-out complete: remove the point
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FadeDeadline {
    pub at_ms: u64,
    pub point: PointId,
    pub step: FadeStep,
    pub entity: EntityId,
}

/// Min-heap of fade deadlines across all traces.
///
/// Entries are never removed when a point goes away early; a deadline whose
/// point no longer exists is simply ignored when popped.
#[derive(Debug, Default)]
pub(crate) struct FadeSchedule {
    heap: BinaryHeap<Reverse<FadeDeadline>>,
}

impl FadeSchedule {
    pub fn push(&mut self, at_ms: u64, entity: &EntityId, point: PointId, step: FadeStep) {
        self.heap.push(Reverse(FadeDeadline {
            at_ms,
            point,
            step,
            entity: entity.clone(),
        }));
    }

    /// Next deadline at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<FadeDeadline> {
        if self.heap.peek()?.0.at_ms > now_ms {
            return None;
        }
        self.heap.pop().map(|Reverse(deadline)| deadline)
    }

    /// Drop every deadline belonging to `entity`
    pub fn cancel_entity(&mut self, entity: &EntityId) {
        self.heap.retain(|Reverse(deadline)| deadline.entity != *entity);
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn pending_for(&self, entity: &EntityId) -> usize {
        self.heap
            .iter()
            .filter(|Reverse(deadline)| deadline.entity == *entity)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: u64, created: u64) -> TraceCoordinate {
        TraceCoordinate {
            id: PointId(id),
            marker: EntityId::new(format!("m{}", id)),
            position: Position::new(id as f64, 0.0, 0.0),
            timestamp_created: created,
            birth_index: 0,
            fade_out_started: None,
        }
    }

    fn trace(max: usize) -> Trace {
        Trace::new(
            EntityId::new("t"),
            TraceConfig {
                max_coordinates: max,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_push_evicts_oldest_fifo() {
        let mut trace = trace(2);
        assert_eq!(trace.push(point(1, 0), 0), None);
        assert_eq!(trace.push(point(2, 10), 10), None);
        assert_eq!(trace.push(point(3, 20), 20), Some((PointId(1), true)));

        assert_eq!(trace.len(), 2);
        assert_eq!(trace.coordinates()[0].id, PointId(2));
        assert_eq!(trace.evicted().len(), 1);
        assert_eq!(trace.evicted()[0].fade_out_started, Some(20));
        assert_eq!(trace.markers().count(), 3);
    }

    #[test]
    fn test_eviction_keeps_existing_fade_start() {
        let mut trace = trace(1);
        trace.push(point(1, 0), 0);
        trace.find_mut(PointId(1)).unwrap().fade_out_started = Some(5);
        assert_eq!(trace.push(point(2, 10), 10), Some((PointId(1), false)));
        assert_eq!(trace.evicted()[0].fade_out_started, Some(5));
    }

    #[test]
    fn test_take_from_either_list() {
        let mut trace = trace(1);
        trace.push(point(1, 0), 0);
        trace.push(point(2, 10), 10);
        assert_eq!(trace.take(PointId(1)).map(|c| c.id), Some(PointId(1)));
        assert_eq!(trace.take(PointId(2)).map(|c| c.id), Some(PointId(2)));
        assert!(trace.take(PointId(2)).is_none());
        assert!(trace.is_empty());
    }

    #[test]
    fn test_should_record_either_threshold() {
        let mut trace = trace(10);
        assert!(trace.should_record(None, 0));
        trace.push(point(1, 0), 0);

        // close and soon: collapse
        assert!(!trace.should_record(Some(100.0), 1_000));
        // far enough
        assert!(trace.should_record(Some(600.0), 1_000));
        // long enough
        assert!(trace.should_record(Some(10.0), 5_000));
    }

    #[test]
    fn test_staggered_fade_respects_lifetime_and_cadence() {
        let mut trace = Trace::new(
            EntityId::new("t"),
            TraceConfig {
                coordinate_lifetime: 1_000,
                ..Default::default()
            },
        );
        trace.push(point(1, 0), 0);
        trace.push(point(2, 100), 100);

        assert_eq!(trace.start_staggered_fade(900, 500), None);
        assert_eq!(trace.start_staggered_fade(1_200, 500), Some(PointId(1)));
        // cadence not yet elapsed
        assert_eq!(trace.start_staggered_fade(1_400, 500), None);
        assert_eq!(trace.start_staggered_fade(1_700, 500), Some(PointId(2)));
        assert_eq!(trace.start_staggered_fade(2_500, 500), None);
    }

    #[test]
    fn test_schedule_orders_and_cancels() {
        let mut schedule = FadeSchedule::default();
        let a = EntityId::new("a");
        let b = EntityId::new("b");
        schedule.push(300, &a, PointId(1), FadeStep::Finalize);
        schedule.push(100, &b, PointId(2), FadeStep::BeginFadeOut);
        schedule.push(200, &a, PointId(3), FadeStep::BeginFadeOut);

        assert_eq!(schedule.pop_due(50), None);
        assert_eq!(schedule.pop_due(250).map(|d| d.point), Some(PointId(2)));
        assert_eq!(schedule.pending_for(&a), 2);

        schedule.cancel_entity(&a);
        assert_eq!(schedule.len(), 0);
        assert_eq!(schedule.pop_due(1_000), None);
    }
}
