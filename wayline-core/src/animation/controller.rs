use serde::{Deserialize, Serialize};

use crate::error::LayerError;
use crate::events::EventChannel;
use crate::geo::Position;
use crate::host::{EntityId, FrameHandle, MapHost};
use crate::plugin::{HookSet, Plugin};

/// Animation options.
///
/// Deserializes from camelCase JSON with defaults for missing keys.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationOptions {
    /// Time to cover the full distance in ms
    pub duration_ms: u64,
    /// Distance to the target at which the run counts as arrived
    pub stopping_distance_meters: f64,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        AnimationOptions {
            duration_ms: 4_000,
            stopping_distance_meters: 100.0,
        }
    }
}

impl AnimationOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One in-flight transit. Both positions are snapshots taken at start.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationRun {
    pub source: EntityId,
    pub target: EntityId,
    pub start_position: Position,
    pub target_position: Position,
    pub start_time: u64,
    pub duration_ms: u64,
    pub stopping_distance_meters: f64,
}

impl AnimationRun {
    /// Fraction of the duration elapsed at `now_ms`, in 0..=1
    pub fn progress(&self, now_ms: u64) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms.saturating_sub(self.start_time) as f64;
        (elapsed / self.duration_ms as f64).clamp(0.0, 1.0)
    }
}

/// Arrival of the source at its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimationComplete {
    pub source: EntityId,
    pub target: EntityId,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationEvents {
    pub on_complete: EventChannel<AnimationComplete>,
}

/// Moves one entity toward a snapshot of another's position
#[derive(Debug, Default)]
pub struct AnimationController {
    options: AnimationOptions,
    run: Option<AnimationRun>,
    frame: Option<FrameHandle>,
    events: AnimationEvents,
    destroyed: bool,
}

impl AnimationController {
    pub fn new(options: AnimationOptions) -> Self {
        AnimationController {
            options,
            ..Default::default()
        }
    }

    /// Builder-style completion callback
    pub fn with_on_complete(self, callback: impl Fn(&AnimationComplete) + 'static) -> Self {
        self.events.on_complete.subscribe_fn(callback);
        self
    }

    pub fn events(&self) -> &AnimationEvents {
        &self.events
    }

    pub fn options(&self) -> &AnimationOptions {
        &self.options
    }

    /// The in-flight run, if any
    pub fn current(&self) -> Option<&AnimationRun> {
        self.run.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Start moving `source` toward where `target` is now. An in-flight run is
    /// dropped without completion. Returns false if nothing started.
    pub fn start_animation(
        &mut self,
        host: &mut dyn MapHost,
        source: &EntityId,
        target: &EntityId,
    ) -> bool {
        match self.try_start(host, source, target) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("animation: {} -> {} not started: {}", source, target, e);
                false
            }
        }
    }

    /// Cancel the in-flight run without completion. Returns false if idle.
    pub fn stop_animation(&mut self, host: &mut dyn MapHost) -> bool {
        let stopped = self.run.take().is_some();
        self.stop_frames(host);
        stopped
    }

    fn try_start(
        &mut self,
        host: &mut dyn MapHost,
        source: &EntityId,
        target: &EntityId,
    ) -> Result<(), LayerError> {
        if self.destroyed || host.is_destroyed() {
            return Err(LayerError::HostTornDown);
        }
        let start_position = resolve(host, source)?;
        let target_position = resolve(host, target)?;

        if let Some(previous) = self.run.take() {
            log::debug!(
                "animation: {} -> {} superseded",
                previous.source,
                previous.target
            );
        }
        log::debug!(
            "animation: {} -> {} over {}m",
            source,
            target,
            host.distance(&start_position, &target_position).round()
        );
        self.run = Some(AnimationRun {
            source: source.clone(),
            target: target.clone(),
            start_position,
            target_position,
            start_time: host.now_ms(),
            duration_ms: self.options.duration_ms,
            stopping_distance_meters: self.options.stopping_distance_meters,
        });
        if self.frame.is_none() {
            self.frame = Some(host.start_frames());
        }
        Ok(())
    }

    fn stop_frames(&mut self, host: &mut dyn MapHost) {
        if let Some(frame) = self.frame.take() {
            if !host.is_destroyed() {
                host.cancel_frames(frame);
            }
        }
    }

    fn tick(&mut self, host: &mut dyn MapHost) {
        let Some(run) = &self.run else {
            self.stop_frames(host);
            return;
        };

        // The source may have been removed or replaced since the start
        if host.position(&run.source).is_none() {
            log::debug!("animation: {} gone, aborting", run.source);
            self.run = None;
            self.stop_frames(host);
            return;
        }

        let progress = run.progress(host.now_ms());
        let position = run.start_position.lerp(&run.target_position, progress);
        if let Err(e) = host.set_position(&run.source, position) {
            log::warn!("animation: {}: position write failed: {}", run.source, e);
        }

        let distance = host.distance(&position, &run.target_position);
        if progress < 1.0 && distance > run.stopping_distance_meters {
            return;
        }

        let Some(run) = self.run.take() else {
            return;
        };
        self.stop_frames(host);
        log::debug!(
            "animation: {} reached {} ({}m left)",
            run.source,
            run.target,
            distance.round()
        );
        self.events.on_complete.emit(&AnimationComplete {
            source: run.source,
            target: run.target,
        });
    }
}

fn resolve(host: &dyn MapHost, id: &EntityId) -> Result<Position, LayerError> {
    if !host.contains(id) {
        return Err(LayerError::MissingEntity(id.clone()));
    }
    host.position(id)
        .ok_or_else(|| LayerError::UnresolvablePosition(id.clone()))
}

impl Plugin for AnimationController {
    fn name(&self) -> &'static str {
        "animation"
    }

    fn hooks(&self) -> HookSet {
        HookSet::FRAMES
    }

    fn destroy(&mut self, host: &mut dyn MapHost) {
        self.run = None;
        self.stop_frames(host);
        self.destroyed = true;
    }

    fn on_frame(&mut self, host: &mut dyn MapHost, handle: FrameHandle) {
        if self.frame != Some(handle) {
            return;
        }
        if host.is_destroyed() {
            self.run = None;
            self.frame = None;
            return;
        }
        self.tick(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::host::{EntityStore, GeoMath};
    use crate::plugin::Standalone;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn origin() -> Position {
        Position::new(4.0, 52.0, 0.0)
    }

    fn completions(controller: &AnimationController) -> Rc<RefCell<Vec<AnimationComplete>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        controller
            .events()
            .on_complete
            .subscribe_fn(move |done| l.borrow_mut().push(done.clone()));
        log
    }

    fn assert_at(host: &MemoryHost, id: &EntityId, expected: Position) {
        let position = host.position(id).unwrap();
        let off = host.distance(&position, &expected);
        assert!(off < 1e-3, "{} is {}m off", id, off);
    }

    fn scene() -> (MemoryHost, EntityId, EntityId) {
        let mut host = MemoryHost::new();
        let a = EntityId::new("a");
        let b = EntityId::new("b");
        host.spawn(a.clone(), origin());
        host.spawn(b.clone(), origin().offset_north(1_000.0));
        (host, a, b)
    }

    #[test]
    fn test_stops_at_stopping_distance_before_duration() {
        let (mut host, a, b) = scene();
        let mut controller = AnimationController::new(AnimationOptions {
            duration_ms: 5_000,
            stopping_distance_meters: 100.0,
        });
        let done = completions(&controller);

        assert!(controller.start_animation(&mut host, &a, &b));
        host.run_for(&mut Standalone(&mut controller), 4_400, 50);
        assert!(done.borrow().is_empty());
        assert!(controller.is_running());

        host.run_for(&mut Standalone(&mut controller), 200, 50);
        assert_eq!(
            *done.borrow(),
            vec![AnimationComplete {
                source: a.clone(),
                target: b.clone()
            }]
        );
        assert!(!controller.is_running());
        assert_eq!(host.active_frames(), 0);

        let left = host.distance(&host.position(&a).unwrap(), &origin().offset_north(1_000.0));
        assert!(left <= 100.0 && left > 50.0, "left {}", left);

        // Exactly once
        host.run_for(&mut Standalone(&mut controller), 2_000, 50);
        assert_eq!(done.borrow().len(), 1);
    }

    #[test]
    fn test_completes_at_full_progress() {
        let (mut host, a, b) = scene();
        let mut controller = AnimationController::new(AnimationOptions {
            duration_ms: 1_000,
            stopping_distance_meters: 0.0,
        });
        let done = completions(&controller);
        controller.start_animation(&mut host, &a, &b);
        host.run_for(&mut Standalone(&mut controller), 1_000, 100);

        assert_eq!(done.borrow().len(), 1);
        assert_at(&host, &a, origin().offset_north(1_000.0));
    }

    #[test]
    fn test_supersede_completes_only_new_pair() {
        let (mut host, a, b) = scene();
        let c = EntityId::new("c");
        host.spawn(c.clone(), origin().offset_north(-1_000.0));
        let mut controller = AnimationController::new(AnimationOptions::default());
        let done = completions(&controller);

        assert!(controller.start_animation(&mut host, &a, &b));
        assert!(controller.start_animation(&mut host, &a, &c));
        assert_eq!(host.active_frames(), 1);
        host.run_for(&mut Standalone(&mut controller), 5_000, 50);

        assert_eq!(
            *done.borrow(),
            vec![AnimationComplete {
                source: a.clone(),
                target: c.clone()
            }]
        );
    }

    #[test]
    fn test_chases_target_snapshot() {
        let (mut host, a, b) = scene();
        let mut controller = AnimationController::new(AnimationOptions {
            duration_ms: 1_000,
            stopping_distance_meters: 0.0,
        });
        controller.start_animation(&mut host, &a, &b);
        host.move_entity(&b, origin().offset_north(5_000.0)).unwrap();
        host.run_for(&mut Standalone(&mut controller), 1_000, 100);

        assert_at(&host, &a, origin().offset_north(1_000.0));
    }

    #[test]
    fn test_missing_source_aborts_silently() {
        let (mut host, a, b) = scene();
        let mut controller = AnimationController::new(AnimationOptions::default());
        let done = completions(&controller);
        controller.start_animation(&mut host, &a, &b);
        host.run_for(&mut Standalone(&mut controller), 500, 50);

        host.remove(&a);
        host.run_for(&mut Standalone(&mut controller), 5_000, 50);
        assert!(done.borrow().is_empty());
        assert!(!controller.is_running());
        assert_eq!(host.active_frames(), 0);
    }

    #[test]
    fn test_start_requires_resolvable_entities() {
        let (mut host, a, _b) = scene();
        host.spawn_unpositioned("nowhere");
        let mut controller = AnimationController::new(AnimationOptions::default());

        assert!(!controller.start_animation(&mut host, &a, &EntityId::new("ghost")));
        assert!(!controller.start_animation(&mut host, &a, &EntityId::new("nowhere")));
        assert!(!controller.is_running());
        assert_eq!(host.active_frames(), 0);
    }

    #[test]
    fn test_stop_animation() {
        let (mut host, a, b) = scene();
        let mut controller = AnimationController::new(AnimationOptions::default());
        let done = completions(&controller);
        controller.start_animation(&mut host, &a, &b);

        assert!(controller.stop_animation(&mut host));
        assert!(!controller.stop_animation(&mut host));
        host.run_for(&mut Standalone(&mut controller), 5_000, 50);
        assert!(done.borrow().is_empty());
        assert_eq!(host.position(&a), Some(origin()));
    }

    #[test]
    fn test_zero_duration_completes_on_first_frame() {
        let (mut host, a, b) = scene();
        let called = Rc::new(RefCell::new(0));
        let c = called.clone();
        let mut controller = AnimationController::new(AnimationOptions {
            duration_ms: 0,
            stopping_distance_meters: 100.0,
        })
        .with_on_complete(move |_| *c.borrow_mut() += 1);

        controller.start_animation(&mut host, &a, &b);
        host.step(&mut Standalone(&mut controller));
        assert_eq!(*called.borrow(), 1);
        assert_at(&host, &a, origin().offset_north(1_000.0));
    }

    #[test]
    fn test_options_from_json() {
        let json = r#"{ "durationMs": 3000, "easing": "none" }"#;
        let options = AnimationOptions::from_json(json).unwrap();
        assert_eq!(options.duration_ms, 3_000);
        assert_eq!(options.stopping_distance_meters, 100.0);
    }
}
