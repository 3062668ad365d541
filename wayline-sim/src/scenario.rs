//! Scripted pick-and-move scenario
//!
//! Two entities on a [`MemoryHost`]: a vessel (the only accepted source) and
//! a waypoint north of it (the only accepted target). Every event the layer
//! emits is recorded so the driver can print it.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use wayline_core::host::memory::MemoryHost;
use wayline_core::host::FrameScheduler;
use wayline_core::trails::RenderPass;
use wayline_core::{
    AnimationComplete, EntityId, InteractionLayer, LayerConfig, Position, SelectionChanged,
    TargetSet, TraceChange,
};

pub const VESSEL: &str = "vessel";
pub const WAYPOINT: &str = "waypoint";

/// Anything the layer announced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SimEvent {
    SelectionChanged(SelectionChanged),
    TargetSet(TargetSet),
    Trace(TraceChange),
    Render(RenderPass),
    Complete(AnimationComplete),
}

/// An event with the simulated time it was collected at
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimRecord {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: SimEvent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    /// Where the vessel starts
    pub origin: Position,
    /// How far north of the vessel the waypoint lies, in meters
    pub distance_m: f64,
    /// Also record trace render passes
    pub record_renders: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario {
            origin: Position::new(4.3, 51.9, 0.0),
            distance_m: 1_000.0,
            record_renders: false,
        }
    }
}

impl Scenario {
    pub fn build(&self, config: LayerConfig) -> Simulation {
        let mut host = MemoryHost::new();
        host.spawn(VESSEL, self.origin);
        host.spawn(WAYPOINT, self.origin.offset_north(self.distance_m));
        let layer = InteractionLayer::new(&mut host, config);

        let log: Rc<RefCell<Vec<SimEvent>>> = Rc::default();
        let selection = layer.selection().events();
        selection
            .entity_source
            .subscribe_fn(|id: &EntityId| id.as_str() == VESSEL);
        selection
            .entity_target
            .subscribe_fn(|id: &EntityId| id.as_str() == WAYPOINT);

        let l = Rc::clone(&log);
        selection
            .selection_changed
            .subscribe_fn(move |e| l.borrow_mut().push(SimEvent::SelectionChanged(e.clone())));
        let l = Rc::clone(&log);
        selection
            .target_set
            .subscribe_fn(move |e| l.borrow_mut().push(SimEvent::TargetSet(e.clone())));
        let l = Rc::clone(&log);
        layer
            .traces()
            .events()
            .on_change
            .subscribe_fn(move |e| l.borrow_mut().push(SimEvent::Trace(e.clone())));
        if self.record_renders {
            let l = Rc::clone(&log);
            layer
                .traces()
                .events()
                .on_render
                .subscribe_fn(move |e| l.borrow_mut().push(SimEvent::Render(*e)));
        }
        let l = Rc::clone(&log);
        layer
            .animation()
            .events()
            .on_complete
            .subscribe_fn(move |e| l.borrow_mut().push(SimEvent::Complete(e.clone())));

        Simulation { host, layer, log }
    }
}

/// A built scenario, ready to be stepped
pub struct Simulation {
    pub host: MemoryHost,
    pub layer: InteractionLayer,
    log: Rc<RefCell<Vec<SimEvent>>>,
}

impl Simulation {
    /// Click the vessel, then the waypoint. Returns whether a transit started.
    pub fn pick(&mut self) -> bool {
        self.host
            .click(&mut self.layer, Some(&EntityId::new(VESSEL)));
        self.host
            .click(&mut self.layer, Some(&EntityId::new(WAYPOINT)));
        self.layer.animation().is_running()
    }

    /// Move the clock to `now_ms` and deliver one step
    pub fn step_to(&mut self, now_ms: u64) {
        self.host.set_time(now_ms);
        self.host.step(&mut self.layer);
    }

    pub fn now_ms(&self) -> u64 {
        self.host.now_ms()
    }

    /// Whether the transit is over (or never started)
    pub fn is_settled(&self) -> bool {
        !self.layer.animation().is_running()
    }

    pub fn vessel_position(&self) -> Option<Position> {
        self.host.entity(&EntityId::new(VESSEL)).and_then(|e| e.position)
    }

    /// Take every event recorded since the last call
    pub fn drain(&mut self) -> Vec<SimRecord> {
        let at_ms = self.host.now_ms();
        self.log
            .borrow_mut()
            .drain(..)
            .map(|event| SimRecord { at_ms, event })
            .collect()
    }

    /// Tear the layer down and let the deferred removals run
    pub fn finish(&mut self) {
        self.layer.destroy(&mut self.host);
        self.host.step(&mut self.layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_starts_transit() {
        let mut sim = Scenario::default().build(LayerConfig::default());
        assert!(sim.pick());
        let events = sim.drain();
        let kinds: Vec<&SimEvent> = events.iter().map(|r| &r.event).collect();
        assert!(matches!(kinds[0], SimEvent::SelectionChanged(c) if c.active));
        assert!(kinds
            .iter()
            .any(|e| matches!(e, SimEvent::TargetSet(t) if t.target.as_str() == WAYPOINT)));
        assert!(sim.drain().is_empty());
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = SimRecord {
            at_ms: 40,
            event: SimEvent::Trace(TraceChange::Started {
                entity: EntityId::new(VESSEL),
            }),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["atMs"], 40);
        assert_eq!(json["event"], "trace");
        assert_eq!(json["kind"], "started");
        assert_eq!(json["entity"], VESSEL);
    }
}
