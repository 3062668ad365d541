//! Interaction layer
//!
//! The composition root: owns one selection coordinator, one trace engine and
//! one animation controller, routes host hooks to them and wires a committed
//! selection into trace and animation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::animation::AnimationController;
use crate::config::LayerConfig;
use crate::host::{
    Click, ClickResponse, ClickRouter, EntityId, FrameHandle, HostHooks, MapHost, TimerId,
};
use crate::plugin::{Plugin, Router};
use crate::selection::{SelectionCoordinator, TargetSet};
use crate::trails::{Trace, TraceEngine, TraceOptions};

/// All interaction plugins attached to one host surface
pub struct InteractionLayer {
    config: LayerConfig,
    selection: SelectionCoordinator,
    traces: TraceEngine,
    animation: AnimationController,
    committed: Rc<RefCell<VecDeque<TargetSet>>>,
    destroyed: bool,
}

impl InteractionLayer {
    pub fn new(host: &mut dyn MapHost, config: LayerConfig) -> Self {
        let selection = SelectionCoordinator::new();
        let traces = TraceEngine::new(host, config.trace.clone());
        let animation = AnimationController::new(config.animation);

        // Commits are handled once click routing is done
        let committed = Rc::new(RefCell::new(VecDeque::new()));
        let queue = Rc::clone(&committed);
        selection
            .events()
            .target_set
            .subscribe_fn(move |set: &TargetSet| queue.borrow_mut().push_back(set.clone()));

        log::debug!(
            "layer: installed (auto trace {}, animation {}ms)",
            config.auto_trace,
            config.animation.duration_ms
        );
        InteractionLayer {
            config,
            selection,
            traces,
            animation,
            committed,
            destroyed: false,
        }
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn traces(&self) -> &TraceEngine {
        &self.traces
    }

    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    pub fn trace(
        &mut self,
        host: &mut dyn MapHost,
        entity: &EntityId,
        options: &TraceOptions,
    ) -> bool {
        self.traces.trace(host, entity, options)
    }

    pub fn untrace(&mut self, host: &mut dyn MapHost, entity: &EntityId) -> bool {
        self.traces.untrace(host, entity)
    }

    pub fn untrace_all(&mut self, host: &mut dyn MapHost) -> usize {
        self.traces.untrace_all(host)
    }

    pub fn get_trace(&self, entity: &EntityId) -> Option<&Trace> {
        self.traces.get_trace(entity)
    }

    pub fn start_selection(&mut self, host: &mut dyn MapHost, source: &EntityId) -> bool {
        self.selection.start_selection(host, source)
    }

    pub fn cancel_selection(&mut self, host: &mut dyn MapHost) -> bool {
        self.selection.cancel_selection(host)
    }

    pub fn start_animation(
        &mut self,
        host: &mut dyn MapHost,
        source: &EntityId,
        target: &EntityId,
    ) -> bool {
        self.animation.start_animation(host, source, target)
    }

    pub fn stop_animation(&mut self, host: &mut dyn MapHost) -> bool {
        self.animation.stop_animation(host)
    }

    /// Destroy every plugin. Trail markers disappear on the next timer tick,
    /// so keep stepping the host at least once after this.
    pub fn destroy(&mut self, host: &mut dyn MapHost) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.committed.borrow_mut().clear();
        self.with_router(|router| {
            for plugin in router.plugins.iter_mut() {
                plugin.destroy(host);
            }
        });
        log::debug!("layer: destroyed");
    }

    fn with_router<R>(&mut self, f: impl FnOnce(&mut Router<'_, '_>) -> R) -> R {
        let mut plugins: [&mut dyn Plugin; 3] =
            [&mut self.selection, &mut self.traces, &mut self.animation];
        f(&mut Router {
            plugins: &mut plugins,
        })
    }

    fn handle_commits(&mut self, host: &mut dyn MapHost) {
        loop {
            let Some(set) = self.committed.borrow_mut().pop_front() else {
                break;
            };
            if self.config.auto_trace && !self.traces.is_tracing(&set.source) {
                self.traces.trace(host, &set.source, &TraceOptions::default());
            }
            self.animation.start_animation(host, &set.source, &set.target);
        }
    }
}

impl ClickRouter for InteractionLayer {
    fn selecting(&mut self, host: &mut dyn MapHost, candidate: Option<&EntityId>) -> bool {
        self.with_router(|router| router.selecting(host, candidate))
    }

    fn click(&mut self, host: &mut dyn MapHost, click: &Click) -> ClickResponse {
        let response = self.with_router(|router| router.click(host, click));
        self.handle_commits(host);
        response
    }

    fn selected(&mut self, host: &mut dyn MapHost, entity: Option<&EntityId>) -> bool {
        self.with_router(|router| router.selected(host, entity))
    }
}

impl HostHooks for InteractionLayer {
    fn entity_changed(&mut self, host: &mut dyn MapHost, id: &EntityId) {
        self.with_router(|router| router.entity_changed(host, id))
    }

    fn frame(&mut self, host: &mut dyn MapHost, handle: FrameHandle) {
        self.with_router(|router| router.frame(host, handle))
    }

    fn timer(&mut self, host: &mut dyn MapHost, timer: TimerId) {
        self.with_router(|router| router.timer(host, timer))
    }
}
