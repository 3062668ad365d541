//! Plugin capability interface
//!
//! A plugin is a bundle of event channels and actions that hooks into the host.
//! It declares which host hooks it consumes as a [`HookSet`]; whoever routes
//! host callbacks (normally [`InteractionLayer`](crate::InteractionLayer)) only
//! calls the handlers a plugin declared.

use bitflags::bitflags;

use crate::host::{
    Click, ClickResponse, ClickRouter, EntityId, FrameHandle, HostHooks, MapHost, TimerId,
};

bitflags! {
    /// Host hooks a plugin consumes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HookSet: u8 {
        const CLICK = 1 << 0;
        const SELECTING = 1 << 1;
        const SELECTED = 1 << 2;
        const ENTITY_CHANGED = 1 << 3;
        const FRAMES = 1 << 4;
        const TIMERS = 1 << 5;

        /// Native click interception
        const CLICKS = Self::CLICK.bits() | Self::SELECTING.bits() | Self::SELECTED.bits();
    }
}

/// Capability interface shared by every plugin
pub trait Plugin {
    /// Short name used as log prefix
    fn name(&self) -> &'static str;

    /// Hooks this plugin wants routed to it
    fn hooks(&self) -> HookSet;

    /// Cancel scheduled work and release host resources
    fn destroy(&mut self, host: &mut dyn MapHost);

    /// Whether native selection of `candidate` may proceed
    fn on_selecting(&mut self, _host: &mut dyn MapHost, _candidate: Option<&EntityId>) -> bool {
        true
    }

    fn on_click(&mut self, _host: &mut dyn MapHost, _click: &Click) -> ClickResponse {
        ClickResponse::Allow
    }

    fn on_selected(&mut self, _host: &mut dyn MapHost, _entity: Option<&EntityId>) -> bool {
        true
    }

    fn on_entity_changed(&mut self, _host: &mut dyn MapHost, _id: &EntityId) {}

    fn on_frame(&mut self, _host: &mut dyn MapHost, _handle: FrameHandle) {}

    fn on_timer(&mut self, _host: &mut dyn MapHost, _timer: TimerId) {}
}

/// Route host hooks to a list of plugins, honoring each plugin's [`HookSet`].
///
/// Boolean hooks are vetoes: every plugin is asked and a single `false` wins.
pub(crate) struct Router<'a, 'p> {
    pub plugins: &'a mut [&'p mut dyn Plugin],
}

impl ClickRouter for Router<'_, '_> {
    fn selecting(&mut self, host: &mut dyn MapHost, candidate: Option<&EntityId>) -> bool {
        let mut allow = true;
        for plugin in self.plugins.iter_mut() {
            if plugin.hooks().contains(HookSet::SELECTING) {
                allow &= plugin.on_selecting(host, candidate);
            }
        }
        allow
    }

    fn click(&mut self, host: &mut dyn MapHost, click: &Click) -> ClickResponse {
        let mut response = ClickResponse::Allow;
        for plugin in self.plugins.iter_mut() {
            if plugin.hooks().contains(HookSet::CLICK) {
                response = response.combine(plugin.on_click(host, click));
            }
        }
        response
    }

    fn selected(&mut self, host: &mut dyn MapHost, entity: Option<&EntityId>) -> bool {
        let mut allow = true;
        for plugin in self.plugins.iter_mut() {
            if plugin.hooks().contains(HookSet::SELECTED) {
                allow &= plugin.on_selected(host, entity);
            }
        }
        allow
    }
}

impl HostHooks for Router<'_, '_> {
    fn entity_changed(&mut self, host: &mut dyn MapHost, id: &EntityId) {
        for plugin in self.plugins.iter_mut() {
            if plugin.hooks().contains(HookSet::ENTITY_CHANGED) {
                plugin.on_entity_changed(host, id);
            }
        }
    }

    fn frame(&mut self, host: &mut dyn MapHost, handle: FrameHandle) {
        for plugin in self.plugins.iter_mut() {
            if plugin.hooks().contains(HookSet::FRAMES) {
                plugin.on_frame(host, handle);
            }
        }
    }

    fn timer(&mut self, host: &mut dyn MapHost, timer: TimerId) {
        for plugin in self.plugins.iter_mut() {
            if plugin.hooks().contains(HookSet::TIMERS) {
                plugin.on_timer(host, timer);
            }
        }
    }
}

/// Host hooks for a single plugin used on its own, without a layer
pub struct Standalone<'a, P: ?Sized>(pub &'a mut P);

impl<P: Plugin> Standalone<'_, P> {
    fn with_router<R>(&mut self, f: impl FnOnce(&mut Router<'_, '_>) -> R) -> R {
        let plugin: &mut dyn Plugin = &mut *self.0;
        let mut plugins = [plugin];
        f(&mut Router {
            plugins: &mut plugins,
        })
    }
}

impl<P: Plugin> ClickRouter for Standalone<'_, P> {
    fn selecting(&mut self, host: &mut dyn MapHost, candidate: Option<&EntityId>) -> bool {
        self.with_router(|router| router.selecting(host, candidate))
    }

    fn click(&mut self, host: &mut dyn MapHost, click: &Click) -> ClickResponse {
        self.with_router(|router| router.click(host, click))
    }

    fn selected(&mut self, host: &mut dyn MapHost, entity: Option<&EntityId>) -> bool {
        self.with_router(|router| router.selected(host, entity))
    }
}

impl<P: Plugin> HostHooks for Standalone<'_, P> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::host::FrameScheduler;
    use crate::Position;

    struct Recorder {
        hooks: HookSet,
        frames: usize,
        veto: bool,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn hooks(&self) -> HookSet {
            self.hooks
        }

        fn destroy(&mut self, _host: &mut dyn MapHost) {}

        fn on_selecting(&mut self, _host: &mut dyn MapHost, _candidate: Option<&EntityId>) -> bool {
            !self.veto
        }

        fn on_frame(&mut self, _host: &mut dyn MapHost, _handle: FrameHandle) {
            self.frames += 1;
        }
    }

    #[test]
    fn test_undeclared_hooks_are_not_routed() {
        let mut host = MemoryHost::new();
        host.start_frames();
        let mut recorder = Recorder {
            hooks: HookSet::TIMERS,
            frames: 0,
            veto: true,
        };

        host.run_for(&mut Standalone(&mut recorder), 32, 16);
        assert_eq!(recorder.frames, 0);

        let id = EntityId::new("a");
        host.spawn(id.clone(), Position::default());
        let report = host.click(&mut Standalone(&mut recorder), Some(&id));
        assert!(report.selection_allowed);
    }

    #[test]
    fn test_declared_hooks_are_routed() {
        let mut host = MemoryHost::new();
        host.start_frames();
        let mut recorder = Recorder {
            hooks: HookSet::FRAMES | HookSet::CLICKS,
            frames: 0,
            veto: true,
        };

        host.run_for(&mut Standalone(&mut recorder), 32, 16);
        assert_eq!(recorder.frames, 2);

        let report = host.click(&mut Standalone(&mut recorder), None);
        assert!(!report.selection_allowed);
    }

    #[test]
    fn test_hookset_composite() {
        assert!(HookSet::CLICKS.contains(HookSet::SELECTED));
        assert!(!HookSet::CLICKS.contains(HookSet::FRAMES));
    }
}
