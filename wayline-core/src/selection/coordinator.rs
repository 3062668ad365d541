use serde::Serialize;

use super::state::{ClickClass, Outcome, SelectionState};
use crate::events::EventChannel;
use crate::host::{Click, ClickResponse, EntityId, MapHost};
use crate::plugin::{HookSet, Plugin};

/// A committed source/target pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSet {
    pub source: EntityId,
    pub target: EntityId,
}

/// Session start or end
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionChanged {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<EntityId>,
}

/// Votes and notifications of the selection coordinator
#[derive(Debug, Clone, Default)]
pub struct SelectionEvents {
    /// Vote: may this entity start a session as source?
    pub entity_source: EventChannel<EntityId, bool>,
    /// Vote: may this entity be the target of the current session?
    pub entity_target: EventChannel<EntityId, bool>,
    pub target_set: EventChannel<TargetSet>,
    pub selection_changed: EventChannel<SelectionChanged>,
}

/// Two-click "pick source, then target" protocol on top of the host's clicks
#[derive(Debug, Default)]
pub struct SelectionCoordinator {
    state: SelectionState,
    events: SelectionEvents,
    destroyed: bool,
}

impl SelectionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &SelectionEvents {
        &self.events
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_awaiting()
    }

    /// Enter `AwaitingTarget` for `source` without a click. Returns false if
    /// the entity is unknown, already the source, or the host is gone.
    pub fn start_selection(&mut self, host: &mut dyn MapHost, source: &EntityId) -> bool {
        if self.destroyed || host.is_destroyed() {
            log::debug!("selection: start {} skipped: host torn down", source);
            return false;
        }
        if !host.contains(source) {
            log::debug!("selection: start {} skipped: entity not found", source);
            return false;
        }
        if self.state.source() == Some(source) {
            return false;
        }
        self.state = SelectionState::AwaitingTarget {
            source: source.clone(),
        };
        self.announce(Outcome::Started(source.clone()));
        true
    }

    /// Abandon the current session. Returns false if none was active or the
    /// host is gone.
    pub fn cancel_selection(&mut self, host: &mut dyn MapHost) -> bool {
        if self.destroyed || host.is_destroyed() {
            log::debug!("selection: cancel skipped: host torn down");
            return false;
        }
        match std::mem::take(&mut self.state) {
            SelectionState::Idle => false,
            SelectionState::AwaitingTarget { source } => {
                self.announce(Outcome::Cancelled(source));
                true
            }
        }
    }

    fn classify(&self, click: &Click) -> ClickClass {
        let Some(entity) = &click.entity else {
            return ClickClass::Empty;
        };
        let is_source =
            self.state.source() == Some(entity) || self.events.entity_source.any(entity);
        if is_source {
            ClickClass::Source(entity.clone())
        } else if self.state.is_awaiting() && self.events.entity_target.any(entity) {
            ClickClass::Target(entity.clone())
        } else {
            ClickClass::Rejected(entity.clone())
        }
    }

    fn announce(&self, outcome: Outcome) {
        match outcome {
            Outcome::Unchanged => {}
            Outcome::Started(source) => {
                log::debug!("selection: source {}, awaiting target", source);
                self.events.selection_changed.emit(&SelectionChanged {
                    active: true,
                    source: Some(source),
                });
            }
            Outcome::Committed { source, target } => {
                log::debug!("selection: target {} set for {}", target, source);
                self.events.target_set.emit(&TargetSet { source, target });
                self.events.selection_changed.emit(&SelectionChanged {
                    active: false,
                    source: None,
                });
            }
            Outcome::Cancelled(source) => {
                log::debug!("selection: session for {} cancelled", source);
                self.events.selection_changed.emit(&SelectionChanged {
                    active: false,
                    source: None,
                });
            }
        }
    }
}

impl Plugin for SelectionCoordinator {
    fn name(&self) -> &'static str {
        "selection"
    }

    fn hooks(&self) -> HookSet {
        HookSet::CLICKS
    }

    /// End any session. It is only announced while the host is still alive.
    fn destroy(&mut self, host: &mut dyn MapHost) {
        if self.destroyed {
            return;
        }
        if host.is_destroyed() {
            self.state = SelectionState::Idle;
        } else {
            self.cancel_selection(host);
        }
        self.destroyed = true;
    }

    fn on_selecting(&mut self, _host: &mut dyn MapHost, _candidate: Option<&EntityId>) -> bool {
        !self.state.is_awaiting()
    }

    fn on_click(&mut self, host: &mut dyn MapHost, click: &Click) -> ClickResponse {
        if self.destroyed || host.is_destroyed() {
            return ClickResponse::Allow;
        }
        let was_awaiting = self.state.is_awaiting();
        let class = self.classify(click);
        let (next, outcome) = std::mem::take(&mut self.state).on_click(class);
        self.state = next;
        self.announce(outcome);

        if was_awaiting {
            ClickResponse::Suppress
        } else {
            ClickResponse::Allow
        }
    }

    fn on_selected(&mut self, _host: &mut dyn MapHost, _entity: Option<&EntityId>) -> bool {
        !self.state.is_awaiting()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::plugin::Standalone;
    use crate::Position;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixture {
        host: MemoryHost,
        selection: SelectionCoordinator,
        committed: Rc<RefCell<Vec<TargetSet>>>,
        changes: Rc<RefCell<Vec<SelectionChanged>>>,
    }

    /// Ships are sources, buoys are targets
    fn fixture() -> Fixture {
        let mut host = MemoryHost::new();
        for name in ["ship-1", "ship-2", "buoy-1", "rock"] {
            host.spawn(name, Position::default());
        }
        let selection = SelectionCoordinator::new();
        let events = selection.events();
        events
            .entity_source
            .subscribe_fn(|id| id.as_str().starts_with("ship"));
        events
            .entity_target
            .subscribe_fn(|id| id.as_str().starts_with("buoy"));

        let committed = Rc::new(RefCell::new(Vec::new()));
        let c = committed.clone();
        events
            .target_set
            .subscribe_fn(move |set| c.borrow_mut().push(set.clone()));
        let changes = Rc::new(RefCell::new(Vec::new()));
        let c = changes.clone();
        events
            .selection_changed
            .subscribe_fn(move |change| c.borrow_mut().push(change.clone()));

        Fixture {
            host,
            selection,
            committed,
            changes,
        }
    }

    impl Fixture {
        fn click(&mut self, entity: Option<&str>) -> ClickResponse {
            let entity = entity.map(EntityId::new);
            self.host
                .click(&mut Standalone(&mut self.selection), entity.as_ref())
                .response
        }
    }

    #[test]
    fn test_commit_flow() {
        let mut f = fixture();

        assert_eq!(f.click(Some("ship-1")), ClickResponse::Allow);
        assert_eq!(
            f.selection.state().source(),
            Some(&EntityId::new("ship-1"))
        );
        // Source keeps its native highlight
        assert_eq!(f.host.selected(), Some(&EntityId::new("ship-1")));

        assert_eq!(f.click(Some("buoy-1")), ClickResponse::Suppress);
        assert_eq!(
            *f.committed.borrow(),
            vec![TargetSet {
                source: EntityId::new("ship-1"),
                target: EntityId::new("buoy-1"),
            }]
        );
        assert!(!f.selection.is_active());
        assert_eq!(
            *f.changes.borrow(),
            vec![
                SelectionChanged {
                    active: true,
                    source: Some(EntityId::new("ship-1")),
                },
                SelectionChanged {
                    active: false,
                    source: None,
                },
            ]
        );
        // Target click never reached native selection
        assert_eq!(f.host.selected(), Some(&EntityId::new("ship-1")));
    }

    #[test]
    fn test_cancel_on_empty_space() {
        let mut f = fixture();
        f.click(Some("ship-1"));
        assert_eq!(f.click(None), ClickResponse::Suppress);
        assert!(!f.selection.is_active());
        assert!(f.committed.borrow().is_empty());
        assert_eq!(f.changes.borrow().len(), 2);
        assert!(!f.changes.borrow()[1].active);
    }

    #[test]
    fn test_cancel_on_rejected_target() {
        let mut f = fixture();
        f.click(Some("ship-1"));
        f.click(Some("rock"));
        assert!(!f.selection.is_active());
        assert!(f.committed.borrow().is_empty());
        assert_eq!(f.changes.borrow().len(), 2);
    }

    #[test]
    fn test_second_source_click_is_ignored() {
        let mut f = fixture();
        f.click(Some("ship-1"));
        assert_eq!(f.click(Some("ship-2")), ClickResponse::Suppress);
        assert_eq!(f.click(Some("ship-1")), ClickResponse::Suppress);

        assert_eq!(
            f.selection.state().source(),
            Some(&EntityId::new("ship-1"))
        );
        assert_eq!(f.changes.borrow().len(), 1);

        f.click(Some("buoy-1"));
        assert_eq!(f.committed.borrow()[0].source, EntityId::new("ship-1"));
    }

    #[test]
    fn test_native_selection_vetoed_while_awaiting() {
        let mut f = fixture();
        f.click(Some("ship-1"));
        let report = f
            .host
            .click(&mut Standalone(&mut f.selection), Some(&EntityId::new("rock")));
        assert!(!report.selection_allowed);

        // Veto lifts once idle again
        let report = f
            .host
            .click(&mut Standalone(&mut f.selection), Some(&EntityId::new("rock")));
        assert!(report.selection_allowed);
        assert_eq!(f.host.selected(), Some(&EntityId::new("rock")));
    }

    #[test]
    fn test_no_source_voters_no_session() {
        let mut host = MemoryHost::new();
        host.spawn("ship-1", Position::default());
        let mut selection = SelectionCoordinator::new();
        let ship = EntityId::new("ship-1");
        let report = host.click(&mut Standalone(&mut selection), Some(&ship));
        assert_eq!(report.response, ClickResponse::Allow);
        assert!(!selection.is_active());
    }

    #[test]
    fn test_start_and_cancel_selection() {
        let mut f = fixture();
        assert!(!f.selection.start_selection(&mut f.host, &EntityId::new("ghost")));
        assert!(f.selection.start_selection(&mut f.host, &EntityId::new("rock")));
        assert!(!f.selection.start_selection(&mut f.host, &EntityId::new("rock")));
        assert!(f.selection.is_active());

        assert!(f.selection.cancel_selection(&mut f.host));
        assert!(!f.selection.cancel_selection(&mut f.host));
        assert_eq!(f.changes.borrow().len(), 2);
    }

    #[test]
    fn test_cancel_after_host_teardown_is_silent() {
        let mut f = fixture();
        assert!(f.selection.start_selection(&mut f.host, &EntityId::new("ship-1")));
        f.host.destroy();

        assert!(!f.selection.cancel_selection(&mut f.host));
        assert_eq!(f.changes.borrow().len(), 1);

        f.selection.destroy(&mut f.host);
        assert!(!f.selection.is_active());
        assert_eq!(f.changes.borrow().len(), 1);
    }

    #[test]
    fn test_destroyed_coordinator_passes_clicks_through() {
        let mut f = fixture();
        f.click(Some("ship-1"));
        f.selection.destroy(&mut f.host);
        assert!(!f.selection.is_active());
        assert_eq!(f.click(Some("ship-1")), ClickResponse::Allow);
        assert!(!f.selection.is_active());
        assert!(!f.selection.start_selection(&mut f.host, &EntityId::new("ship-1")));
    }
}
