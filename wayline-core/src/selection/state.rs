//! Selection state machine
//!
//! Pure transitions: the coordinator classifies a click using its votes and
//! feeds the class here; this module decides the next state and what the
//! coordinator must announce.

use serde::Serialize;

use crate::host::EntityId;

/// Where a selection session stands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SelectionState {
    #[default]
    Idle,
    /// A source was picked, the next click picks the target
    AwaitingTarget { source: EntityId },
}

impl SelectionState {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, SelectionState::AwaitingTarget { .. })
    }

    pub fn source(&self) -> Option<&EntityId> {
        match self {
            SelectionState::Idle => None,
            SelectionState::AwaitingTarget { source } => Some(source),
        }
    }

    /// Next state for a classified click, and what happened
    pub fn on_click(self, class: ClickClass) -> (SelectionState, Outcome) {
        match (self, class) {
            (SelectionState::Idle, ClickClass::Source(source)) => (
                SelectionState::AwaitingTarget {
                    source: source.clone(),
                },
                Outcome::Started(source),
            ),
            (SelectionState::Idle, _) => (SelectionState::Idle, Outcome::Unchanged),

            (state @ SelectionState::AwaitingTarget { .. }, ClickClass::Source(_)) => {
                (state, Outcome::Unchanged)
            }
            (SelectionState::AwaitingTarget { source }, ClickClass::Target(target)) => {
                (SelectionState::Idle, Outcome::Committed { source, target })
            }
            (SelectionState::AwaitingTarget { source }, ClickClass::Empty)
            | (SelectionState::AwaitingTarget { source }, ClickClass::Rejected(_)) => {
                (SelectionState::Idle, Outcome::Cancelled(source))
            }
        }
    }
}

/// A click as seen through the coordinator's votes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickClass {
    /// Empty space
    Empty,
    /// An entity a source voter accepted (or the current source itself)
    Source(EntityId),
    /// An entity a target voter accepted
    Target(EntityId),
    /// An entity nobody voted for
    Rejected(EntityId),
}

/// Result of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Started(EntityId),
    Committed { source: EntityId, target: EntityId },
    Cancelled(EntityId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    fn awaiting(s: &str) -> SelectionState {
        SelectionState::AwaitingTarget { source: id(s) }
    }

    #[test]
    fn test_idle_transitions() {
        assert_eq!(
            SelectionState::Idle.on_click(ClickClass::Source(id("a"))),
            (awaiting("a"), Outcome::Started(id("a")))
        );
        assert_eq!(
            SelectionState::Idle.on_click(ClickClass::Rejected(id("a"))),
            (SelectionState::Idle, Outcome::Unchanged)
        );
        assert_eq!(
            SelectionState::Idle.on_click(ClickClass::Empty),
            (SelectionState::Idle, Outcome::Unchanged)
        );
    }

    #[test]
    fn test_awaiting_transitions() {
        assert_eq!(
            awaiting("a").on_click(ClickClass::Empty),
            (SelectionState::Idle, Outcome::Cancelled(id("a")))
        );
        assert_eq!(
            awaiting("a").on_click(ClickClass::Source(id("b"))),
            (awaiting("a"), Outcome::Unchanged)
        );
        assert_eq!(
            awaiting("a").on_click(ClickClass::Target(id("b"))),
            (
                SelectionState::Idle,
                Outcome::Committed {
                    source: id("a"),
                    target: id("b")
                }
            )
        );
        assert_eq!(
            awaiting("a").on_click(ClickClass::Rejected(id("b"))),
            (SelectionState::Idle, Outcome::Cancelled(id("a")))
        );
    }

    #[test]
    fn test_state_accessors() {
        assert!(!SelectionState::Idle.is_awaiting());
        assert_eq!(awaiting("a").source(), Some(&id("a")));
        let json = serde_json::to_value(awaiting("a")).unwrap();
        assert_eq!(json["state"], "awaitingTarget");
        assert_eq!(json["source"], "a");
    }
}
