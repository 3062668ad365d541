//! Source/Target Selection
//!
//! A two-state protocol layered over the host's native click handling:
//! the first click picks a source, the next click picks a target.
//!
//! Which entities qualify is decided by votes. Subscribers of
//! `entity_source` and `entity_target` return `true` to accept an entity; a
//! single approval is enough. With no source voters no session ever starts.
//!
//! | State | Click | Next | Emits |
//! |-------|-------|------|-------|
//! | Idle | accepted source | AwaitingTarget | `selection_changed(true)` |
//! | AwaitingTarget | empty space | Idle | `selection_changed(false)` |
//! | AwaitingTarget | a source | AwaitingTarget | nothing |
//! | AwaitingTarget | accepted target | Idle | `target_set`, `selection_changed(false)` |
//! | AwaitingTarget | anything else | Idle | `selection_changed(false)` |
//!
//! While awaiting a target every click is suppressed and native selection is
//! vetoed.

mod coordinator;
mod state;

pub use coordinator::*;
pub use state::*;
