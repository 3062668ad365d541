//! Error types
//!
//! Nothing in the interaction layer is fatal. Actions swallow these errors and
//! log them; they exist so internal helpers can use `?` and so host
//! implementations have a common failure type.

use thiserror::Error;

use crate::EntityId;

/// Failure reported by a host capability (entity store, scheduler, ...)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host error {code}: {message}")]
pub struct HostError {
    /// Host specific error code, -1 when the host has none
    pub code: i32,
    /// Human readable description
    pub message: String,
}

impl HostError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Entity id not known to the host
    pub fn unknown_entity(id: &EntityId) -> Self {
        Self::new(-2, format!("unknown entity {}", id))
    }

    /// Host surface has been destroyed
    pub fn destroyed() -> Self {
        Self::new(-3, "host destroyed")
    }
}

/// Errors raised inside the interaction layer
#[derive(Debug, Error)]
pub enum LayerError {
    /// Referenced id is not resolvable on the host
    #[error("entity {0} not found")]
    MissingEntity(EntityId),

    /// Entity exists but has no current position
    #[error("entity {0} has no resolvable position")]
    UnresolvablePosition(EntityId),

    /// The host surface signalled destruction
    #[error("host surface has been torn down")]
    HostTornDown,

    /// Action was already in effect (e.g. tracing an already traced entity)
    #[error("redundant action: {0}")]
    Redundant(String),

    /// A host effect failed
    #[error(transparent)]
    Host(#[from] HostError),

    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl LayerError {
    /// Whether this error is one of the expected silent no-op conditions
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            LayerError::MissingEntity(_)
                | LayerError::UnresolvablePosition(_)
                | LayerError::HostTornDown
                | LayerError::Redundant(_)
        )
    }
}
