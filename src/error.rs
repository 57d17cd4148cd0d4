//! Error taxonomy for transition adjudication and history recording.

use crate::builder::ConfigError;
use crate::storage::StorageError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Reasons an agent may be refused a transition.
///
/// All of these are recoverable: the message is meant to be surfaced to the
/// requesting agent, and the request is not retried automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("Trans:{transition} is disabled by the '{property}' property")]
    Disabled {
        transition: String,
        property: String,
    },

    #[error("Activity must be active to perform trans:{transition}")]
    Inactive { transition: String },

    #[error(
        "Agent '{agent}' cannot perform trans:{transition} because the activity '{activity}' is currently owned by {owner}"
    )]
    Owned {
        agent: String,
        transition: String,
        activity: String,
        owner: String,
    },

    #[error("Agent '{agent}' does not hold a suitable role '{role}' for the activity {activity}")]
    MissingRole {
        agent: String,
        role: String,
        activity: String,
    },
}

/// Errors raised by the lifecycle core.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The transition does not leave the activity's current state.
    #[error("Transition '{transition}' not valid from state '{state}'")]
    InvalidTransition { transition: String, state: String },

    #[error(transparent)]
    AccessRights(#[from] AccessDenied),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Persistency failure: {0}")]
    Persistency(#[from] StorageError),
}

impl LifecycleError {
    /// True for refusals an agent can act on (wrong state or missing rights).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::AccessRights(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_converts_into_lifecycle_error() {
        let err: LifecycleError = AccessDenied::Inactive {
            transition: "Done[id:1]".to_string(),
        }
        .into();

        assert!(matches!(err, LifecycleError::AccessRights(AccessDenied::Inactive { .. })));
        assert!(err.is_recoverable());
    }

    #[test]
    fn persistency_failures_are_not_recoverable() {
        let err: LifecycleError = StorageError::Poisoned.into();
        assert!(!err.is_recoverable());
        assert!(err.to_string().starts_with("Persistency failure"));
    }

    #[test]
    fn owned_message_names_the_owner() {
        let denied = AccessDenied::Owned {
            agent: "bob".to_string(),
            transition: "Complete[id:0]".to_string(),
            activity: "Review".to_string(),
            owner: "alice".to_string(),
        };
        assert!(denied.to_string().ends_with("currently owned by alice"));
    }
}
