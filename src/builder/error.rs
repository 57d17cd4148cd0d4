//! Configuration errors for state machine definitions and builders.

use crate::machine::CoherenceViolation;
use thiserror::Error;

/// Errors that make a state machine definition unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Transition '{transition}' source state not specified. Call .from(state)")]
    MissingFromState { transition: String },

    #[error("Transition '{transition}' target state not specified. Call .to(state)")]
    MissingToState { transition: String },

    #[error("State '{name}' is not declared")]
    UnknownState { name: String },

    #[error("Transition {transition} cannot be both reinitializing and finishing")]
    FinishingReinitializes { transition: String },

    #[error("StateMachine '{machine}' has not been validated since it was last changed")]
    NotValidated { machine: String },

    #[error("StateMachine '{machine}' is incoherent: {}", summarize(.violations))]
    Incoherent {
        machine: String,
        violations: Vec<CoherenceViolation>,
    },

    #[error("Invalid state machine definition: {0}")]
    InvalidDefinition(String),
}

fn summarize(violations: &[CoherenceViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
