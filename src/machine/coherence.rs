//! Coherence checks for state machine definitions.
//!
//! Uses Stillwater's `Validation` so that every problem in a definition is
//! reported at once instead of stopping at the first.

use crate::core::{State, Transition};
use std::collections::{HashMap, HashSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A single defect in a state machine definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoherenceViolation {
    #[error("Initial state id {id} is not declared")]
    UnknownInitialState { id: i32 },

    #[error("Transition {transition} has undeclared origin state id {state_id}")]
    UnknownOrigin { transition: String, state_id: i32 },

    #[error("Transition {transition} has undeclared target state id {state_id}")]
    UnknownTarget { transition: String, state_id: i32 },

    #[error("State id {id} is declared more than once")]
    DuplicateStateId { id: i32 },

    #[error("Transition id {id} is declared more than once")]
    DuplicateTransitionId { id: i32 },

    #[error("Transition {transition} cannot be both reinitializing and finishing")]
    FinishingReinitializes { transition: String },
}

impl CoherenceViolation {
    /// Whether this violation comes from an id that does not resolve.
    pub fn is_unresolved_reference(&self) -> bool {
        matches!(
            self,
            Self::UnknownInitialState { .. } | Self::UnknownOrigin { .. } | Self::UnknownTarget { .. }
        )
    }
}

type Check = Validation<(), NonEmptyVec<CoherenceViolation>>;

fn require(ok: bool, violation: impl FnOnce() -> CoherenceViolation) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// Check a definition, accumulating ALL violations.
pub fn check_definition(states: &[State], transitions: &[Transition], initial_state_id: i32) -> Check {
    let mut checks: Vec<Check> = Vec::new();

    let mut by_id: HashMap<i32, &State> = HashMap::new();
    for state in states {
        let fresh = by_id.insert(state.id(), state).is_none();
        checks.push(require(fresh, || CoherenceViolation::DuplicateStateId { id: state.id() }));
    }

    checks.push(require(by_id.contains_key(&initial_state_id), || {
        CoherenceViolation::UnknownInitialState { id: initial_state_id }
    }));

    let mut transition_ids = HashSet::new();
    for transition in transitions {
        checks.push(require(transition_ids.insert(transition.id), || {
            CoherenceViolation::DuplicateTransitionId { id: transition.id }
        }));

        checks.push(require(by_id.contains_key(&transition.origin_state_id), || {
            CoherenceViolation::UnknownOrigin {
                transition: transition.to_string(),
                state_id: transition.origin_state_id,
            }
        }));

        let target = by_id.get(&transition.target_state_id);
        checks.push(require(target.is_some(), || CoherenceViolation::UnknownTarget {
            transition: transition.to_string(),
            state_id: transition.target_state_id,
        }));

        let finishing = target.is_some_and(|s| s.is_finished());
        checks.push(require(!(finishing && transition.reinitializes()), || {
            CoherenceViolation::FinishingReinitializes {
                transition: transition.to_string(),
            }
        }));
    }

    Validation::all_vec(checks).map(|_| ())
}

/// Flatten a check into the list of its violations.
pub fn violations(check: Check) -> Vec<CoherenceViolation> {
    match check {
        Validation::Success(_) => Vec::new(),
        Validation::Failure(errors) => errors.iter().cloned().collect(),
    }
}
