//! Lifecycle states.
//!
//! A state is a named node of a state machine. States are plain values: the
//! table of transitions leaving a state is an index owned by the
//! `StateMachine`, not something the state carries around.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A named node in a state machine.
///
/// Equality and hashing only consider the id, so two states with the same
/// id but different names compare equal.
///
/// # Example
///
/// ```rust
/// use ledgerflow::core::State;
///
/// let started = State::new(0, "Started");
/// let done = State::new(1, "Done").finished();
///
/// assert!(!started.is_finished());
/// assert!(done.is_finished());
/// assert_eq!(done.to_string(), "Done[id:1]");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct State {
    id: i32,
    name: String,
    /// Reaching a finished state deactivates the owning activity.
    #[serde(default)]
    finished: bool,
}

impl State {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            finished: false,
        }
    }

    /// Mark this state as terminal.
    pub fn finished(mut self) -> Self {
        self.finished = true;
        self
    }

    pub fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[id:{}]", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_by_id_only() {
        let a = State::new(3, "Waiting");
        let b = State::new(3, "Renamed").finished();
        let c = State::new(4, "Waiting");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hash_follows_id() {
        let mut set = HashSet::new();
        set.insert(State::new(1, "One"));
        set.insert(State::new(1, "Uno"));
        set.insert(State::new(2, "Two"));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn finished_defaults_to_false_when_absent() {
        let state: State = serde_json::from_str(r#"{"id":7,"name":"Open"}"#).unwrap();
        assert_eq!(state.id(), 7);
        assert_eq!(state.name(), "Open");
        assert!(!state.is_finished());
    }

    #[test]
    fn state_serializes_correctly() {
        let state = State::new(1, "Done").finished();
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: State = serde_json::from_str(&json).unwrap();

        assert_eq!(state, deserialized);
        assert!(deserialized.is_finished());
        assert_eq!(deserialized.name(), "Done");
    }
}
