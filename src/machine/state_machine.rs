//! The state machine definition and its derived indexes.

use super::coherence::{check_definition, violations, CoherenceViolation};
use crate::builder::ConfigError;
use crate::core::{State, Transition};
use crate::error::{LifecycleError, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};

/// A versioned, validated lifecycle graph.
///
/// Definitions are built in two phases. States and transitions are plain
/// values; `validate` then derives the id indexes and the table of
/// transitions leaving each state. A machine only adjudicates transitions
/// once a validation pass has found no violation, and any later edit
/// requires validating again.
///
/// Once validated the machine is only read, so it can be shared between
/// threads behind an `Arc` without locking.
///
/// # Example
///
/// ```rust
/// use ledgerflow::machine::StateMachine;
///
/// let mut machine = StateMachine::new("Default", Some(0));
/// let waiting = machine.create_state("Waiting").id();
/// let done = machine.create_state("Done");
/// done.set_finished(true);
/// let done = done.id();
///
/// let complete = machine.create_transition("Complete");
/// complete.origin_state_id = waiting;
/// complete.target_state_id = done;
///
/// machine.set_initial_state_id(waiting);
/// assert!(machine.validate());
/// assert!(machine.transition_by_name("Complete").unwrap().is_finishing());
/// ```
#[derive(Clone, Debug)]
pub struct StateMachine {
    name: String,
    version: Option<i32>,
    states: Vec<State>,
    transitions: Vec<Transition>,
    initial_state_id: i32,

    state_index: HashMap<i32, usize>,
    transition_index: HashMap<i32, usize>,
    /// origin state id -> (transition id -> index into `transitions`)
    outgoing: HashMap<i32, BTreeMap<i32, usize>>,
    coherent: bool,
    violations: Vec<CoherenceViolation>,
    validated: bool,

    next_state_id: Option<i32>,
    next_transition_id: Option<i32>,
}

impl StateMachine {
    pub fn new(name: impl Into<String>, version: Option<i32>) -> Self {
        Self {
            name: name.into(),
            version,
            states: Vec::new(),
            transitions: Vec::new(),
            initial_state_id: 0,
            state_index: HashMap::new(),
            transition_index: HashMap::new(),
            outgoing: HashMap::new(),
            coherent: false,
            violations: Vec::new(),
            validated: false,
            next_state_id: None,
            next_transition_id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn initial_state_id(&self) -> i32 {
        self.initial_state_id
    }

    fn invalidate(&mut self) {
        self.validated = false;
        self.coherent = false;
    }

    fn allocate_state_id(&mut self) -> i32 {
        let next = self.next_state_id.unwrap_or_else(|| {
            self.states.iter().map(State::id).max().map_or(0, |max| max + 1)
        });
        self.next_state_id = Some(next + 1);
        next
    }

    fn allocate_transition_id(&mut self) -> i32 {
        let next = self.next_transition_id.unwrap_or_else(|| {
            self.transitions.iter().map(|t| t.id).max().map_or(0, |max| max + 1)
        });
        self.next_transition_id = Some(next + 1);
        next
    }

    /// Add a state with the next unused id. Names are not checked for
    /// collisions.
    pub fn create_state(&mut self, name: impl Into<String>) -> &mut State {
        let id = self.allocate_state_id();
        let state = State::new(id, name);
        debug!(machine = %self.name, state = %state, "created state");
        self.invalidate();
        let index = self.states.len();
        self.states.push(state);
        &mut self.states[index]
    }

    /// Add a transition with the next unused id. Its endpoints are left
    /// unresolved (-1) for the caller to set. Names are not checked for
    /// collisions.
    pub fn create_transition(&mut self, name: impl Into<String>) -> &mut Transition {
        let id = self.allocate_transition_id();
        let transition = Transition::new(id, name, -1, -1);
        debug!(machine = %self.name, transition = %transition, "created transition");
        self.invalidate();
        let index = self.transitions.len();
        self.transitions.push(transition);
        &mut self.transitions[index]
    }

    /// Replace all states and revalidate.
    pub fn set_states(&mut self, states: Vec<State>) -> bool {
        self.states = states;
        self.next_state_id = None;
        self.validate()
    }

    /// Replace all transitions and revalidate.
    pub fn set_transitions(&mut self, transitions: Vec<Transition>) -> bool {
        self.transitions = transitions;
        self.next_transition_id = None;
        self.validate()
    }

    /// Change the initial state and revalidate.
    pub fn set_initial_state_id(&mut self, id: i32) -> bool {
        self.initial_state_id = id;
        self.validate()
    }

    /// Rebuild the indexes and resolve every transition.
    ///
    /// Returns whether the machine is coherent: the initial state and both
    /// endpoints of every transition resolve to declared states. Other
    /// defects (duplicate ids, reinitializing transitions into finished
    /// states) do not affect the result but still prevent adjudication; see
    /// `violations`.
    pub fn validate(&mut self) -> bool {
        self.state_index.clear();
        self.transition_index.clear();
        self.outgoing.clear();

        debug!(machine = %self.name, "validating state machine");

        for (index, state) in self.states.iter().enumerate() {
            trace!(state = %state, "state");
            self.state_index.insert(state.id(), index);
        }

        for (index, transition) in self.transitions.iter_mut().enumerate() {
            trace!(transition = %transition, "transition");
            self.transition_index.insert(transition.id, index);

            if self.state_index.contains_key(&transition.origin_state_id) {
                self.outgoing
                    .entry(transition.origin_state_id)
                    .or_default()
                    .insert(transition.id, index);
            }
            if let Some(&target) = self.state_index.get(&transition.target_state_id) {
                transition.bind_target(&self.states[target]);
            }
        }

        self.violations = violations(check_definition(
            &self.states,
            &self.transitions,
            self.initial_state_id,
        ));
        self.coherent = !self
            .violations
            .iter()
            .any(CoherenceViolation::is_unresolved_reference);
        self.validated = true;

        if !self.violations.is_empty() {
            warn!(
                machine = %self.name,
                violations = self.violations.len(),
                coherent = self.coherent,
                "state machine definition has violations"
            );
        }
        self.coherent
    }

    /// Result of the last validation; false if never validated or edited
    /// since.
    pub fn is_coherent(&self) -> bool {
        self.validated && self.coherent
    }

    /// Every defect found by the last validation.
    pub fn violations(&self) -> &[CoherenceViolation] {
        &self.violations
    }

    /// Fail fast unless this machine may adjudicate transitions.
    pub fn ensure_adjudicable(&self) -> Result<()> {
        if !self.validated {
            return Err(ConfigError::NotValidated {
                machine: self.name.clone(),
            }
            .into());
        }
        if !self.violations.is_empty() {
            return Err(ConfigError::Incoherent {
                machine: self.name.clone(),
                violations: self.violations.clone(),
            }
            .into());
        }
        Ok(())
    }

    pub fn state(&self, id: i32) -> Option<&State> {
        self.state_index.get(&id).map(|&i| &self.states[i])
    }

    pub fn state_by_name(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name() == name)
    }

    pub fn initial_state(&self) -> Option<&State> {
        self.state(self.initial_state_id)
    }

    pub fn transition(&self, id: i32) -> Option<&Transition> {
        self.transition_index.get(&id).map(|&i| &self.transitions[i])
    }

    pub fn transition_by_name(&self, name: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.name == name)
    }

    pub fn transition_id(&self, name: &str) -> Option<i32> {
        self.transition_by_name(name).map(|t| t.id)
    }

    /// Like `transition_id`, but an unknown name is an error.
    pub fn valid_transition_id(&self, name: &str) -> Result<i32> {
        self.transition_id(name).ok_or_else(|| {
            LifecycleError::InvalidData(format!(
                "Transition name '{name}' was not found in StateMachine '{}'",
                self.name
            ))
        })
    }

    /// Transitions leaving `state_id`, in id order.
    pub fn outgoing_transitions(&self, state_id: i32) -> impl Iterator<Item = &Transition> {
        self.outgoing
            .get(&state_id)
            .into_iter()
            .flat_map(|table| table.values())
            .map(|&i| &self.transitions[i])
    }

    pub fn possible_transition_ids(&self, state_id: i32) -> Vec<i32> {
        self.outgoing_transitions(state_id).map(|t| t.id).collect()
    }

    /// The error-handling transition leaving `state_id`, if there is one.
    pub fn error_transition_id(&self, state_id: i32) -> Option<i32> {
        self.outgoing_transitions(state_id)
            .find(|t| t.error_handler)
            .map(|t| t.id)
    }
}
