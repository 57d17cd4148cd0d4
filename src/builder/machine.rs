//! Builder for constructing state machines.

use crate::builder::error::ConfigError;
use crate::builder::transition::TransitionBuilder;
use crate::core::State;
use crate::machine::StateMachine;
use std::collections::HashMap;

/// Builder for constructing validated state machines with a fluent API.
///
/// States get ids in declaration order; transitions refer to them by name.
/// `build` only returns a machine that is ready to adjudicate transitions.
///
/// # Example
///
/// ```rust
/// use ledgerflow::builder::{StateMachineBuilder, TransitionBuilder};
///
/// let machine = StateMachineBuilder::new("Default")
///     .version(0)
///     .state("Started")
///     .finished_state("Done")
///     .initial("Started")
///     .transition(TransitionBuilder::new("Complete").from("Started").to("Done"))
///     .build()
///     .unwrap();
///
/// assert!(machine.is_coherent());
/// assert!(machine.transition_by_name("Complete").unwrap().is_finishing());
/// ```
pub struct StateMachineBuilder {
    name: String,
    version: Option<i32>,
    states: Vec<(String, bool)>,
    initial: Option<String>,
    transitions: Vec<TransitionBuilder>,
}

impl StateMachineBuilder {
    /// Create a new builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            states: Vec::new(),
            initial: None,
            transitions: Vec::new(),
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }

    /// Declare a state.
    pub fn state(mut self, name: impl Into<String>) -> Self {
        self.states.push((name.into(), false));
        self
    }

    /// Declare a terminal state.
    pub fn finished_state(mut self, name: impl Into<String>) -> Self {
        self.states.push((name.into(), true));
        self
    }

    /// Set the initial state (required).
    pub fn initial(mut self, name: impl Into<String>) -> Self {
        self.initial = Some(name.into());
        self
    }

    /// Add a transition.
    pub fn transition(mut self, builder: TransitionBuilder) -> Self {
        self.transitions.push(builder);
        self
    }

    /// Add multiple transitions at once.
    pub fn transitions(mut self, builders: impl IntoIterator<Item = TransitionBuilder>) -> Self {
        self.transitions.extend(builders);
        self
    }

    /// Build and validate the state machine.
    pub fn build(self) -> Result<StateMachine, ConfigError> {
        let initial = self.initial.ok_or(ConfigError::MissingInitialState)?;

        let states: Vec<State> = self
            .states
            .into_iter()
            .zip(0..)
            .map(|((name, finished), id)| {
                let mut state = State::new(id, name);
                state.set_finished(finished);
                state
            })
            .collect();

        // first declaration wins when names repeat
        let mut ids: HashMap<&str, i32> = HashMap::new();
        for state in &states {
            ids.entry(state.name()).or_insert(state.id());
        }
        let state_id = |name: &str| {
            ids.get(name).copied().ok_or_else(|| ConfigError::UnknownState {
                name: name.to_string(),
            })
        };

        let initial_id = state_id(&initial)?;
        let transitions = self
            .transitions
            .into_iter()
            .zip(0..)
            .map(|(builder, id)| builder.build(id, &state_id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut machine = StateMachine::new(self.name, self.version);
        machine.set_states(states);
        machine.set_transitions(transitions);
        machine.set_initial_state_id(initial_id);

        if !machine.violations().is_empty() {
            return Err(ConfigError::Incoherent {
                machine: machine.name().to_string(),
                violations: machine.violations().to_vec(),
            });
        }
        Ok(machine)
    }
}
