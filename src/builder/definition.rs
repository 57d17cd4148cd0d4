//! Serializable state machine definitions.
//!
//! A definition is the configuration form of a state machine: states and
//! transitions with explicit ids, as they are stored alongside other
//! description objects. Loading one always validates it.

use crate::builder::error::ConfigError;
use crate::core::{State, Transition};
use crate::machine::StateMachine;
use serde::{Deserialize, Serialize};

/// The persisted layout of a state machine.
///
/// # Example
///
/// ```rust
/// use ledgerflow::builder::StateMachineDefinition;
///
/// let json = r#"{
///     "name": "Default",
///     "version": 0,
///     "initial_state_id": 0,
///     "states": [
///         {"id": 0, "name": "Started"},
///         {"id": 1, "name": "Done", "finished": true}
///     ],
///     "transitions": [
///         {"id": 0, "name": "Complete", "origin_state_id": 0, "target_state_id": 1}
///     ]
/// }"#;
///
/// let machine = StateMachineDefinition::from_json(json).unwrap().into_machine().unwrap();
/// assert!(machine.is_coherent());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateMachineDefinition {
    pub name: String,
    #[serde(default)]
    pub version: Option<i32>,
    pub initial_state_id: i32,
    pub states: Vec<State>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl StateMachineDefinition {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidDefinition(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::InvalidDefinition(e.to_string()))
    }

    /// Build and validate the machine this definition describes.
    pub fn into_machine(self) -> Result<StateMachine, ConfigError> {
        let mut machine = StateMachine::new(self.name, self.version);
        machine.set_states(self.states);
        machine.set_transitions(self.transitions);
        machine.set_initial_state_id(self.initial_state_id);

        if machine.violations().is_empty() {
            Ok(machine)
        } else {
            Err(ConfigError::Incoherent {
                machine: machine.name().to_string(),
                violations: machine.violations().to_vec(),
            })
        }
    }
}

impl From<&StateMachine> for StateMachineDefinition {
    fn from(machine: &StateMachine) -> Self {
        Self {
            name: machine.name().to_string(),
            version: machine.version(),
            initial_state_id: machine.initial_state_id(),
            states: machine.states().to_vec(),
            transitions: machine.transitions().to_vec(),
        }
    }
}
