//! State machines: definition, validation and transition adjudication.
//!
//! A `StateMachine` answers two questions about an activity:
//! - what may this agent do now (`possible_transitions`), advisory
//! - may this agent perform this transition now (`traverse`), enforced
//!
//! Neither writes anything. Recording a performed transition is the job of
//! `crate::events::History`.

mod authority;
mod coherence;
mod state_machine;

pub use authority::Traversal;
pub use coherence::{check_definition, CoherenceViolation};
pub use state_machine::StateMachine;
