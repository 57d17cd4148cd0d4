//! Configuration surfaces for state machines.
//!
//! This module provides fluent builders and serializable definitions for
//! creating state machines. Both validate before handing a machine back,
//! so an incoherent configuration is rejected when it is loaded rather
//! than when the first transition is attempted.

pub mod definition;
pub mod error;
pub mod machine;
pub mod transition;

pub use definition::StateMachineDefinition;
pub use error::ConfigError;
pub use machine::StateMachineBuilder;
pub use transition::TransitionBuilder;
