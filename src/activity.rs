//! The activity interface consumed by transition adjudication.
//!
//! Activities live outside this crate. The state machine only reads their
//! current state, activation flag, reservation and properties, and reports
//! what the reservation should become after a transition.

use crate::core::{is_blank, Reservation, State};
use crate::error::Result;
use std::collections::BTreeMap;

/// Read access to a unit of work governed by a state machine.
pub trait Activity {
    /// Display name, used in refusal messages.
    fn name(&self) -> &str;

    fn current_state_id(&self) -> i32;

    fn is_active(&self) -> bool;

    /// Name of the agent currently holding the reservation, if any.
    fn current_agent_name(&self) -> Option<&str>;

    /// Role (or comma-separated roles) expected to act next.
    fn current_agent_role(&self) -> Option<&str>;

    /// Raw property value.
    fn property(&self, name: &str) -> Option<String>;

    /// Evaluate a property for a guard.
    ///
    /// Implementations backed by computed properties may fail here; the
    /// default simply reads the stored value.
    fn evaluate_property(&self, name: &str) -> Result<Option<String>> {
        Ok(self.property(name))
    }
}

/// An in-memory activity record.
///
/// # Example
///
/// ```rust
/// use ledgerflow::activity::{Activity, ActivityRecord};
///
/// let activity = ActivityRecord::new("Review", 0)
///     .with_role("Worker")
///     .with_property("Skippable", "true");
///
/// assert!(activity.is_active());
/// assert_eq!(activity.current_agent_role(), Some("Worker"));
/// assert_eq!(activity.property("Skippable").as_deref(), Some("true"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRecord {
    pub name: String,
    pub state_id: i32,
    pub active: bool,
    pub agent_name: Option<String>,
    pub agent_role: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl ActivityRecord {
    pub fn new(name: impl Into<String>, state_id: i32) -> Self {
        Self {
            name: name.into(),
            state_id,
            active: true,
            agent_name: None,
            agent_role: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.agent_role = Some(role.into());
        self
    }

    pub fn reserved_by(mut self, agent: impl Into<String>) -> Self {
        self.agent_name = Some(agent.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn apply_reservation(&mut self, reservation: &Reservation) {
        self.agent_name = match reservation {
            Reservation::Reserve(agent) => Some(agent.clone()),
            Reservation::Clear => None,
        };
    }

    /// Move to `target`, deactivating when it is finished.
    pub fn enter(&mut self, target: &State) {
        self.state_id = target.id();
        self.active = !target.is_finished();
    }
}

impl Activity for ActivityRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn current_state_id(&self) -> i32 {
        self.state_id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn current_agent_name(&self) -> Option<&str> {
        let name = self.agent_name.as_deref();
        if is_blank(name) {
            None
        } else {
            name
        }
    }

    fn current_agent_role(&self) -> Option<&str> {
        let role = self.agent_role.as_deref();
        if is_blank(role) {
            None
        } else {
            role
        }
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_reservation_reads_as_none() {
        let activity = ActivityRecord::new("Review", 0).reserved_by("  ");
        assert_eq!(activity.current_agent_name(), None);

        let activity = ActivityRecord::new("Review", 0).with_role("");
        assert_eq!(activity.current_agent_role(), None);
    }

    #[test]
    fn reservation_is_applied() {
        let mut activity = ActivityRecord::new("Review", 0);

        activity.apply_reservation(&Reservation::Reserve("alice".to_string()));
        assert_eq!(activity.current_agent_name(), Some("alice"));

        activity.apply_reservation(&Reservation::Clear);
        assert_eq!(activity.current_agent_name(), None);
    }

    #[test]
    fn entering_finished_state_deactivates() {
        let mut activity = ActivityRecord::new("Review", 0);

        activity.enter(&State::new(1, "Started"));
        assert_eq!(activity.current_state_id(), 1);
        assert!(activity.is_active());

        activity.enter(&State::new(2, "Done").finished());
        assert_eq!(activity.current_state_id(), 2);
        assert!(!activity.is_active());
    }

    #[test]
    fn evaluate_property_defaults_to_stored_value() {
        let activity = ActivityRecord::new("Review", 0).with_property("Skippable", "false");

        assert_eq!(
            activity.evaluate_property("Skippable").unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(activity.evaluate_property("Unknown").unwrap(), None);
    }
}
