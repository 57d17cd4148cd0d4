//! Builder for constructing transitions by state name.

use crate::builder::error::ConfigError;
use crate::core::{ReservationMode, ResourceRef, Transition};

/// Builder for a transition whose endpoints are given by state name.
///
/// Names are resolved to ids by `StateMachineBuilder::build`.
#[derive(Clone, Debug)]
pub struct TransitionBuilder {
    name: String,
    from: Option<String>,
    to: Option<String>,
    requires_active: bool,
    enabled_prop: Option<String>,
    role_override: Option<String>,
    reservation: Option<ReservationMode>,
    error_handler: bool,
    reinitializes: bool,
    outcome: Option<ResourceRef>,
    script: Option<ResourceRef>,
    query: Option<ResourceRef>,
}

impl TransitionBuilder {
    /// Create a new transition builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: None,
            to: None,
            requires_active: true,
            enabled_prop: None,
            role_override: None,
            reservation: None,
            error_handler: false,
            reinitializes: false,
            outcome: None,
            script: None,
            query: None,
        }
    }

    /// Set the origin state (required).
    pub fn from(mut self, state: impl Into<String>) -> Self {
        self.from = Some(state.into());
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = Some(state.into());
        self
    }

    /// Allow the transition on inactive activities.
    pub fn when_inactive(mut self) -> Self {
        self.requires_active = false;
        self
    }

    /// Gate the transition on a boolean activity property.
    pub fn enabled_by(mut self, property: impl Into<String>) -> Self {
        self.enabled_prop = Some(property.into());
        self
    }

    /// Override the activity's role; may contain `${property}` placeholders.
    pub fn role_override(mut self, role: impl Into<String>) -> Self {
        self.role_override = Some(role.into());
        self
    }

    pub fn reservation(mut self, mode: ReservationMode) -> Self {
        self.reservation = Some(mode);
        self
    }

    pub fn error_handler(mut self) -> Self {
        self.error_handler = true;
        self
    }

    pub fn reinitializes(mut self) -> Self {
        self.reinitializes = true;
        self
    }

    pub fn outcome(mut self, schema: impl Into<String>, version: impl Into<String>) -> Self {
        self.outcome = Some(ResourceRef::new(schema, version));
        self
    }

    pub fn script(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.script = Some(ResourceRef::new(name, version));
        self
    }

    pub fn query(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.query = Some(ResourceRef::new(name, version));
        self
    }

    /// Build the transition with `id`, resolving state names with
    /// `state_id`.
    pub(crate) fn build<F>(self, id: i32, state_id: F) -> Result<Transition, ConfigError>
    where
        F: Fn(&str) -> Result<i32, ConfigError>,
    {
        let from = self.from.as_deref().ok_or_else(|| ConfigError::MissingFromState {
            transition: self.name.clone(),
        })?;
        let to = self.to.as_deref().ok_or_else(|| ConfigError::MissingToState {
            transition: self.name.clone(),
        })?;

        let mut transition = Transition::new(id, self.name.clone(), state_id(from)?, state_id(to)?);
        transition.requires_active = self.requires_active;
        transition.enabled_prop = self.enabled_prop;
        transition.role_override = self.role_override;
        transition.reservation = self.reservation;
        transition.error_handler = self.error_handler;
        transition.outcome = self.outcome;
        transition.script = self.script;
        transition.query = self.query;
        transition.set_reinitializes(self.reinitializes)?;
        Ok(transition)
    }
}
