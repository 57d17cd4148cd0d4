//! Deciding who may perform a transition, and what performing it means.

use super::state_machine::StateMachine;
use crate::activity::Activity;
use crate::agent::{Agent, RoleDirectory, ADMIN_ROLE};
use crate::core::{is_truthy, Reservation, State, Transition};
use crate::error::{AccessDenied, LifecycleError, Result};
use std::collections::HashMap;
use tracing::debug;

/// The outcome of a legal transition request.
///
/// Performing the transition is left to the caller: record an event in the
/// item's history, move the activity to `target` and apply `reservation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Traversal {
    pub transition_id: i32,
    pub target: State,
    /// The role the agent acts under, or `None` when no role is required.
    pub performing_role: Option<String>,
    pub reservation: Reservation,
}

impl Transition {
    /// Whether the activity's enabling property allows this transition.
    ///
    /// Transitions without an enabling property are always enabled; one
    /// whose property is absent is disabled.
    pub fn is_enabled(&self, activity: &dyn Activity) -> Result<bool> {
        let Some(prop) = self.enabled_prop.as_deref().filter(|p| !p.trim().is_empty()) else {
            return Ok(true);
        };
        debug!(transition = %self, enabled_prop = prop, "evaluating enabling property");
        Ok(activity
            .evaluate_property(prop)?
            .is_some_and(|value| is_truthy(&value)))
    }

    /// Resolve the role under which `agent` would perform this transition.
    ///
    /// Checks, in order: the enabling property, the activation requirement,
    /// the activity's reservation (only a role override may bypass it) and
    /// finally role membership. Holding `Admin` satisfies any role.
    pub fn performing_role(
        &self,
        activity: &dyn Activity,
        agent: &Agent,
        roles: &dyn RoleDirectory,
    ) -> Result<Option<String>> {
        if !self.is_enabled(activity)? {
            return Err(AccessDenied::Disabled {
                transition: self.to_string(),
                property: self.enabled_prop.clone().unwrap_or_default(),
            }
            .into());
        }

        if self.requires_active && !activity.is_active() {
            return Err(AccessDenied::Inactive {
                transition: self.to_string(),
            }
            .into());
        }

        let overriding_role = self.resolved_role_override(|name| activity.property(name));

        if let Some(owner) = activity.current_agent_name() {
            if overriding_role.is_none() && owner != agent.name() {
                return Err(AccessDenied::Owned {
                    agent: agent.name().to_string(),
                    transition: self.to_string(),
                    activity: activity.name().to_string(),
                    owner: owner.to_string(),
                }
                .into());
            }
        }

        let role_names: Vec<String> = match overriding_role {
            Some(role) => vec![role],
            None => activity
                .current_agent_role()
                .map(|roles| {
                    roles
                        .split(',')
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        };

        if role_names.is_empty() {
            return Ok(None);
        }

        let candidates = role_names
            .iter()
            .map(|name| roles.role(name))
            .collect::<Result<Vec<_>>>()?;

        if let Some(role) = agent.first_matching_role(&candidates) {
            return Ok(Some(role.name().to_string()));
        }
        if agent.is_admin() {
            return Ok(Some(ADMIN_ROLE.to_string()));
        }

        Err(AccessDenied::MissingRole {
            agent: agent.name().to_string(),
            role: role_names.join(","),
            activity: activity.name().to_string(),
        }
        .into())
    }
}

impl StateMachine {
    fn current_state(&self, activity: &dyn Activity) -> Result<&State> {
        let id = activity.current_state_id();
        self.state(id).ok_or_else(|| {
            LifecycleError::InvalidData(format!(
                "Activity '{}' is in state {id}, which StateMachine '{}' does not declare",
                activity.name(),
                self.name()
            ))
        })
    }

    /// Transitions `agent` may currently perform on `activity`, with the
    /// role each would be performed under.
    ///
    /// This is advisory: transitions that are disabled or refused for
    /// access reasons are left out rather than reported. Lookup failures
    /// still propagate. The map is keyed by transition and has no order.
    pub fn possible_transitions(
        &self,
        activity: &dyn Activity,
        agent: &Agent,
        roles: &dyn RoleDirectory,
    ) -> Result<HashMap<&Transition, Option<String>>> {
        self.ensure_adjudicable()?;
        let current = self.current_state(activity)?;

        let mut offered = HashMap::new();
        for transition in self.outgoing_transitions(current.id()) {
            if !transition.is_enabled(activity)? {
                debug!(transition = %transition, activity = activity.name(), "transition disabled");
                continue;
            }
            match transition.performing_role(activity, agent, roles) {
                Ok(role) => {
                    offered.insert(transition, role);
                }
                Err(LifecycleError::AccessRights(reason)) => {
                    debug!(
                        transition = %transition,
                        agent = agent.name(),
                        %reason,
                        "transition not offered"
                    );
                }
                Err(other) => return Err(other),
            }
        }
        Ok(offered)
    }

    /// Check that `agent` may perform `transition` on `activity` right now.
    ///
    /// Fails with `InvalidTransition` when the transition does not leave
    /// the activity's current state, and with `AccessRights` when the agent
    /// is refused. Nothing is recorded; see `History::add_event`.
    pub fn traverse(
        &self,
        activity: &dyn Activity,
        transition: &Transition,
        agent: &Agent,
        roles: &dyn RoleDirectory,
    ) -> Result<Traversal> {
        self.ensure_adjudicable()?;
        let current = self.current_state(activity)?;

        let bound = self.transition(transition.id).ok_or_else(|| {
            LifecycleError::ObjectNotFound(format!(
                "Transition {transition} is not declared by StateMachine '{}'",
                self.name()
            ))
        })?;

        if bound.origin_state_id != current.id() {
            return Err(LifecycleError::InvalidTransition {
                transition: bound.to_string(),
                state: current.name().to_string(),
            });
        }

        let performing_role = bound.performing_role(activity, agent, roles)?;
        let target = self.state(bound.target_state_id).cloned().ok_or_else(|| {
            LifecycleError::ObjectNotFound(format!("Target of {bound} is not declared"))
        })?;

        debug!(
            transition = %bound,
            agent = agent.name(),
            role = performing_role.as_deref().unwrap_or(""),
            target = %target,
            "transition allowed"
        );

        Ok(Traversal {
            transition_id: bound.id,
            target,
            performing_role,
            reservation: bound.reservation_for(agent.name()),
        })
    }

    /// Convenience for `traverse` by transition id.
    pub fn traverse_id(
        &self,
        activity: &dyn Activity,
        transition_id: i32,
        agent: &Agent,
        roles: &dyn RoleDirectory,
    ) -> Result<Traversal> {
        let transition = self.transition(transition_id).ok_or_else(|| {
            LifecycleError::ObjectNotFound(format!(
                "Transition id {transition_id} is not declared by StateMachine '{}'",
                self.name()
            ))
        })?;
        self.traverse(activity, transition, agent, roles)
    }
}
