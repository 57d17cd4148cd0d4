//! Agents, roles and the role directory.

use crate::error::{LifecycleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::RwLock;

/// The distinguished role that bypasses role-membership checks.
pub const ADMIN_ROLE: &str = "Admin";

/// A named permission grouping.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Role {
    name: String,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An actor identified by name and holding zero or more roles.
///
/// # Example
///
/// ```rust
/// use ledgerflow::agent::{Agent, Role};
///
/// let alice = Agent::new("alice").with_role("Worker");
///
/// assert!(alice.has_role("Worker"));
/// assert!(!alice.is_admin());
///
/// let candidates = [Role::new("Manager"), Role::new("Worker")];
/// assert_eq!(alice.first_matching_role(&candidates), Some(&candidates[1]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    name: String,
    roles: BTreeSet<Role>,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(Role::new(role));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.name == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    /// The first of `candidates`, in order, that this agent holds.
    pub fn first_matching_role<'a>(&self, candidates: &'a [Role]) -> Option<&'a Role> {
        candidates.iter().find(|r| self.roles.contains(*r))
    }
}

/// Resolves role names to roles.
pub trait RoleDirectory: Send + Sync {
    /// Fails with `ObjectNotFound` when no such role is known.
    fn role(&self, name: &str) -> Result<Role>;
}

/// In-memory role directory.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    roles: RwLock<BTreeSet<Role>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with `names`.
    pub fn with_roles<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: RwLock::new(names.into_iter().map(Role::new).collect()),
        }
    }

    pub fn register(&self, name: impl Into<String>) -> Result<Role> {
        let role = Role::new(name);
        self.roles
            .write()
            .map_err(|_| LifecycleError::InvalidData("role registry lock poisoned".to_string()))?
            .insert(role.clone());
        Ok(role)
    }
}

impl RoleDirectory for RoleRegistry {
    fn role(&self, name: &str) -> Result<Role> {
        let roles = self
            .roles
            .read()
            .map_err(|_| LifecycleError::InvalidData("role registry lock poisoned".to_string()))?;
        roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| LifecycleError::ObjectNotFound(format!("Role '{name}' does not exist")))
    }
}
