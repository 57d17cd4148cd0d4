//! Transition definitions.
//!
//! A transition is a directed edge between two states carrying the metadata
//! used to decide who may perform it: an optional enabling property, the
//! activation requirement, a role override and the reservation policy.

use super::guard::{is_blank, resolve_value};
use super::state::State;
use crate::builder::ConfigError;
use crate::error::{LifecycleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// What performing a transition does to the activity's reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationMode {
    /// Reserve the activity for the acting agent.
    Set,
    /// Release any reservation.
    Clear,
}

/// The reservation an activity should hold after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reservation {
    Reserve(String),
    Clear,
}

/// Reference to a versioned resource (outcome schema, script or query).
///
/// Both parts are expressions that may contain `${property}` placeholders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub name: String,
    pub version: String,
}

impl ResourceRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    fn resolve_parts<F>(&self, lookup: F) -> Option<(String, String)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = resolve_value(&self.name, &lookup);
        let version = resolve_value(&self.version, &lookup);
        (!name.is_empty() && !version.is_empty()).then_some((name, version))
    }

    /// True when both name and version resolve to something non-empty.
    pub fn is_resolvable<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.resolve_parts(lookup).is_some()
    }

    /// Resolve placeholders and parse the version.
    ///
    /// Returns `Ok(None)` when either part resolves empty.
    pub fn resolve<F>(&self, lookup: F) -> Result<Option<ResolvedRef>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some((name, version_text)) = self.resolve_parts(lookup) else {
            return Ok(None);
        };
        let version = version_text.trim().parse::<i32>().map_err(|_| {
            LifecycleError::InvalidData(format!(
                "Bad version number: {} ({version_text})",
                self.version
            ))
        })?;
        Ok(Some(ResolvedRef { name, version }))
    }
}

/// A resource reference after placeholder substitution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRef {
    pub name: String,
    pub version: i32,
}

fn default_requires_active() -> bool {
    true
}

/// A named, directed edge between two states.
///
/// `finishing` is derived from the target state when the owning machine is
/// validated and cannot be set directly. A transition may not be both
/// finishing and reinitializing.
///
/// # Example
///
/// ```rust
/// use ledgerflow::core::{ReservationMode, Transition};
///
/// let mut done = Transition::new(0, "Done", 0, 1);
/// done.role_override = Some("${Approver}".to_string());
///
/// assert!(done.requires_active);
/// assert_eq!(done.reservation, None::<ReservationMode>);
/// assert_eq!(done.to_string(), "Done[id:0]");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transition {
    pub id: i32,
    pub name: String,
    pub origin_state_id: i32,
    pub target_state_id: i32,

    /// Whether the activity must be active for this transition to be offered.
    #[serde(default = "default_requires_active")]
    pub requires_active: bool,

    /// Name of the boolean activity property that enables this transition.
    #[serde(default)]
    pub enabled_prop: Option<String>,

    /// Role expression that overrides the activity's role.
    #[serde(default)]
    pub role_override: Option<String>,

    #[serde(default)]
    pub reservation: Option<ReservationMode>,

    #[serde(default)]
    pub error_handler: bool,

    #[serde(default)]
    pub outcome: Option<ResourceRef>,

    #[serde(default)]
    pub script: Option<ResourceRef>,

    #[serde(default)]
    pub query: Option<ResourceRef>,

    #[serde(default)]
    reinitializes: bool,

    #[serde(skip)]
    finishing: bool,
}

impl Transition {
    pub fn new(id: i32, name: impl Into<String>, origin_state_id: i32, target_state_id: i32) -> Self {
        Self {
            id,
            name: name.into(),
            origin_state_id,
            target_state_id,
            requires_active: true,
            enabled_prop: None,
            role_override: None,
            reservation: None,
            error_handler: false,
            outcome: None,
            script: None,
            query: None,
            reinitializes: false,
            finishing: false,
        }
    }

    /// Whether the target state is finished. Only meaningful once the
    /// owning machine has been validated.
    pub fn is_finishing(&self) -> bool {
        self.finishing
    }

    pub fn reinitializes(&self) -> bool {
        self.reinitializes
    }

    /// Flag the transition as reinitializing the activity.
    ///
    /// Fails if the transition is already known to be finishing.
    pub fn set_reinitializes(&mut self, reinitializes: bool) -> std::result::Result<(), ConfigError> {
        if reinitializes && self.finishing {
            return Err(ConfigError::FinishingReinitializes {
                transition: self.to_string(),
            });
        }
        self.reinitializes = reinitializes;
        Ok(())
    }

    /// Bind the resolved target state, deriving `finishing` from it.
    pub(crate) fn bind_target(&mut self, target: &State) {
        self.finishing = target.is_finished();
    }

    /// The effective reservation mode: explicit, or derived from `finishing`.
    pub fn reservation_mode(&self) -> ReservationMode {
        self.reservation.unwrap_or(if self.finishing {
            ReservationMode::Clear
        } else {
            ReservationMode::Set
        })
    }

    /// The reservation an activity should hold once `agent_name` has
    /// performed this transition.
    pub fn reservation_for(&self, agent_name: &str) -> Reservation {
        match self.reservation_mode() {
            ReservationMode::Set => Reservation::Reserve(agent_name.to_string()),
            ReservationMode::Clear => Reservation::Clear,
        }
    }

    /// The role override with placeholders resolved, if one is configured.
    pub fn resolved_role_override<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.role_override
            .as_deref()
            .filter(|expr| !expr.is_empty())
            .map(|expr| resolve_value(expr, lookup))
    }

    /// Whether availability is gated by an activity property.
    pub fn has_enabling_property(&self) -> bool {
        !is_blank(self.enabled_prop.as_deref())
    }

    /// Whether an outcome schema is declared and both its name and version
    /// resolve to non-empty values.
    pub fn has_outcome<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.outcome.as_ref().is_some_and(|r| r.is_resolvable(lookup))
    }

    /// Whether a script is declared and resolves; see `has_outcome`.
    pub fn has_script<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.script.as_ref().is_some_and(|r| r.is_resolvable(lookup))
    }

    /// Whether a query is declared and resolves; see `has_outcome`.
    pub fn has_query<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.query.as_ref().is_some_and(|r| r.is_resolvable(lookup))
    }

    /// The outcome schema reference with `${}` placeholders resolved. A
    /// version that is not an integer is `InvalidData`.
    pub fn outcome_ref<F>(&self, lookup: F) -> Result<Option<ResolvedRef>>
    where
        F: Fn(&str) -> Option<String>,
    {
        resolve_optional(self.outcome.as_ref(), lookup)
    }

    /// The script reference, resolved like `outcome_ref`.
    pub fn script_ref<F>(&self, lookup: F) -> Result<Option<ResolvedRef>>
    where
        F: Fn(&str) -> Option<String>,
    {
        resolve_optional(self.script.as_ref(), lookup)
    }

    /// The query reference, resolved like `outcome_ref`.
    pub fn query_ref<F>(&self, lookup: F) -> Result<Option<ResolvedRef>>
    where
        F: Fn(&str) -> Option<String>,
    {
        resolve_optional(self.query.as_ref(), lookup)
    }
}

fn resolve_optional<F>(reference: Option<&ResourceRef>, lookup: F) -> Result<Option<ResolvedRef>>
where
    F: Fn(&str) -> Option<String>,
{
    match reference {
        Some(r) => r.resolve(lookup),
        None => Ok(None),
    }
}

impl PartialEq for Transition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transition {}

impl Hash for Transition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[id:{}]", self.name, self.id)
    }
}
