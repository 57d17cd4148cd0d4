//! Immutable records of performed transitions.

use crate::core::is_blank;
use crate::error::{LifecycleError, Result};
use crate::machine::StateMachine;
use crate::storage::ItemPath;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// View name given to outcomes recorded without one.
pub const DEFAULT_VIEW_NAME: &str = "last";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const COMPACT_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn time_to_string(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIME_FORMAT).to_string()
}

/// Parse `YYYY-MM-DD HH:MM:SS`, or the compact `YYYYMMDDHHMMSS` form, as
/// UTC.
pub fn parse_time_string(time: &str) -> Result<DateTime<Utc>> {
    let format = match time.len() {
        19 => TIME_FORMAT,
        14 => COMPACT_TIME_FORMAT,
        _ => return Err(LifecycleError::InvalidData(format!("Unknown time format: {time}"))),
    };
    NaiveDateTime::parse_from_str(time, format)
        .map(|naive| naive.and_utc())
        .map_err(|e| LifecycleError::InvalidData(format!("Unknown time format: {time} ({e})")))
}

/// Split a combined `agent[:delegate]` key.
pub fn split_agent_key(key: &str) -> Result<(String, Option<String>)> {
    let mut parts = key.split(':');
    let agent = parts.next().unwrap_or_default();
    let delegate = parts.next();
    if agent.is_empty() || parts.next().is_some() || delegate.is_some_and(str::is_empty) {
        return Err(LifecycleError::InvalidData(format!("Invalid agent key '{key}'")));
    }
    Ok((agent.to_string(), delegate.map(String::from)))
}

/// Details of the outcome document produced by a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutcomeDetails {
    pub schema_name: String,
    pub schema_version: i32,
    pub view_name: Option<String>,
}

impl OutcomeDetails {
    pub fn new(schema_name: impl Into<String>, schema_version: i32) -> Self {
        Self {
            schema_name: schema_name.into(),
            schema_version,
            view_name: None,
        }
    }

    pub fn with_view(mut self, view_name: impl Into<String>) -> Self {
        self.view_name = Some(view_name.into());
        self
    }
}

/// What a caller supplies to record a performed transition.
///
/// # Example
///
/// ```rust
/// use ledgerflow::events::{NewEvent, OutcomeDetails};
///
/// let new_event = NewEvent::new("alice", "Review", "workflow/Review", "ElementaryActivity", 0)
///     .with_role("Worker")
///     .with_outcome(OutcomeDetails::new("ReviewReport", 0));
///
/// assert_eq!(new_event.agent_role.as_deref(), Some("Worker"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    pub agent: String,
    pub delegate: Option<String>,
    pub agent_role: Option<String>,
    pub step_name: String,
    pub step_path: String,
    pub step_type: String,
    pub transition_id: i32,
    pub outcome: Option<OutcomeDetails>,
    /// Explicit time of the event; stamped with the current time when absent.
    pub time_string: Option<String>,
}

impl NewEvent {
    pub fn new(
        agent: impl Into<String>,
        step_name: impl Into<String>,
        step_path: impl Into<String>,
        step_type: impl Into<String>,
        transition_id: i32,
    ) -> Self {
        Self {
            agent: agent.into(),
            delegate: None,
            agent_role: None,
            step_name: step_name.into(),
            step_path: step_path.into(),
            step_type: step_type.into(),
            transition_id,
            outcome: None,
            time_string: None,
        }
    }

    pub fn with_delegate(mut self, delegate: impl Into<String>) -> Self {
        self.delegate = Some(delegate.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.agent_role = Some(role.into());
        self
    }

    pub fn with_outcome(mut self, outcome: OutcomeDetails) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn at(mut self, time_string: impl Into<String>) -> Self {
        self.time_string = Some(time_string.into());
        self
    }
}

/// The persisted field set of an event.
///
/// Every optional field round-trips as absent; storage backends must not
/// drop or default them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Option<i32>,
    pub item: ItemPath,
    pub agent: String,
    pub delegate: Option<String>,
    pub agent_role: Option<String>,
    pub step_name: String,
    pub step_path: String,
    pub step_type: String,
    pub state_machine_name: String,
    pub state_machine_version: Option<i32>,
    pub transition_id: i32,
    pub origin_state_id: i32,
    pub target_state_id: i32,
    pub schema_name: Option<String>,
    pub schema_version: Option<i32>,
    pub view_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An immutable fact: who performed which transition, from which state to
/// which, when, and what outcome it produced.
///
/// Events are either minted from a transition being performed
/// (`Event::new`) or rebuilt from their persisted fields
/// (`Event::from_record`). Only the first stamps a time. The id is assigned
/// by the history when the event is stored and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EventRecord", into = "EventRecord")]
pub struct Event {
    record: EventRecord,
}

impl Event {
    /// Mint an event for performing `new_event.transition_id` of `machine`
    /// on `item`.
    pub fn new(item: ItemPath, machine: &StateMachine, new_event: NewEvent) -> Result<Self> {
        let transition = machine.transition(new_event.transition_id).ok_or_else(|| {
            LifecycleError::ObjectNotFound(format!(
                "Transition id {} is not declared by StateMachine '{}'",
                new_event.transition_id,
                machine.name()
            ))
        })?;

        let timestamp = match new_event.time_string.as_deref() {
            Some(time) => parse_time_string(time)?,
            None => Utc::now(),
        };

        let (schema_name, schema_version, view_name) = match new_event.outcome {
            Some(outcome) => (
                Some(outcome.schema_name),
                Some(outcome.schema_version),
                outcome.view_name,
            ),
            None => (None, None, None),
        };

        Ok(Self::from_record(EventRecord {
            id: None,
            item,
            agent: new_event.agent,
            delegate: new_event.delegate,
            agent_role: new_event.agent_role,
            step_name: new_event.step_name,
            step_path: new_event.step_path,
            step_type: new_event.step_type,
            state_machine_name: machine.name().to_string(),
            state_machine_version: machine.version(),
            transition_id: transition.id,
            origin_state_id: transition.origin_state_id,
            target_state_id: transition.target_state_id,
            schema_name,
            schema_version,
            view_name,
            timestamp,
        }))
    }

    /// Rebuild an event from every persisted field. The timestamp is kept
    /// as given.
    ///
    /// A blank view name becomes `"last"` when an outcome schema is
    /// recorded, and absent otherwise.
    pub fn from_record(mut record: EventRecord) -> Self {
        if is_blank(record.view_name.as_deref()) {
            record.view_name = if is_blank(record.schema_name.as_deref()) {
                None
            } else {
                Some(DEFAULT_VIEW_NAME.to_string())
            };
        }
        Self { record }
    }

    pub fn record(&self) -> &EventRecord {
        &self.record
    }

    pub fn into_record(self) -> EventRecord {
        self.record
    }

    pub fn id(&self) -> Option<i32> {
        self.record.id
    }

    /// The storage name of this event: its id in decimal.
    pub fn name(&self) -> Option<String> {
        self.record.id.map(|id| id.to_string())
    }

    /// Recover the id from a storage name, for events rebuilt from untyped
    /// storage. Ignored once an id is set, or if `name` is not decimal.
    pub fn set_name(&mut self, name: &str) {
        if self.record.id.is_none() {
            self.record.id = name.parse().ok();
        }
    }

    pub(crate) fn assign_id(&mut self, id: i32) {
        self.record.id = Some(id);
    }

    pub(crate) fn move_to(&mut self, item: ItemPath) {
        self.record.item = item;
    }

    pub fn item(&self) -> &ItemPath {
        &self.record.item
    }

    pub fn agent(&self) -> &str {
        &self.record.agent
    }

    pub fn delegate(&self) -> Option<&str> {
        self.record.delegate.as_deref()
    }

    /// `agent`, or `agent:delegate` when acting on someone's behalf.
    pub fn agent_key(&self) -> String {
        match &self.record.delegate {
            Some(delegate) => format!("{}:{delegate}", self.record.agent),
            None => self.record.agent.clone(),
        }
    }

    pub fn agent_role(&self) -> Option<&str> {
        self.record.agent_role.as_deref()
    }

    pub fn step_name(&self) -> &str {
        &self.record.step_name
    }

    pub fn step_path(&self) -> &str {
        &self.record.step_path
    }

    pub fn step_type(&self) -> &str {
        &self.record.step_type
    }

    pub fn state_machine_name(&self) -> &str {
        &self.record.state_machine_name
    }

    pub fn state_machine_version(&self) -> Option<i32> {
        self.record.state_machine_version
    }

    pub fn transition_id(&self) -> i32 {
        self.record.transition_id
    }

    pub fn origin_state_id(&self) -> i32 {
        self.record.origin_state_id
    }

    pub fn target_state_id(&self) -> i32 {
        self.record.target_state_id
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.record.schema_name.as_deref()
    }

    pub fn schema_version(&self) -> Option<i32> {
        self.record.schema_version
    }

    pub fn view_name(&self) -> Option<&str> {
        self.record.view_name.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.record.timestamp
    }

    pub fn time_string(&self) -> String {
        time_to_string(&self.record.timestamp)
    }
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        Self::from_record(record)
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        event.record
    }
}
