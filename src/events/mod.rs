//! Events and the per-item history log.

mod event;
mod history;

pub use event::{
    parse_time_string, split_agent_key, time_to_string, Event, EventRecord, NewEvent,
    OutcomeDetails, DEFAULT_VIEW_NAME,
};
pub use history::{History, HistoryRegistry};
