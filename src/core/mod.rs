//! State and transition definitions.
//!
//! This module holds the pure data of a lifecycle graph:
//! - `State`: a node, possibly terminal
//! - `Transition`: a guarded, directed edge with authorization metadata
//! - Guard helpers for `${property}` substitution and enabling flags
//!
//! Nothing here performs I/O. Resolution against an activity and an agent
//! happens in `crate::machine`.

mod guard;
mod state;
mod transition;

pub use guard::{is_truthy, resolve_value};
pub(crate) use guard::is_blank;
pub use state::State;
pub use transition::{Reservation, ReservationMode, ResolvedRef, ResourceRef, Transition};
