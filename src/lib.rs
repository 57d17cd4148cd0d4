//! Ledgerflow: lifecycle state machines with an append-only event history.
//!
//! A `StateMachine` declares the states an activity can be in and the
//! transitions between them. It answers two questions for an acting agent:
//! which transitions are currently offered, and whether a specific one may be
//! performed right now. Performed transitions are recorded as immutable
//! `Event`s in the item's `History`, which assigns dense, strictly ordered
//! ids and never forgets.
//!
//! # Core Concepts
//!
//! - **StateMachine**: validated graph of `State`s and `Transition`s
//! - **Traversal**: the outcome of an authorized transition (target state,
//!   resolved role, reservation to apply)
//! - **History**: per-item ordered event log over a `ClusterStorage`
//!
//! # Example
//!
//! ```rust
//! use ledgerflow::activity::ActivityRecord;
//! use ledgerflow::agent::{Agent, RoleRegistry};
//! use ledgerflow::builder::{StateMachineBuilder, TransitionBuilder};
//! use ledgerflow::events::{History, NewEvent};
//! use ledgerflow::storage::{EventCodec, ItemPath, MemoryClusterStorage};
//! use std::sync::Arc;
//!
//! let machine = StateMachineBuilder::new("Default")
//!     .state("Started")
//!     .finished_state("Done")
//!     .initial("Started")
//!     .transition(TransitionBuilder::new("Complete").from("Started").to("Done"))
//!     .build()
//!     .unwrap();
//!
//! let roles = RoleRegistry::with_roles(["Worker"]);
//! let alice = Agent::new("alice").with_role("Worker");
//! let mut activity = ActivityRecord::new("Review", 0).with_role("Worker");
//!
//! let traversal = machine.traverse_id(&activity, 0, &alice, &roles).unwrap();
//! assert_eq!(traversal.performing_role.as_deref(), Some("Worker"));
//!
//! let history = History::open(ItemPath::new(), Arc::new(MemoryClusterStorage::new()), EventCodec::Json).unwrap();
//! let event = history
//!     .add_event(&machine, NewEvent::new("alice", "Review", "wf/Review", "Elementary", traversal.transition_id))
//!     .unwrap();
//!
//! activity.enter(&traversal.target);
//! activity.apply_reservation(&traversal.reservation);
//!
//! assert_eq!(event.id(), Some(0));
//! assert!(!activity.active);
//! ```

pub mod activity;
pub mod agent;
pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod error;
pub mod events;
pub mod machine;
pub mod storage;

// Re-export commonly used types
pub use activity::{Activity, ActivityRecord};
pub use agent::{Agent, Role, RoleDirectory, RoleRegistry, ADMIN_ROLE};
pub use builder::{ConfigError, StateMachineBuilder, StateMachineDefinition, TransitionBuilder};
pub use checkpoint::{CheckpointError, HistoryCheckpoint};
pub use crate::core::{Reservation, ReservationMode, State, Transition};
pub use error::{AccessDenied, LifecycleError, Result};
pub use events::{Event, History, HistoryRegistry, NewEvent};
pub use machine::{StateMachine, Traversal};
pub use storage::{ClusterStorage, EventCodec, ItemPath, MemoryClusterStorage, StorageError};
