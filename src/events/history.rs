//! Append-only event log of an item.

use super::event::{Event, NewEvent};
use crate::error::{LifecycleError, Result};
use crate::machine::StateMachine;
use crate::storage::{ClusterStorage, ClusterType, EventCodec, ItemPath, StorageError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, trace, warn};

/// The ordered, append-only history of one item.
///
/// Events are stored under `AuditTrail/<id>` with ids assigned densely from
/// 0. Appends are serialized per history: concurrent callers each receive a
/// distinct id and no id is skipped. Stored events cannot be removed.
///
/// # Example
///
/// ```rust
/// use ledgerflow::builder::{StateMachineBuilder, TransitionBuilder};
/// use ledgerflow::events::{History, NewEvent};
/// use ledgerflow::storage::{EventCodec, ItemPath, MemoryClusterStorage};
/// use std::sync::Arc;
///
/// let machine = StateMachineBuilder::new("Default")
///     .state("Waiting")
///     .finished_state("Done")
///     .initial("Waiting")
///     .transition(TransitionBuilder::new("Complete").from("Waiting").to("Done"))
///     .build()
///     .unwrap();
///
/// let storage = Arc::new(MemoryClusterStorage::new());
/// let history = History::open(ItemPath::new(), storage, EventCodec::Json).unwrap();
///
/// let event = history
///     .add_event(&machine, NewEvent::new("alice", "Review", "wf/Review", "Elementary", 0))
///     .unwrap();
///
/// assert_eq!(event.id(), Some(0));
/// assert_eq!(history.current_state_id().unwrap(), Some(1));
/// ```
pub struct History {
    item: ItemPath,
    storage: Arc<dyn ClusterStorage>,
    codec: EventCodec,
    last_id: Mutex<i32>,
}

impl History {
    /// Open the history of `item`, deriving the last assigned id from the
    /// keys already in storage.
    pub fn open(item: ItemPath, storage: Arc<dyn ClusterStorage>, codec: EventCodec) -> Result<Self> {
        let last_id = stored_ids(&item, storage.as_ref())?
            .into_iter()
            .max()
            .unwrap_or(-1);
        debug!(item = %item, last_id, storage = storage.name(), "opened history");

        Ok(Self {
            item,
            storage,
            codec,
            last_id: Mutex::new(last_id),
        })
    }

    /// The item this history belongs to.
    pub fn item(&self) -> &ItemPath {
        &self.item
    }

    /// Encoding used for stored events.
    pub fn codec(&self) -> EventCodec {
        self.codec
    }

    /// Highest id assigned so far, or -1 for an empty history.
    pub fn last_id(&self) -> Result<i32> {
        Ok(*self.last_id.lock().map_err(|_| StorageError::Poisoned)?)
    }

    /// Number of events recorded, derived from the last assigned id.
    pub fn len(&self) -> Result<usize> {
        Ok((i64::from(self.last_id()?) + 1) as usize)
    }

    /// True until the first event is recorded.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.last_id()? < 0)
    }

    /// Mint an event for `new_event`, assign it the next id and store it.
    ///
    /// When storage fails the id is not consumed and the error is returned
    /// as `Persistency`.
    pub fn add_event(&self, machine: &StateMachine, new_event: NewEvent) -> Result<Event> {
        let mut event = Event::new(self.item, machine, new_event)?;

        let mut last_id = self.last_id.lock().map_err(|_| StorageError::Poisoned)?;
        let id = last_id.checked_add(1).ok_or_else(|| {
            LifecycleError::InvalidData(format!("History of {} has no ids left after {}", self.item, *last_id))
        })?;
        event.assign_id(id);
        self.store(id, &event)?;
        *last_id = id;

        debug!(
            item = %self.item,
            id,
            transition = event.transition_id(),
            agent = %event.agent_key(),
            "recorded event"
        );
        Ok(event)
    }

    /// The event stored under `id`, if any.
    pub fn get_event(&self, id: i32) -> Result<Option<Event>> {
        let path = ClusterType::AuditTrail.path(&id.to_string());
        let Some(bytes) = self.storage.get(&self.item, &path)? else {
            return Ok(None);
        };
        let mut event: Event = self.codec.decode(&path, &bytes)?;
        event.set_name(&id.to_string());

        if event.id() != Some(id) {
            return Err(LifecycleError::InvalidData(format!(
                "Event stored at {path} carries id {:?}",
                event.id()
            )));
        }
        Ok(Some(event))
    }

    /// Events can never be removed. Always returns false.
    pub fn remove(&self, id: i32) -> bool {
        warn!(item = %self.item, id, "refusing to remove event from history");
        false
    }

    /// All stored events, ordered by id.
    pub fn events(&self) -> Result<Vec<Event>> {
        let mut ids = stored_ids(&self.item, self.storage.as_ref())?;
        ids.sort_unstable();

        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(event) = self.get_event(id)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// The most recently recorded event.
    pub fn last_event(&self) -> Result<Option<Event>> {
        let last_id = self.last_id()?;
        if last_id < 0 {
            return Ok(None);
        }
        self.get_event(last_id)
    }

    /// Target state of the most recent event.
    pub fn current_state_id(&self) -> Result<Option<i32>> {
        Ok(self.last_event()?.map(|event| event.target_state_id()))
    }

    /// Write previously recorded events into an empty history, keeping
    /// their ids.
    pub(crate) fn restore(&self, events: &[Event]) -> Result<()> {
        let mut last_id = self.last_id.lock().map_err(|_| StorageError::Poisoned)?;
        if *last_id >= 0 {
            return Err(LifecycleError::InvalidData(format!(
                "History of {} already holds {} events",
                self.item,
                *last_id + 1
            )));
        }

        for (expected, event) in (0..).zip(events) {
            if event.id() != Some(expected) {
                return Err(LifecycleError::InvalidData(format!(
                    "Expected event {expected}, found {:?}",
                    event.id()
                )));
            }
            let mut event = event.clone();
            event.move_to(self.item);
            self.store(expected, &event)?;
            *last_id = expected;
        }

        debug!(item = %self.item, events = events.len(), "restored history");
        Ok(())
    }

    fn store(&self, id: i32, event: &Event) -> Result<()> {
        let path = ClusterType::AuditTrail.path(&id.to_string());
        let bytes = self.codec.encode(event)?;
        self.storage.put(&self.item, &path, bytes)?;
        trace!(item = %self.item, path = %path, "stored event");
        Ok(())
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("item", &self.item)
            .field("storage", &self.storage.name())
            .field("codec", &self.codec)
            .field("last_id", &self.last_id)
            .finish()
    }
}

fn stored_ids(item: &ItemPath, storage: &dyn ClusterStorage) -> Result<Vec<i32>> {
    let children = storage.list_children(item, ClusterType::AuditTrail.as_str())?;
    Ok(children
        .into_iter()
        .filter_map(|name| match name.parse::<i32>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(item = %item, name = %name, "ignoring non-numeric history entry");
                None
            }
        })
        .collect())
}

/// Opens histories on demand, one per item, over shared storage.
pub struct HistoryRegistry {
    storage: Arc<dyn ClusterStorage>,
    codec: EventCodec,
    histories: RwLock<HashMap<ItemPath, Arc<History>>>,
}

impl HistoryRegistry {
    pub fn new(storage: Arc<dyn ClusterStorage>, codec: EventCodec) -> Self {
        Self {
            storage,
            codec,
            histories: RwLock::new(HashMap::new()),
        }
    }

    /// The history of `item`. Every caller asking for the same item shares
    /// one instance, and so one id sequence.
    pub fn history(&self, item: &ItemPath) -> Result<Arc<History>> {
        if let Some(history) = self
            .histories
            .read()
            .map_err(|_| StorageError::Poisoned)?
            .get(item)
        {
            return Ok(Arc::clone(history));
        }

        let mut histories = self.histories.write().map_err(|_| StorageError::Poisoned)?;
        if let Some(history) = histories.get(item) {
            return Ok(Arc::clone(history));
        }
        let history = Arc::new(History::open(*item, Arc::clone(&self.storage), self.codec)?);
        histories.insert(*item, Arc::clone(&history));
        Ok(history)
    }

    pub fn storage(&self) -> &Arc<dyn ClusterStorage> {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateMachineBuilder, TransitionBuilder};
    use crate::events::OutcomeDetails;
    use crate::storage::MemoryClusterStorage;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn machine() -> StateMachine {
        StateMachineBuilder::new("Default")
            .state("Waiting")
            .state("Started")
            .finished_state("Finished")
            .initial("Waiting")
            .transition(TransitionBuilder::new("Start").from("Waiting").to("Started"))
            .transition(TransitionBuilder::new("Complete").from("Started").to("Finished"))
            .build()
            .unwrap()
    }

    fn request(transition_id: i32) -> NewEvent {
        NewEvent::new("alice", "Review", "workflow/Review", "ElementaryActivity", transition_id)
    }

    /// Memory storage whose writes can be made to fail.
    struct FlakyStorage {
        inner: MemoryClusterStorage,
        failing: AtomicBool,
    }

    impl FlakyStorage {
        fn new() -> Self {
            Self {
                inner: MemoryClusterStorage::new(),
                failing: AtomicBool::new(false),
            }
        }
    }

    impl ClusterStorage for FlakyStorage {
        fn name(&self) -> &str {
            "Flaky"
        }

        fn get(&self, item: &ItemPath, path: &str) -> std::result::Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(item, path)
        }

        fn put(&self, item: &ItemPath, path: &str, value: Vec<u8>) -> std::result::Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Backend {
                    storage: self.name().to_string(),
                    path: path.to_string(),
                    message: "disk full".to_string(),
                });
            }
            self.inner.put(item, path, value)
        }

        fn delete(&self, item: &ItemPath, path: &str) -> std::result::Result<(), StorageError> {
            self.inner.delete(item, path)
        }

        fn list_children(
            &self,
            item: &ItemPath,
            path: &str,
        ) -> std::result::Result<BTreeSet<String>, StorageError> {
            self.inner.list_children(item, path)
        }
    }

    #[test]
    fn empty_history() {
        let history =
            History::open(ItemPath::new(), Arc::new(MemoryClusterStorage::new()), EventCodec::Json).unwrap();

        assert_eq!(history.last_id().unwrap(), -1);
        assert!(history.is_empty().unwrap());
        assert_eq!(history.len().unwrap(), 0);
        assert!(history.events().unwrap().is_empty());
        assert!(history.last_event().unwrap().is_none());
        assert_eq!(history.current_state_id().unwrap(), None);
        assert!(history.get_event(0).unwrap().is_none());
    }

    #[test]
    fn ids_are_assigned_densely_from_zero() {
        let history =
            History::open(ItemPath::new(), Arc::new(MemoryClusterStorage::new()), EventCodec::Json).unwrap();
        let machine = machine();

        let first = history.add_event(&machine, request(0)).unwrap();
        let second = history.add_event(&machine, request(1)).unwrap();

        assert_eq!(first.id(), Some(0));
        assert_eq!(second.id(), Some(1));
        assert_eq!(history.last_id().unwrap(), 1);
        assert_eq!(history.len().unwrap(), 2);
        assert_eq!(history.current_state_id().unwrap(), Some(2));
        assert_eq!(history.get_event(0).unwrap(), Some(first));
    }

    #[test]
    fn reopening_continues_after_highest_stored_id() {
        let storage: Arc<dyn ClusterStorage> = Arc::new(MemoryClusterStorage::new());
        let item = ItemPath::new();
        let machine = machine();

        let history = History::open(item, Arc::clone(&storage), EventCodec::Json).unwrap();
        history.add_event(&machine, request(0)).unwrap();
        history.add_event(&machine, request(1)).unwrap();
        storage
            .put(&item, &ClusterType::AuditTrail.path("notes"), b"ignored".to_vec())
            .unwrap();

        let reopened = History::open(item, storage, EventCodec::Json).unwrap();
        assert_eq!(reopened.last_id().unwrap(), 1);
        let third = reopened.add_event(&machine, request(1)).unwrap();
        assert_eq!(third.id(), Some(2));

        let ids: Vec<_> = reopened.events().unwrap().iter().filter_map(Event::id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn remove_never_deletes() {
        let history =
            History::open(ItemPath::new(), Arc::new(MemoryClusterStorage::new()), EventCodec::Json).unwrap();
        let event = history.add_event(&machine(), request(0)).unwrap();

        assert!(!history.remove(0));
        assert!(!history.remove(7));
        assert_eq!(history.get_event(0).unwrap(), Some(event));
        assert_eq!(history.len().unwrap(), 1);
    }

    #[test]
    fn exhausted_ids_are_refused_without_poisoning() {
        let storage: Arc<dyn ClusterStorage> = Arc::new(MemoryClusterStorage::new());
        let item = ItemPath::new();
        storage
            .put(&item, &ClusterType::AuditTrail.path(&i32::MAX.to_string()), b"{}".to_vec())
            .unwrap();

        let history = History::open(item, storage, EventCodec::Json).unwrap();
        assert_eq!(history.last_id().unwrap(), i32::MAX);

        let err = history.add_event(&machine(), request(0)).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidData(_)));

        assert_eq!(history.last_id().unwrap(), i32::MAX);
        assert_eq!(history.len().unwrap(), i32::MAX as usize + 1);
        assert!(matches!(
            history.add_event(&machine(), request(0)),
            Err(LifecycleError::InvalidData(_))
        ));
    }

    #[test]
    fn failed_write_does_not_consume_id() {
        let storage = Arc::new(FlakyStorage::new());
        let history = History::open(ItemPath::new(), storage.clone(), EventCodec::Json).unwrap();
        let machine = machine();

        history.add_event(&machine, request(0)).unwrap();

        storage.failing.store(true, Ordering::SeqCst);
        let err = history.add_event(&machine, request(1)).unwrap_err();
        assert!(matches!(err, LifecycleError::Persistency(StorageError::Backend { .. })));
        assert_eq!(history.last_id().unwrap(), 0);

        storage.failing.store(false, Ordering::SeqCst);
        let retried = history.add_event(&machine, request(1)).unwrap();
        assert_eq!(retried.id(), Some(1));
    }

    #[test]
    fn unknown_transition_records_nothing() {
        let history =
            History::open(ItemPath::new(), Arc::new(MemoryClusterStorage::new()), EventCodec::Json).unwrap();

        assert!(matches!(
            history.add_event(&machine(), request(42)),
            Err(LifecycleError::ObjectNotFound(_))
        ));
        assert!(history.is_empty().unwrap());
    }

    #[test]
    fn binary_codec_round_trips_events() {
        let history =
            History::open(ItemPath::new(), Arc::new(MemoryClusterStorage::new()), EventCodec::Binary).unwrap();
        let stored = history
            .add_event(
                &machine(),
                request(0)
                    .with_delegate("bob")
                    .with_outcome(OutcomeDetails::new("Report", 1))
                    .at("2021-06-01 10:00:00"),
            )
            .unwrap();

        let loaded = history.get_event(0).unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.view_name(), Some("last"));
        assert_eq!(loaded.agent_key(), "alice:bob");
    }

    #[test]
    fn corrupt_entry_is_a_persistency_error() {
        let storage: Arc<dyn ClusterStorage> = Arc::new(MemoryClusterStorage::new());
        let item = ItemPath::new();
        storage
            .put(&item, &ClusterType::AuditTrail.path("0"), b"{not json".to_vec())
            .unwrap();

        let history = History::open(item, storage, EventCodec::Json).unwrap();
        assert!(matches!(
            history.get_event(0),
            Err(LifecycleError::Persistency(StorageError::Decode { .. }))
        ));
    }

    #[test]
    fn registry_shares_one_history_per_item() {
        let registry = HistoryRegistry::new(Arc::new(MemoryClusterStorage::new()), EventCodec::Json);
        let item = ItemPath::new();

        let a = registry.history(&item).unwrap();
        let b = registry.history(&item).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let other = registry.history(&ItemPath::new()).unwrap();
        assert!(!Arc::ptr_eq(&a, &other));

        a.add_event(&machine(), request(0)).unwrap();
        assert_eq!(b.last_id().unwrap(), 0);
        assert!(other.is_empty().unwrap());
    }
}
