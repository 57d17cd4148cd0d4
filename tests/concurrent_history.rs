//! Concurrent appends to one history.

use ledgerflow::builder::{StateMachineBuilder, TransitionBuilder};
use ledgerflow::events::{HistoryRegistry, NewEvent};
use ledgerflow::storage::{EventCodec, ItemPath, MemoryClusterStorage};
use std::collections::BTreeSet;
use std::sync::Arc;

const WRITERS: usize = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_appends_receive_dense_ids() {
    let machine = Arc::new(
        StateMachineBuilder::new("Default")
            .state("Open")
            .initial("Open")
            .transition(TransitionBuilder::new("Note").from("Open").to("Open"))
            .build()
            .unwrap(),
    );
    let registry = Arc::new(HistoryRegistry::new(
        Arc::new(MemoryClusterStorage::new()),
        EventCodec::Json,
    ));
    let item = ItemPath::new();

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let machine = Arc::clone(&machine);
            let registry = Arc::clone(&registry);
            tokio::task::spawn_blocking(move || {
                let history = registry.history(&item).unwrap();
                let event = history
                    .add_event(
                        &machine,
                        NewEvent::new(format!("agent{writer}"), "Log", "wf/Log", "Elementary", 0),
                    )
                    .unwrap();
                (event.id().unwrap(), event)
            })
        })
        .collect();

    let mut assigned = Vec::with_capacity(WRITERS);
    for handle in handles {
        assigned.push(handle.await.unwrap());
    }

    let ids: BTreeSet<i32> = assigned.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids.len(), WRITERS);
    assert_eq!(ids, (0..WRITERS as i32).collect::<BTreeSet<_>>());

    let history = registry.history(&item).unwrap();
    assert_eq!(history.last_id().unwrap(), WRITERS as i32 - 1);
    for (id, event) in &assigned {
        assert_eq!(history.get_event(*id).unwrap().as_ref(), Some(event));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn items_do_not_share_sequences() {
    let machine = Arc::new(
        StateMachineBuilder::new("Default")
            .state("Open")
            .initial("Open")
            .transition(TransitionBuilder::new("Note").from("Open").to("Open"))
            .build()
            .unwrap(),
    );
    let registry = Arc::new(HistoryRegistry::new(
        Arc::new(MemoryClusterStorage::new()),
        EventCodec::Binary,
    ));
    let items: Vec<ItemPath> = (0..4).map(|_| ItemPath::new()).collect();

    let handles: Vec<_> = items
        .iter()
        .flat_map(|item| std::iter::repeat(*item).take(10))
        .map(|item| {
            let machine = Arc::clone(&machine);
            let registry = Arc::clone(&registry);
            tokio::task::spawn_blocking(move || {
                registry
                    .history(&item)
                    .unwrap()
                    .add_event(&machine, NewEvent::new("alice", "Log", "wf/Log", "Elementary", 0))
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    for item in &items {
        let history = registry.history(item).unwrap();
        let ids: Vec<i32> = history.events().unwrap().iter().filter_map(|e| e.id()).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
        assert!(history.events().unwrap().iter().all(|e| e.item() == item));
    }
}
