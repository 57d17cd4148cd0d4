//! Review Activity Lifecycle
//!
//! This example walks one activity through a small review lifecycle and
//! records every performed transition in the item's history.
//!
//! Key concepts:
//! - Coherent state machines built from names (Waiting -> Started -> Finished)
//! - Listing what an agent may do vs. asking to do one specific thing
//! - Reservations lock the activity to the agent who started it
//! - History assigns event ids 0, 1, 2, ... and survives reopening
//!
//! Run with: cargo run --example review_lifecycle

use ledgerflow::activity::ActivityRecord;
use ledgerflow::agent::{Agent, RoleRegistry};
use ledgerflow::builder::{StateMachineBuilder, TransitionBuilder};
use ledgerflow::checkpoint::HistoryCheckpoint;
use ledgerflow::events::{History, NewEvent, OutcomeDetails};
use ledgerflow::machine::{StateMachine, Traversal};
use ledgerflow::storage::{ClusterStorage, EventCodec, ItemPath, MemoryClusterStorage};
use std::sync::Arc;

fn review_machine() -> Result<StateMachine, Box<dyn std::error::Error>> {
    Ok(StateMachineBuilder::new("Default")
        .version(0)
        .state("Waiting")
        .state("Started")
        .finished_state("Finished")
        .initial("Waiting")
        .transition(TransitionBuilder::new("Start").from("Waiting").to("Started"))
        .transition(
            TransitionBuilder::new("Complete")
                .from("Started")
                .to("Finished")
                .outcome("ReviewReport", "0"),
        )
        .transition(
            TransitionBuilder::new("Skip")
                .from("Waiting")
                .to("Finished")
                .enabled_by("Skippable"),
        )
        .build()?)
}

fn perform(
    machine: &StateMachine,
    history: &History,
    activity: &mut ActivityRecord,
    traversal: &Traversal,
    agent: &Agent,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut new_event = NewEvent::new(
        agent.name(),
        activity.name.clone(),
        format!("workflow/{}", activity.name),
        "ElementaryActivity",
        traversal.transition_id,
    );
    if let Some(role) = &traversal.performing_role {
        new_event = new_event.with_role(role.clone());
    }
    if let Some(transition) = machine.transition(traversal.transition_id) {
        if let Some(outcome) = transition.outcome_ref(|name| activity.properties.get(name).cloned())? {
            new_event = new_event.with_outcome(OutcomeDetails::new(outcome.name, outcome.version));
        }
    }

    let event = history.add_event(machine, new_event)?;
    activity.enter(&traversal.target);
    activity.apply_reservation(&traversal.reservation);

    println!(
        "  event {} at {}: {} -> state {} (reservation {:?})",
        event.id().unwrap_or(-1),
        event.time_string(),
        event.agent_key(),
        traversal.target,
        activity.agent_name
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Review Activity Lifecycle ===\n");

    let machine = review_machine()?;
    let roles = RoleRegistry::with_roles(["Worker", "Admin"]);
    let alice = Agent::new("alice").with_role("Worker");
    let bob = Agent::new("bob").with_role("Worker");

    let storage: Arc<dyn ClusterStorage> = Arc::new(MemoryClusterStorage::new());
    let item = ItemPath::new();
    let history = History::open(item, Arc::clone(&storage), EventCodec::Json)?;
    let mut activity = ActivityRecord::new("Review", 0).with_role("Worker");

    println!("Offered to alice in Waiting:");
    for (transition, role) in machine.possible_transitions(&activity, &alice, &roles)? {
        println!("  {transition} as {role:?}");
    }

    println!("\nalice starts the review:");
    let start = machine.traverse_id(&activity, machine.valid_transition_id("Start")?, &alice, &roles)?;
    perform(&machine, &history, &mut activity, &start, &alice)?;

    println!("\nbob tries to complete it:");
    let complete_id = machine.valid_transition_id("Complete")?;
    match machine.traverse_id(&activity, complete_id, &bob, &roles) {
        Ok(_) => println!("  unexpectedly allowed"),
        Err(e) => println!("  refused: {e}"),
    }

    println!("\nalice completes it:");
    let complete = machine.traverse_id(&activity, complete_id, &alice, &roles)?;
    perform(&machine, &history, &mut activity, &complete, &alice)?;

    println!("\nalice tries to complete it again:");
    if let Err(e) = machine.traverse_id(&activity, complete_id, &alice, &roles) {
        println!("  refused: {e}");
    }

    println!("\nRemoving event 0 is a no-op: {}", history.remove(0));

    let reopened = History::open(item, storage, EventCodec::Json)?;
    println!(
        "Reopened history: {} events, current state {:?}",
        reopened.len()?,
        reopened.current_state_id()?
    );

    let checkpoint = HistoryCheckpoint::capture(&reopened)?;
    println!("\nCheckpoint {} holds {} events", checkpoint.id, checkpoint.events.len());

    println!("\nKey takeaways:");
    println!("- traverse only decides; recording the event is a separate step");
    println!("- a reservation keeps other agents out until it is cleared");
    println!("- history ids are dense and events are never removed");
    Ok(())
}
