//! Property-based tests for state machine adjudication and the history log.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use ledgerflow::activity::ActivityRecord;
use ledgerflow::agent::{Agent, RoleRegistry};
use ledgerflow::core::{Reservation, State, Transition};
use ledgerflow::error::LifecycleError;
use ledgerflow::events::{History, NewEvent};
use ledgerflow::machine::StateMachine;
use ledgerflow::storage::{EventCodec, ItemPath, MemoryClusterStorage};
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

prop_compose! {
    fn arbitrary_definition()(
        state_ids in btree_set(0..10i32, 1..6),
        endpoints in vec((0..12i32, 0..12i32), 0..8),
        initial in 0..12i32,
    ) -> (BTreeSet<i32>, Vec<(i32, i32)>, i32) {
        (state_ids, endpoints, initial)
    }
}

prop_compose! {
    /// A linear machine `0 -> 1 -> ... -> n-1`, plus a jump back to 0 from
    /// the last state, and an activity sitting in one of its states.
    fn chain_with_position()(len in 2..7i32)(
        len in Just(len),
        position in 0..len,
    ) -> (StateMachine, ActivityRecord) {
        let mut machine = StateMachine::new("Chain", Some(0));
        machine.set_states((0..len).map(|id| State::new(id, format!("S{id}"))).collect());
        let mut transitions: Vec<Transition> = (0..len - 1)
            .map(|id| Transition::new(id, format!("T{id}"), id, id + 1))
            .collect();
        transitions.push(Transition::new(len - 1, "Restart", len - 1, 0));
        machine.set_transitions(transitions);
        machine.set_initial_state_id(0);

        (machine, ActivityRecord::new("Step", position))
    }
}

fn agent_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

proptest! {
    #[test]
    fn validate_reports_unresolved_references((state_ids, endpoints, initial) in arbitrary_definition()) {
        let mut machine = StateMachine::new("Generated", None);
        machine.set_states(state_ids.iter().map(|&id| State::new(id, format!("S{id}"))).collect());
        machine.set_transitions(
            endpoints
                .iter()
                .enumerate()
                .map(|(id, &(origin, target))| Transition::new(id as i32, format!("T{id}"), origin, target))
                .collect(),
        );
        let coherent = machine.set_initial_state_id(initial);

        let expected = state_ids.contains(&initial)
            && endpoints
                .iter()
                .all(|(origin, target)| state_ids.contains(origin) && state_ids.contains(target));

        prop_assert_eq!(coherent, expected);
        prop_assert_eq!(machine.validate(), expected);
        prop_assert_eq!(machine.is_coherent(), expected);
    }

    #[test]
    fn traverse_is_legal_only_from_origin((machine, activity) in chain_with_position()) {
        let agent = Agent::new("anyone");
        let roles = RoleRegistry::new();

        for transition in machine.transitions() {
            let result = machine.traverse(&activity, transition, &agent, &roles);
            if transition.origin_state_id == activity.state_id {
                let traversal = result.unwrap();
                prop_assert_eq!(traversal.target.id(), transition.target_state_id);
                prop_assert_eq!(traversal.performing_role, None);
            } else {
                let is_invalid_transition = matches!(result, Err(LifecycleError::InvalidTransition { .. }));
                prop_assert!(is_invalid_transition);
            }
        }
    }

    #[test]
    fn reservation_follows_finishing_target(finished in any::<bool>(), agent in agent_name()) {
        let mut target = State::new(1, "Next");
        target.set_finished(finished);

        let mut machine = StateMachine::new("Reserve", None);
        machine.set_states(vec![State::new(0, "Start"), target]);
        machine.set_transitions(vec![Transition::new(0, "Go", 0, 1)]);
        prop_assert!(machine.set_initial_state_id(0));

        let mut activity = ActivityRecord::new("Step", 0);
        let traversal = machine
            .traverse_id(&activity, 0, &Agent::new(agent.clone()), &RoleRegistry::new())
            .unwrap();
        activity.apply_reservation(&traversal.reservation);

        if finished {
            prop_assert_eq!(traversal.reservation, Reservation::Clear);
            prop_assert_eq!(activity.agent_name, None);
        } else {
            prop_assert_eq!(traversal.reservation, Reservation::Reserve(agent.clone()));
            prop_assert_eq!(activity.agent_name, Some(agent));
        }
    }

    #[test]
    fn reserved_activity_refuses_other_agents(owner in agent_name(), other in agent_name()) {
        prop_assume!(owner != other);

        let mut machine = StateMachine::new("Owned", None);
        machine.set_states(vec![State::new(0, "Start"), State::new(1, "Next")]);
        let mut overridden = Transition::new(1, "Steal", 0, 1);
        overridden.role_override = Some("Supervisor".to_string());
        machine.set_transitions(vec![Transition::new(0, "Go", 0, 1), overridden]);
        prop_assert!(machine.set_initial_state_id(0));

        let roles = RoleRegistry::with_roles(["Supervisor"]);
        let activity = ActivityRecord::new("Step", 0).reserved_by(owner.clone());
        let agent = Agent::new(other).with_role("Supervisor");

        let refused = machine.traverse_id(&activity, 0, &agent, &roles);
        prop_assert!(matches!(refused, Err(LifecycleError::AccessRights(_))));

        let traversal = machine.traverse_id(&activity, 1, &agent, &roles).unwrap();
        prop_assert_eq!(traversal.performing_role.as_deref(), Some("Supervisor"));

        let owner_traversal = machine.traverse_id(&activity, 0, &Agent::new(owner), &roles);
        prop_assert!(owner_traversal.is_ok());
    }

    #[test]
    fn remove_leaves_events_untouched(count in 1..12usize, any_id in 0..20i32) {
        let mut machine = StateMachine::new("Loop", None);
        machine.set_states(vec![State::new(0, "Only")]);
        machine.set_transitions(vec![Transition::new(0, "Again", 0, 0)]);
        prop_assert!(machine.set_initial_state_id(0));

        let history = History::open(ItemPath::new(), Arc::new(MemoryClusterStorage::new()), EventCodec::Json).unwrap();
        let recorded: Vec<_> = (0..count)
            .map(|_| history.add_event(&machine, NewEvent::new("alice", "Step", "wf/Step", "Elementary", 0)).unwrap())
            .collect();

        prop_assert!(!history.remove(any_id));
        for event in &recorded {
            let id = event.id().unwrap();
            prop_assert!(!history.remove(id));
            let stored = history.get_event(id).unwrap();
            prop_assert_eq!(stored.as_ref(), Some(event));
        }
        prop_assert_eq!(history.len().unwrap(), count);
    }
}
