//! Incremental application and full replay agree on every roll-up.

use proptest::prelude::*;
use upline_engine::{Engine, LifecycleEvent, PropagationMode};
use upline_integration_tests::{
    expected_team_volumes, memory_engine, nth, register_forest, rollup_state,
};
use upline_ledger::{HierarchyStore, MemoryStore, Money, ParticipantSummary};

#[derive(Debug, Clone)]
struct History {
    parents: Vec<Option<usize>>,
    active: Vec<bool>,
    /// (participant, minor units), in posting order
    investments: Vec<(usize, u64)>,
}

fn history() -> impl Strategy<Value = History> {
    (2usize..24)
        .prop_flat_map(|n| {
            let parents = (0..n)
                .map(|i| {
                    if i == 0 {
                        Just(None).boxed()
                    } else {
                        prop_oneof![1 => Just(None), 6 => (0..i).prop_map(Some)].boxed()
                    }
                })
                .collect::<Vec<_>>();
            let active = prop::collection::vec(any::<bool>(), n);
            let investments = prop::collection::vec((0..n, 1u64..50_000_000), 0..40);
            (parents, active, investments)
        })
        .prop_map(|(parents, active, investments)| History {
            parents,
            active,
            investments,
        })
}

fn run_live(history: &History) -> Engine<MemoryStore> {
    let engine = memory_engine();
    register_forest(&engine, &history.parents);
    for (i, active) in history.active.iter().enumerate() {
        if *active {
            engine.activate(&nth(i)).unwrap();
        }
    }
    for (i, minor) in &history.investments {
        if history.active[*i] {
            let amount = Money::from_minor(*minor).unwrap();
            engine.post_investment(&nth(*i), amount).unwrap();
        }
    }
    engine
}

proptest! {
    #[test]
    fn replay_converges_to_incremental(history in history()) {
        let engine = run_live(&history);
        let live = rollup_state(engine.store().as_ref());

        let report = engine.reconcile_all().unwrap();
        prop_assert!(report.failures.is_empty());
        prop_assert!(report.drift.is_empty(), "{:?}", report.drift);
        prop_assert_eq!(rollup_state(engine.store().as_ref()), live);

        let audit = engine.audit_ledger().unwrap();
        prop_assert!(audit.is_clean(), "{:?}", audit.mismatches);
    }

    #[test]
    fn team_volume_counts_five_generations_once(history in history()) {
        let engine = run_live(&history);
        engine.reconcile_all().unwrap();

        let invested: Vec<Money> = (0..history.parents.len())
            .map(|i| engine.store().get_participant(&nth(i)).unwrap().unwrap().total_invested)
            .collect();
        let expected = expected_team_volumes(&history.parents, &invested);
        for (id, volume) in expected {
            let p = engine.store().get_participant(&id).unwrap().unwrap();
            prop_assert_eq!(p.team_volume, volume, "{}", id);
            prop_assert_eq!(
                p.rank.as_str(),
                engine.config().ranks.rank_for(p.team_volume).name
            );
        }
    }

    #[test]
    fn replay_order_does_not_matter(history in history()) {
        let forward = run_live(&history);
        let summaries = forward.store().list_all_participants().unwrap();

        let mut reversed = Vec::new();
        replay_into(&forward, summaries.iter().rev(), &mut reversed);
        let mut in_order = Vec::new();
        replay_into(&forward, summaries.iter(), &mut in_order);

        prop_assert_eq!(reversed, in_order);
    }

    #[test]
    fn posting_order_does_not_matter(history in history()) {
        let forward = run_live(&history);
        forward.reconcile_all().unwrap();

        let mut shuffled = history.clone();
        shuffled.investments.reverse();
        let backward = run_live(&shuffled);
        backward.reconcile_all().unwrap();

        prop_assert_eq!(
            rollup_state(backward.store().as_ref()),
            rollup_state(forward.store().as_ref())
        );
    }
}

/// Reset `engine`'s roll-ups, replay `order`, and record the volume side
/// of every participant (commission roll-ups come from the ledger, not
/// from replay).
fn replay_into<'a>(
    engine: &Engine<MemoryStore>,
    order: impl Iterator<Item = &'a ParticipantSummary>,
    out: &mut Vec<(String, Money, u64, u64)>,
) {
    engine.store().reset_rollups().unwrap();
    for summary in order {
        let mut event = LifecycleEvent::new_member().with_investment(summary.total_invested);
        if summary.status.is_active() {
            event = event.with_activation();
        }
        engine.propagate(&summary.id, &event, PropagationMode::Replay);
    }
    for summary in engine.store().list_all_participants().unwrap() {
        let p = engine.store().get_participant(&summary.id).unwrap().unwrap();
        out.push((
            p.id.to_string(),
            p.team_volume,
            p.total_team_members,
            p.total_active_team_members,
        ));
    }
}
