//! Shared fixtures for cross-crate scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use upline_engine::Engine;
use upline_ledger::{
    HierarchyStore, Level, LevelAggregate, MemoryStore, Money, Participant, ParticipantId,
    MAX_LEVEL,
};

pub fn pid(s: &str) -> ParticipantId {
    ParticipantId::parse(s).unwrap()
}

/// Id of the `i`th generated participant.
pub fn nth(i: usize) -> ParticipantId {
    pid(&format!("p{:03}", i))
}

/// An engine over a fresh memory store.
pub fn memory_engine() -> Engine<MemoryStore> {
    Engine::new(Arc::new(MemoryStore::new()))
}

/// Register a forest where `parents[i]` is the recruiter index of
/// participant `i` (always lower than `i`), or `None` for a root.
pub fn register_forest<S: HierarchyStore>(engine: &Engine<S>, parents: &[Option<usize>]) {
    for (i, parent) in parents.iter().enumerate() {
        let p = Participant::new(nth(i), format!("Member {}", i), parent.map(nth));
        engine.register(p).unwrap();
    }
}

/// Team volume of every participant computed directly from the tree:
/// each descendant within five generations counted once.
pub fn expected_team_volumes(
    parents: &[Option<usize>],
    invested: &[Money],
) -> HashMap<ParticipantId, Money> {
    let mut volumes: HashMap<ParticipantId, Money> =
        (0..parents.len()).map(|i| (nth(i), Money::ZERO)).collect();
    for (i, amount) in invested.iter().enumerate() {
        let mut current = parents[i];
        for _ in 0..MAX_LEVEL {
            let Some(ancestor) = current else { break };
            let slot = volumes.entry(nth(ancestor)).or_default();
            *slot = slot.checked_add(*amount).unwrap();
            current = parents[ancestor];
        }
    }
    volumes
}

/// Every roll-up in the store, keyed by participant, for comparing two
/// stores or two points in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupState {
    pub participants: Vec<(ParticipantId, Money, u64, u64, Money, String)>,
    pub rows: Vec<LevelAggregate>,
}

pub fn rollup_state<S: HierarchyStore>(store: &S) -> RollupState {
    let mut participants = Vec::new();
    let mut rows = Vec::new();
    for summary in store.list_all_participants().unwrap() {
        let p = store.get_participant(&summary.id).unwrap().unwrap();
        participants.push((
            p.id.clone(),
            p.team_volume,
            p.total_team_members,
            p.total_active_team_members,
            p.total_team_commission,
            p.rank.clone(),
        ));
        rows.extend(
            store
                .list_aggregate_rows(&summary.id)
                .unwrap()
                .into_iter()
                .filter(|r| !r.is_zero()),
        );
    }
    RollupState { participants, rows }
}

/// A participant's row at `level`, zeroed if it does not exist yet.
pub fn level_row<S: HierarchyStore>(store: &S, id: &ParticipantId, level: u8) -> LevelAggregate {
    let level = Level::new(level).unwrap();
    store
        .get_aggregate_row(id, level)
        .unwrap()
        .unwrap_or_else(|| LevelAggregate::zeroed(id.clone(), level))
}
