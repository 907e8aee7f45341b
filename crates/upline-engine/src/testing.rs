//! Test fixtures.

use std::collections::HashSet;
use std::sync::Mutex;

use upline_ledger::{
    AggregateDelta, AncestorUpdate, CommissionTransaction, Error, HierarchyStore, Level,
    LevelAggregate, MemoryStore, Money, NewCommission, Participant, ParticipantId,
    ParticipantStatus, ParticipantSummary, RankTable, RankUpdate, Result, TotalsDelta,
};

pub fn pid(s: &str) -> ParticipantId {
    ParticipantId::parse(s).unwrap()
}

/// Insert `ids` as a recruiter chain, each recruiting the next. Names are
/// the upper-cased ids.
pub fn chain<S: HierarchyStore + ?Sized>(store: &S, ids: &[&str]) {
    let mut parent: Option<ParticipantId> = None;
    for id in ids {
        let p = Participant::new(pid(id), id.to_uppercase(), parent.clone());
        store.insert_participant(&p).unwrap();
        parent = Some(pid(id));
    }
}

/// A memory store that fails ancestor updates for chosen participants.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<ParticipantId>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_updates_for(&self, id: ParticipantId) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn check(&self, id: &ParticipantId) -> Result<()> {
        if self.failing.lock().unwrap().contains(id) {
            return Err(Error::Storage(format!("injected failure for {}", id)));
        }
        Ok(())
    }
}

impl HierarchyStore for FlakyStore {
    fn get_participant(&self, id: &ParticipantId) -> Result<Option<Participant>> {
        self.inner.get_participant(id)
    }

    fn get_parent(&self, id: &ParticipantId) -> Result<Option<ParticipantId>> {
        self.inner.get_parent(id)
    }

    fn insert_participant(&self, participant: &Participant) -> Result<()> {
        self.inner.insert_participant(participant)
    }

    fn set_status(
        &self,
        id: &ParticipantId,
        status: ParticipantStatus,
    ) -> Result<ParticipantStatus> {
        self.inner.set_status(id, status)
    }

    fn add_invested(&self, id: &ParticipantId, amount: Money) -> Result<Money> {
        self.inner.add_invested(id, amount)
    }

    fn get_aggregate_row(
        &self,
        id: &ParticipantId,
        level: Level,
    ) -> Result<Option<LevelAggregate>> {
        self.inner.get_aggregate_row(id, level)
    }

    fn upsert_aggregate_row(
        &self,
        id: &ParticipantId,
        level: Level,
        defaults: &LevelAggregate,
    ) -> Result<bool> {
        self.inner.upsert_aggregate_row(id, level, defaults)
    }

    fn increment_aggregate(
        &self,
        id: &ParticipantId,
        level: Level,
        delta: &AggregateDelta,
    ) -> Result<()> {
        self.inner.increment_aggregate(id, level, delta)
    }

    fn increment_participant_totals(&self, id: &ParticipantId, delta: &TotalsDelta) -> Result<()> {
        self.inner.increment_participant_totals(id, delta)
    }

    fn set_rank(&self, id: &ParticipantId, ranks: &RankTable) -> Result<Option<RankUpdate>> {
        self.inner.set_rank(id, ranks)
    }

    fn append_commission_transaction(
        &self,
        commission: NewCommission,
    ) -> Result<CommissionTransaction> {
        self.inner.append_commission_transaction(commission)
    }

    fn apply_ancestor(
        &self,
        id: &ParticipantId,
        update: AncestorUpdate,
    ) -> Result<Option<CommissionTransaction>> {
        self.check(id)?;
        self.inner.apply_ancestor(id, update)
    }

    fn list_all_participants(&self) -> Result<Vec<ParticipantSummary>> {
        self.inner.list_all_participants()
    }

    fn list_aggregate_rows(&self, id: &ParticipantId) -> Result<Vec<LevelAggregate>> {
        self.inner.list_aggregate_rows(id)
    }

    fn list_commission_transactions(&self) -> Result<Vec<CommissionTransaction>> {
        self.inner.list_commission_transactions()
    }

    fn reset_rollups(&self) -> Result<()> {
        self.inner.reset_rollups()
    }
}
