//! In-process store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use upline_rank::{Money, RankTable};

use crate::error::{Error, Result};
use crate::model::{
    AggregateDelta, CommissionTransaction, Level, LevelAggregate, NewCommission, Participant,
    ParticipantId, ParticipantStatus, ParticipantSummary, RankUpdate, TotalsDelta,
};
use crate::store::{AncestorUpdate, HierarchyStore};

#[derive(Debug, Default)]
struct MemoryState {
    participants: HashMap<ParticipantId, Participant>,
    aggregates: BTreeMap<(ParticipantId, Level), LevelAggregate>,
    ledger: Vec<CommissionTransaction>,
}

impl MemoryState {
    fn participant_mut(&mut self, id: &ParticipantId) -> Result<&mut Participant> {
        self.participants
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("participant {}", id)))
    }

    // The staged_* helpers compute new records without touching state, so a
    // caller can validate every part of an update before committing any.

    fn staged_row(
        &self,
        id: &ParticipantId,
        level: Level,
        delta: &AggregateDelta,
    ) -> Result<LevelAggregate> {
        let mut row = self
            .aggregates
            .get(&(id.clone(), level))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("aggregate {} {}", id, level)))?;
        row.apply(delta)?;
        Ok(row)
    }

    fn staged_totals(&self, id: &ParticipantId, delta: &TotalsDelta) -> Result<Participant> {
        let mut participant = self
            .participants
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("participant {}", id)))?;
        participant.apply_totals(delta)?;
        Ok(participant)
    }

    fn staged_transaction(&self, commission: NewCommission) -> CommissionTransaction {
        CommissionTransaction::record(commission, self.ledger.len() as u64 + 1)
    }
}

/// Hierarchy store held in memory.
///
/// Every method runs inside one critical section, which makes each
/// increment an atomic read-modify-write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }
}

impl HierarchyStore for MemoryStore {
    fn get_participant(&self, id: &ParticipantId) -> Result<Option<Participant>> {
        Ok(self.lock()?.participants.get(id).cloned())
    }

    fn get_parent(&self, id: &ParticipantId) -> Result<Option<ParticipantId>> {
        Ok(self
            .lock()?
            .participants
            .get(id)
            .and_then(|p| p.parent_id.clone()))
    }

    fn insert_participant(&self, participant: &Participant) -> Result<()> {
        let mut state = self.lock()?;
        if state.participants.contains_key(&participant.id) {
            return Err(Error::Duplicate(format!("participant {}", participant.id)));
        }
        state
            .participants
            .insert(participant.id.clone(), participant.clone());
        Ok(())
    }

    fn set_status(
        &self,
        id: &ParticipantId,
        status: ParticipantStatus,
    ) -> Result<ParticipantStatus> {
        let mut state = self.lock()?;
        let participant = state.participant_mut(id)?;
        Ok(std::mem::replace(&mut participant.status, status))
    }

    fn add_invested(&self, id: &ParticipantId, amount: Money) -> Result<Money> {
        let mut state = self.lock()?;
        let participant = state.participant_mut(id)?;
        participant.total_invested = participant
            .total_invested
            .checked_add(amount)
            .ok_or_else(|| Error::Overflow(format!("total_invested of {}", id)))?;
        Ok(participant.total_invested)
    }

    fn get_aggregate_row(
        &self,
        id: &ParticipantId,
        level: Level,
    ) -> Result<Option<LevelAggregate>> {
        Ok(self.lock()?.aggregates.get(&(id.clone(), level)).cloned())
    }

    fn upsert_aggregate_row(
        &self,
        id: &ParticipantId,
        level: Level,
        defaults: &LevelAggregate,
    ) -> Result<bool> {
        let mut state = self.lock()?;
        let key = (id.clone(), level);
        if state.aggregates.contains_key(&key) {
            return Ok(false);
        }
        let mut row = defaults.clone();
        row.participant_id = id.clone();
        row.level = level;
        state.aggregates.insert(key, row);
        Ok(true)
    }

    fn increment_aggregate(
        &self,
        id: &ParticipantId,
        level: Level,
        delta: &AggregateDelta,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let row = state.staged_row(id, level, delta)?;
        state.aggregates.insert((id.clone(), level), row);
        Ok(())
    }

    fn increment_participant_totals(&self, id: &ParticipantId, delta: &TotalsDelta) -> Result<()> {
        let mut state = self.lock()?;
        let participant = state.staged_totals(id, delta)?;
        state.participants.insert(id.clone(), participant);
        Ok(())
    }

    fn set_rank(&self, id: &ParticipantId, ranks: &RankTable) -> Result<Option<RankUpdate>> {
        Ok(self.lock()?.participant_mut(id)?.refresh_rank(ranks))
    }

    fn append_commission_transaction(
        &self,
        commission: NewCommission,
    ) -> Result<CommissionTransaction> {
        let mut state = self.lock()?;
        let tx = state.staged_transaction(commission);
        state.ledger.push(tx.clone());
        Ok(tx)
    }

    fn apply_ancestor(
        &self,
        id: &ParticipantId,
        update: AncestorUpdate,
    ) -> Result<Option<CommissionTransaction>> {
        update.check_beneficiary(id)?;
        let mut state = self.lock()?;
        let row = state.staged_row(id, update.level, &update.row)?;
        let participant = state.staged_totals(id, &update.totals)?;
        let tx = update.commission.map(|c| state.staged_transaction(c));

        state.aggregates.insert((id.clone(), update.level), row);
        state.participants.insert(id.clone(), participant);
        if let Some(tx) = &tx {
            state.ledger.push(tx.clone());
        }
        Ok(tx)
    }

    fn list_all_participants(&self) -> Result<Vec<ParticipantSummary>> {
        let state = self.lock()?;
        let mut list: Vec<_> = state.participants.values().map(Participant::summary).collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }

    fn list_aggregate_rows(&self, id: &ParticipantId) -> Result<Vec<LevelAggregate>> {
        let state = self.lock()?;
        Ok(Level::ALL
            .iter()
            .filter_map(|level| state.aggregates.get(&(id.clone(), *level)).cloned())
            .collect())
    }

    fn list_commission_transactions(&self) -> Result<Vec<CommissionTransaction>> {
        Ok(self.lock()?.ledger.clone())
    }

    fn reset_rollups(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.aggregates.values_mut().for_each(LevelAggregate::reset);
        state.participants.values_mut().for_each(Participant::reset_rollups);
        Ok(())
    }
}
