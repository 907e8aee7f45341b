//! Persistent storage using RocksDB.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rocksdb::{Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use upline_rank::{Money, RankTable};

use crate::error::{Error, Result};
use crate::model::{
    AggregateDelta, CommissionTransaction, Level, LevelAggregate, NewCommission, Participant,
    ParticipantId, ParticipantStatus, ParticipantSummary, RankUpdate, TotalsDelta,
};
use crate::store::{AncestorUpdate, HierarchyStore};

const PARTICIPANT_PREFIX: &[u8] = b"participant:";
const AGGREGATE_PREFIX: &[u8] = b"aggregate:";
const COMMISSION_PREFIX: &[u8] = b"commission:";
const COMMISSION_SEQ_KEY: &str = "meta:commission_seq";

fn participant_key(id: &ParticipantId) -> String {
    format!("participant:{}", id)
}

fn aggregate_key(id: &ParticipantId, level: Level) -> String {
    format!("aggregate:{}:{}", id, level.get())
}

fn commission_key(seq: u64) -> String {
    // zero-padded so lexical order is append order
    format!("commission:{:020}", seq)
}

/// Hierarchy store backed by RocksDB.
///
/// Values are JSON. Read-modify-write updates take `write_lock`, so
/// increments from concurrent events never lose an update; multi-key
/// updates commit through a single `WriteBatch`.
pub struct RocksStore {
    db: DB,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn write_guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| Error::Storage("write lock poisoned".into()))
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_vec(value)?;
        self.db.put(key.as_bytes(), value)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<(Box<[u8]>, T)>> {
        let mut items = Vec::new();
        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let parsed: T = serde_json::from_slice(&value)?;
            items.push((key, parsed));
        }
        Ok(items)
    }

    fn load_participant(&self, key: &str, id: &ParticipantId) -> Result<Participant> {
        self.get_json(key)?
            .ok_or_else(|| Error::NotFound(format!("participant {}", id)))
    }

    // The staged_* helpers read and compute without writing. Callers hold
    // `write_lock` and commit what they return.

    fn staged_row(
        &self,
        id: &ParticipantId,
        level: Level,
        delta: &AggregateDelta,
    ) -> Result<(String, LevelAggregate)> {
        let key = aggregate_key(id, level);
        let mut row: LevelAggregate = self
            .get_json(&key)?
            .ok_or_else(|| Error::NotFound(format!("aggregate {} {}", id, level)))?;
        row.apply(delta)?;
        Ok((key, row))
    }

    fn staged_totals(
        &self,
        id: &ParticipantId,
        delta: &TotalsDelta,
    ) -> Result<(String, Participant)> {
        let key = participant_key(id);
        let mut participant = self.load_participant(&key, id)?;
        participant.apply_totals(delta)?;
        Ok((key, participant))
    }

    fn staged_transaction(&self, commission: NewCommission) -> Result<CommissionTransaction> {
        let last: u64 = self.get_json(COMMISSION_SEQ_KEY)?.unwrap_or(0);
        Ok(CommissionTransaction::record(commission, last + 1))
    }

    /// Load, mutate and store a participant under the write lock.
    fn update_participant<R>(
        &self,
        id: &ParticipantId,
        f: impl FnOnce(&mut Participant) -> Result<R>,
    ) -> Result<R> {
        let _guard = self.write_guard()?;
        let key = participant_key(id);
        let mut participant = self.load_participant(&key, id)?;
        let out = f(&mut participant)?;
        self.put_json(&key, &participant)?;
        Ok(out)
    }
}

fn batch_json<T: Serialize>(batch: &mut WriteBatch, key: &str, value: &T) -> Result<()> {
    batch.put(key.as_bytes(), serde_json::to_vec(value)?);
    Ok(())
}

fn batch_transaction(batch: &mut WriteBatch, tx: &CommissionTransaction) -> Result<()> {
    batch_json(batch, &commission_key(tx.seq), tx)?;
    batch_json(batch, COMMISSION_SEQ_KEY, &tx.seq)
}

impl HierarchyStore for RocksStore {
    fn get_participant(&self, id: &ParticipantId) -> Result<Option<Participant>> {
        self.get_json(&participant_key(id))
    }

    fn get_parent(&self, id: &ParticipantId) -> Result<Option<ParticipantId>> {
        Ok(self.get_participant(id)?.and_then(|p| p.parent_id))
    }

    fn insert_participant(&self, participant: &Participant) -> Result<()> {
        let _guard = self.write_guard()?;
        let key = participant_key(&participant.id);
        if self.db.get(key.as_bytes())?.is_some() {
            return Err(Error::Duplicate(format!("participant {}", participant.id)));
        }
        self.put_json(&key, participant)
    }

    fn set_status(
        &self,
        id: &ParticipantId,
        status: ParticipantStatus,
    ) -> Result<ParticipantStatus> {
        self.update_participant(id, |p| Ok(std::mem::replace(&mut p.status, status)))
    }

    fn add_invested(&self, id: &ParticipantId, amount: Money) -> Result<Money> {
        self.update_participant(id, |p| {
            p.total_invested = p
                .total_invested
                .checked_add(amount)
                .ok_or_else(|| Error::Overflow(format!("total_invested of {}", p.id)))?;
            Ok(p.total_invested)
        })
    }

    fn get_aggregate_row(
        &self,
        id: &ParticipantId,
        level: Level,
    ) -> Result<Option<LevelAggregate>> {
        self.get_json(&aggregate_key(id, level))
    }

    fn upsert_aggregate_row(
        &self,
        id: &ParticipantId,
        level: Level,
        defaults: &LevelAggregate,
    ) -> Result<bool> {
        let _guard = self.write_guard()?;
        let key = aggregate_key(id, level);
        if self.db.get(key.as_bytes())?.is_some() {
            return Ok(false);
        }
        let mut row = defaults.clone();
        row.participant_id = id.clone();
        row.level = level;
        self.put_json(&key, &row)?;
        Ok(true)
    }

    fn increment_aggregate(
        &self,
        id: &ParticipantId,
        level: Level,
        delta: &AggregateDelta,
    ) -> Result<()> {
        let _guard = self.write_guard()?;
        let (key, row) = self.staged_row(id, level, delta)?;
        self.put_json(&key, &row)
    }

    fn increment_participant_totals(&self, id: &ParticipantId, delta: &TotalsDelta) -> Result<()> {
        let _guard = self.write_guard()?;
        let (key, participant) = self.staged_totals(id, delta)?;
        self.put_json(&key, &participant)
    }

    fn set_rank(&self, id: &ParticipantId, ranks: &RankTable) -> Result<Option<RankUpdate>> {
        let _guard = self.write_guard()?;
        let key = participant_key(id);
        let mut participant = self.load_participant(&key, id)?;
        let update = participant.refresh_rank(ranks);
        if update.is_some() {
            self.put_json(&key, &participant)?;
        }
        Ok(update)
    }

    fn append_commission_transaction(
        &self,
        commission: NewCommission,
    ) -> Result<CommissionTransaction> {
        let _guard = self.write_guard()?;
        let tx = self.staged_transaction(commission)?;
        let mut batch = WriteBatch::default();
        batch_transaction(&mut batch, &tx)?;
        self.db.write(batch)?;
        Ok(tx)
    }

    fn apply_ancestor(
        &self,
        id: &ParticipantId,
        update: AncestorUpdate,
    ) -> Result<Option<CommissionTransaction>> {
        update.check_beneficiary(id)?;
        let _guard = self.write_guard()?;
        let (row_key, row) = self.staged_row(id, update.level, &update.row)?;
        let (totals_key, participant) = self.staged_totals(id, &update.totals)?;
        let tx = update
            .commission
            .map(|c| self.staged_transaction(c))
            .transpose()?;

        let mut batch = WriteBatch::default();
        batch_json(&mut batch, &row_key, &row)?;
        batch_json(&mut batch, &totals_key, &participant)?;
        if let Some(tx) = &tx {
            batch_transaction(&mut batch, tx)?;
        }
        self.db.write(batch)?;
        Ok(tx)
    }

    fn list_all_participants(&self) -> Result<Vec<ParticipantSummary>> {
        // keys sort by id, so the scan is already ordered
        Ok(self
            .scan::<Participant>(PARTICIPANT_PREFIX)?
            .into_iter()
            .map(|(_, p)| p.summary())
            .collect())
    }

    fn list_aggregate_rows(&self, id: &ParticipantId) -> Result<Vec<LevelAggregate>> {
        let mut rows = Vec::new();
        for level in Level::ALL {
            if let Some(row) = self.get_aggregate_row(id, level)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn list_commission_transactions(&self) -> Result<Vec<CommissionTransaction>> {
        Ok(self
            .scan::<CommissionTransaction>(COMMISSION_PREFIX)?
            .into_iter()
            .map(|(_, tx)| tx)
            .collect())
    }

    fn reset_rollups(&self) -> Result<()> {
        let _guard = self.write_guard()?;
        let mut batch = WriteBatch::default();
        for (key, mut row) in self.scan::<LevelAggregate>(AGGREGATE_PREFIX)? {
            row.reset();
            batch.put(key, serde_json::to_vec(&row)?);
        }
        for (key, mut participant) in self.scan::<Participant>(PARTICIPANT_PREFIX)? {
            participant.reset_rollups();
            batch.put(key, serde_json::to_vec(&participant)?);
        }
        self.db.write(batch)?;
        Ok(())
    }
}
