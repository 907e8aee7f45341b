//! Hierarchy store contract.
//!
//! The engine reads parent pointers and writes additive deltas; it never
//! holds shared state between events. Every method below is its own atomic
//! unit at the storage layer. One ancestor's share of an event goes through
//! [`HierarchyStore::apply_ancestor`], so its aggregate row, its totals,
//! its wallet and its ledger entry land together or not at all. Nothing
//! spans several ancestors, which is why a multi-level walk can stop part
//! way and leave the roll-ups to reconciliation.

use upline_rank::{Money, RankTable};

use crate::error::{Error, Result};
use crate::model::{
    AggregateDelta, CommissionTransaction, Level, LevelAggregate, NewCommission, Participant,
    ParticipantId, ParticipantStatus, ParticipantSummary, RankUpdate, TotalsDelta,
};

/// Everything one event credits to one ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorUpdate {
    pub level: Level,
    /// Added to the ancestor's row at `level`
    pub row: AggregateDelta,
    /// Added to the ancestor's rolled-up totals and wallet
    pub totals: TotalsDelta,
    /// Ledger entry to append; its beneficiary must be the ancestor
    pub commission: Option<NewCommission>,
}

impl AncestorUpdate {
    /// Reject a commission addressed to someone other than `id`.
    pub fn check_beneficiary(&self, id: &ParticipantId) -> Result<()> {
        match &self.commission {
            Some(c) if c.beneficiary != *id => Err(Error::InvalidInput(format!(
                "commission for {} applied to {}",
                c.beneficiary, id
            ))),
            _ => Ok(()),
        }
    }
}

/// Persistent participant graph with roll-up counters and the commission ledger.
pub trait HierarchyStore: Send + Sync {
    /// Fetch a participant record.
    fn get_participant(&self, id: &ParticipantId) -> Result<Option<Participant>>;

    /// Recruiter of `id`. `None` for the top of the hierarchy and for
    /// unknown ids (orphans).
    fn get_parent(&self, id: &ParticipantId) -> Result<Option<ParticipantId>>;

    /// Insert a new participant. Fails with `Duplicate` if the id exists.
    fn insert_participant(&self, participant: &Participant) -> Result<()>;

    /// Set activation status, returning the status it replaced.
    fn set_status(
        &self,
        id: &ParticipantId,
        status: ParticipantStatus,
    ) -> Result<ParticipantStatus>;

    /// Atomically add to the participant's own invested amount and return
    /// the new total.
    fn add_invested(&self, id: &ParticipantId, amount: Money) -> Result<Money>;

    fn get_aggregate_row(
        &self,
        id: &ParticipantId,
        level: Level,
    ) -> Result<Option<LevelAggregate>>;

    /// Create the row from `defaults` unless it already exists.
    ///
    /// Returns `true` if this call created it. A losing concurrent writer
    /// sees `false`, never an error or a second row.
    fn upsert_aggregate_row(
        &self,
        id: &ParticipantId,
        level: Level,
        defaults: &LevelAggregate,
    ) -> Result<bool>;

    /// Atomically add `delta` to an existing row.
    fn increment_aggregate(
        &self,
        id: &ParticipantId,
        level: Level,
        delta: &AggregateDelta,
    ) -> Result<()>;

    /// Atomically add `delta` to a participant's rolled-up totals.
    fn increment_participant_totals(&self, id: &ParticipantId, delta: &TotalsDelta) -> Result<()>;

    /// Re-derive the cached rank from the team volume read in the same
    /// atomic unit, writing only if it changed.
    ///
    /// Concurrent callers can never leave a rank computed from an older
    /// volume behind a newer one.
    fn set_rank(&self, id: &ParticipantId, ranks: &RankTable) -> Result<Option<RankUpdate>>;

    /// Append a ledger entry; the store assigns id, sequence and timestamp.
    fn append_commission_transaction(
        &self,
        commission: NewCommission,
    ) -> Result<CommissionTransaction>;

    /// Apply one ancestor's row delta, totals delta and optional ledger
    /// entry as a single atomic unit.
    ///
    /// On any error (missing row or participant, overflow, mismatched
    /// beneficiary) nothing is written. Returns the appended entry.
    fn apply_ancestor(
        &self,
        id: &ParticipantId,
        update: AncestorUpdate,
    ) -> Result<Option<CommissionTransaction>>;

    /// Every participant, ordered by id. Each call is a fresh read, so a
    /// job that stops part way can simply start again.
    fn list_all_participants(&self) -> Result<Vec<ParticipantSummary>>;

    /// Every aggregate row of a participant, nearest level first.
    fn list_aggregate_rows(&self, id: &ParticipantId) -> Result<Vec<LevelAggregate>>;

    /// The full ledger in append order.
    fn list_commission_transactions(&self) -> Result<Vec<CommissionTransaction>>;

    /// Zero every aggregate row and every participant's rolled-up totals.
    fn reset_rollups(&self) -> Result<()>;
}

/// Make sure all five aggregate rows of `id` exist.
///
/// Only missing rows are created; existing counters are never touched.
/// Returns how many rows this call created.
pub fn ensure_level_rows<S>(store: &S, id: &ParticipantId) -> Result<usize>
where
    S: HierarchyStore + ?Sized,
{
    let mut created = 0;
    for level in Level::ALL {
        if store.get_aggregate_row(id, level)?.is_some() {
            continue;
        }
        let defaults = LevelAggregate::zeroed(id.clone(), level);
        if store.upsert_aggregate_row(id, level, &defaults)? {
            created += 1;
        }
    }
    if created > 0 {
        tracing::debug!(participant = %id, created, "initialized level aggregates");
    }
    Ok(created)
}

/// Shared conformance checks run against every store implementation.
#[cfg(test)]
pub(crate) mod conformance {
    use super::*;
    use crate::error::Error;

    pub fn pid(s: &str) -> ParticipantId {
        ParticipantId::parse(s).unwrap()
    }

    fn seed<S: HierarchyStore>(store: &S) {
        store.insert_participant(&Participant::new(pid("root"), "Root", None)).unwrap();
        store
            .insert_participant(&Participant::new(pid("a"), "Asha", Some(pid("root"))))
            .unwrap();
    }

    pub fn participants<S: HierarchyStore>(store: &S) {
        seed(store);
        assert_eq!(store.get_parent(&pid("a")).unwrap(), Some(pid("root")));
        assert_eq!(store.get_parent(&pid("root")).unwrap(), None);
        assert_eq!(store.get_parent(&pid("ghost")).unwrap(), None);

        let dup = store.insert_participant(&Participant::new(pid("a"), "Again", None));
        assert!(matches!(dup, Err(Error::Duplicate(_))));

        assert_eq!(
            store.set_status(&pid("a"), ParticipantStatus::Active).unwrap(),
            ParticipantStatus::Inactive
        );
        assert_eq!(
            store.set_status(&pid("a"), ParticipantStatus::Active).unwrap(),
            ParticipantStatus::Active
        );
        assert_eq!(store.add_invested(&pid("a"), Money::units(10)).unwrap(), Money::units(10));
        assert_eq!(store.add_invested(&pid("a"), Money::units(5)).unwrap(), Money::units(15));

        let list = store.list_all_participants().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, pid("a"));
        assert_eq!(list[0].status, ParticipantStatus::Active);
        assert_eq!(list[0].total_invested, Money::units(15));

        assert!(matches!(
            store.set_status(&pid("ghost"), ParticipantStatus::Active),
            Err(Error::NotFound(_))
        ));
    }

    pub fn aggregates<S: HierarchyStore>(store: &S) {
        seed(store);
        let root = pid("root");

        assert_eq!(ensure_level_rows(store, &root).unwrap(), 5);
        assert_eq!(ensure_level_rows(store, &root).unwrap(), 0);

        let delta = AggregateDelta {
            count: 1,
            volume: Money::units(100),
            ..Default::default()
        };
        store.increment_aggregate(&root, Level::FIRST, &delta).unwrap();

        // upsert over an existing row keeps its counters
        let zero = LevelAggregate::zeroed(root.clone(), Level::FIRST);
        assert!(!store.upsert_aggregate_row(&root, Level::FIRST, &zero).unwrap());
        let row = store.get_aggregate_row(&root, Level::FIRST).unwrap().unwrap();
        assert_eq!(row.count, 1);
        assert_eq!(row.volume, Money::units(100));

        let rows = store.list_aggregate_rows(&root).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].level, Level::FIRST);

        assert!(matches!(
            store.increment_aggregate(&pid("a"), Level::FIRST, &delta),
            Err(Error::NotFound(_))
        ));
    }

    pub fn totals_and_reset<S: HierarchyStore>(store: &S) {
        seed(store);
        let root = pid("root");
        ensure_level_rows(store, &root).unwrap();
        store
            .increment_aggregate(
                &root,
                Level::FIRST,
                &AggregateDelta {
                    count: 1,
                    commission: Money::units(5),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .increment_participant_totals(
                &root,
                &TotalsDelta {
                    team_members: 1,
                    team_volume: Money::units(100),
                    team_commission: Money::units(5),
                    wallet: Money::units(5),
                    ..Default::default()
                },
            )
            .unwrap();
        let update = store.set_rank(&root, &RankTable::standard()).unwrap();
        assert_eq!(update, None);

        let p = store.get_participant(&root).unwrap().unwrap();
        assert_eq!(p.total_team_members, 1);
        assert_eq!(p.wallet_balance, Money::units(5));
        assert_eq!(p.rank, "Starter");

        store.reset_rollups().unwrap();
        let p = store.get_participant(&root).unwrap().unwrap();
        assert_eq!(p.total_team_members, 0);
        assert_eq!(p.team_volume, Money::ZERO);
        assert_eq!(p.wallet_balance, Money::units(5));
        assert!(store
            .list_aggregate_rows(&root)
            .unwrap()
            .iter()
            .all(LevelAggregate::is_zero));
        assert_eq!(store.list_aggregate_rows(&root).unwrap().len(), 5);
    }

    pub fn ranks<S: HierarchyStore>(store: &S) {
        seed(store);
        let root = pid("root");
        let ranks = RankTable::standard();

        store
            .increment_participant_totals(
                &root,
                &TotalsDelta {
                    team_volume: Money::units(5_000_000),
                    ..Default::default()
                },
            )
            .unwrap();
        let update = store.set_rank(&root, &ranks).unwrap().unwrap();
        assert_eq!(update.from, "Starter");
        assert_eq!(update.to, "Senior Manager");
        assert_eq!(update.team_volume, Money::units(5_000_000));
        assert_eq!(store.get_participant(&root).unwrap().unwrap().rank, "Senior Manager");
        assert_eq!(store.set_rank(&root, &ranks).unwrap(), None);

        assert!(matches!(store.set_rank(&pid("ghost"), &ranks), Err(Error::NotFound(_))));
    }

    fn investment_update(
        beneficiary: &str,
        level: Level,
        amount: Money,
        rate_bps: u32,
    ) -> AncestorUpdate {
        let commission = amount.share_bps(rate_bps);
        AncestorUpdate {
            level,
            row: AggregateDelta {
                volume: amount,
                commission,
                ..Default::default()
            },
            totals: TotalsDelta {
                team_volume: amount,
                team_commission: commission,
                wallet: commission,
                ..Default::default()
            },
            commission: Some(NewCommission {
                beneficiary: pid(beneficiary),
                level,
                source: pid("a"),
                description: "Level 1 commission from Asha (a)".into(),
                amount: commission,
            }),
        }
    }

    pub fn ancestor_updates<S: HierarchyStore>(store: &S) {
        seed(store);
        let root = pid("root");
        ensure_level_rows(store, &root).unwrap();

        let paid = investment_update("root", Level::FIRST, Money::units(1_000), 500);
        let tx = store
            .apply_ancestor(&root, paid)
            .unwrap()
            .unwrap();
        assert_eq!(tx.beneficiary, root);
        assert_eq!(tx.amount, Money::units(50));

        let row = store.get_aggregate_row(&root, Level::FIRST).unwrap().unwrap();
        assert_eq!(row.volume, Money::units(1_000));
        assert_eq!(row.commission, Money::units(50));
        let p = store.get_participant(&root).unwrap().unwrap();
        assert_eq!(p.team_volume, Money::units(1_000));
        assert_eq!(p.total_team_commission, Money::units(50));
        assert_eq!(p.wallet_balance, Money::units(50));
        assert_eq!(store.list_commission_transactions().unwrap(), vec![tx.clone()]);

        // without a ledger entry only the roll-ups move
        let counted = AncestorUpdate {
            level: Level::FIRST,
            row: AggregateDelta {
                count: 1,
                ..Default::default()
            },
            totals: TotalsDelta {
                team_members: 1,
                ..Default::default()
            },
            commission: None,
        };
        assert_eq!(store.apply_ancestor(&root, counted).unwrap(), None);
        assert_eq!(store.get_aggregate_row(&root, Level::FIRST).unwrap().unwrap().count, 1);
        assert_eq!(store.list_commission_transactions().unwrap().len(), 1);

        // a has no rows yet: nothing may be written, ledger included
        let before = store.get_participant(&pid("a")).unwrap().unwrap();
        let small = investment_update("a", Level::FIRST, Money::units(10), 500);
        assert!(matches!(
            store.apply_ancestor(&pid("a"), small.clone()),
            Err(Error::NotFound(_))
        ));
        assert_eq!(store.get_participant(&pid("a")).unwrap().unwrap(), before);
        assert_eq!(store.list_commission_transactions().unwrap().len(), 1);

        // an entry addressed to another participant is refused
        assert!(matches!(
            store.apply_ancestor(&root, small),
            Err(Error::InvalidInput(_))
        ));

        // overflow in the totals leaves the row and the ledger alone
        let max = Money::from_micros(u64::MAX);
        let huge = investment_update("root", Level::new(2).unwrap(), max, 0);
        assert!(matches!(store.apply_ancestor(&root, huge), Err(Error::Overflow(_))));
        assert!(store.get_aggregate_row(&root, Level::new(2).unwrap()).unwrap().unwrap().is_zero());
        assert_eq!(store.list_commission_transactions().unwrap().len(), 1);

        // sequence numbers continue across both append paths
        let next = store
            .apply_ancestor(&root, investment_update("root", Level::FIRST, Money::units(100), 500))
            .unwrap()
            .unwrap();
        assert_eq!(next.seq, tx.seq + 1);
    }

    pub fn ledger<S: HierarchyStore>(store: &S) {
        seed(store);
        let first = store
            .append_commission_transaction(NewCommission {
                beneficiary: pid("root"),
                level: Level::FIRST,
                source: pid("a"),
                description: "Level 1 commission from Asha (a)".into(),
                amount: Money::units(5),
            })
            .unwrap();
        let second = store
            .append_commission_transaction(NewCommission {
                beneficiary: pid("root"),
                level: Level::FIRST,
                source: pid("a"),
                description: "Level 1 commission from Asha (a)".into(),
                amount: Money::units(7),
            })
            .unwrap();
        assert!(second.seq > first.seq);
        assert_ne!(first.id, second.id);

        let all = store.list_commission_transactions().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
        assert_eq!(all[1].amount, Money::units(7));
    }
}
