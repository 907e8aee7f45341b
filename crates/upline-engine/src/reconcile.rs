//! Full recomputation of roll-ups from participant history.
//!
//! Reconciliation zeroes every aggregate row and rolled-up total, then
//! replays each participant's history through the same primitive the live
//! path uses, in [`PropagationMode::Replay`]. Each participant contributes
//! independently, so replay order does not matter.
//!
//! Replay rebuilds counts and volume. Commission roll-ups are then summed
//! back from the ledger, which is never written here, so they always agree
//! with the entries that justify them. [`Engine::audit_ledger`] checks that
//! agreement without changing anything.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{error, info, warn};
use upline_ledger::{
    ensure_level_rows, AggregateDelta, AncestorUpdate, HierarchyStore, Level, LevelAggregate,
    Money, ParticipantId, ParticipantSummary, TotalsDelta, MAX_LEVEL,
};

use crate::engine::Engine;
use crate::error::Result;
use crate::event::LifecycleEvent;
use crate::propagate::PropagationMode;
use crate::rank::RankChange;

/// A rolled-up value that reconciliation changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drift {
    pub participant: ParticipantId,
    /// `team_volume`, `rank`, `L3.count`, ...
    pub field: String,
    pub before: String,
    pub after: String,
}

/// A participant whose replay or re-rank did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileFailure {
    pub participant: ParticipantId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub participants: usize,
    /// Individual facts replayed (registrations, activations, investments)
    pub replayed_events: usize,
    /// Ledger entries folded back into commission roll-ups
    pub ledger_entries: usize,
    pub rank_changes: Vec<RankChange>,
    pub drift: Vec<Drift>,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.drift.is_empty() && self.failures.is_empty()
    }
}

/// An aggregate that disagrees with the commission ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerMismatch {
    pub participant: ParticipantId,
    /// `L2.commission`, `total_team_commission` or `wallet_balance`
    pub field: String,
    pub recorded: Money,
    pub ledger: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerAudit {
    pub transactions: usize,
    pub ledger_total: Money,
    pub mismatches: Vec<LedgerMismatch>,
}

impl LedgerAudit {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

type LevelCounters = (u64, u64, Money, Money);

/// Roll-up state of one participant, for before/after comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    team_volume: Money,
    total_team_members: u64,
    total_active_team_members: u64,
    total_team_commission: Money,
    rank: String,
    /// Missing rows read as zero
    levels: [LevelCounters; MAX_LEVEL as usize],
}

impl Snapshot {
    fn diff(&self, after: &Snapshot, participant: &ParticipantId, out: &mut Vec<Drift>) {
        let mut push = |field: String, before: String, after: String| {
            if before != after {
                out.push(Drift {
                    participant: participant.clone(),
                    field,
                    before,
                    after,
                });
            }
        };

        push("team_volume".into(), self.team_volume.to_string(), after.team_volume.to_string());
        push(
            "total_team_members".into(),
            self.total_team_members.to_string(),
            after.total_team_members.to_string(),
        );
        push(
            "total_active_team_members".into(),
            self.total_active_team_members.to_string(),
            after.total_active_team_members.to_string(),
        );
        push(
            "total_team_commission".into(),
            self.total_team_commission.to_string(),
            after.total_team_commission.to_string(),
        );
        push("rank".into(), self.rank.clone(), after.rank.clone());

        for (level, (b, a)) in Level::ALL.iter().zip(self.levels.iter().zip(after.levels.iter())) {
            push(format!("{}.count", level), b.0.to_string(), a.0.to_string());
            push(format!("{}.active", level), b.1.to_string(), a.1.to_string());
            push(format!("{}.volume", level), b.2.to_string(), a.2.to_string());
            push(format!("{}.commission", level), b.3.to_string(), a.3.to_string());
        }
    }
}

fn replay_event(summary: &ParticipantSummary) -> LifecycleEvent {
    let mut event = LifecycleEvent::new_member().with_investment(summary.total_invested);
    if summary.status.is_active() {
        event = event.with_activation();
    }
    event
}

impl<S: HierarchyStore> Engine<S> {
    /// Rebuild every aggregate from scratch and report what moved.
    ///
    /// Idempotent: a second run over unchanged history reports no drift.
    pub fn reconcile_all(&self) -> Result<ReconcileReport> {
        let store = self.store();
        let participants = store.list_all_participants()?;
        let before = self.snapshots(&participants)?;

        store.reset_rollups()?;
        info!(participants = participants.len(), "roll-ups reset, replaying history");

        let mut report = ReconcileReport {
            participants: participants.len(),
            ..Default::default()
        };

        for summary in &participants {
            let event = replay_event(summary);
            let walk = self.propagate(&summary.id, &event, PropagationMode::Replay);
            report.replayed_events += event.fact_count();
            if let Some(failure) = walk.failure {
                report.failures.push(ReconcileFailure {
                    participant: summary.id.clone(),
                    error: failure.error,
                });
            }
        }

        self.restore_commissions(&mut report)?;

        for summary in &participants {
            match self.update_rank(&summary.id) {
                Ok(Some(change)) => report.rank_changes.push(change),
                Ok(None) => {}
                Err(e) => {
                    error!(participant = %summary.id, error = %e, "re-rank failed");
                    report.failures.push(ReconcileFailure {
                        participant: summary.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let after = self.snapshots(&participants)?;
        for summary in &participants {
            if let (Some(b), Some(a)) = (before.get(&summary.id), after.get(&summary.id)) {
                b.diff(a, &summary.id, &mut report.drift);
            }
        }

        for drift in &report.drift {
            warn!(
                participant = %drift.participant,
                field = %drift.field,
                before = %drift.before,
                after = %drift.after,
                "drift corrected"
            );
        }
        info!(
            participants = report.participants,
            replayed_events = report.replayed_events,
            ledger_entries = report.ledger_entries,
            rank_changes = report.rank_changes.len(),
            drift = report.drift.len(),
            failures = report.failures.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Add the ledger back onto each beneficiary's commission roll-ups.
    fn restore_commissions(&self, report: &mut ReconcileReport) -> Result<()> {
        let store = self.store();
        let ledger = store.list_commission_transactions()?;
        report.ledger_entries = ledger.len();

        let mut per_level: BTreeMap<(ParticipantId, Level), Money> = BTreeMap::new();
        for tx in ledger {
            let slot = per_level.entry((tx.beneficiary, tx.level)).or_default();
            *slot = add(*slot, tx.amount)?;
        }

        for ((beneficiary, level), amount) in per_level {
            if store.get_participant(&beneficiary)?.is_none() {
                // reported by the audit
                warn!(participant = %beneficiary, %level, "ledger beneficiary not registered");
                continue;
            }
            let update = AncestorUpdate {
                level,
                row: AggregateDelta {
                    commission: amount,
                    ..Default::default()
                },
                totals: TotalsDelta {
                    team_commission: amount,
                    ..Default::default()
                },
                commission: None,
            };
            let restored = ensure_level_rows(store.as_ref(), &beneficiary)
                .and_then(|_| store.apply_ancestor(&beneficiary, update));
            if let Err(e) = restored {
                error!(participant = %beneficiary, %level, error = %e, "commission restore failed");
                report.failures.push(ReconcileFailure {
                    participant: beneficiary,
                    error: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Compare commission aggregates and wallets against the ledger.
    ///
    /// Read-only; mismatches are reported, never fixed.
    pub fn audit_ledger(&self) -> Result<LedgerAudit> {
        let store = self.store();
        let ledger = store.list_commission_transactions()?;

        let mut per_level: HashMap<(ParticipantId, Level), Money> = HashMap::new();
        let mut per_beneficiary: HashMap<ParticipantId, Money> = HashMap::new();
        let mut audit = LedgerAudit {
            transactions: ledger.len(),
            ..Default::default()
        };

        for tx in &ledger {
            let slot = per_level.entry((tx.beneficiary.clone(), tx.level)).or_default();
            *slot = add(*slot, tx.amount)?;
            let total = per_beneficiary.entry(tx.beneficiary.clone()).or_default();
            *total = add(*total, tx.amount)?;
            audit.ledger_total = add(audit.ledger_total, tx.amount)?;
        }

        for summary in store.list_all_participants()? {
            let id = summary.id;
            let Some(participant) = store.get_participant(&id)? else {
                continue;
            };
            let rows = store.list_aggregate_rows(&id)?;

            for level in Level::ALL {
                let recorded = rows
                    .iter()
                    .find(|r| r.level == level)
                    .map(|r| r.commission)
                    .unwrap_or_default();
                let expected = per_level.remove(&(id.clone(), level)).unwrap_or_default();
                if recorded != expected {
                    audit.mismatches.push(LedgerMismatch {
                        participant: id.clone(),
                        field: format!("{}.commission", level),
                        recorded,
                        ledger: expected,
                    });
                }
            }

            let expected = per_beneficiary.remove(&id).unwrap_or_default();
            if participant.total_team_commission != expected {
                audit.mismatches.push(LedgerMismatch {
                    participant: id.clone(),
                    field: "total_team_commission".into(),
                    recorded: participant.total_team_commission,
                    ledger: expected,
                });
            }
            if participant.wallet_balance != expected {
                audit.mismatches.push(LedgerMismatch {
                    participant: id.clone(),
                    field: "wallet_balance".into(),
                    recorded: participant.wallet_balance,
                    ledger: expected,
                });
            }
        }

        // entries whose beneficiary is no longer registered
        for (id, amount) in per_beneficiary {
            audit.mismatches.push(LedgerMismatch {
                participant: id,
                field: "wallet_balance".into(),
                recorded: Money::ZERO,
                ledger: amount,
            });
        }

        for m in &audit.mismatches {
            warn!(
                participant = %m.participant,
                field = %m.field,
                recorded = %m.recorded,
                ledger = %m.ledger,
                "ledger mismatch"
            );
        }
        Ok(audit)
    }

    fn snapshots(
        &self,
        participants: &[ParticipantSummary],
    ) -> Result<HashMap<ParticipantId, Snapshot>> {
        let store = self.store();
        let mut out = HashMap::with_capacity(participants.len());
        for summary in participants {
            let Some(p) = store.get_participant(&summary.id)? else {
                continue;
            };
            let mut levels = [(0, 0, Money::ZERO, Money::ZERO); MAX_LEVEL as usize];
            for row in store.list_aggregate_rows(&summary.id)? {
                levels[usize::from(row.level.get() - 1)] = counters(&row);
            }
            out.insert(
                summary.id.clone(),
                Snapshot {
                    team_volume: p.team_volume,
                    total_team_members: p.total_team_members,
                    total_active_team_members: p.total_active_team_members,
                    total_team_commission: p.total_team_commission,
                    rank: p.rank,
                    levels,
                },
            );
        }
        Ok(out)
    }
}

fn counters(row: &LevelAggregate) -> LevelCounters {
    (row.count, row.active, row.volume, row.commission)
}

fn add(a: Money, b: Money) -> upline_ledger::Result<Money> {
    a.checked_add(b)
        .ok_or_else(|| upline_ledger::Error::Overflow("ledger total".into()))
}
