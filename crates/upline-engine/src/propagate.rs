//! Upward propagation of life-cycle events.
//!
//! Starting at the participant, walk at most five recruiter links. At each
//! ancestor:
//!
//! 1. ensure its five aggregate rows exist
//! 2. in one atomic store call, add the event's delta to the row for the
//!    current level and to the rolled-up totals, and in live mode credit
//!    the wallet and append the commission ledger entry
//! 3. re-derive the ancestor's rank if its team volume moved (live mode)
//!
//! Each ancestor is an independent unit. A storage failure stops the walk
//! at that ancestor and is reported; nearer ancestors keep their updates,
//! the failing one keeps none, and reconciliation repairs the rest.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, error, warn};
use upline_ledger::{
    ensure_level_rows, AggregateDelta, AncestorUpdate, HierarchyStore, Level, Money, NewCommission,
    ParticipantId, TotalsDelta,
};

use crate::engine::Engine;
use crate::event::LifecycleEvent;

/// What a walk is allowed to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    /// Roll-ups, wallet credit, ledger entries and rank updates
    Live,
    /// Counts and volume only. Ledger entries are write-once facts and
    /// wallet credits are money already paid, so neither is repeated;
    /// commission roll-ups are rebuilt from the ledger and ranks are
    /// re-derived once at the end of reconciliation.
    Replay,
}

impl PropagationMode {
    fn writes_ledger(self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Why a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Nothing to apply
    EmptyEvent,
    /// Reached a participant with no recruiter
    TopOfHierarchy,
    /// Applied all five levels
    DepthLimit,
    /// An ancestor reappeared in its own chain
    CycleDetected,
    /// A store call failed; see [`PropagationReport::failure`]
    StorageFailure,
}

/// Failure at one ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorFailure {
    /// `None` when the parent lookup itself failed
    pub ancestor: Option<ParticipantId>,
    pub level: Level,
    pub error: String,
}

/// Outcome of one walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    pub participant: ParticipantId,
    pub mode: PropagationMode,
    /// Ancestors fully updated, nearest first
    pub ancestors: Vec<ParticipantId>,
    /// Ledger entries appended
    pub commissions: usize,
    pub stop: StopReason,
    pub failure: Option<AncestorFailure>,
}

impl PropagationReport {
    fn new(participant: &ParticipantId, mode: PropagationMode) -> Self {
        Self {
            participant: participant.clone(),
            mode,
            ancestors: Vec::new(),
            commissions: 0,
            stop: StopReason::EmptyEvent,
            failure: None,
        }
    }

    /// True unless a store call failed.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    pub fn levels_reached(&self) -> usize {
        self.ancestors.len()
    }
}

impl<S: HierarchyStore> Engine<S> {
    /// Apply a live event raised by a workflow.
    ///
    /// Fire-and-forget: failures are logged and reported, never returned as
    /// errors, and never undo the workflow write that raised the event.
    pub fn apply_event(
        &self,
        participant: &ParticipantId,
        event: &LifecycleEvent,
    ) -> PropagationReport {
        self.propagate(participant, event, PropagationMode::Live)
    }

    /// Shared per-event primitive for live and replay paths.
    pub fn propagate(
        &self,
        participant: &ParticipantId,
        event: &LifecycleEvent,
        mode: PropagationMode,
    ) -> PropagationReport {
        let mut report = PropagationReport::new(participant, mode);
        if event.is_empty() {
            return report;
        }

        let source_label = if mode.writes_ledger() && !event.invested_amount.is_zero() {
            self.source_label(participant)
        } else {
            String::new()
        };

        let mut visited = HashSet::from([participant.clone()]);
        let mut current = participant.clone();
        report.stop = StopReason::DepthLimit;

        for level in Level::ALL {
            let parent = match self.store().get_parent(&current) {
                Ok(Some(parent)) => parent,
                Ok(None) => {
                    report.stop = StopReason::TopOfHierarchy;
                    break;
                }
                Err(e) => {
                    error!(
                        participant = %participant,
                        at = %current,
                        %level,
                        error = %e,
                        "parent lookup failed"
                    );
                    report.failure = Some(AncestorFailure {
                        ancestor: None,
                        level,
                        error: e.to_string(),
                    });
                    report.stop = StopReason::StorageFailure;
                    break;
                }
            };

            if !visited.insert(parent.clone()) {
                warn!(
                    participant = %participant,
                    ancestor = %parent,
                    %level,
                    "cycle in recruiter chain"
                );
                report.stop = StopReason::CycleDetected;
                break;
            }

            match self.apply_at(&parent, level, participant, &source_label, event, mode) {
                Ok(appended) => {
                    debug!(
                        participant = %participant,
                        ancestor = %parent,
                        %level,
                        ?mode,
                        "applied"
                    );
                    report.commissions += appended;
                    report.ancestors.push(parent.clone());
                }
                Err(e) => {
                    error!(
                        participant = %participant,
                        ancestor = %parent,
                        %level,
                        error = %e,
                        "propagation stopped"
                    );
                    report.failure = Some(AncestorFailure {
                        ancestor: Some(parent),
                        level,
                        error: e.to_string(),
                    });
                    report.stop = StopReason::StorageFailure;
                    break;
                }
            }

            current = parent;
        }

        report
    }

    /// Apply `event` to one ancestor. Returns the ledger entries appended.
    fn apply_at(
        &self,
        ancestor: &ParticipantId,
        level: Level,
        source: &ParticipantId,
        source_label: &str,
        event: &LifecycleEvent,
        mode: PropagationMode,
    ) -> upline_ledger::Result<usize> {
        let store = self.store();
        ensure_level_rows(store.as_ref(), ancestor)?;

        let invested = event.invested_amount;
        let pays = mode.writes_ledger() && !invested.is_zero();
        let commission = if pays {
            self.config().schedule.commission(level, invested)
        } else {
            Money::ZERO
        };

        let update = AncestorUpdate {
            level,
            row: AggregateDelta {
                count: u64::from(event.is_new_member),
                active: u64::from(event.is_activated),
                volume: invested,
                commission,
            },
            totals: TotalsDelta {
                team_members: u64::from(event.is_new_member),
                active_team_members: u64::from(event.is_activated),
                team_volume: invested,
                team_commission: commission,
                wallet: commission,
            },
            commission: pays.then(|| NewCommission {
                beneficiary: ancestor.clone(),
                level,
                source: source.clone(),
                description: format!("Level {} commission from {}", level.get(), source_label),
                amount: commission,
            }),
        };
        let appended = usize::from(store.apply_ancestor(ancestor, update)?.is_some());

        // the cached rank is repaired by reconciliation; a failed refresh
        // must not hide money that was already applied
        if pays {
            if let Err(e) = self.rerank(ancestor) {
                warn!(ancestor = %ancestor, %level, error = %e, "rank refresh failed");
            }
        }

        Ok(appended)
    }

    /// "Name (id)" for ledger descriptions, falling back to the bare id.
    fn source_label(&self, id: &ParticipantId) -> String {
        match self.store().get_participant(id) {
            Ok(Some(p)) => format!("{} ({})", p.name, id),
            Ok(None) => id.to_string(),
            Err(e) => {
                warn!(participant = %id, error = %e, "source lookup failed");
                id.to_string()
            }
        }
    }
}
