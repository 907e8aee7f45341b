//! Upline Engine - Five-Level Propagation and Reconciliation
//!
//! Every participant is recruited by exactly one other. When something
//! happens to a participant (registration, activation, investment), the
//! engine walks up to five recruiter links and credits each ancestor at its
//! relative level.
//!
//! # Two Paths, One Primitive
//!
//! - **Live**: [`Engine::apply_event`] adds deltas to aggregates, credits
//!   wallets and appends one [`CommissionTransaction`](upline_ledger::CommissionTransaction)
//!   per ancestor level on investment.
//! - **Replay**: [`Engine::reconcile_all`] zeroes the roll-ups, pushes
//!   each participant's history through [`Engine::propagate`] in
//!   [`PropagationMode::Replay`] to rebuild counts and volume, then sums
//!   commission roll-ups back from the ledger. The ledger is never written.
//!
//! Because both paths share one primitive and commissions are exact
//! fixed-point, replay converges to exactly what incremental application
//! produced for the same history.
//!
//! # Level Commission Plan
//!
//! | Level | Rate |
//! |---|---|
//! | 1 | 5% |
//! | 2 | 2% |
//! | 3-5 | 0.5% each |
//!
//! # Failure Model
//!
//! Each ancestor update is its own atomic unit: row, totals, wallet and
//! ledger entry land together or not at all. A storage failure stops the
//! walk at that ancestor, is logged, and is returned in the
//! [`PropagationReport`]; the triggering workflow is never rolled back.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use upline_engine::Engine;
//! use upline_ledger::{MemoryStore, Money, Participant, ParticipantId};
//!
//! let engine = Engine::new(Arc::new(MemoryStore::new()));
//! let root = ParticipantId::parse("root").unwrap();
//! let asha = ParticipantId::parse("asha").unwrap();
//!
//! engine.register(Participant::new(root.clone(), "Root", None)).unwrap();
//! engine.register(Participant::new(asha.clone(), "Asha", Some(root.clone()))).unwrap();
//! engine.activate(&asha).unwrap();
//! engine.post_investment(&asha, Money::units(100_000)).unwrap();
//!
//! let report = engine.reconcile_all().unwrap();
//! assert!(report.is_clean());
//! ```

mod config;
mod engine;
mod error;
mod event;
mod propagate;
mod queue;
mod rank;
mod reconcile;
mod schedule;
mod workflow;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use event::LifecycleEvent;
pub use propagate::{AncestorFailure, PropagationMode, PropagationReport, StopReason};
pub use queue::{PropagationQueue, QueueHandle};
pub use rank::RankChange;
pub use reconcile::{Drift, LedgerAudit, LedgerMismatch, ReconcileFailure, ReconcileReport};
pub use schedule::{CommissionSchedule, STANDARD_RATES_BPS};
