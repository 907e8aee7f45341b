//! Upline Ledger
//!
//! Storage contract and data model for the referral hierarchy.
//!
//! # Architecture
//!
//! - **Models**: [`Participant`], [`LevelAggregate`], [`CommissionTransaction`]
//! - **Store contract**: [`HierarchyStore`], the only way the engine touches
//!   persistent state. Writes are additive deltas applied atomically by the
//!   store, one ancestor at a time through [`HierarchyStore::apply_ancestor`].
//! - **Backends**: [`MemoryStore`] for tests and embedding, [`RocksStore`]
//!   for a persistent data directory
//!
//! Aggregate rows are created lazily through [`ensure_level_rows`], which
//! only inserts missing levels.

pub mod error;
pub mod memory;
pub mod model;
pub mod rocks;
pub mod store;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use model::{
    AggregateDelta, CommissionTransaction, Level, LevelAggregate, NewCommission, Participant,
    ParticipantId, ParticipantStatus, ParticipantSummary, RankUpdate, TotalsDelta, MAX_LEVEL,
};
pub use rocks::RocksStore;
pub use store::{ensure_level_rows, AncestorUpdate, HierarchyStore};
pub use upline_rank::{Money, RankTable, MICROS_PER_MINOR};
