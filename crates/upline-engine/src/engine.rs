//! Engine handle shared by workflows, propagation and reconciliation.

use std::sync::Arc;

use upline_ledger::HierarchyStore;
use upline_rank::{Money, RankProgress};

use crate::config::EngineConfig;

/// Propagation engine over a hierarchy store.
///
/// Holds no mutable state of its own; every change goes to the store as a
/// delta, so one engine can serve any number of concurrent callers.
pub struct Engine<S> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: HierarchyStore> Engine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Progress of a team volume toward the next tier. Pure.
    pub fn rank_progress(&self, team_volume: Money) -> RankProgress<'_> {
        self.config.ranks.progress(team_volume)
    }
}
