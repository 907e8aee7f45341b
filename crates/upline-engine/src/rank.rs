//! Rank evaluation against the configured tier table.

use serde::Serialize;
use tracing::info;
use upline_ledger::{HierarchyStore, ParticipantId};

use crate::engine::Engine;
use crate::error::{Error, Result};

/// A rank write that actually happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub participant: ParticipantId,
    pub from: String,
    pub to: String,
}

impl<S: HierarchyStore> Engine<S> {
    /// Re-derive a participant's rank from its current team volume.
    ///
    /// Writes only when the cached rank differs; `None` means no write.
    pub fn update_rank(&self, id: &ParticipantId) -> Result<Option<RankChange>> {
        self.rerank(id).map_err(|e| match e {
            upline_ledger::Error::NotFound(_) => Error::NotFound(id.clone()),
            other => other.into(),
        })
    }

    /// The store reads the volume and writes the rank in one atomic unit.
    pub(crate) fn rerank(&self, id: &ParticipantId) -> upline_ledger::Result<Option<RankChange>> {
        let Some(update) = self.store().set_rank(id, &self.config().ranks)? else {
            return Ok(None);
        };
        info!(
            participant = %id,
            from = %update.from,
            to = %update.to,
            team_volume = %update.team_volume,
            "rank changed"
        );
        Ok(Some(RankChange {
            participant: id.clone(),
            from: update.from,
            to: update.to,
        }))
    }
}
