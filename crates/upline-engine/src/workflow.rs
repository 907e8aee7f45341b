//! Calling workflows: registration, activation and investment posting.
//!
//! Each workflow performs its own write first and only then raises the
//! life-cycle event. The write stands even if propagation fails part way;
//! the returned report says how far the event got.
//!
//! Investment requires an active participant. Enforcing activation before
//! investment here keeps the engine free of ordering assumptions.

use tracing::info;
use upline_ledger::{
    HierarchyStore, Money, Participant, ParticipantId, ParticipantStatus, MICROS_PER_MINOR,
};

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::event::LifecycleEvent;
use crate::propagate::PropagationReport;

impl<S: HierarchyStore> Engine<S> {
    /// Insert a new participant and raise `NewMember`.
    ///
    /// The stored rank is taken from the configured table, not from
    /// whatever the record was built with.
    pub fn register(&self, mut participant: Participant) -> Result<PropagationReport> {
        if let Some(parent) = &participant.parent_id {
            if *parent == participant.id {
                return Err(upline_ledger::Error::InvalidInput(format!(
                    "participant {} cannot recruit itself",
                    participant.id
                ))
                .into());
            }
            if self.store().get_participant(parent)?.is_none() {
                return Err(Error::UnknownParent(parent.clone()));
            }
        }

        participant.refresh_rank(&self.config().ranks);
        self.store().insert_participant(&participant)?;
        info!(
            participant = %participant.id,
            parent = ?participant.parent_id.as_ref().map(ToString::to_string),
            rank = %participant.rank,
            "registered"
        );
        Ok(self.apply_event(&participant.id, &LifecycleEvent::new_member()))
    }

    /// Mark a participant active and raise `Activated`.
    ///
    /// Returns `None` if the participant was already active; no second
    /// event is raised.
    pub fn activate(&self, id: &ParticipantId) -> Result<Option<PropagationReport>> {
        let previous = self
            .store()
            .set_status(id, ParticipantStatus::Active)
            .map_err(|e| match e {
                upline_ledger::Error::NotFound(_) => Error::NotFound(id.clone()),
                other => other.into(),
            })?;
        if previous.is_active() {
            return Ok(None);
        }
        info!(participant = %id, "activated");
        Ok(Some(self.apply_event(id, &LifecycleEvent::activated())))
    }

    /// Record an investment by an active participant and raise `Invested`.
    pub fn post_investment(&self, id: &ParticipantId, amount: Money) -> Result<PropagationReport> {
        if amount.is_zero() {
            return Err(Error::InvalidAmount("investment must be positive".into()));
        }
        if amount.micros() % MICROS_PER_MINOR != 0 {
            return Err(Error::InvalidAmount(format!(
                "{} is not a whole number of minor units",
                amount
            )));
        }

        let participant = self
            .store()
            .get_participant(id)?
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        if !participant.status.is_active() {
            return Err(Error::NotActive(id.clone()));
        }

        let total = self.store().add_invested(id, amount)?;
        info!(participant = %id, %amount, %total, "investment posted");
        Ok(self.apply_event(id, &LifecycleEvent::invested(amount)))
    }
}
