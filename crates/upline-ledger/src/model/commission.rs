//! Commission ledger entries.

use serde::{Deserialize, Serialize};
use upline_rank::Money;

use crate::model::{now_millis, Level, ParticipantId};

/// Immutable record of one commission credited to one ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTransaction {
    /// Hex Blake3 digest of beneficiary, level, source and sequence
    pub id: String,
    /// Append order within the ledger
    pub seq: u64,
    pub beneficiary: ParticipantId,
    pub level: Level,
    /// Participant whose investment earned the commission
    pub source: ParticipantId,
    pub description: String,
    pub amount: Money,
    /// Unix millis
    pub created_at: u64,
}

impl CommissionTransaction {
    /// Derive the transaction id for a ledger position.
    pub fn generate_id(
        beneficiary: &ParticipantId,
        level: Level,
        source: &ParticipantId,
        seq: u64,
    ) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(beneficiary.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(&[level.get()]);
        hasher.update(b":");
        hasher.update(source.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(&seq.to_be_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }

    /// Seal a pending commission at ledger position `seq`.
    pub fn record(commission: NewCommission, seq: u64) -> Self {
        Self {
            id: Self::generate_id(
                &commission.beneficiary,
                commission.level,
                &commission.source,
                seq,
            ),
            seq,
            beneficiary: commission.beneficiary,
            level: commission.level,
            source: commission.source,
            description: commission.description,
            amount: commission.amount,
            created_at: now_millis(),
        }
    }
}

/// A commission about to be appended; the store assigns id, sequence and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommission {
    pub beneficiary: ParticipantId,
    pub level: Level,
    pub source: ParticipantId,
    pub description: String,
    pub amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_id_deterministic() {
        let a = ParticipantId::parse("a").unwrap();
        let b = ParticipantId::parse("b").unwrap();
        let id1 = CommissionTransaction::generate_id(&a, Level::FIRST, &b, 7);
        let id2 = CommissionTransaction::generate_id(&a, Level::FIRST, &b, 7);
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 64);

        let other = CommissionTransaction::generate_id(&a, Level::FIRST, &b, 8);
        assert_ne!(id1, other);
    }

    #[test]
    fn record_assigns_id_from_position() {
        let a = ParticipantId::parse("a").unwrap();
        let b = ParticipantId::parse("b").unwrap();
        let tx = CommissionTransaction::record(
            NewCommission {
                beneficiary: a.clone(),
                level: Level::FIRST,
                source: b.clone(),
                description: "Level 1 commission from B (b)".into(),
                amount: Money::units(5),
            },
            3,
        );
        assert_eq!(tx.seq, 3);
        assert_eq!(tx.id, CommissionTransaction::generate_id(&a, Level::FIRST, &b, 3));
        assert_eq!(tx.amount, Money::units(5));
    }
}
