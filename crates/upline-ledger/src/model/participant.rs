//! Participant model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use upline_rank::{Money, RankTable};

use crate::error::{Error, Result};
use crate::model::{checked_add, now_millis};

/// Maximum length of a participant identifier.
pub const MAX_ID_LEN: usize = 64;

/// Identifier of a participant in the referral hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Parse and validate an identifier.
    ///
    /// Identifiers are non-empty, at most [`MAX_ID_LEN`] bytes, and free of
    /// whitespace and `:` (the storage key separator).
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidInput("participant id is empty".into()));
        }
        if s.len() > MAX_ID_LEN {
            return Err(Error::InvalidInput(format!(
                "participant id longer than {} bytes",
                MAX_ID_LEN
            )));
        }
        if s.chars().any(|c| c == ':' || c.is_whitespace()) {
            return Err(Error::InvalidInput(format!(
                "participant id {:?} contains ':' or whitespace",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ParticipantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Activation state of a participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Registered but below the activation threshold
    #[default]
    Inactive,
    /// Crossed the activation threshold
    Active,
}

impl ParticipantStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "inactive"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// A registered account and its rolled-up team totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,

    /// Display name, used in commission descriptions
    pub name: String,

    /// Recruiter. A relation only; the parent does not own this node.
    pub parent_id: Option<ParticipantId>,

    pub status: ParticipantStatus,

    /// Own invested amount
    pub total_invested: Money,

    /// Investment volume of descendants within five generations
    pub team_volume: Money,

    pub total_team_members: u64,

    pub total_active_team_members: u64,

    /// Commission earned from descendants, across all levels
    pub total_team_commission: Money,

    /// Credited by commissions; debited only by external payout workflows
    pub wallet_balance: Money,

    /// Cached tier name, always `rank_for(team_volume)`
    pub rank: String,

    /// Registration time (Unix millis)
    pub joined_at: u64,
}

impl Participant {
    /// Create a fresh, inactive participant with zeroed totals.
    pub fn new(
        id: ParticipantId,
        name: impl Into<String>,
        parent_id: Option<ParticipantId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            status: ParticipantStatus::Inactive,
            total_invested: Money::ZERO,
            team_volume: Money::ZERO,
            total_team_members: 0,
            total_active_team_members: 0,
            total_team_commission: Money::ZERO,
            wallet_balance: Money::ZERO,
            rank: upline_rank::rank_for(Money::ZERO).name.to_string(),
            joined_at: now_millis(),
        }
    }

    /// Add a totals delta, failing without mutation on overflow.
    pub fn apply_totals(&mut self, delta: &TotalsDelta) -> Result<()> {
        let what = |field: &str| format!("{} of {}", field, self.id);
        let members = self
            .total_team_members
            .checked_add(delta.team_members)
            .ok_or_else(|| Error::Overflow(what("total_team_members")))?;
        let active = self
            .total_active_team_members
            .checked_add(delta.active_team_members)
            .ok_or_else(|| Error::Overflow(what("total_active_team_members")))?;
        let volume = checked_add(self.team_volume, delta.team_volume, || what("team_volume"))?;
        let commission = checked_add(self.total_team_commission, delta.team_commission, || {
            what("total_team_commission")
        })?;
        let wallet = checked_add(self.wallet_balance, delta.wallet, || what("wallet_balance"))?;

        self.total_team_members = members;
        self.total_active_team_members = active;
        self.team_volume = volume;
        self.total_team_commission = commission;
        self.wallet_balance = wallet;
        Ok(())
    }

    /// Re-derive the cached rank from the current team volume.
    ///
    /// Returns the change, or `None` when the cached rank already matches.
    pub fn refresh_rank(&mut self, ranks: &RankTable) -> Option<RankUpdate> {
        let tier = ranks.rank_for(self.team_volume);
        if self.rank == tier.name {
            return None;
        }
        let from = std::mem::replace(&mut self.rank, tier.name.to_string());
        Some(RankUpdate {
            from,
            to: self.rank.clone(),
            team_volume: self.team_volume,
        })
    }

    /// Zero every rolled-up field. Own investment and wallet are facts, not
    /// roll-ups, and are left alone.
    pub fn reset_rollups(&mut self) {
        self.team_volume = Money::ZERO;
        self.total_team_members = 0;
        self.total_active_team_members = 0;
        self.total_team_commission = Money::ZERO;
    }

    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            id: self.id.clone(),
            total_invested: self.total_invested,
            status: self.status,
        }
    }
}

/// The slice of a participant that reconciliation replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub total_invested: Money,
    pub status: ParticipantStatus,
}

/// Additive change to a participant's rolled-up totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsDelta {
    pub team_members: u64,
    pub active_team_members: u64,
    pub team_volume: Money,
    pub team_commission: Money,
    pub wallet: Money,
}

/// A cached rank that was rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankUpdate {
    pub from: String,
    pub to: String,
    /// Volume the new rank was derived from
    pub team_volume: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use upline_rank::RankTier;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::parse(s).unwrap()
    }

    #[test]
    fn id_validation() {
        assert!(ParticipantId::parse("USR-001").is_ok());
        assert!(ParticipantId::parse("").is_err());
        assert!(ParticipantId::parse("a:b").is_err());
        assert!(ParticipantId::parse("a b").is_err());
        assert!(ParticipantId::parse(&"x".repeat(MAX_ID_LEN + 1)).is_err());
        assert_eq!("abc".parse::<ParticipantId>().unwrap().as_str(), "abc");
    }

    #[test]
    fn new_participant_starts_at_lowest_rank() {
        let p = Participant::new(pid("a"), "Asha", Some(pid("root")));
        assert_eq!(p.rank, "Starter");
        assert_eq!(p.status, ParticipantStatus::Inactive);
        assert_eq!(p.team_volume, Money::ZERO);
        assert_eq!(p.parent_id, Some(pid("root")));
    }

    #[test]
    fn apply_totals_adds_each_field() {
        let mut p = Participant::new(pid("a"), "Asha", None);
        let delta = TotalsDelta {
            team_members: 2,
            active_team_members: 1,
            team_volume: Money::units(100),
            team_commission: Money::units(5),
            wallet: Money::units(5),
        };
        p.apply_totals(&delta).unwrap();
        p.apply_totals(&delta).unwrap();
        assert_eq!(p.total_team_members, 4);
        assert_eq!(p.total_active_team_members, 2);
        assert_eq!(p.team_volume, Money::units(200));
        assert_eq!(p.wallet_balance, Money::units(10));
    }

    #[test]
    fn apply_totals_overflow_leaves_participant_untouched() {
        let mut p = Participant::new(pid("a"), "Asha", None);
        p.team_volume = Money::from_micros(u64::MAX);
        let before = p.clone();
        let delta = TotalsDelta {
            team_members: 1,
            team_volume: Money::from_micros(1),
            ..Default::default()
        };
        assert!(matches!(p.apply_totals(&delta), Err(Error::Overflow(_))));
        assert_eq!(p, before);
    }

    #[test]
    fn refresh_rank_uses_the_given_table() {
        let ranks = RankTable::new(vec![
            RankTier::new("Member", Money::ZERO),
            RankTier::new("Gold", Money::units(100)),
        ])
        .unwrap();
        let mut p = Participant::new(pid("a"), "Asha", None);

        let update = p.refresh_rank(&ranks).unwrap();
        assert_eq!(update.from, "Starter");
        assert_eq!(update.to, "Member");
        assert_eq!(p.rank, "Member");
        assert_eq!(p.refresh_rank(&ranks), None);

        p.team_volume = Money::units(100);
        assert_eq!(p.refresh_rank(&ranks).unwrap().to, "Gold");
    }

    #[test]
    fn reset_keeps_facts() {
        let mut p = Participant::new(pid("a"), "Asha", None);
        p.total_invested = Money::units(50);
        p.wallet_balance = Money::units(3);
        p.team_volume = Money::units(900);
        p.total_team_members = 7;
        p.reset_rollups();
        assert_eq!(p.total_invested, Money::units(50));
        assert_eq!(p.wallet_balance, Money::units(3));
        assert_eq!(p.team_volume, Money::ZERO);
        assert_eq!(p.total_team_members, 0);
    }
}
