//! Life-cycle events raised by calling workflows.

use serde::{Deserialize, Serialize};
use upline_ledger::Money;

/// One or more life-cycle facts about a participant, applied in one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub is_new_member: bool,
    pub is_activated: bool,
    pub invested_amount: Money,
}

impl LifecycleEvent {
    pub const fn new_member() -> Self {
        Self {
            is_new_member: true,
            is_activated: false,
            invested_amount: Money::ZERO,
        }
    }

    pub const fn activated() -> Self {
        Self {
            is_new_member: false,
            is_activated: true,
            invested_amount: Money::ZERO,
        }
    }

    pub const fn invested(amount: Money) -> Self {
        Self {
            is_new_member: false,
            is_activated: false,
            invested_amount: amount,
        }
    }

    #[must_use]
    pub const fn with_activation(mut self) -> Self {
        self.is_activated = true;
        self
    }

    #[must_use]
    pub const fn with_investment(mut self, amount: Money) -> Self {
        self.invested_amount = amount;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.is_new_member && !self.is_activated && self.invested_amount.is_zero()
    }

    /// Number of distinct facts carried.
    pub fn fact_count(&self) -> usize {
        usize::from(self.is_new_member)
            + usize::from(self.is_activated)
            + usize::from(!self.invested_amount.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_event() {
        let event = LifecycleEvent::new_member()
            .with_activation()
            .with_investment(Money::units(10));
        assert!(event.is_new_member && event.is_activated);
        assert_eq!(event.fact_count(), 3);
        assert!(LifecycleEvent::default().is_empty());
        assert!(!LifecycleEvent::invested(Money::units(1)).is_empty());
    }
}
