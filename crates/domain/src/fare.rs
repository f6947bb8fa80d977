//! Fare reconciliation and settlement planning.
//!
//! ```text
//! delta = newFare - oldPrice
//!
//! delta <= 0               -> Refund |delta|   (no ledger call when zero)
//! delta >  0, Automatic    -> Withdraw delta   (insufficient funds -> AwaitingPayment)
//! delta >  0, AlreadyPaid  -> Prepaid delta    (no ledger call)
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Signed difference between the new fare and the price already paid.
pub fn fare_delta(old_price: Money, new_fare: Money) -> Money {
    new_fare - old_price
}

/// How a positive difference is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    /// Withdraw from the actor's balance.
    Automatic,
    /// The actor settled out of band; commit without a withdrawal.
    AlreadyPaid,
}

/// The ledger action chosen for a fare delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "amount")]
pub enum SettlementPlan {
    /// Credit the actor. Amount is non-negative.
    Refund(Money),
    /// Debit the actor.
    Withdraw(Money),
    /// Positive difference already paid.
    Prepaid(Money),
}

impl SettlementPlan {
    pub fn decide(delta: Money, mode: PaymentMode) -> Self {
        if !delta.is_positive() {
            return SettlementPlan::Refund(delta.abs());
        }
        match mode {
            PaymentMode::Automatic => SettlementPlan::Withdraw(delta),
            PaymentMode::AlreadyPaid => SettlementPlan::Prepaid(delta),
        }
    }

    pub fn amount(&self) -> Money {
        match self {
            SettlementPlan::Refund(amount)
            | SettlementPlan::Withdraw(amount)
            | SettlementPlan::Prepaid(amount) => *amount,
        }
    }

    /// The signed fare delta this plan settles.
    pub fn delta(&self) -> Money {
        match self {
            SettlementPlan::Refund(amount) => -*amount,
            SettlementPlan::Withdraw(amount) | SettlementPlan::Prepaid(amount) => *amount,
        }
    }

    /// Amount to debit before the seat is reserved.
    pub fn debit(&self) -> Option<Money> {
        match self {
            SettlementPlan::Withdraw(amount) => Some(*amount),
            _ => None,
        }
    }

    /// Amount to credit right before commit. `None` for a zero delta.
    pub fn credit(&self) -> Option<Money> {
        match self {
            SettlementPlan::Refund(amount) if !amount.is_zero() => Some(*amount),
            _ => None,
        }
    }

    /// Outcome reported once the rebook commits.
    pub fn committed_outcome(&self) -> SettlementOutcome {
        match self {
            SettlementPlan::Refund(_) => SettlementOutcome::Refunded(self.delta()),
            _ => SettlementOutcome::Settled(self.delta()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementPlan::Refund(_) => "Refund",
            SettlementPlan::Withdraw(_) => "Withdraw",
            SettlementPlan::Prepaid(_) => "Prepaid",
        }
    }
}

/// How the fare difference was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "delta")]
pub enum SettlementOutcome {
    /// A positive delta was paid.
    Settled(Money),
    /// A positive delta could not be withdrawn; nothing was committed.
    AwaitingPayment(Money),
    /// A non-positive delta was credited back.
    Refunded(Money),
}

impl SettlementOutcome {
    pub fn delta(&self) -> Money {
        match self {
            SettlementOutcome::Settled(d)
            | SettlementOutcome::AwaitingPayment(d)
            | SettlementOutcome::Refunded(d) => *d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn money(s: &str) -> Money {
        Money::parse(s).unwrap()
    }

    #[test]
    fn delta_is_new_minus_old() {
        let delta = fare_delta(money("250.0"), money("95.0"));
        assert_eq!(delta.to_string(), "-155.0");
        assert_eq!(fare_delta(money("95.0"), money("250.0")), money("155"));
    }

    #[test]
    fn cheaper_trip_refunds_the_difference() {
        let plan = SettlementPlan::decide(money("-155.0"), PaymentMode::Automatic);
        assert_eq!(plan, SettlementPlan::Refund(money("155")));
        assert_eq!(plan.credit(), Some(money("155")));
        assert_eq!(plan.debit(), None);
        assert_eq!(
            plan.committed_outcome(),
            SettlementOutcome::Refunded(money("-155"))
        );
    }

    #[test]
    fn zero_delta_moves_no_money() {
        for mode in [PaymentMode::Automatic, PaymentMode::AlreadyPaid] {
            let plan = SettlementPlan::decide(Money::zero(), mode);
            assert_eq!(plan, SettlementPlan::Refund(Money::zero()));
            assert_eq!(plan.credit(), None);
            assert_eq!(plan.debit(), None);
        }
    }

    #[test]
    fn pricier_trip_withdraws_or_is_prepaid() {
        let delta = Money::from(dec!(40.5));

        let automatic = SettlementPlan::decide(delta, PaymentMode::Automatic);
        assert_eq!(automatic.debit(), Some(delta));
        assert_eq!(automatic.committed_outcome(), SettlementOutcome::Settled(delta));

        let prepaid = SettlementPlan::decide(delta, PaymentMode::AlreadyPaid);
        assert_eq!(prepaid, SettlementPlan::Prepaid(delta));
        assert_eq!(prepaid.debit(), None);
        assert_eq!(prepaid.credit(), None);
        assert_eq!(prepaid.delta(), delta);
    }

    #[test]
    fn one_cent_cheaper_is_refunded_in_either_mode() {
        let plan = SettlementPlan::decide(money("-0.01"), PaymentMode::AlreadyPaid);
        assert_eq!(plan.amount(), money("0.01"));
        assert_eq!(plan.delta(), money("-0.01"));
    }

    #[test]
    fn plan_serializes_tagged() {
        let json = serde_json::to_value(SettlementPlan::Withdraw(money("12.5"))).unwrap();
        assert_eq!(json["action"], "Withdraw");
        assert_eq!(json["amount"], "12.5");
    }
}
