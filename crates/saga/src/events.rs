//! Rebook saga events, one journal entry each.

use chrono::{DateTime, Utc};
use common::{OrderId, SagaId};
use domain::{
    DomainEvent, IdempotencyKey, Money, Order, PaymentMode, RebookRequest, SettlementOutcome,
    SettlementPlan, Shard, TripQuote,
};
use serde::{Deserialize, Serialize};

/// Ledger step names used by compensation entries.
pub const STEP_WITHDRAW: &str = "withdraw";
pub const STEP_REFUND: &str = "refund";

/// Steps recorded while a rebook runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RebookEvent {
    /// An attempt began. A saga stream may hold several attempts.
    RebookStarted(RebookStartedData),

    /// The order was found in its source partition.
    OrderResolved(OrderResolvedData),

    /// The target trip was priced.
    FareQuoted(FareQuotedData),

    /// The fare delta and its ledger action were fixed.
    SettlementDecided(SettlementDecidedData),

    /// The positive delta was debited.
    BalanceWithdrawn(LedgerMovementData),

    /// The debit was refused for lack of funds. Nothing was committed.
    AwaitingPayment(AwaitingPaymentData),

    /// A seat on the target trip was taken.
    SeatReserved(SeatReservedData),

    /// The negative delta was credited back.
    BalanceRefunded(LedgerMovementData),

    /// Cross-partition move about to start. Recorded before the insert.
    RelocationPrepared(RelocationPreparedData),

    /// The old partition no longer holds the order.
    RelocationCompleted(RelocationCompletedData),

    /// The insert into the new partition never happened.
    RelocationAbandoned(RelocationAbandonedData),

    /// The rebooked order is stored.
    RebookCommitted(RebookCommittedData),

    /// A ledger movement was undone.
    CompensationApplied(CompensationData),

    /// Undoing a ledger movement failed; needs manual follow-up.
    CompensationFailed(CompensationFailedData),

    /// The attempt ended without a commit.
    RebookAborted(RebookAbortedData),
}

impl DomainEvent for RebookEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RebookEvent::RebookStarted(_) => "RebookStarted",
            RebookEvent::OrderResolved(_) => "OrderResolved",
            RebookEvent::FareQuoted(_) => "FareQuoted",
            RebookEvent::SettlementDecided(_) => "SettlementDecided",
            RebookEvent::BalanceWithdrawn(_) => "BalanceWithdrawn",
            RebookEvent::AwaitingPayment(_) => "AwaitingPayment",
            RebookEvent::SeatReserved(_) => "SeatReserved",
            RebookEvent::BalanceRefunded(_) => "BalanceRefunded",
            RebookEvent::RelocationPrepared(_) => "RelocationPrepared",
            RebookEvent::RelocationCompleted(_) => "RelocationCompleted",
            RebookEvent::RelocationAbandoned(_) => "RelocationAbandoned",
            RebookEvent::RebookCommitted(_) => "RebookCommitted",
            RebookEvent::CompensationApplied(_) => "CompensationApplied",
            RebookEvent::CompensationFailed(_) => "CompensationFailed",
            RebookEvent::RebookAborted(_) => "RebookAborted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebookStartedData {
    pub saga_id: SagaId,
    pub order_id: OrderId,
    pub idempotency_key: IdempotencyKey,
    pub request: RebookRequest,
    /// `AlreadyPaid` for a confirmed difference payment.
    pub mode: PaymentMode,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResolvedData {
    pub shard: Shard,
    /// The order as read, before any change.
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareQuotedData {
    pub quote: TripQuote,
    /// Fare for the requested seat class.
    pub new_fare: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDecidedData {
    pub old_price: Money,
    pub new_fare: Money,
    pub delta: Money,
    pub plan: SettlementPlan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMovementData {
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitingPaymentData {
    pub delta: Money,
    /// What the order would look like once paid. Never persisted.
    pub preview: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatReservedData {
    pub seat_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationPreparedData {
    pub from: Shard,
    pub to: Shard,
    /// The record to insert into `to`.
    pub order: Order,
    pub prepared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationCompletedData {
    /// True when the reconciler finished the move.
    pub recovered: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationAbandonedData {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebookCommittedData {
    pub order: Order,
    /// `None` when the commit was discovered through the order's marker
    /// rather than observed.
    pub outcome: Option<SettlementOutcome>,
    pub committed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationData {
    pub step: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationFailedData {
    pub step: String,
    pub amount: Money,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebookAbortedData {
    /// Stable failure code, e.g. `SEAT_NOT_AVAILABLE`.
    pub code: String,
    pub reason: String,
    pub aborted_at: DateTime<Utc>,
}

impl RebookEvent {
    pub fn rebook_started(request: &RebookRequest, mode: PaymentMode) -> Self {
        let idempotency_key = request.idempotency_key();
        RebookEvent::RebookStarted(RebookStartedData {
            saga_id: idempotency_key.saga_id(),
            order_id: request.order_id,
            idempotency_key,
            request: request.clone(),
            mode,
            started_at: Utc::now(),
        })
    }

    pub fn order_resolved(shard: Shard, order: Order) -> Self {
        RebookEvent::OrderResolved(OrderResolvedData { shard, order })
    }

    pub fn fare_quoted(quote: TripQuote, new_fare: Money) -> Self {
        RebookEvent::FareQuoted(FareQuotedData { quote, new_fare })
    }

    pub fn settlement_decided(old_price: Money, new_fare: Money, plan: SettlementPlan) -> Self {
        RebookEvent::SettlementDecided(SettlementDecidedData {
            old_price,
            new_fare,
            delta: plan.delta(),
            plan,
        })
    }

    pub fn balance_withdrawn(amount: Money) -> Self {
        RebookEvent::BalanceWithdrawn(LedgerMovementData { amount })
    }

    pub fn balance_refunded(amount: Money) -> Self {
        RebookEvent::BalanceRefunded(LedgerMovementData { amount })
    }

    pub fn awaiting_payment(delta: Money, preview: Order) -> Self {
        RebookEvent::AwaitingPayment(AwaitingPaymentData { delta, preview })
    }

    pub fn seat_reserved(seat_number: impl Into<String>) -> Self {
        RebookEvent::SeatReserved(SeatReservedData {
            seat_number: seat_number.into(),
        })
    }

    pub fn relocation_prepared(from: Shard, to: Shard, order: Order) -> Self {
        RebookEvent::RelocationPrepared(RelocationPreparedData {
            from,
            to,
            order,
            prepared_at: Utc::now(),
        })
    }

    pub fn relocation_completed(recovered: bool) -> Self {
        RebookEvent::RelocationCompleted(RelocationCompletedData {
            recovered,
            completed_at: Utc::now(),
        })
    }

    pub fn relocation_abandoned(reason: impl Into<String>) -> Self {
        RebookEvent::RelocationAbandoned(RelocationAbandonedData {
            reason: reason.into(),
        })
    }

    pub fn rebook_committed(order: Order, outcome: Option<SettlementOutcome>) -> Self {
        RebookEvent::RebookCommitted(RebookCommittedData {
            order,
            outcome,
            committed_at: Utc::now(),
        })
    }

    pub fn compensation_applied(step: &str, amount: Money) -> Self {
        RebookEvent::CompensationApplied(CompensationData {
            step: step.to_string(),
            amount,
        })
    }

    pub fn compensation_failed(step: &str, amount: Money, error: impl Into<String>) -> Self {
        RebookEvent::CompensationFailed(CompensationFailedData {
            step: step.to_string(),
            amount,
            error: error.into(),
        })
    }

    pub fn rebook_aborted(code: &str, reason: impl Into<String>) -> Self {
        RebookEvent::RebookAborted(RebookAbortedData {
            code: code.to_string(),
            reason: reason.into(),
            aborted_at: Utc::now(),
        })
    }
}
