//! Rebook saga aggregate.

use chrono::{DateTime, Utc};
use common::{OrderId, SagaId};
use domain::{
    Aggregate, IdempotencyKey, Money, Order, PaymentMode, RebookRequest, SettlementOutcome,
    SettlementPlan, Shard, TripQuote,
};
use journal::Sequence;
use serde::{Deserialize, Serialize};

use crate::events::{RebookEvent, STEP_REFUND, STEP_WITHDRAW};
use crate::state::RebookState;

/// A cross-partition move whose completion has not been recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRelocation {
    pub from: Shard,
    pub to: Shard,
    pub order: Order,
    pub prepared_at: DateTime<Utc>,
}

/// Journal-sourced state of one rebook saga.
///
/// One saga exists per idempotency key. It may run several attempts (an
/// aborted or awaiting-payment attempt followed by a retry, or a return to a
/// trip the order left since it was committed). `RebookStarted` resets the
/// per-attempt context and any earlier commit; a pending relocation survives
/// across attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebookSaga {
    id: Option<SagaId>,
    sequence: Sequence,
    order_id: Option<OrderId>,
    idempotency_key: Option<IdempotencyKey>,
    request: Option<RebookRequest>,
    mode: Option<PaymentMode>,
    state: RebookState,
    attempts: u32,
    started_at: Option<DateTime<Utc>>,
    source_shard: Option<Shard>,
    original: Option<Order>,
    quote: Option<TripQuote>,
    new_fare: Option<Money>,
    plan: Option<SettlementPlan>,
    /// Debit applied in this attempt and not compensated.
    debited: Option<Money>,
    /// Credit applied in this attempt and not compensated.
    refunded: Option<Money>,
    seat_number: Option<String>,
    relocation: Option<PendingRelocation>,
    awaiting_delta: Option<Money>,
    payment_preview: Option<Order>,
    committed_order: Option<Order>,
    outcome: Option<SettlementOutcome>,
    committed_at: Option<DateTime<Utc>>,
    abort_code: Option<String>,
    abort_reason: Option<String>,
    compensations_applied: u32,
    compensations_failed: u32,
}

impl Aggregate for RebookSaga {
    type Event = RebookEvent;

    fn aggregate_type() -> &'static str {
        "RebookSaga"
    }

    fn id(&self) -> Option<SagaId> {
        self.id
    }

    fn sequence(&self) -> Sequence {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: Sequence) {
        self.sequence = sequence;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            RebookEvent::RebookStarted(data) => {
                self.id = Some(data.saga_id);
                self.order_id = Some(data.order_id);
                self.idempotency_key = Some(data.idempotency_key);
                self.request = Some(data.request);
                self.mode = Some(data.mode);
                self.started_at = Some(data.started_at);
                self.state = RebookState::Start;
                self.attempts += 1;

                self.source_shard = None;
                self.original = None;
                self.quote = None;
                self.new_fare = None;
                self.plan = None;
                self.debited = None;
                self.refunded = None;
                self.seat_number = None;
                self.awaiting_delta = None;
                self.payment_preview = None;
                self.abort_code = None;
                self.abort_reason = None;
                self.committed_order = None;
                self.outcome = None;
                self.committed_at = None;
            }
            RebookEvent::OrderResolved(data) => {
                self.source_shard = Some(data.shard);
                self.original = Some(data.order);
                self.state = RebookState::OrderResolved;
            }
            RebookEvent::FareQuoted(data) => {
                self.quote = Some(data.quote);
                self.new_fare = Some(data.new_fare);
                self.state = RebookState::FareQuoted;
            }
            RebookEvent::SettlementDecided(data) => {
                self.plan = Some(data.plan);
                self.state = RebookState::SettlementDecided;
            }
            RebookEvent::BalanceWithdrawn(data) => {
                self.debited = Some(data.amount);
            }
            RebookEvent::AwaitingPayment(data) => {
                self.awaiting_delta = Some(data.delta);
                self.payment_preview = Some(data.preview);
                self.state = RebookState::AwaitingPayment;
            }
            RebookEvent::SeatReserved(data) => {
                self.seat_number = Some(data.seat_number);
                self.state = RebookState::SeatReserved;
            }
            RebookEvent::BalanceRefunded(data) => {
                self.refunded = Some(data.amount);
            }
            RebookEvent::RelocationPrepared(data) => {
                self.relocation = Some(PendingRelocation {
                    from: data.from,
                    to: data.to,
                    order: data.order,
                    prepared_at: data.prepared_at,
                });
            }
            RebookEvent::RelocationCompleted(_) | RebookEvent::RelocationAbandoned(_) => {
                self.relocation = None;
            }
            RebookEvent::RebookCommitted(data) => {
                self.committed_order = Some(data.order);
                self.outcome = data.outcome;
                self.committed_at = Some(data.committed_at);
                self.state = RebookState::Committed;
            }
            RebookEvent::CompensationApplied(data) => {
                self.compensations_applied += 1;
                match data.step.as_str() {
                    STEP_WITHDRAW => self.debited = None,
                    STEP_REFUND => self.refunded = None,
                    _ => {}
                }
            }
            RebookEvent::CompensationFailed(_) => {
                self.compensations_failed += 1;
            }
            RebookEvent::RebookAborted(data) => {
                self.abort_code = Some(data.code);
                self.abort_reason = Some(data.reason);
                self.state = RebookState::Aborted;
            }
        }
    }
}

impl RebookSaga {
    pub fn state(&self) -> RebookState {
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.state == RebookState::Committed
    }

    /// Number of attempts recorded on this saga.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn idempotency_key(&self) -> Option<&IdempotencyKey> {
        self.idempotency_key.as_ref()
    }

    pub fn request(&self) -> Option<&RebookRequest> {
        self.request.as_ref()
    }

    pub fn mode(&self) -> Option<PaymentMode> {
        self.mode
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn source_shard(&self) -> Option<Shard> {
        self.source_shard
    }

    /// The order as it was read at the start of the current attempt.
    pub fn original_order(&self) -> Option<&Order> {
        self.original.as_ref()
    }

    pub fn quote(&self) -> Option<&TripQuote> {
        self.quote.as_ref()
    }

    pub fn new_fare(&self) -> Option<Money> {
        self.new_fare
    }

    pub fn plan(&self) -> Option<SettlementPlan> {
        self.plan
    }

    pub fn debited(&self) -> Option<Money> {
        self.debited
    }

    pub fn refunded(&self) -> Option<Money> {
        self.refunded
    }

    pub fn seat_number(&self) -> Option<&str> {
        self.seat_number.as_deref()
    }

    pub fn pending_relocation(&self) -> Option<&PendingRelocation> {
        self.relocation.as_ref()
    }

    pub fn awaiting_delta(&self) -> Option<Money> {
        self.awaiting_delta
    }

    pub fn payment_preview(&self) -> Option<&Order> {
        self.payment_preview.as_ref()
    }

    pub fn committed_order(&self) -> Option<&Order> {
        self.committed_order.as_ref()
    }

    pub fn outcome(&self) -> Option<SettlementOutcome> {
        self.outcome
    }

    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.committed_at
    }

    pub fn abort_code(&self) -> Option<&str> {
        self.abort_code.as_deref()
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    pub fn compensations_applied(&self) -> u32 {
        self.compensations_applied
    }

    pub fn compensations_failed(&self) -> u32 {
        self.compensations_failed
    }
}
