//! Rebook coordinator: drives one saga per (order, target trip).

use std::time::{Duration, Instant};

use chrono::Utc;
use common::SagaId;
use domain::{
    Money, Order, OrderChange, PaymentMode, RebookRequest, SettlementOutcome, SettlementPlan,
    ShardResolver, fare_delta,
};
use journal::SagaJournal;

use crate::aggregate::RebookSaga;
use crate::error::{RebookError, Result};
use crate::events::{RebookEvent, STEP_REFUND, STEP_WITHDRAW};
use crate::lock::OrderLocks;
use crate::recorder::{SagaRecorder, load_saga};
use crate::relocation::Relocator;
use crate::services::{
    Gateways, LedgerRequest, SeatRequest, TripDetailQuery, Withdrawal, within,
};

/// Tunables for the coordinator.
#[derive(Debug, Clone)]
pub struct RebookSettings {
    /// How long after departure an order may still be changed.
    pub grace: chrono::Duration,
    /// Bound on every collaborator call.
    pub upstream_timeout: Duration,
    pub resolver: ShardResolver,
    /// How long a request queues behind another rebook of the same order.
    pub lock_wait: Duration,
}

impl Default for RebookSettings {
    fn default() -> Self {
        Self {
            grace: chrono::Duration::minutes(120),
            upstream_timeout: Duration::from_secs(5),
            resolver: ShardResolver::default(),
            lock_wait: Duration::from_secs(10),
        }
    }
}

/// Successful end of a rebook request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebookOutcome {
    /// The rebooked order is stored. `replayed` marks a retry of a rebook
    /// that had already committed; nothing was called or written.
    Committed {
        order: Order,
        outcome: Option<SettlementOutcome>,
        replayed: bool,
    },
    /// The positive delta could not be withdrawn. `order` is a preview of the
    /// rebooked order and was not stored.
    AwaitingPayment { order: Order, delta: Money },
}

impl RebookOutcome {
    pub fn order(&self) -> &Order {
        match self {
            RebookOutcome::Committed { order, .. } | RebookOutcome::AwaitingPayment { order, .. } => {
                order
            }
        }
    }
}

/// Ledger movements applied by the running attempt, tracked outside the
/// journal so a failed append cannot hide one from compensation.
#[derive(Debug, Default)]
struct Applied {
    debit: Option<Money>,
    credit: Option<Money>,
}

/// Orchestrates rebooks with compensation on failure.
///
/// Each step is recorded in the saga journal before the coordinator moves
/// on, and requests for the same order are serialized through [`OrderLocks`].
pub struct RebookCoordinator<J: SagaJournal> {
    journal: J,
    gateways: Gateways,
    settings: RebookSettings,
    locks: OrderLocks,
    relocator: Relocator,
}

impl<J: SagaJournal> RebookCoordinator<J> {
    pub fn new(journal: J, gateways: Gateways, settings: RebookSettings) -> Self {
        let locks = OrderLocks::new(settings.lock_wait);
        let relocator = Relocator::new(gateways.orders.clone(), settings.upstream_timeout);
        Self {
            journal,
            gateways,
            settings,
            locks,
            relocator,
        }
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    pub fn gateways(&self) -> &Gateways {
        &self.gateways
    }

    pub fn settings(&self) -> &RebookSettings {
        &self.settings
    }

    /// The per-order locks, shared with the relocation reconciler.
    pub fn locks(&self) -> &OrderLocks {
        &self.locks
    }

    /// Rebooks an order, withdrawing a positive difference from the balance.
    pub async fn initiate_rebook(&self, request: &RebookRequest) -> Result<RebookOutcome> {
        self.run(request, PaymentMode::Automatic).await
    }

    /// Rebooks an order whose positive difference was paid out of band.
    pub async fn confirm_difference(&self, request: &RebookRequest) -> Result<RebookOutcome> {
        self.run(request, PaymentMode::AlreadyPaid).await
    }

    /// Loads a saga by id.
    pub async fn get_saga(&self, saga_id: SagaId) -> Result<Option<RebookSaga>> {
        load_saga(&self.journal, saga_id).await
    }

    #[tracing::instrument(
        skip_all,
        fields(order_id = %request.order_id, saga_id = %request.saga_id(), ?mode)
    )]
    async fn run(&self, request: &RebookRequest, mode: PaymentMode) -> Result<RebookOutcome> {
        metrics::counter!("rebook_requests_total").increment(1);
        let started = Instant::now();

        let result = self.run_locked(request, mode).await;

        metrics::histogram!("rebook_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(RebookOutcome::Committed { replayed, .. }) => {
                metrics::counter!("rebook_committed_total").increment(1);
                tracing::info!(replayed, "rebook committed");
            }
            Ok(RebookOutcome::AwaitingPayment { delta, .. }) => {
                metrics::counter!("rebook_awaiting_payment_total").increment(1);
                tracing::info!(%delta, "rebook awaiting difference payment");
            }
            Err(err) => {
                metrics::counter!("rebook_aborted_total", "code" => err.code()).increment(1);
                tracing::warn!(code = err.code(), error = %err, "rebook aborted");
            }
        }
        result
    }

    async fn run_locked(&self, request: &RebookRequest, mode: PaymentMode) -> Result<RebookOutcome> {
        let _guard = self.locks.acquire(request.order_id).await?;

        let mut recorder =
            SagaRecorder::load(&self.journal, request.saga_id(), request.order_id).await?;

        if recorder.saga().committed_order().is_some()
            && let Some(order) = self.still_rebooked(request).await?
        {
            return Ok(RebookOutcome::Committed {
                order,
                outcome: recorder.saga().outcome(),
                replayed: true,
            });
        }

        recorder
            .record(RebookEvent::rebook_started(request, mode))
            .await?;

        let mut applied = Applied::default();
        match self.advance(&mut recorder, request, mode, &mut applied).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.abort(&mut recorder, request, applied, &err).await;
                Err(err)
            }
        }
    }

    /// Walks `Start` through `Committed`. Once `OrderResolved` is journaled
    /// the status is checked before the departure window, so a departed order
    /// that is also not rebookable aborts with `OrderNotRebookable`.
    async fn advance(
        &self,
        recorder: &mut SagaRecorder<'_, J>,
        request: &RebookRequest,
        mode: PaymentMode,
        applied: &mut Applied,
    ) -> Result<RebookOutcome> {
        let timeout = self.settings.upstream_timeout;
        let resolver = &self.settings.resolver;
        let key = request.idempotency_key();
        let source_shard = resolver.resolve(&request.source_trip_id);
        let target_shard = resolver.resolve(&request.target_trip_id);

        // Start -> OrderResolved
        tracing::info!(step = "resolve_order", shard = %source_shard, "saga step started");
        let found = within(
            timeout,
            "order",
            self.gateways.orders.find(source_shard, request.order_id),
        )
        .await?;

        let order = match found {
            Some(order) if order.carries_marker(&key) => {
                return self.replay_from_marker(recorder, order).await;
            }
            Some(order) => order,
            None => {
                if target_shard != source_shard
                    && let Some(order) = within(
                        timeout,
                        "order",
                        self.gateways.orders.find(target_shard, request.order_id),
                    )
                    .await?
                    && order.carries_marker(&key)
                {
                    return self.replay_from_marker(recorder, order).await;
                }
                return Err(RebookError::OrderNotFound(request.order_id));
            }
        };
        recorder
            .record(RebookEvent::order_resolved(source_shard, order.clone()))
            .await?;

        if !order.status.is_rebookable() {
            return Err(RebookError::OrderNotRebookable {
                order_id: order.id,
                status: order.status,
            });
        }
        if order.is_too_late_to_change(Utc::now(), self.settings.grace) {
            return Err(RebookError::TooLateToChange {
                order_id: order.id,
                departure: order.departure(),
            });
        }

        // OrderResolved -> FareQuoted
        tracing::info!(step = "quote_fare", trip_id = %request.target_trip_id, "saga step started");
        let query = TripDetailQuery {
            trip_id: request.target_trip_id.clone(),
            travel_date: request.requested_date,
            from: order.from_station.clone(),
            to: order.to_station.clone(),
        };
        let detail = within(timeout, "travel", self.gateways.trips.trip_detail(&query))
            .await?
            .ok_or_else(|| RebookError::TripNotFound(request.target_trip_id.clone()))?;
        let route_missing = || RebookError::RouteOrPriceNotFound {
            route: detail.route_id.clone(),
            train_type: detail.train_type.clone(),
        };
        let price = within(
            timeout,
            "price",
            self.gateways
                .trips
                .price(&detail.route_id, &detail.train_type),
        )
        .await?
        .ok_or_else(route_missing)?;

        let quote = detail.priced(&price.rate());
        let change = OrderChange::from_quote(
            &quote,
            request.seat_class,
            request.requested_date,
            key.clone(),
        )
        .ok_or_else(route_missing)?;
        let new_fare = change.price;
        recorder
            .record(RebookEvent::fare_quoted(quote.clone(), new_fare))
            .await?;

        // FareQuoted -> SettlementDecided
        let delta = fare_delta(order.price, new_fare);
        let plan = SettlementPlan::decide(delta, mode);
        tracing::info!(step = "settle", %delta, plan = plan.as_str(), "saga step started");
        recorder
            .record(RebookEvent::settlement_decided(order.price, new_fare, plan))
            .await?;

        if let Some(amount) = plan.debit() {
            let debit = LedgerRequest::new(request.actor_id, order.id, amount);
            match within(timeout, "ledger", self.gateways.ledger.withdraw(&debit)).await? {
                Withdrawal::Debited => {
                    applied.debit = Some(amount);
                    recorder
                        .record(RebookEvent::balance_withdrawn(amount))
                        .await?;
                }
                Withdrawal::InsufficientFunds => {
                    let preview = order.payment_preview(&change, amount);
                    recorder
                        .record(RebookEvent::awaiting_payment(amount, preview.clone()))
                        .await?;
                    return Ok(RebookOutcome::AwaitingPayment {
                        order: preview,
                        delta: amount,
                    });
                }
            }
        }

        // SettlementDecided -> SeatReserved
        tracing::info!(step = "reserve_seat", seat_class = %request.seat_class, "saga step started");
        let seat_request = SeatRequest {
            trip_id: request.target_trip_id.clone(),
            travel_date: request.requested_date,
            seat_class: request.seat_class,
            from: quote.origin_station.clone(),
            to: quote.dest_station.clone(),
        };
        let seat = within(timeout, "seat", self.gateways.seats.reserve(&seat_request))
            .await?
            .ok_or_else(|| RebookError::SeatNotAvailable(request.target_trip_id.clone()))?;
        recorder
            .record(RebookEvent::seat_reserved(seat.seat_number.clone()))
            .await?;
        let change = change.with_seat(seat.seat_number);

        if let Some(amount) = plan.credit() {
            let credit = LedgerRequest::new(request.actor_id, order.id, amount);
            within(timeout, "ledger", self.gateways.ledger.refund(&credit)).await?;
            applied.credit = Some(amount);
            recorder
                .record(RebookEvent::balance_refunded(amount))
                .await?;
        }

        // SeatReserved -> Committed
        tracing::info!(step = "commit", from = %source_shard, to = %target_shard, "saga step started");
        let rebooked = order.rebooked(&change);
        let committed = self
            .relocator
            .commit(recorder, source_shard, target_shard, &rebooked)
            .await?
            .into_order();

        let outcome = plan.committed_outcome();
        if let Err(err) = recorder
            .record(RebookEvent::rebook_committed(committed.clone(), Some(outcome)))
            .await
        {
            // Past the point of no return; the order's marker still proves the commit.
            tracing::error!(error = %err, "commit stored but not journaled");
        }

        Ok(RebookOutcome::Committed {
            order: committed,
            outcome: Some(outcome),
            replayed: false,
        })
    }

    /// The stored order, if it still carries this request's marker. A later
    /// rebook of the same order replaces the marker, so a committed saga for
    /// a trip the order has since left starts a new attempt.
    async fn still_rebooked(&self, request: &RebookRequest) -> Result<Option<Order>> {
        let shard = self.settings.resolver.resolve(&request.target_trip_id);
        let found = within(
            self.settings.upstream_timeout,
            "order",
            self.gateways.orders.find(shard, request.order_id),
        )
        .await?;
        let key = request.idempotency_key();
        Ok(found.filter(|order| order.carries_marker(&key)))
    }

    /// The order already carries this rebook's marker: a previous attempt
    /// committed without reaching the journal.
    async fn replay_from_marker(
        &self,
        recorder: &mut SagaRecorder<'_, J>,
        order: Order,
    ) -> Result<RebookOutcome> {
        tracing::info!(order_id = %order.id, "order already rebooked, replaying commit");
        recorder
            .record(RebookEvent::rebook_committed(order.clone(), None))
            .await?;
        Ok(RebookOutcome::Committed {
            order,
            outcome: None,
            replayed: true,
        })
    }

    /// Undoes applied ledger movements, newest first, then closes the attempt.
    ///
    /// Journal failures here are logged; the original error is what the
    /// caller sees.
    async fn abort(
        &self,
        recorder: &mut SagaRecorder<'_, J>,
        request: &RebookRequest,
        applied: Applied,
        err: &RebookError,
    ) {
        let timeout = self.settings.upstream_timeout;

        if let Some(amount) = applied.credit {
            let claw_back = LedgerRequest::new(request.actor_id, request.order_id, amount);
            let event = match within(timeout, "ledger", self.gateways.ledger.withdraw(&claw_back))
                .await
            {
                Ok(Withdrawal::Debited) => RebookEvent::compensation_applied(STEP_REFUND, amount),
                Ok(Withdrawal::InsufficientFunds) => RebookEvent::compensation_failed(
                    STEP_REFUND,
                    amount,
                    "insufficient funds to take the refund back",
                ),
                Err(e) => RebookEvent::compensation_failed(STEP_REFUND, amount, e.to_string()),
            };
            self.record_compensation(recorder, event).await;
        }

        if let Some(amount) = applied.debit {
            let refund = LedgerRequest::new(request.actor_id, request.order_id, amount);
            let event = match within(timeout, "ledger", self.gateways.ledger.refund(&refund)).await
            {
                Ok(()) => RebookEvent::compensation_applied(STEP_WITHDRAW, amount),
                Err(e) => RebookEvent::compensation_failed(STEP_WITHDRAW, amount, e.to_string()),
            };
            self.record_compensation(recorder, event).await;
        }

        if let Err(journal_err) = recorder
            .record(RebookEvent::rebook_aborted(err.code(), err.to_string()))
            .await
        {
            tracing::error!(error = %journal_err, "abort not journaled");
        }
    }

    async fn record_compensation(&self, recorder: &mut SagaRecorder<'_, J>, event: RebookEvent) {
        match &event {
            RebookEvent::CompensationApplied(data) => {
                metrics::counter!("rebook_compensations_total", "result" => "applied").increment(1);
                tracing::info!(step = %data.step, amount = %data.amount, "compensation applied");
            }
            RebookEvent::CompensationFailed(data) => {
                metrics::counter!("rebook_compensations_total", "result" => "failed").increment(1);
                tracing::error!(
                    step = %data.step,
                    amount = %data.amount,
                    error = %data.error,
                    "compensation failed"
                );
            }
            _ => {}
        }
        if let Err(err) = recorder.record(event).await {
            tracing::error!(error = %err, "compensation not journaled");
        }
    }
}
