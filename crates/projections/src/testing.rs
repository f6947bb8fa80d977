//! Journals hand-built rebook sagas for the unit tests.

use chrono::{Days, NaiveTime, Utc};
use common::{ActorId, OrderId};
use domain::{
    Money, Order, OrderStatus, PaymentMode, RebookRequest, SeatClass, SettlementPlan, Shard,
    TripId,
};
use journal::InMemoryJournal;
use saga::{RebookEvent, SagaRecorder};

pub(crate) fn money(s: &str) -> Money {
    Money::parse(s).unwrap()
}

pub(crate) fn sample_order() -> Order {
    Order {
        id: OrderId::new(),
        account_id: ActorId::new(),
        train_number: TripId::new("G1234"),
        from_station: "shanghai".into(),
        to_station: "nanjing".into(),
        travel_date: Utc::now().date_naive() + Days::new(7),
        travel_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        seat_class: SeatClass::Comfort,
        seat_number: "FirstClass-30".into(),
        price: money("250.0"),
        difference_money: Money::zero(),
        status: OrderStatus::Paid,
        document_type: 1,
        contacts_name: "Contacts_One".into(),
        contacts_document_number: "DocumentNumber_One".into(),
        bought_date: Utc::now(),
        rebook_marker: None,
    }
}

pub(crate) fn request_for(order: &Order, target: &str) -> RebookRequest {
    RebookRequest {
        actor_id: order.account_id,
        order_id: order.id,
        source_trip_id: order.train_number.clone(),
        target_trip_id: TripId::new(target),
        seat_class: SeatClass::Economy,
        requested_date: order.travel_date,
    }
}

/// Records `events` after a `RebookStarted` for `request`.
pub(crate) async fn record(
    journal: &InMemoryJournal,
    request: &RebookRequest,
    mode: PaymentMode,
    events: Vec<RebookEvent>,
) {
    let mut recorder = SagaRecorder::load(journal, request.saga_id(), request.order_id)
        .await
        .unwrap();
    recorder
        .record(RebookEvent::rebook_started(request, mode))
        .await
        .unwrap();
    for event in events {
        recorder.record(event).await.unwrap();
    }
}

/// A same-shard rebook G1234 -> D5678 refunding 155.0.
pub(crate) async fn record_committed_rebook(journal: &InMemoryJournal) -> RebookRequest {
    let order = sample_order();
    let request = request_for(&order, "D5678");
    let plan = SettlementPlan::Refund(money("155.0"));
    let mut committed = order.clone();
    committed.train_number = TripId::new("D5678");
    committed.price = money("95.0");

    record(
        journal,
        &request,
        PaymentMode::Automatic,
        vec![
            RebookEvent::order_resolved(Shard::Primary, order),
            RebookEvent::settlement_decided(money("250.0"), money("95.0"), plan),
            RebookEvent::seat_reserved("Economy-1"),
            RebookEvent::balance_refunded(money("155.0")),
            RebookEvent::rebook_committed(committed, Some(plan.committed_outcome())),
        ],
    )
    .await;
    request
}
