use chrono::{NaiveDate, NaiveTime, Utc};
use common::{ActorId, OrderId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Money, Order, OrderStatus, PaymentMode, RebookRequest, SeatClass, SettlementPlan, Shard,
    TripId,
};
use journal::InMemoryJournal;
use projections::{PendingRelocationsView, Projection, ProjectionProcessor, RebookHistoryView};
use saga::{RebookEvent, SagaRecorder};

fn money(s: &str) -> Money {
    Money::parse(s).unwrap()
}

fn order() -> Order {
    Order {
        id: OrderId::new(),
        account_id: ActorId::new(),
        train_number: TripId::new("G1234"),
        from_station: "shanghai".into(),
        to_station: "nanjing".into(),
        travel_date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
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

/// Journals N cross-shard rebooks of 7 entries each.
async fn populate_journal(journal: &InMemoryJournal, n: usize) {
    for _ in 0..n {
        let order = order();
        let request = RebookRequest {
            actor_id: order.account_id,
            order_id: order.id,
            source_trip_id: order.train_number.clone(),
            target_trip_id: TripId::new("K1345"),
            seat_class: SeatClass::Economy,
            requested_date: order.travel_date,
        };
        let plan = SettlementPlan::Refund(money("155.0"));
        let mut moved = order.clone();
        moved.train_number = TripId::new("K1345");
        moved.price = money("95.0");

        let mut recorder = SagaRecorder::load(journal, request.saga_id(), request.order_id)
            .await
            .unwrap();
        for event in [
            RebookEvent::rebook_started(&request, PaymentMode::Automatic),
            RebookEvent::order_resolved(Shard::Primary, order),
            RebookEvent::settlement_decided(money("250.0"), money("95.0"), plan),
            RebookEvent::balance_refunded(money("155.0")),
            RebookEvent::relocation_prepared(Shard::Primary, Shard::Secondary, moved.clone()),
            RebookEvent::relocation_completed(false),
            RebookEvent::rebook_committed(moved, Some(plan.committed_outcome())),
        ] {
            recorder.record(event).await.unwrap();
        }
    }
}

fn wired(
    journal: &InMemoryJournal,
) -> (ProjectionProcessor<InMemoryJournal>, RebookHistoryView) {
    let history = RebookHistoryView::new();
    let mut processor = ProjectionProcessor::new(journal.clone());
    processor.register(Box::new(history.clone()) as Box<dyn Projection>);
    processor.register(Box::new(PendingRelocationsView::new()) as Box<dyn Projection>);
    (processor, history)
}

fn bench_catch_up(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let journal = InMemoryJournal::new();
    rt.block_on(populate_journal(&journal, 100));

    c.bench_function("projections/catch_up_700_entries", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (processor, _) = wired(&journal);
                processor.run_catch_up().await.unwrap();
            });
        });
    });
}

fn bench_incremental_catch_up(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let journal = InMemoryJournal::new();
    rt.block_on(populate_journal(&journal, 1000));
    let (processor, _) = wired(&journal);
    rt.block_on(processor.run_catch_up()).unwrap();

    // Nothing new: measures the position scan alone
    c.bench_function("projections/catch_up_noop_7000_entries", |b| {
        b.iter(|| rt.block_on(processor.run_catch_up()).unwrap());
    });
}

fn bench_history_query(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let journal = InMemoryJournal::new();
    rt.block_on(populate_journal(&journal, 100));
    let (processor, history) = wired(&journal);
    rt.block_on(processor.run_catch_up()).unwrap();

    c.bench_function("projections/aborted_with_over_100_orders", |b| {
        b.iter(|| rt.block_on(history.aborted_with("SEAT_NOT_AVAILABLE")));
    });
}

criterion_group!(
    benches,
    bench_catch_up,
    bench_incremental_catch_up,
    bench_history_query,
);
criterion_main!(benches);
