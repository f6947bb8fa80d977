//! Walks a rebook through the pure domain steps: validate, price, settle,
//! and rewrite the order.

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use common::{ActorId, OrderId};
use domain::{
    Money, Order, OrderChange, OrderStatus, PaymentMode, PriceRate, RebookForm, SeatClass,
    SettlementOutcome, SettlementPlan, Shard, ShardResolver, TripId, TripQuote, fare_delta,
};
use rust_decimal_macros::dec;

fn paid_order(trip: &str, price: &str) -> Order {
    Order {
        id: OrderId::new(),
        account_id: ActorId::new(),
        train_number: TripId::new(trip),
        from_station: "shanghai".into(),
        to_station: "beijing".into(),
        travel_date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
        travel_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        seat_class: SeatClass::Comfort,
        seat_number: "FirstClass-1".into(),
        price: Money::parse(price).unwrap(),
        difference_money: Money::zero(),
        status: OrderStatus::Paid,
        document_type: 1,
        contacts_name: "Contacts_One".into(),
        contacts_document_number: "DocumentNumber_One".into(),
        bought_date: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
        rebook_marker: None,
    }
}

fn form_for(order: &Order, target: &str, seat_type: i32) -> RebookForm {
    RebookForm {
        login_id: order.account_id.to_string(),
        order_id: order.id.to_string(),
        old_trip_id: order.train_number.to_string(),
        trip_id: target.into(),
        seat_type,
        date: "2026-05-06".into(),
    }
}

fn quote(target: &str) -> TripQuote {
    TripQuote::priced(
        TripId::new(target),
        "KuaiSu",
        "route-2",
        "shanghai",
        "nanjing",
        NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        dec!(250),
        &PriceRate::new(Money::from(dec!(0.38)), Money::from(dec!(1.2))),
    )
}

#[test]
fn cheaper_cross_shard_rebook_is_refunded() {
    let order = paid_order("G1234", "250.0");
    let request = form_for(&order, "K1345", 3).validate().unwrap();
    let resolver = ShardResolver::default();

    assert_eq!(resolver.resolve(&request.source_trip_id), Shard::Primary);
    assert_eq!(resolver.resolve(&request.target_trip_id), Shard::Secondary);

    let quote = quote("K1345");
    let change = OrderChange::from_quote(
        &quote,
        request.seat_class,
        request.requested_date,
        request.idempotency_key(),
    )
    .unwrap();

    let delta = fare_delta(order.price, change.price);
    assert_eq!(delta.to_string(), "-155.0");

    let plan = SettlementPlan::decide(delta, PaymentMode::Automatic);
    assert_eq!(plan.credit(), Some(Money::parse("155").unwrap()));
    assert!(matches!(
        plan.committed_outcome(),
        SettlementOutcome::Refunded(_)
    ));

    let committed = order.rebooked(&change.with_seat("SecondClass-7"));
    assert_eq!(committed.id, order.id);
    assert_eq!(committed.price.to_string(), "95.0");
    assert_eq!(committed.difference_money.to_string(), "0.0");
    assert_eq!(committed.status, OrderStatus::Changed);
    assert!(committed.carries_marker(&request.idempotency_key()));
}

#[test]
fn pricier_rebook_previews_the_difference() {
    let order = paid_order("K1000", "95.0");
    let request = form_for(&order, "K1345", 2).validate().unwrap();

    let change = OrderChange::from_quote(
        &quote("K1345"),
        request.seat_class,
        request.requested_date,
        request.idempotency_key(),
    )
    .unwrap();
    let delta = fare_delta(order.price, change.price);
    assert_eq!(delta, Money::from(dec!(205)));

    let plan = SettlementPlan::decide(delta, PaymentMode::Automatic);
    assert_eq!(plan.debit(), Some(delta));

    let preview = order.payment_preview(&change, delta);
    assert_eq!(preview.difference_money.to_string(), "205.0");
    assert_eq!(preview.price.to_string(), "300.0");
    assert_eq!(preview.status, OrderStatus::Paid);
}

#[test]
fn grace_window_is_measured_from_departure() {
    let order = paid_order("G1234", "250.0");
    let grace = Duration::minutes(120);

    let just_inside = order.departure() + Duration::minutes(119);
    let outside = order.departure() + Duration::minutes(121);

    assert!(!order.is_too_late_to_change(just_inside, grace));
    assert!(order.is_too_late_to_change(outside, grace));
}
