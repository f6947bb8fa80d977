use chrono::NaiveTime;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Money, PaymentMode, PriceRate, RebookForm, SeatClass, SettlementPlan, ShardResolver, TripId,
    TripQuote, fare_delta,
};
use rust_decimal_macros::dec;
use std::hint::black_box;

fn quote() -> TripQuote {
    TripQuote::priced(
        TripId::new("K1345"),
        "KuaiSu",
        "route-2",
        "shanghai",
        "nanjing",
        NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
        dec!(301.5),
        &PriceRate::new(Money::from(dec!(0.38)), Money::from(dec!(0.6))),
    )
}

fn bench_resolve_shard(c: &mut Criterion) {
    let resolver = ShardResolver::default();
    let ids: Vec<TripId> = ["G1234", "D1345", "K1345", "Z1234", "T1235", ""]
        .into_iter()
        .map(TripId::new)
        .collect();

    c.bench_function("domain/resolve_shard", |b| {
        b.iter(|| {
            for id in &ids {
                black_box(resolver.resolve(black_box(id)));
            }
        });
    });
}

fn bench_price_quote(c: &mut Criterion) {
    c.bench_function("domain/price_quote", |b| {
        b.iter(|| black_box(quote()));
    });
}

fn bench_settlement_decision(c: &mut Criterion) {
    let quote = quote();
    let old_price = Money::parse("250.0").unwrap();

    c.bench_function("domain/settlement_decision", |b| {
        b.iter(|| {
            for class in SeatClass::ALL {
                let fare = quote.fare_for(class).unwrap_or_default();
                let delta = fare_delta(black_box(old_price), fare);
                black_box(SettlementPlan::decide(delta, PaymentMode::Automatic));
            }
        });
    });
}

fn bench_validate_form(c: &mut Criterion) {
    let form = RebookForm {
        login_id: "4d2a46c7-71cb-4cf1-b5bb-b68406d9da6f".into(),
        order_id: "5ad7750b-a68b-49c0-a8c0-32776b067703".into(),
        old_trip_id: "G1237".into(),
        trip_id: "K1345".into(),
        seat_type: 2,
        date: "2026-05-04".into(),
    };

    c.bench_function("domain/validate_rebook_form", |b| {
        b.iter(|| black_box(form.validate().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_resolve_shard,
    bench_price_quote,
    bench_settlement_decision,
    bench_validate_form,
);
criterion_main!(benches);
