//! Fixtures shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use common::{ActorId, OrderId};
use domain::{Money, Order, OrderStatus, RebookRequest, SeatClass, Shard, TripId};
use journal::InMemoryJournal;
use rust_decimal::Decimal;

use crate::coordinator::{RebookCoordinator, RebookSettings};
use crate::services::{
    Gateways, InMemoryLedger, InMemoryOrderStore, InMemorySeatAllocator, InMemoryTripFareGateway,
    PriceRecord, TripDetail,
};

/// A week from now, so the grace window never interferes.
pub(crate) fn travel_date() -> NaiveDate {
    Utc::now().date_naive() + Days::new(7)
}

pub(crate) fn sample_order(trip: &str, price: &str) -> Order {
    Order {
        id: OrderId::new(),
        account_id: ActorId::new(),
        train_number: TripId::new(trip),
        from_station: "shanghai".into(),
        to_station: "nanjing".into(),
        travel_date: travel_date(),
        travel_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        seat_class: SeatClass::Comfort,
        seat_number: "FirstClass-30".into(),
        price: Money::parse(price).unwrap(),
        difference_money: Money::zero(),
        status: OrderStatus::Paid,
        document_type: 1,
        contacts_name: "Contacts_One".into(),
        contacts_document_number: "DocumentNumber_One".into(),
        bought_date: Utc::now(),
        rebook_marker: None,
    }
}

pub(crate) fn sample_request(source: &str, target: &str) -> RebookRequest {
    RebookRequest {
        actor_id: ActorId::new(),
        order_id: OrderId::new(),
        source_trip_id: TripId::new(source),
        target_trip_id: TripId::new(target),
        seat_class: SeatClass::Economy,
        requested_date: travel_date(),
    }
}

/// A coordinator wired to in-memory collaborators.
pub(crate) struct Harness {
    pub coordinator: RebookCoordinator<InMemoryJournal>,
    pub orders: InMemoryOrderStore,
    pub trips: InMemoryTripFareGateway,
    pub seats: InMemorySeatAllocator,
    pub ledger: InMemoryLedger,
}

impl Harness {
    pub fn new() -> Self {
        let orders = InMemoryOrderStore::new();
        let trips = InMemoryTripFareGateway::new();
        let seats = InMemorySeatAllocator::new();
        let ledger = InMemoryLedger::new();
        let gateways = Gateways::new(
            Arc::new(orders.clone()),
            Arc::new(trips.clone()),
            Arc::new(seats.clone()),
            Arc::new(ledger.clone()),
        );
        let settings = RebookSettings {
            upstream_timeout: Duration::from_secs(1),
            lock_wait: Duration::from_secs(1),
            ..RebookSettings::default()
        };

        Self {
            coordinator: RebookCoordinator::new(InMemoryJournal::new(), gateways, settings),
            orders,
            trips,
            seats,
            ledger,
        }
    }

    pub fn seed_order(&self, shard: Shard, trip: &str, price: &str) -> Order {
        let order = sample_order(trip, price);
        self.orders.insert(shard, order.clone());
        order
    }

    pub fn request(&self, order: &Order, target: &str) -> RebookRequest {
        RebookRequest {
            actor_id: order.account_id,
            order_id: order.id,
            source_trip_id: order.train_number.clone(),
            target_trip_id: TripId::new(target),
            seat_class: SeatClass::Economy,
            requested_date: travel_date(),
        }
    }

    pub fn add_trip(&self, trip: &str, train_type: &str, route: &str, distance: &str) {
        self.trips.add_trip(TripDetail {
            trip_id: TripId::new(trip),
            train_type: train_type.into(),
            route_id: route.into(),
            from: "shanghai".into(),
            to: "nanjing".into(),
            departure_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            distance: distance.parse::<Decimal>().unwrap(),
        });
    }

    pub fn add_price(&self, route: &str, train_type: &str, basic: &str, first_class: &str) {
        self.trips.add_price(PriceRecord {
            route_id: route.into(),
            train_type: train_type.into(),
            basic_price_rate: Money::parse(basic).unwrap(),
            first_class_price_rate: Money::parse(first_class).unwrap(),
        });
    }
}
