use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use common::{ActorId, OrderId};
use serde::{Deserialize, Serialize};

use super::{OrderStatus, SeatClass};
use crate::money::Money;
use crate::rebook::IdempotencyKey;
use crate::trip::{TripId, TripQuote};

/// A ticket order as stored by an order partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub account_id: ActorId,
    pub train_number: TripId,
    pub from_station: String,
    pub to_station: String,
    pub travel_date: NaiveDate,
    pub travel_time: NaiveTime,
    pub seat_class: SeatClass,
    pub seat_number: String,
    pub price: Money,
    pub difference_money: Money,
    pub status: OrderStatus,
    pub document_type: i32,
    pub contacts_name: String,
    pub contacts_document_number: String,
    pub bought_date: DateTime<Utc>,
    /// Idempotency key of the last rebook committed onto this order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebook_marker: Option<String>,
}

impl Order {
    /// Departure instant of the booked trip.
    pub fn departure(&self) -> DateTime<Utc> {
        self.travel_date.and_time(self.travel_time).and_utc()
    }

    /// True once the trip departed more than `grace` before `now`.
    pub fn is_too_late_to_change(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        now > self.departure() + grace
    }

    pub fn carries_marker(&self, key: &IdempotencyKey) -> bool {
        self.rebook_marker.as_deref() == Some(key.as_str())
    }

    /// The committed order after a rebook.
    ///
    /// Keeps the id and passenger details; the difference is cleared and the
    /// completion marker set.
    pub fn rebooked(&self, change: &OrderChange) -> Order {
        let mut order = self.with_trip(change);
        order.difference_money = Money::zero();
        order.status = OrderStatus::Changed;
        order.rebook_marker = Some(change.marker.as_str().to_string());
        order
    }

    /// The order a client would get after paying `difference`. Never persisted.
    pub fn payment_preview(&self, change: &OrderChange, difference: Money) -> Order {
        let mut order = self.with_trip(change);
        order.difference_money = difference;
        order
    }

    fn with_trip(&self, change: &OrderChange) -> Order {
        Order {
            train_number: change.train_number.clone(),
            from_station: change.from_station.clone(),
            to_station: change.to_station.clone(),
            travel_date: change.travel_date,
            travel_time: change.travel_time,
            seat_class: change.seat_class,
            seat_number: change
                .seat_number
                .clone()
                .unwrap_or_else(|| self.seat_number.clone()),
            price: change.price,
            ..self.clone()
        }
    }
}

/// The fields a rebook rewrites on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderChange {
    pub train_number: TripId,
    pub from_station: String,
    pub to_station: String,
    pub travel_date: NaiveDate,
    pub travel_time: NaiveTime,
    pub seat_class: SeatClass,
    /// Set once a seat has been reserved.
    pub seat_number: Option<String>,
    pub price: Money,
    pub marker: IdempotencyKey,
}

impl OrderChange {
    /// Change towards a quoted trip, priced for `seat_class`.
    ///
    /// Returns `None` when the quote has no fare for the class.
    pub fn from_quote(
        quote: &TripQuote,
        seat_class: SeatClass,
        travel_date: NaiveDate,
        marker: IdempotencyKey,
    ) -> Option<Self> {
        let price = quote.fare_for(seat_class)?;
        Some(Self {
            train_number: quote.trip_id.clone(),
            from_station: quote.origin_station.clone(),
            to_station: quote.dest_station.clone(),
            travel_date,
            travel_time: quote.departure_time,
            seat_class,
            seat_number: None,
            price,
            marker,
        })
    }

    pub fn with_seat(mut self, seat_number: impl Into<String>) -> Self {
        self.seat_number = Some(seat_number.into());
        self
    }
}
