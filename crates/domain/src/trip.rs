//! Trip identifiers, price rates and fare quotes.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::money::Money;
use crate::order::SeatClass;

/// Train/trip identifier such as `G1234` or `K1345`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(String);

impl TripId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Leading character, which selects the order partition.
    pub fn leading_char(&self) -> Option<char> {
        self.0.chars().next()
    }
}

impl std::fmt::Display for TripId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TripId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TripId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Per-distance price rates for one (route, train type) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRate {
    /// Rate applied to second class seats.
    pub basic: Money,
    /// Rate applied to first class seats.
    pub first_class: Money,
}

impl PriceRate {
    pub fn new(basic: Money, first_class: Money) -> Self {
        Self { basic, first_class }
    }

    /// Rate for a seat class. Comfort uses the first class rate.
    pub fn rate_for(&self, class: SeatClass) -> Money {
        match class {
            SeatClass::Comfort => self.first_class,
            SeatClass::Economy => self.basic,
        }
    }

    /// Fare for a class over a segment distance, rounded to cents.
    pub fn fare(&self, class: SeatClass, distance: Decimal) -> Money {
        Money::from(self.rate_for(class).as_decimal() * distance).round_to_cents()
    }
}

/// A priced trip, fetched fresh for every rebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripQuote {
    pub trip_id: TripId,
    pub train_class: String,
    pub route: String,
    pub origin_station: String,
    pub dest_station: String,
    pub departure_time: NaiveTime,
    #[serde(with = "class_fares")]
    pub fare_by_class: BTreeMap<SeatClass, Money>,
}

/// Fares as a list of `{seatClass, fare}` pairs. JSON object keys are
/// strings, which the integer seat class code cannot be read back from.
mod class_fares {
    use super::*;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ClassFare {
        seat_class: SeatClass,
        fare: Money,
    }

    pub fn serialize<S: Serializer>(
        fares: &BTreeMap<SeatClass, Money>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            fares
                .iter()
                .map(|(&seat_class, &fare)| ClassFare { seat_class, fare }),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<SeatClass, Money>, D::Error> {
        let fares = Vec::<ClassFare>::deserialize(deserializer)?;
        Ok(fares.into_iter().map(|f| (f.seat_class, f.fare)).collect())
    }
}

impl TripQuote {
    /// Builds a quote by pricing every seat class over `distance`.
    #[allow(clippy::too_many_arguments)]
    pub fn priced(
        trip_id: TripId,
        train_class: impl Into<String>,
        route: impl Into<String>,
        origin_station: impl Into<String>,
        dest_station: impl Into<String>,
        departure_time: NaiveTime,
        distance: Decimal,
        rate: &PriceRate,
    ) -> Self {
        let fare_by_class = SeatClass::ALL
            .into_iter()
            .map(|class| (class, rate.fare(class, distance)))
            .collect();

        Self {
            trip_id,
            train_class: train_class.into(),
            route: route.into(),
            origin_station: origin_station.into(),
            dest_station: dest_station.into(),
            departure_time,
            fare_by_class,
        }
    }

    /// Fare for a seat class, if the quote carries one.
    pub fn fare_for(&self, class: SeatClass) -> Option<Money> {
        self.fare_by_class.get(&class).copied()
    }
}
