//! Trip metadata and the route price table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use domain::{Money, PriceRate, TripId, TripQuote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::http::ServiceClient;
use super::{read, write};
use crate::error::{RebookError, Result};

/// Body of `POST /trip_detail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetailQuery {
    pub trip_id: TripId,
    pub travel_date: NaiveDate,
    pub from: String,
    pub to: String,
}

/// Trip metadata for one segment of a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetail {
    pub trip_id: TripId,
    pub train_type: String,
    pub route_id: String,
    pub from: String,
    pub to: String,
    pub departure_time: NaiveTime,
    /// Segment distance between `from` and `to`.
    pub distance: Decimal,
}

impl TripDetail {
    pub fn priced(&self, rate: &PriceRate) -> TripQuote {
        TripQuote::priced(
            self.trip_id.clone(),
            self.train_type.clone(),
            self.route_id.clone(),
            self.from.clone(),
            self.to.clone(),
            self.departure_time,
            self.distance,
            rate,
        )
    }
}

/// Price table row for a (route, train type) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub route_id: String,
    pub train_type: String,
    pub basic_price_rate: Money,
    pub first_class_price_rate: Money,
}

impl PriceRecord {
    pub fn rate(&self) -> PriceRate {
        PriceRate::new(self.basic_price_rate, self.first_class_price_rate)
    }
}

#[async_trait]
pub trait TripFareGateway: Send + Sync {
    /// Metadata for a trip on a date. `None` if the trip is unknown.
    async fn trip_detail(&self, query: &TripDetailQuery) -> Result<Option<TripDetail>>;

    /// Price rates for a route and train type. `None` if not configured.
    async fn price(&self, route_id: &str, train_type: &str) -> Result<Option<PriceRecord>>;
}

#[derive(Debug, Default)]
struct InMemoryTripFareState {
    trips: HashMap<TripId, TripDetail>,
    prices: HashMap<(String, String), PriceRecord>,
    detail_calls: usize,
    price_calls: usize,
    fail_on_detail: bool,
    delay: Option<Duration>,
}

/// In-memory trip and price tables for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTripFareGateway {
    state: Arc<RwLock<InMemoryTripFareState>>,
}

impl InMemoryTripFareGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trip(&self, detail: TripDetail) {
        write(&self.state)
            .trips
            .insert(detail.trip_id.clone(), detail);
    }

    pub fn add_price(&self, record: PriceRecord) {
        write(&self.state).prices.insert(
            (record.route_id.clone(), record.train_type.clone()),
            record,
        );
    }

    /// Number of trip detail and price lookups.
    pub fn call_count(&self) -> usize {
        let state = read(&self.state);
        state.detail_calls + state.price_calls
    }

    pub fn set_fail_on_detail(&self, fail: bool) {
        write(&self.state).fail_on_detail = fail;
    }

    /// Makes every lookup sleep before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        write(&self.state).delay = delay;
    }

    fn delay(&self) -> Option<Duration> {
        read(&self.state).delay
    }
}

#[async_trait]
impl TripFareGateway for InMemoryTripFareGateway {
    async fn trip_detail(&self, query: &TripDetailQuery) -> Result<Option<TripDetail>> {
        if let Some(delay) = self.delay() {
            tokio::time::sleep(delay).await;
        }
        let mut state = write(&self.state);
        state.detail_calls += 1;
        if state.fail_on_detail {
            return Err(RebookError::unavailable("travel", "travel service unreachable"));
        }
        Ok(state.trips.get(&query.trip_id).cloned())
    }

    async fn price(&self, route_id: &str, train_type: &str) -> Result<Option<PriceRecord>> {
        if let Some(delay) = self.delay() {
            tokio::time::sleep(delay).await;
        }
        let mut state = write(&self.state);
        state.price_calls += 1;
        Ok(state
            .prices
            .get(&(route_id.to_string(), train_type.to_string()))
            .cloned())
    }
}

/// HTTP client for the travel and price services.
#[derive(Debug, Clone)]
pub struct HttpTripFareGateway {
    travel: ServiceClient,
    price: ServiceClient,
}

impl HttpTripFareGateway {
    pub fn new(travel_url: &str, price_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            travel: ServiceClient::new("travel", travel_url, timeout)?,
            price: ServiceClient::new("price", price_url, timeout)?,
        })
    }
}

#[async_trait]
impl TripFareGateway for HttpTripFareGateway {
    #[tracing::instrument(skip_all, fields(trip_id = %query.trip_id))]
    async fn trip_detail(&self, query: &TripDetailQuery) -> Result<Option<TripDetail>> {
        let envelope = self.travel.post::<_, TripDetail>("/trip_detail", query).await?;
        Ok(envelope.into_data())
    }

    #[tracing::instrument(skip(self))]
    async fn price(&self, route_id: &str, train_type: &str) -> Result<Option<PriceRecord>> {
        let envelope = self
            .price
            .get::<PriceRecord>(&format!("/prices/{route_id}/{train_type}"))
            .await?;
        Ok(envelope.into_data())
    }
}
