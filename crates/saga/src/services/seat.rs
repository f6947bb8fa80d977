//! Seat reservation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::{SeatClass, TripId};
use serde::{Deserialize, Serialize};

use super::http::ServiceClient;
use super::{read, write};
use crate::error::{RebookError, Result};

/// Body of `POST /seats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRequest {
    pub trip_id: TripId,
    pub travel_date: NaiveDate,
    pub seat_class: SeatClass,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAssignment {
    pub seat_number: String,
}

#[async_trait]
pub trait SeatAllocator: Send + Sync {
    /// Reserves one seat. `None` means no capacity left in the class.
    async fn reserve(&self, request: &SeatRequest) -> Result<Option<SeatAssignment>>;
}

const DEFAULT_CAPACITY: u32 = 100;

#[derive(Debug, Default)]
struct InMemorySeatState {
    capacity: HashMap<(TripId, SeatClass), u32>,
    reserved: Vec<(SeatRequest, SeatAssignment)>,
    reserve_calls: usize,
    fail_on_reserve: bool,
    delay: Option<Duration>,
}

/// In-memory seat inventory for testing.
///
/// Trips without an explicit capacity start with 100 seats per class.
#[derive(Debug, Clone, Default)]
pub struct InMemorySeatAllocator {
    state: Arc<RwLock<InMemorySeatState>>,
}

impl InMemorySeatAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_capacity(&self, trip_id: TripId, class: SeatClass, seats: u32) {
        write(&self.state).capacity.insert((trip_id, class), seats);
    }

    pub fn reserve_calls(&self) -> usize {
        read(&self.state).reserve_calls
    }

    pub fn reservation_count(&self) -> usize {
        read(&self.state).reserved.len()
    }

    pub fn set_fail_on_reserve(&self, fail: bool) {
        write(&self.state).fail_on_reserve = fail;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        write(&self.state).delay = delay;
    }
}

#[async_trait]
impl SeatAllocator for InMemorySeatAllocator {
    async fn reserve(&self, request: &SeatRequest) -> Result<Option<SeatAssignment>> {
        let delay = read(&self.state).delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = write(&self.state);
        state.reserve_calls += 1;
        if state.fail_on_reserve {
            return Err(RebookError::unavailable("seat", "seat service unreachable"));
        }

        let remaining = state
            .capacity
            .entry((request.trip_id.clone(), request.seat_class))
            .or_insert(DEFAULT_CAPACITY);
        if *remaining == 0 {
            return Ok(None);
        }
        *remaining -= 1;

        let number = state
            .reserved
            .iter()
            .filter(|(r, _)| r.trip_id == request.trip_id && r.seat_class == request.seat_class)
            .count()
            + 1;
        let assignment = SeatAssignment {
            seat_number: format!("{}-{number}", request.seat_class),
        };
        state.reserved.push((request.clone(), assignment.clone()));
        Ok(Some(assignment))
    }
}

/// HTTP client for the seat service.
#[derive(Debug, Clone)]
pub struct HttpSeatAllocator {
    client: ServiceClient,
}

impl HttpSeatAllocator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new("seat", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl SeatAllocator for HttpSeatAllocator {
    #[tracing::instrument(skip_all, fields(trip_id = %request.trip_id, seat_class = %request.seat_class))]
    async fn reserve(&self, request: &SeatRequest) -> Result<Option<SeatAssignment>> {
        let envelope = self
            .client
            .post::<_, SeatAssignment>("/seats", request)
            .await?;
        Ok(envelope.into_data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(class: SeatClass) -> SeatRequest {
        SeatRequest {
            trip_id: TripId::new("K1345"),
            travel_date: NaiveDate::from_ymd_opt(2026, 5, 6).unwrap(),
            seat_class: class,
            from: "shanghai".into(),
            to: "nanjing".into(),
        }
    }

    #[tokio::test]
    async fn assigns_numbered_seats_per_class() {
        let seats = InMemorySeatAllocator::new();
        let first = seats.reserve(&request(SeatClass::Economy)).await.unwrap().unwrap();
        let second = seats.reserve(&request(SeatClass::Economy)).await.unwrap().unwrap();
        let comfort = seats.reserve(&request(SeatClass::Comfort)).await.unwrap().unwrap();

        assert_eq!(first.seat_number, "Economy-1");
        assert_eq!(second.seat_number, "Economy-2");
        assert_eq!(comfort.seat_number, "Comfort-1");
        assert_eq!(seats.reservation_count(), 3);
    }

    #[tokio::test]
    async fn sold_out_class_is_empty() {
        let seats = InMemorySeatAllocator::new();
        seats.set_capacity(TripId::new("K1345"), SeatClass::Comfort, 1);

        assert!(seats.reserve(&request(SeatClass::Comfort)).await.unwrap().is_some());
        assert!(seats.reserve(&request(SeatClass::Comfort)).await.unwrap().is_none());
        assert!(seats.reserve(&request(SeatClass::Economy)).await.unwrap().is_some());
        assert_eq!(seats.reserve_calls(), 3);
    }

    #[tokio::test]
    async fn fail_on_reserve() {
        let seats = InMemorySeatAllocator::new();
        seats.set_fail_on_reserve(true);
        assert!(seats.reserve(&request(SeatClass::Economy)).await.is_err());
        assert_eq!(seats.reservation_count(), 0);
    }
}
