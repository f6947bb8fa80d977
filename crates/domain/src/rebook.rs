//! Rebook requests: wire form, validation and idempotency key.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use common::{ActorId, OrderId, SagaId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::order::SeatClass;
use crate::trip::TripId;

/// Body of `POST /rebook` and `POST /rebook/difference`.
///
/// Every field defaults so that missing values surface as
/// [`DomainError::MalformedInput`] from [`RebookForm::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RebookForm {
    pub login_id: String,
    pub order_id: String,
    pub old_trip_id: String,
    pub trip_id: String,
    pub seat_type: i32,
    pub date: String,
}

impl RebookForm {
    /// Validates the form into a request. No I/O.
    pub fn validate(&self) -> Result<RebookRequest, DomainError> {
        let actor_id = ActorId::parse(self.login_id.trim())
            .map_err(|e| DomainError::malformed("loginId", e.to_string()))?;
        let order_id = OrderId::parse(self.order_id.trim())
            .map_err(|e| DomainError::malformed("orderId", e.to_string()))?;
        let source_trip_id = trip_id("oldTripId", &self.old_trip_id)?;
        let target_trip_id = trip_id("tripId", &self.trip_id)?;
        let requested_date = parse_date(&self.date)?;

        Ok(RebookRequest {
            actor_id,
            order_id,
            source_trip_id,
            target_trip_id,
            seat_class: SeatClass::from_code(self.seat_type),
            requested_date,
        })
    }
}

fn trip_id(field: &'static str, raw: &str) -> Result<TripId, DomainError> {
    let id = TripId::new(raw.trim());
    if id.is_empty() {
        return Err(DomainError::malformed(field, "must not be empty"));
    }
    Ok(id)
}

/// Accepts `2026-05-04`, `2026-05-04 09:00:00` and RFC 3339 timestamps.
fn parse_date(raw: &str) -> Result<NaiveDate, DomainError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(at.date());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.date_naive())
        .map_err(|_| DomainError::malformed("date", format!("unparseable date '{raw}'")))
}

/// A validated rebook request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebookRequest {
    pub actor_id: ActorId,
    pub order_id: OrderId,
    pub source_trip_id: TripId,
    pub target_trip_id: TripId,
    pub seat_class: SeatClass,
    pub requested_date: NaiveDate,
}

impl RebookRequest {
    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::new(self.order_id, &self.target_trip_id)
    }

    pub fn saga_id(&self) -> SagaId {
        self.idempotency_key().saga_id()
    }
}

/// Identifies one rebook of one order onto one trip: `"<orderId>:<tripId>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(order_id: OrderId, target_trip_id: &TripId) -> Self {
        Self(format!("{order_id}:{target_trip_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic saga stream id for this key.
    pub fn saga_id(&self) -> SagaId {
        SagaId::for_key(&self.0)
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
