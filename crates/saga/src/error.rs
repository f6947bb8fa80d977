//! Rebook error taxonomy.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{DomainError, OrderStatus, TripId};
use journal::JournalError;
use thiserror::Error;

/// Errors that end a rebook saga or fail a gateway call.
#[derive(Debug, Error)]
pub enum RebookError {
    /// Request rejected at the boundary.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The order is not in the partition derived from the source trip.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is in a status that cannot be rebooked.
    #[error("Order {order_id} cannot be rebooked in status {status}")]
    OrderNotRebookable {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The booked trip departed too long ago.
    #[error("Too late to change order {order_id}: departed at {departure}")]
    TooLateToChange {
        order_id: OrderId,
        departure: DateTime<Utc>,
    },

    /// The target trip is unknown.
    #[error("Trip not found: {0}")]
    TripNotFound(TripId),

    /// No price table entry for the trip's route and train type.
    #[error("No route or price for route {route} and train type {train_type}")]
    RouteOrPriceNotFound { route: String, train_type: String },

    /// The target trip has no seat left in the requested class.
    #[error("No seat available on {0}")]
    SeatNotAvailable(TripId),

    /// A collaborator timed out, refused, or returned an unusable response.
    #[error("Service '{service}' unavailable: {reason}")]
    ServiceUnavailable {
        service: &'static str,
        reason: String,
    },

    /// Another rebook of the same order holds the lock.
    #[error("A rebook of order {0} is already in progress")]
    RebookInProgress(OrderId),

    /// Journal failure.
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    /// Journal payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RebookError {
    pub fn unavailable(service: &'static str, reason: impl Into<String>) -> Self {
        RebookError::ServiceUnavailable {
            service,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code carried in failure envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            RebookError::MalformedInput(_) => "MALFORMED_INPUT",
            RebookError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            RebookError::OrderNotRebookable { .. } => "ORDER_NOT_REBOOKABLE",
            RebookError::TooLateToChange { .. } => "TOO_LATE_TO_CHANGE",
            RebookError::TripNotFound(_) => "TRIP_NOT_FOUND",
            RebookError::RouteOrPriceNotFound { .. } => "ROUTE_OR_PRICE_NOT_FOUND",
            RebookError::SeatNotAvailable(_) => "SEAT_NOT_AVAILABLE",
            RebookError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            RebookError::RebookInProgress(_) => "REBOOK_IN_PROGRESS",
            RebookError::Journal(JournalError::SequenceConflict { .. }) => "REBOOK_IN_PROGRESS",
            RebookError::Journal(_) | RebookError::Serialization(_) => "INTERNAL",
        }
    }

    /// True for failures the saga reports as a named outcome rather than a
    /// server fault.
    pub fn is_saga_outcome(&self) -> bool {
        !matches!(self.code(), "MALFORMED_INPUT" | "INTERNAL")
    }
}

impl From<DomainError> for RebookError {
    fn from(err: DomainError) -> Self {
        RebookError::MalformedInput(err.to_string())
    }
}

/// Convenience type alias for rebook results.
pub type Result<T> = std::result::Result<T, RebookError>;
