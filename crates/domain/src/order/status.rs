use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lifecycle status of an order.
///
/// Carried as an integer code by the order partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum OrderStatus {
    NotPaid,
    Paid,
    Collected,
    /// Rebooked at least once.
    Changed,
    Cancelled,
    Refunded,
    /// Ticket used.
    Finished,
}

impl OrderStatus {
    pub fn code(&self) -> i32 {
        match self {
            OrderStatus::NotPaid => 0,
            OrderStatus::Paid => 1,
            OrderStatus::Collected => 2,
            OrderStatus::Changed => 3,
            OrderStatus::Cancelled => 4,
            OrderStatus::Refunded => 5,
            OrderStatus::Finished => 6,
        }
    }

    /// Only paid tickets, rebooked or not, can move to another trip.
    pub fn is_rebookable(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Changed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::NotPaid => "NotPaid",
            OrderStatus::Paid => "Paid",
            OrderStatus::Collected => "Collected",
            OrderStatus::Changed => "Changed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
            OrderStatus::Finished => "Finished",
        }
    }
}

impl TryFrom<i32> for OrderStatus {
    type Error = DomainError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => OrderStatus::NotPaid,
            1 => OrderStatus::Paid,
            2 => OrderStatus::Collected,
            3 => OrderStatus::Changed,
            4 => OrderStatus::Cancelled,
            5 => OrderStatus::Refunded,
            6 => OrderStatus::Finished,
            other => return Err(DomainError::UnknownOrderStatus(other)),
        })
    }
}

impl From<OrderStatus> for i32 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
