//! Domain error types.

use thiserror::Error;

/// Errors raised by domain validation and decoding.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A request field could not be parsed or is empty.
    #[error("Malformed {field}: {reason}")]
    MalformedInput { field: &'static str, reason: String },

    /// A monetary amount is not a valid decimal.
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    /// An order status code outside the known set.
    #[error("Unknown order status code {0}")]
    UnknownOrderStatus(i32),
}

impl DomainError {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        DomainError::MalformedInput {
            field,
            reason: reason.into(),
        }
    }
}
