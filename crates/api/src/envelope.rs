//! Response envelope `{status, msg, data, code}`.

use serde::Serialize;

/// Committed rebook.
pub const STATUS_OK: i32 = 1;
/// Difference payment needed; `data` is an unpersisted preview.
pub const STATUS_AWAITING_PAYMENT: i32 = 2;
/// Named failure; `code` says which.
pub const STATUS_FAILED: i32 = 0;

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub status: i32,
    pub msg: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> Envelope<T> {
    pub fn ok(msg: impl Into<String>, data: T) -> Self {
        Self {
            status: STATUS_OK,
            msg: msg.into(),
            data: Some(data),
            code: None,
        }
    }

    pub fn awaiting_payment(msg: impl Into<String>, preview: T) -> Self {
        Self {
            status: STATUS_AWAITING_PAYMENT,
            msg: msg.into(),
            data: Some(preview),
            code: None,
        }
    }
}

impl Envelope<()> {
    pub fn failed(code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAILED,
            msg: msg.into(),
            data: None,
            code: Some(code),
        }
    }
}
