//! Rebook saga state machine.

use serde::{Deserialize, Serialize};

/// Where a rebook attempt stands.
///
/// ```text
/// NotStarted ─► Start ─► OrderResolved ─► FareQuoted ─► SettlementDecided ─► SeatReserved ─► Committed
///                 │            │               │                │                  │
///                 └────────────┴───────────────┴───────┬────────┴──────────────────┴─► Aborted
///                                                      └─► AwaitingPayment (resumable)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RebookState {
    #[default]
    NotStarted,

    /// Attempt recorded; the order has not been looked up yet.
    Start,

    OrderResolved,

    FareQuoted,

    SettlementDecided,

    SeatReserved,

    /// The rebooked order is stored (terminal).
    Committed,

    /// Positive delta not yet paid. A confirmed payment starts a new attempt.
    AwaitingPayment,

    /// Ended without a commit (terminal for the attempt).
    Aborted,
}

impl RebookState {
    /// Returns true once the attempt can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RebookState::Committed | RebookState::AwaitingPayment | RebookState::Aborted
        )
    }

    /// Returns true if a new attempt may be started on this saga.
    pub fn can_start(&self) -> bool {
        !matches!(self, RebookState::Committed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RebookState::NotStarted => "NotStarted",
            RebookState::Start => "Start",
            RebookState::OrderResolved => "OrderResolved",
            RebookState::FareQuoted => "FareQuoted",
            RebookState::SettlementDecided => "SettlementDecided",
            RebookState::SeatReserved => "SeatReserved",
            RebookState::Committed => "Committed",
            RebookState::AwaitingPayment => "AwaitingPayment",
            RebookState::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for RebookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
