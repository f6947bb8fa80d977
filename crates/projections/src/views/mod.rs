//! Read model views over the rebook journal.

pub mod pending_relocations;
pub mod rebook_history;

pub use pending_relocations::{PendingRelocationSummary, PendingRelocationsView};
pub use rebook_history::{AttemptOutcome, RebookAttempt, RebookHistoryView};
