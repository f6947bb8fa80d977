//! Read models over the rebook saga journal.
//!
//! - [`Projection`] trait for folding journal entries into a read model
//! - [`ReadModel`] trait for query access
//! - [`ProjectionProcessor`] for feeding journal entries to projections
//! - Two views: per-order rebook history and pending relocations

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{
    AttemptOutcome, PendingRelocationSummary, PendingRelocationsView, RebookAttempt,
    RebookHistoryView,
};
