//! Append-only journal of rebooking saga steps.
//!
//! Every saga owns one stream of entries, keyed by its [`SagaId`]. Entries
//! are appended with an optimistic sequence check and replayed in order to
//! rebuild the saga state.

pub mod entry;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{OrderId, SagaId};
pub use entry::{EntryId, JournalEntry, JournalEntryBuilder, Sequence};
pub use error::{JournalError, Result};
pub use memory::InMemoryJournal;
pub use postgres::PostgresJournal;
pub use query::JournalQuery;
pub use store::{AppendOptions, EntryStream, JournalExt, SagaJournal};
