use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{JournalEntry, JournalError, JournalQuery, Result, SagaId, Sequence};

/// Options for appending to a saga stream.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Sequence the stream must be at before the append.
    /// `None` skips the check.
    pub expected_sequence: Option<Sequence>,
}

impl AppendOptions {
    /// No sequence check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the stream to be exactly at `sequence`.
    pub fn expect_sequence(sequence: Sequence) -> Self {
        Self {
            expected_sequence: Some(sequence),
        }
    }

    /// Require the stream to be empty.
    pub fn expect_new() -> Self {
        Self::expect_sequence(Sequence::initial())
    }
}

/// A stream of journal entries.
pub type EntryStream = Pin<Box<dyn Stream<Item = Result<JournalEntry>> + Send>>;

/// Storage for saga journals.
///
/// Implementations must be safe to share between request handlers.
#[async_trait]
pub trait SagaJournal: Send + Sync {
    /// Appends a contiguous run of entries to one saga stream.
    ///
    /// Fails with `SequenceConflict` if `options.expected_sequence` is set
    /// and the stream has moved. Returns the new head sequence.
    async fn append(&self, entries: Vec<JournalEntry>, options: AppendOptions) -> Result<Sequence>;

    /// Returns every entry of a saga, oldest first.
    async fn read_saga(&self, saga_id: SagaId) -> Result<Vec<JournalEntry>>;

    /// Returns entries matching the query, in append order.
    async fn query(&self, query: JournalQuery) -> Result<Vec<JournalEntry>>;

    /// Streams every entry in the journal in append order.
    async fn stream_all(&self) -> Result<EntryStream>;

    /// Returns the head sequence of a saga, or `None` if it has no entries.
    async fn head(&self, saga_id: SagaId) -> Result<Option<Sequence>>;
}

/// Convenience helpers over any journal.
#[async_trait]
pub trait JournalExt: SagaJournal {
    /// Appends a single entry.
    async fn append_one(&self, entry: JournalEntry, options: AppendOptions) -> Result<Sequence> {
        self.append(vec![entry], options).await
    }

    /// Returns true if the saga has at least one entry.
    async fn saga_exists(&self, saga_id: SagaId) -> Result<bool> {
        Ok(self.head(saga_id).await?.is_some())
    }
}

impl<T: SagaJournal + ?Sized> JournalExt for T {}

/// Checks that a batch targets one saga with consecutive sequences.
pub fn validate_append(entries: &[JournalEntry]) -> Result<()> {
    let Some(first) = entries.first() else {
        return Err(JournalError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut expected = first.sequence;
    for entry in entries.iter().skip(1) {
        if entry.saga_id != first.saga_id {
            return Err(JournalError::InvalidAppend(
                "all entries must belong to the same saga".to_string(),
            ));
        }
        expected = expected.next();
        if entry.sequence != expected {
            return Err(JournalError::InvalidAppend(format!(
                "sequences must be consecutive: expected {expected}, got {}",
                entry.sequence
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderId;

    fn entry(saga_id: SagaId, sequence: i64) -> JournalEntry {
        JournalEntry::builder()
            .entry_type("Step")
            .saga_id(saga_id)
            .order_id(OrderId::new())
            .sequence(Sequence::new(sequence))
            .build()
    }

    #[test]
    fn rejects_empty_batch() {
        assert!(matches!(
            validate_append(&[]),
            Err(JournalError::InvalidAppend(_))
        ));
    }

    #[test]
    fn rejects_mixed_sagas() {
        let a = SagaId::for_key("a");
        let b = SagaId::for_key("b");
        assert!(validate_append(&[entry(a, 1), entry(b, 2)]).is_err());
    }

    #[test]
    fn rejects_gaps() {
        let a = SagaId::for_key("a");
        assert!(validate_append(&[entry(a, 1), entry(a, 3)]).is_err());
    }

    #[test]
    fn accepts_consecutive_run() {
        let a = SagaId::for_key("a");
        assert!(validate_append(&[entry(a, 4), entry(a, 5), entry(a, 6)]).is_ok());
    }
}
