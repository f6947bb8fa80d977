use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{AppendOptions, EntryStream, SagaJournal, validate_append};
use crate::{JournalEntry, JournalError, JournalQuery, Result, SagaId, Sequence};

#[derive(Default)]
struct Inner {
    /// Every entry in append order.
    log: Vec<JournalEntry>,
    /// Head sequence per saga.
    heads: HashMap<SagaId, Sequence>,
}

/// In-memory journal, used by tests and by the server when no database is
/// configured.
#[derive(Clone, Default)]
pub struct InMemoryJournal {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all sagas.
    pub async fn len(&self) -> usize {
        self.inner.read().await.log.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.log.is_empty()
    }
}

#[async_trait]
impl SagaJournal for InMemoryJournal {
    async fn append(&self, entries: Vec<JournalEntry>, options: AppendOptions) -> Result<Sequence> {
        validate_append(&entries)?;

        let saga_id = entries[0].saga_id;
        let first = entries[0].sequence;

        let mut inner = self.inner.write().await;
        let head = inner
            .heads
            .get(&saga_id)
            .copied()
            .unwrap_or(Sequence::initial());

        if let Some(expected) = options.expected_sequence
            && head != expected
        {
            tracing::debug!(%saga_id, %expected, actual = %head, "journal sequence conflict");
            return Err(JournalError::SequenceConflict {
                saga_id,
                expected,
                actual: head,
            });
        }

        // Mirrors the unique (saga_id, sequence) constraint of the database.
        if first != head.next() {
            return Err(JournalError::SequenceConflict {
                saga_id,
                expected: options.expected_sequence.unwrap_or(head),
                actual: head,
            });
        }

        let last = entries.last().map(|e| e.sequence).unwrap_or(head);
        let count = entries.len() as u64;
        inner.heads.insert(saga_id, last);
        inner.log.extend(entries);

        metrics::counter!("journal_entries_appended_total", "backend" => "memory").increment(count);
        Ok(last)
    }

    async fn read_saga(&self, saga_id: SagaId) -> Result<Vec<JournalEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<_> = inner
            .log
            .iter()
            .filter(|e| e.saga_id == saga_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn query(&self, query: JournalQuery) -> Result<Vec<JournalEntry>> {
        let inner = self.inner.read().await;
        let matching = inner.log.iter().filter(|e| query.matches(e)).cloned();
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn stream_all(&self) -> Result<EntryStream> {
        use futures_util::stream;

        let log = self.inner.read().await.log.clone();
        Ok(Box::pin(stream::iter(log.into_iter().map(Ok))))
    }

    async fn head(&self, saga_id: SagaId) -> Result<Option<Sequence>> {
        Ok(self.inner.read().await.heads.get(&saga_id).copied())
    }
}
