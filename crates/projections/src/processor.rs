//! Feeds journal entries to projections.

use futures_util::StreamExt;
use journal::{JournalEntry, SagaJournal};

use crate::Result;
use crate::projection::Projection;

/// Delivers journal entries to registered projections.
///
/// - Catch-up streams the whole journal and hands each projection only the
///   entries past its position
/// - Single-entry delivery pushes one freshly appended entry
/// - Rebuild resets every projection and catches up from scratch
pub struct ProjectionProcessor<J: SagaJournal> {
    journal: J,
    projections: Vec<Box<dyn Projection>>,
}

impl<J: SagaJournal> ProjectionProcessor<J> {
    pub fn new(journal: J) -> Self {
        Self {
            journal,
            projections: Vec::new(),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let mut stream = self.journal.stream_all().await?;
        let mut index: u64 = 0;
        let mut delivered: u64 = 0;

        while let Some(entry) = stream.next().await {
            let entry = entry?;
            index += 1;

            for projection in &self.projections {
                if projection.position().await.entries_processed < index {
                    projection.handle(&entry).await?;
                    delivered += 1;
                }
            }
        }

        metrics::counter!("projection_entries_processed_total").increment(delivered);
        tracing::debug!(entries = index, delivered, "catch-up complete");
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(entry_type = %entry.entry_type, saga_id = %entry.saga_id))]
    pub async fn process_entry(&self, entry: &JournalEntry) -> Result<()> {
        for projection in &self.projections {
            projection.handle(entry).await?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        for projection in &self.projections {
            tracing::info!(projection = projection.name(), "resetting projection");
            projection.reset().await?;
        }
        self.run_catch_up().await
    }
}
