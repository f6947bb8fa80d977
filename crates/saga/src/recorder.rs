//! Appends saga events to the journal and folds them into the saga.

use common::{OrderId, SagaId};
use domain::{Aggregate, DomainEvent};
use journal::{AppendOptions, JournalEntry, SagaJournal};

use crate::aggregate::RebookSaga;
use crate::error::Result;
use crate::events::RebookEvent;

/// Rebuilds a saga from its journal stream. `None` if nothing was recorded.
pub async fn load_saga<J>(journal: &J, saga_id: SagaId) -> Result<Option<RebookSaga>>
where
    J: SagaJournal + ?Sized,
{
    let entries = journal.read_saga(saga_id).await?;
    let Some(last) = entries.last().map(|e| e.sequence) else {
        return Ok(None);
    };

    let mut saga = RebookSaga::default();
    for entry in &entries {
        saga.apply(entry.decode::<RebookEvent>()?);
    }
    saga.set_sequence(last);
    Ok(Some(saga))
}

/// Write side of one saga stream.
///
/// Every append expects the stream to be where this recorder last saw it,
/// so a second writer on the same saga fails with a sequence conflict.
pub struct SagaRecorder<'a, J: SagaJournal + ?Sized> {
    journal: &'a J,
    saga_id: SagaId,
    order_id: OrderId,
    saga: RebookSaga,
}

impl<'a, J: SagaJournal + ?Sized> SagaRecorder<'a, J> {
    /// Loads the stream, or starts an empty one.
    pub async fn load(journal: &'a J, saga_id: SagaId, order_id: OrderId) -> Result<Self> {
        let saga = load_saga(journal, saga_id).await?.unwrap_or_default();
        Ok(Self {
            journal,
            saga_id,
            order_id,
            saga,
        })
    }

    pub fn saga(&self) -> &RebookSaga {
        &self.saga
    }

    pub fn saga_id(&self) -> SagaId {
        self.saga_id
    }

    pub fn into_saga(self) -> RebookSaga {
        self.saga
    }

    pub async fn record(&mut self, event: RebookEvent) -> Result<()> {
        let current = self.saga.sequence();
        let entry = JournalEntry::builder()
            .entry_type(event.event_type())
            .saga_id(self.saga_id)
            .order_id(self.order_id)
            .sequence(current.next())
            .payload(&event)?
            .build();

        let head = self
            .journal
            .append(vec![entry], AppendOptions::expect_sequence(current))
            .await?;

        tracing::debug!(saga_id = %self.saga_id, step = event.event_type(), %head, "saga step recorded");
        self.saga.apply(event);
        self.saga.set_sequence(head);
        Ok(())
    }
}
