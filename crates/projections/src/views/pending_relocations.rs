//! Relocations prepared but not yet completed or abandoned.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, SagaId};
use domain::{Shard, TripId};
use journal::JournalEntry;
use saga::RebookEvent;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition, decode};
use crate::read_model::ReadModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRelocationSummary {
    pub saga_id: SagaId,
    pub order_id: OrderId,
    pub from: Shard,
    pub to: Shard,
    /// Trip the order was rebooked onto.
    pub trip_id: TripId,
    pub prepared_at: DateTime<Utc>,
}

#[derive(Default)]
struct PendingRelocationsState {
    pending: HashMap<SagaId, PendingRelocationSummary>,
    position: ProjectionPosition,
}

/// Relocations the reconciler still has to look at.
#[derive(Clone, Default)]
pub struct PendingRelocationsView {
    state: Arc<RwLock<PendingRelocationsState>>,
}

impl PendingRelocationsView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pending relocation, oldest first.
    pub async fn pending(&self) -> Vec<PendingRelocationSummary> {
        let mut pending: Vec<_> = self.state.read().await.pending.values().cloned().collect();
        pending.sort_by_key(|p| p.prepared_at);
        pending
    }

    /// Pending relocations prepared before `cutoff`.
    pub async fn older_than(&self, cutoff: DateTime<Utc>) -> Vec<PendingRelocationSummary> {
        self.pending()
            .await
            .into_iter()
            .filter(|p| p.prepared_at < cutoff)
            .collect()
    }

    pub async fn is_pending(&self, saga_id: SagaId) -> bool {
        self.state.read().await.pending.contains_key(&saga_id)
    }
}

#[async_trait]
impl Projection for PendingRelocationsView {
    fn name(&self) -> &'static str {
        "PendingRelocationsView"
    }

    async fn handle(&self, entry: &JournalEntry) -> Result<()> {
        let event = decode(entry)?;
        let mut state = self.state.write().await;

        match event {
            RebookEvent::RelocationPrepared(data) => {
                state.pending.insert(
                    entry.saga_id,
                    PendingRelocationSummary {
                        saga_id: entry.saga_id,
                        order_id: entry.order_id,
                        from: data.from,
                        to: data.to,
                        trip_id: data.order.train_number,
                        prepared_at: data.prepared_at,
                    },
                );
            }
            RebookEvent::RelocationCompleted(_) | RebookEvent::RelocationAbandoned(_) => {
                state.pending.remove(&entry.saga_id);
            }
            _ => {}
        }

        state.position = state.position.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.pending.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for PendingRelocationsView {
    fn name(&self) -> &'static str {
        "PendingRelocationsView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.pending.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, record_committed_rebook, request_for, sample_order};
    use chrono::Duration;
    use domain::PaymentMode;
    use journal::{InMemoryJournal, JournalQuery, SagaJournal};

    async fn project(journal: &InMemoryJournal) -> PendingRelocationsView {
        let view = PendingRelocationsView::new();
        for entry in journal.query(JournalQuery::new()).await.unwrap() {
            view.handle(&entry).await.unwrap();
        }
        view
    }

    fn relocated(order: &domain::Order, trip: &str) -> domain::Order {
        let mut moved = order.clone();
        moved.train_number = TripId::new(trip);
        moved
    }

    #[tokio::test]
    async fn prepared_relocation_is_pending_until_completed() {
        let journal = InMemoryJournal::new();
        let order = sample_order();
        let request = request_for(&order, "K1345");
        let prepared = RebookEvent::relocation_prepared(
            Shard::Primary,
            Shard::Secondary,
            relocated(&order, "K1345"),
        );
        record(&journal, &request, PaymentMode::Automatic, vec![prepared]).await;

        let view = project(&journal).await;
        let pending = view.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order_id, order.id);
        assert_eq!(pending[0].from, Shard::Primary);
        assert_eq!(pending[0].trip_id, TripId::new("K1345"));

        record(
            &journal,
            &request,
            PaymentMode::Automatic,
            vec![RebookEvent::relocation_completed(false)],
        )
        .await;
        let view = project(&journal).await;
        assert!(view.pending().await.is_empty());
        assert!(!view.is_pending(request.saga_id()).await);
    }

    #[tokio::test]
    async fn abandoned_relocation_is_not_pending() {
        let journal = InMemoryJournal::new();
        let order = sample_order();
        let request = request_for(&order, "K1345");
        record(
            &journal,
            &request,
            PaymentMode::Automatic,
            vec![
                RebookEvent::relocation_prepared(
                    Shard::Primary,
                    Shard::Secondary,
                    relocated(&order, "K1345"),
                ),
                RebookEvent::relocation_abandoned("Order already exist"),
            ],
        )
        .await;

        let view = project(&journal).await;
        assert_eq!(ReadModel::count(&view), 0);
    }

    #[tokio::test]
    async fn same_shard_rebook_never_shows_up() {
        let journal = InMemoryJournal::new();
        record_committed_rebook(&journal).await;

        let view = project(&journal).await;
        assert!(view.pending().await.is_empty());
        assert_eq!(view.position().await.entries_processed, journal.len().await as u64);
    }

    #[tokio::test]
    async fn older_than_filters_by_prepared_at() {
        let journal = InMemoryJournal::new();
        let order = sample_order();
        let request = request_for(&order, "K1345");
        record(
            &journal,
            &request,
            PaymentMode::Automatic,
            vec![RebookEvent::relocation_prepared(
                Shard::Primary,
                Shard::Secondary,
                relocated(&order, "K1345"),
            )],
        )
        .await;

        let view = project(&journal).await;
        assert_eq!(view.older_than(Utc::now() + Duration::minutes(1)).await.len(), 1);
        assert!(view.older_than(Utc::now() - Duration::minutes(1)).await.is_empty());
    }
}
