//! Storing the rebooked order, across partitions if needed.

use std::sync::Arc;
use std::time::Duration;

use domain::{Order, Shard};
use journal::SagaJournal;

use crate::error::Result;
use crate::events::RebookEvent;
use crate::recorder::SagaRecorder;
use crate::services::{OrderStore, within};

/// How the rebooked order reached its partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Rewritten in place.
    Updated(Order),
    /// Inserted into the new partition and removed from the old one.
    Relocated(Order),
    /// Inserted into the new partition; the old copy is still there and the
    /// relocation stays pending for the reconciler.
    RelocationPending(Order),
}

impl CommitOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CommitOutcome::Updated(order)
            | CommitOutcome::Relocated(order)
            | CommitOutcome::RelocationPending(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            CommitOutcome::Updated(order)
            | CommitOutcome::Relocated(order)
            | CommitOutcome::RelocationPending(order) => order,
        }
    }
}

/// Writes committed orders to the order partitions.
#[derive(Clone)]
pub struct Relocator {
    orders: Arc<dyn OrderStore>,
    timeout: Duration,
}

impl Relocator {
    pub fn new(orders: Arc<dyn OrderStore>, timeout: Duration) -> Self {
        Self { orders, timeout }
    }

    /// Stores `order` in `to`, removing it from `from` when they differ.
    ///
    /// An error means the new copy was not accepted and nothing changed in
    /// either partition.
    #[tracing::instrument(skip_all, fields(order_id = %order.id, %from, %to))]
    pub async fn commit<J>(
        &self,
        recorder: &mut SagaRecorder<'_, J>,
        from: Shard,
        to: Shard,
        order: &Order,
    ) -> Result<CommitOutcome>
    where
        J: SagaJournal + ?Sized,
    {
        if from == to {
            within(self.timeout, "order", self.orders.update(to, order)).await?;
            return Ok(CommitOutcome::Updated(order.clone()));
        }

        recorder
            .record(RebookEvent::relocation_prepared(from, to, order.clone()))
            .await?;

        if let Err(err) = within(self.timeout, "order", self.orders.create(to, order)).await {
            recorder
                .record(RebookEvent::relocation_abandoned(err.to_string()))
                .await?;
            return Err(err);
        }

        if let Err(err) = within(self.timeout, "order", self.orders.delete(from, order.id)).await {
            tracing::warn!(error = %err, "old copy not deleted, relocation left pending");
            metrics::counter!("relocations_pending_total").increment(1);
            return Ok(CommitOutcome::RelocationPending(order.clone()));
        }

        recorder
            .record(RebookEvent::relocation_completed(false))
            .await?;
        metrics::counter!("relocations_total").increment(1);
        tracing::info!("order relocated");

        Ok(CommitOutcome::Relocated(order.clone()))
    }
}
