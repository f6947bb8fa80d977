//! Finishes relocations interrupted between insert and delete.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{OrderId, SagaId};
use journal::{JournalQuery, SagaJournal};
use serde::{Deserialize, Serialize};

use crate::aggregate::PendingRelocation;
use crate::coordinator::RebookCoordinator;
use crate::error::Result;
use crate::events::RebookEvent;
use crate::lock::OrderLocks;
use crate::recorder::{SagaRecorder, load_saga};
use crate::services::{OrderStore, within};

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Pending relocations examined.
    pub scanned: usize,
    /// Both partitions held the order; the old copy was deleted.
    pub duplicates_removed: usize,
    /// Only the old partition held it; the prepared record was inserted.
    pub rolled_forward: usize,
    /// Only the new partition held it; completion was recorded.
    pub completed: usize,
    /// Neither partition held the order. Left pending.
    pub unrecoverable: Vec<OrderId>,
    /// A rebook of the order was in flight.
    pub skipped: usize,
    /// Relocations whose repair failed this time, with the error.
    pub failed: Vec<String>,
}

impl ReconcileReport {
    pub fn recovered(&self) -> usize {
        self.duplicates_removed + self.rolled_forward + self.completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    DuplicateRemoved,
    RolledForward,
    Completed,
    Unrecoverable,
}

impl Resolution {
    fn as_str(&self) -> &'static str {
        match self {
            Resolution::DuplicateRemoved => "duplicate_removed",
            Resolution::RolledForward => "rolled_forward",
            Resolution::Completed => "completed",
            Resolution::Unrecoverable => "unrecoverable",
        }
    }
}

/// Sweeps the journal for `RelocationPrepared` entries without a matching
/// completion and repairs the order partitions.
pub struct RelocationReconciler<J: SagaJournal> {
    journal: J,
    orders: Arc<dyn OrderStore>,
    timeout: Duration,
    locks: OrderLocks,
}

impl<J: SagaJournal> RelocationReconciler<J> {
    pub fn new(journal: J, orders: Arc<dyn OrderStore>, timeout: Duration, locks: OrderLocks) -> Self {
        Self {
            journal,
            orders,
            timeout,
            locks,
        }
    }

    /// Shares the coordinator's journal, order store and locks.
    pub fn for_coordinator(coordinator: &RebookCoordinator<J>) -> Self
    where
        J: Clone,
    {
        Self::new(
            coordinator.journal().clone(),
            coordinator.gateways().orders.clone(),
            coordinator.settings().upstream_timeout,
            coordinator.locks().clone(),
        )
    }

    /// Saga ids with a relocation still pending, oldest first.
    pub async fn pending(&self) -> Result<Vec<(SagaId, PendingRelocation)>> {
        let mut pending = Vec::new();
        for saga_id in self.candidates().await? {
            if let Some(saga) = load_saga(&self.journal, saga_id).await?
                && let Some(relocation) = saga.pending_relocation()
            {
                pending.push((saga_id, relocation.clone()));
            }
        }
        Ok(pending)
    }

    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for (saga_id, relocation) in self.pending().await? {
            report.scanned += 1;
            let order_id = relocation.order.id;

            let Some(_guard) = self.locks.try_acquire(order_id) else {
                tracing::debug!(%order_id, "rebook in flight, skipping");
                report.skipped += 1;
                continue;
            };

            match self.resolve(saga_id, order_id).await {
                Ok(Some(Resolution::DuplicateRemoved)) => report.duplicates_removed += 1,
                Ok(Some(Resolution::RolledForward)) => report.rolled_forward += 1,
                Ok(Some(Resolution::Completed)) => report.completed += 1,
                Ok(Some(Resolution::Unrecoverable)) => report.unrecoverable.push(order_id),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%order_id, error = %err, "relocation repair failed");
                    report.failed.push(format!("{order_id}: {err}"));
                }
            }
        }

        if report.scanned > 0 {
            tracing::info!(
                scanned = report.scanned,
                recovered = report.recovered(),
                unrecoverable = report.unrecoverable.len(),
                "relocation sweep finished"
            );
        }
        Ok(report)
    }

    async fn candidates(&self) -> Result<Vec<SagaId>> {
        let entries = self
            .journal
            .query(JournalQuery::new().entry_types(["RelocationPrepared"]))
            .await?;

        let mut seen = HashSet::new();
        Ok(entries
            .into_iter()
            .map(|entry| entry.saga_id)
            .filter(|id| seen.insert(*id))
            .collect())
    }

    /// Repairs one relocation under the order's lock. `None` if it was
    /// completed since it was listed.
    async fn resolve(&self, saga_id: SagaId, order_id: OrderId) -> Result<Option<Resolution>> {
        let mut recorder = SagaRecorder::load(&self.journal, saga_id, order_id).await?;
        let Some(relocation) = recorder.saga().pending_relocation().cloned() else {
            return Ok(None);
        };
        let (from, to) = (relocation.from, relocation.to);

        let in_new = within(self.timeout, "order", self.orders.find(to, order_id))
            .await?
            .is_some();
        let in_old = within(self.timeout, "order", self.orders.find(from, order_id))
            .await?
            .is_some();

        let resolution = match (in_new, in_old) {
            (true, true) => {
                within(self.timeout, "order", self.orders.delete(from, order_id)).await?;
                Resolution::DuplicateRemoved
            }
            (true, false) => Resolution::Completed,
            (false, true) => {
                within(
                    self.timeout,
                    "order",
                    self.orders.create(to, &relocation.order),
                )
                .await?;
                within(self.timeout, "order", self.orders.delete(from, order_id)).await?;
                Resolution::RolledForward
            }
            (false, false) => {
                tracing::error!(%order_id, %from, %to, "order missing from both partitions");
                metrics::counter!("reconciler_unrecoverable_total").increment(1);
                return Ok(Some(Resolution::Unrecoverable));
            }
        };

        recorder
            .record(RebookEvent::relocation_completed(true))
            .await?;
        if !recorder.saga().is_committed() {
            let outcome = recorder.saga().plan().map(|plan| plan.committed_outcome());
            recorder
                .record(RebookEvent::rebook_committed(relocation.order, outcome))
                .await?;
        }

        metrics::counter!("reconciler_recovered_total", "resolution" => resolution.as_str())
            .increment(1);
        tracing::info!(%order_id, resolution = resolution.as_str(), "relocation recovered");
        Ok(Some(resolution))
    }
}
