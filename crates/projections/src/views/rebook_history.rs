//! Per-order history of rebook attempts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, SagaId};
use domain::{Money, PaymentMode, SettlementOutcome, TripId};
use journal::JournalEntry;
use saga::RebookEvent;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition, decode};
use crate::read_model::ReadModel;

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum AttemptOutcome {
    InProgress,
    Committed {
        settlement: Option<SettlementOutcome>,
    },
    AwaitingPayment,
    Aborted {
        code: String,
        reason: String,
    },
}

/// One run of a rebook saga. A retry of the same saga is a new attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebookAttempt {
    pub saga_id: SagaId,
    pub source_trip_id: TripId,
    pub target_trip_id: TripId,
    pub mode: PaymentMode,
    pub delta: Option<Money>,
    pub outcome: AttemptOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RebookAttempt {
    pub fn is_finished(&self) -> bool {
        self.outcome != AttemptOutcome::InProgress
    }
}

#[derive(Default)]
struct RebookHistoryState {
    attempts: HashMap<OrderId, Vec<RebookAttempt>>,
    position: ProjectionPosition,
}

impl RebookHistoryState {
    /// The latest attempt of `saga_id` on `order_id`.
    fn current(&mut self, order_id: OrderId, saga_id: SagaId) -> Option<&mut RebookAttempt> {
        self.attempts
            .get_mut(&order_id)?
            .iter_mut()
            .rev()
            .find(|a| a.saga_id == saga_id)
    }
}

/// Rebook attempts per order, oldest first.
#[derive(Clone, Default)]
pub struct RebookHistoryView {
    state: Arc<RwLock<RebookHistoryState>>,
}

impl RebookHistoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn history(&self, order_id: OrderId) -> Vec<RebookAttempt> {
        self.state
            .read()
            .await
            .attempts
            .get(&order_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The most recent attempt that committed, if any.
    pub async fn last_committed(&self, order_id: OrderId) -> Option<RebookAttempt> {
        self.history(order_id)
            .await
            .into_iter()
            .rev()
            .find(|a| matches!(a.outcome, AttemptOutcome::Committed { .. }))
    }

    /// Attempts aborted with `code`, across all orders.
    pub async fn aborted_with(&self, code: &str) -> Vec<RebookAttempt> {
        self.state
            .read()
            .await
            .attempts
            .values()
            .flatten()
            .filter(|a| matches!(&a.outcome, AttemptOutcome::Aborted { code: c, .. } if c == code))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Projection for RebookHistoryView {
    fn name(&self) -> &'static str {
        "RebookHistoryView"
    }

    async fn handle(&self, entry: &JournalEntry) -> Result<()> {
        let event = decode(entry)?;
        let (order_id, saga_id) = (entry.order_id, entry.saga_id);
        let mut state = self.state.write().await;

        match event {
            RebookEvent::RebookStarted(data) => {
                state.attempts.entry(order_id).or_default().push(RebookAttempt {
                    saga_id,
                    source_trip_id: data.request.source_trip_id,
                    target_trip_id: data.request.target_trip_id,
                    mode: data.mode,
                    delta: None,
                    outcome: AttemptOutcome::InProgress,
                    started_at: data.started_at,
                    finished_at: None,
                });
            }
            RebookEvent::SettlementDecided(data) => {
                if let Some(attempt) = state.current(order_id, saga_id) {
                    attempt.delta = Some(data.delta);
                }
            }
            RebookEvent::AwaitingPayment(data) => {
                if let Some(attempt) = state.current(order_id, saga_id) {
                    attempt.delta = Some(data.delta);
                    attempt.outcome = AttemptOutcome::AwaitingPayment;
                    attempt.finished_at = Some(entry.recorded_at);
                }
            }
            RebookEvent::RebookCommitted(data) => {
                if let Some(attempt) = state.current(order_id, saga_id) {
                    attempt.outcome = AttemptOutcome::Committed {
                        settlement: data.outcome,
                    };
                    attempt.finished_at = Some(data.committed_at);
                }
            }
            RebookEvent::RebookAborted(data) => {
                if let Some(attempt) = state.current(order_id, saga_id) {
                    attempt.outcome = AttemptOutcome::Aborted {
                        code: data.code,
                        reason: data.reason,
                    };
                    attempt.finished_at = Some(data.aborted_at);
                }
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
        state.attempts.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for RebookHistoryView {
    fn name(&self) -> &'static str {
        "RebookHistoryView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.attempts.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}
