//! Relocation admin endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use journal::SagaJournal;
use projections::PendingRelocationSummary;
use saga::ReconcileReport;

use crate::AppState;
use crate::envelope::Envelope;
use crate::error::ApiError;

/// GET /admin/relocations/pending
pub async fn pending_relocations<J: SagaJournal + Clone + 'static>(
    State(state): State<Arc<AppState<J>>>,
) -> Result<Json<Envelope<Vec<PendingRelocationSummary>>>, ApiError> {
    state.refresh_views().await?;
    Ok(Json(Envelope::ok("Success", state.pending.pending().await)))
}

/// POST /admin/relocations/reconcile. Runs one sweep synchronously.
#[tracing::instrument(skip_all)]
pub async fn reconcile<J: SagaJournal + Clone + 'static>(
    State(state): State<Arc<AppState<J>>>,
) -> Result<Json<Envelope<ReconcileReport>>, ApiError> {
    let report = state.reconciler.sweep().await?;
    tracing::info!(
        scanned = report.scanned,
        recovered = report.recovered(),
        "manual reconcile finished"
    );
    Ok(Json(Envelope::ok("Success", report)))
}
