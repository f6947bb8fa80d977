//! `GET /rebook/{orderId}/history`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use journal::SagaJournal;
use projections::RebookAttempt;

use crate::AppState;
use crate::envelope::Envelope;
use crate::error::ApiError;

pub async fn get<J: SagaJournal + Clone + 'static>(
    State(state): State<Arc<AppState<J>>>,
    Path(order_id): Path<String>,
) -> Result<Json<Envelope<Vec<RebookAttempt>>>, ApiError> {
    let order_id = OrderId::parse(order_id.trim())
        .map_err(|e| ApiError::Malformed(format!("Malformed orderId: {e}")))?;

    state.refresh_views().await?;
    let attempts = state.history.history(order_id).await;
    let msg = if attempts.is_empty() {
        "No rebook recorded"
    } else {
        "Success"
    };
    Ok(Json(Envelope::ok(msg, attempts)))
}
