//! `POST /rebook` and `POST /rebook/difference`.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use domain::{Order, RebookForm};
use journal::SagaJournal;
use saga::RebookOutcome;

use crate::AppState;
use crate::envelope::Envelope;
use crate::error::ApiError;

type RebookResponse = Result<Json<Envelope<Order>>, ApiError>;

/// Rebooks an order, withdrawing a positive difference from the balance.
pub async fn rebook<J: SagaJournal + Clone + 'static>(
    State(state): State<Arc<AppState<J>>>,
    form: Result<Json<RebookForm>, JsonRejection>,
) -> RebookResponse {
    let Json(form) = form?;
    let request = form.validate()?;
    let outcome = state.coordinator.initiate_rebook(&request).await?;
    Ok(Json(envelope(outcome)))
}

/// Resumes a rebook whose difference the actor has now paid.
pub async fn pay_difference<J: SagaJournal + Clone + 'static>(
    State(state): State<Arc<AppState<J>>>,
    form: Result<Json<RebookForm>, JsonRejection>,
) -> RebookResponse {
    let Json(form) = form?;
    let request = form.validate()?;
    let outcome = state.coordinator.confirm_difference(&request).await?;
    Ok(Json(envelope(outcome)))
}

fn envelope(outcome: RebookOutcome) -> Envelope<Order> {
    match outcome {
        RebookOutcome::Committed { order, .. } => Envelope::ok("Success!", order),
        RebookOutcome::AwaitingPayment { order, delta } => Envelope::awaiting_payment(
            format!("Please pay the difference of {delta}"),
            order,
        ),
    }
}
