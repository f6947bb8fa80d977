//! HTTP server for the rebook orchestrator.
//!
//! Serves the two rebook entry points, the history and relocation admin
//! endpoints, health and Prometheus metrics.

pub mod config;
pub mod envelope;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use journal::SagaJournal;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{PendingRelocationsView, Projection, ProjectionProcessor, RebookHistoryView};
use saga::{
    Gateways, HttpLedger, HttpOrderStore, HttpSeatAllocator, HttpTripFareGateway,
    RebookCoordinator, RebookSettings, RelocationReconciler,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Shared state of every handler.
pub struct AppState<J: SagaJournal> {
    pub coordinator: RebookCoordinator<J>,
    pub reconciler: RelocationReconciler<J>,
    pub history: RebookHistoryView,
    pub pending: PendingRelocationsView,
    processor: Mutex<ProjectionProcessor<J>>,
}

impl<J: SagaJournal + Clone> AppState<J> {
    pub fn new(journal: J, gateways: Gateways, settings: RebookSettings) -> Self {
        let coordinator = RebookCoordinator::new(journal.clone(), gateways, settings);
        let reconciler = RelocationReconciler::for_coordinator(&coordinator);

        let history = RebookHistoryView::new();
        let pending = PendingRelocationsView::new();
        let mut processor = ProjectionProcessor::new(journal);
        processor.register(Box::new(history.clone()) as Box<dyn Projection>);
        processor.register(Box::new(pending.clone()) as Box<dyn Projection>);

        Self {
            coordinator,
            reconciler,
            history,
            pending,
            processor: Mutex::new(processor),
        }
    }

    /// Brings the views up to date with the journal.
    pub async fn refresh_views(&self) -> projections::Result<()> {
        self.processor.lock().await.run_catch_up().await
    }
}

/// HTTP gateways to the collaborators named in `config`.
pub fn http_gateways(config: &Config) -> saga::Result<Gateways> {
    let urls = &config.services;
    let timeout = config.upstream_timeout;
    Ok(Gateways::new(
        Arc::new(HttpOrderStore::new(&urls.order, &urls.order_other, timeout)?),
        Arc::new(HttpTripFareGateway::new(&urls.travel, &urls.price, timeout)?),
        Arc::new(HttpSeatAllocator::new(&urls.seat, timeout)?),
        Arc::new(HttpLedger::new(&urls.ledger, timeout)?),
    ))
}

pub fn create_app<J: SagaJournal + Clone + 'static>(
    state: Arc<AppState<J>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/rebook", post(routes::rebook::rebook::<J>))
        .route("/rebook/difference", post(routes::rebook::pay_difference::<J>))
        .route("/rebook/{order_id}/history", get(routes::history::get::<J>))
        .route(
            "/admin/relocations/pending",
            get(routes::admin::pending_relocations::<J>),
        )
        .route(
            "/admin/relocations/reconcile",
            post(routes::admin::reconcile::<J>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Runs a reconciler sweep every `interval` until the task is aborted.
pub fn spawn_reconcile_loop<J: SagaJournal + Clone + 'static>(
    state: Arc<AppState<J>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match state.reconciler.sweep().await {
                Ok(report) if !report.unrecoverable.is_empty() => {
                    tracing::error!(orders = ?report.unrecoverable, "unrecoverable relocations");
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "reconcile sweep failed"),
            }
        }
    })
}
