//! `rebook-server`: the rebook orchestrator over HTTP.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::{AppState, create_app, http_gateways, spawn_reconcile_loop};
use journal::{InMemoryJournal, PostgresJournal, SagaJournal};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env();
    init_tracing(&config);

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    match config.database_url.clone() {
        Some(url) => {
            let journal = PostgresJournal::connect(&url).await?;
            journal.run_migrations().await?;
            tracing::info!("using PostgreSQL journal");
            serve(journal, config, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL unset, journal is in-memory and lost on restart");
            serve(InMemoryJournal::new(), config, metrics_handle).await
        }
    }
}

async fn serve<J>(journal: J, config: Config, metrics_handle: PrometheusHandle) -> Result<(), BoxError>
where
    J: SagaJournal + Clone + 'static,
{
    let gateways = http_gateways(&config)?;
    let state = Arc::new(AppState::new(journal, gateways, config.rebook_settings()));
    state.refresh_views().await?;

    let reconcile_loop = config
        .reconcile_interval
        .map(|interval| spawn_reconcile_loop(state.clone(), interval));

    let app = create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting rebook server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = reconcile_loop {
        handle.abort();
    }
    tracing::info!("server shut down gracefully");
    Ok(())
}
