pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod state;
pub mod background;

use crate::config::Config;
use crate::error::AppError;
use crate::infra::factory::bootstrap_state;
use api::router::create_router;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use crate::background::{start_background_worker, PassWorker};

pub fn init_logging() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("./logs", "campus-gate.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("info,campus_gate=debug"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized. Writing JSON logs to ./logs/");
    guard
}

fn load_config() -> Result<Config, AppError> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        tracing::warn!("Ignoring unreadable .env file: {}", e);
    }
    Config::from_env()
}

pub async fn run() -> Result<(), AppError> {
    let _guard = init_logging();

    let config = load_config()?;
    let state_arc = Arc::new(bootstrap_state(&config).await?);

    if config.worker_enabled {
        let worker_state = state_arc.clone();
        tokio::spawn(async move {
            start_background_worker(worker_state).await;
        });
    } else {
        info!("In-process pass worker disabled");
    }

    let app = create_router(state_arc);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!("Server running on port {}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Standalone worker process sharing the same queue and stores as the API.
pub async fn run_worker() -> Result<(), AppError> {
    let _guard = init_logging();

    let config = load_config()?;
    if config.pass_queue_url.is_none() {
        tracing::warn!("PASS_QUEUE_URL not set; a standalone worker only sees its own in-memory queue");
    }
    let state = Arc::new(bootstrap_state(&config).await?);

    PassWorker::new(state).run().await;
    Ok(())
}
