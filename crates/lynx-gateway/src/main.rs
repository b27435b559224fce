mod app;
mod cli;
mod error;
mod handlers;
mod model;
mod state;

use crate::app::App;
use crate::cli::{StorageBackendArg, CLI};
use crate::state::AppState;
use anyhow::Context;
use clap::Parser;
use lynx_core::{Repository, SystemClock};
use lynx_shortener::{LinkService, RandomGenerator, ServiceSettings, Shortener};
use lynx_storage::{InMemoryRepository, RedisRepository};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine, the environment and flags still apply
    dotenvy::dotenv().ok();

    let config = CLI::parse();
    init_tracing(&config.log_level, config.log_json)?;

    info!(
        listen_addr = %config.listen_addr(),
        public_base_url = %config.public_base_url(),
        storage_backend = %config.storage,
        "starting gateway server"
    );

    let settings = ServiceSettings::builder()
        .max_attempts(config.max_attempts)
        .build();

    let shortener: Arc<dyn Shortener> = match config.storage {
        StorageBackendArg::InMemory => link_service(InMemoryRepository::new(), settings),
        StorageBackendArg::Redis => {
            let redis = config.redis_settings();
            let repository = RedisRepository::connect(&redis)
                .await
                .with_context(|| format!("failed to connect to redis at {}", redis.url))?;
            link_service(repository, settings)
        }
    };

    let state = AppState::new(Arc::clone(&shortener), config.public_base_url());

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;
    info!(listen_addr = %listener.local_addr()?, "gateway server listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shortener
        .close()
        .await
        .context("failed to close the repository")?;
    info!("gateway server stopped");

    Ok(())
}

fn link_service<R: Repository>(repository: R, settings: ServiceSettings) -> Arc<dyn Shortener> {
    Arc::new(LinkService::with_parts(
        repository,
        RandomGenerator::new(),
        SystemClock,
        settings,
    ))
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_tracing(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| anyhow::anyhow!(e))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "failed to listen for ctrl-c, shutting down"),
    }
}
