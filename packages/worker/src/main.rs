//! Transcode worker binary.
//!
//! Reads jobs as JSON lines from stdin, runs them on the orchestrator and
//! persists outcomes to SurrealDB. Stops on Ctrl-C or end of input.

mod producer;

use db::DbConfig;
use media::{FfmpegTranscoder, MediaConfig};
use orchestrator::{DbPersistence, Orchestrator, OrchestratorError};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use transcode_core::{ConfigError, OrchestratorConfig};

#[derive(Debug, thiserror::Error)]
enum WorkerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Db(#[from] db::DbError),

    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(env_filter)
        .init();

    if let Err(e) = run().await {
        error!("Worker failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), WorkerError> {
    info!("Starting transcode worker");

    let config = OrchestratorConfig::from_env()?;
    let media_config = MediaConfig::from_env();
    info!("Orchestrator config: {:?}", config);
    info!(
        "Media: input {}, output {}",
        media_config.input_dir.display(),
        media_config.output_dir.display()
    );

    db::init(DbConfig::from_env()).await?;

    let orchestrator =
        Orchestrator::new(config, FfmpegTranscoder::new(media_config), DbPersistence)?;
    orchestrator.start().await?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal.cancel();
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    producer::run_producer(stdin, &orchestrator, shutdown.clone()).await;

    // End of input: let queued work finish unless a signal arrives first
    if !shutdown.is_cancelled() {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = wait_idle(&orchestrator) => {}
        }
    }

    orchestrator.stop().await;

    let stats = orchestrator.stats();
    info!(
        "Worker shutdown complete: {} done, {} failed, {} pending, {} total",
        stats.done,
        stats.error,
        stats.pending,
        stats.total()
    );
    Ok(())
}

async fn wait_idle(orchestrator: &Orchestrator) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(250));
    loop {
        interval.tick().await;
        let stats = orchestrator.stats();
        if stats.pending == 0 && stats.processing == 0 {
            return;
        }
    }
}
