//! etlflow orchestrator - main entry point

use std::{future::IntoFuture, io::Read, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use etl_common::{
    logging::{init_logging, LogConfig},
    types::S3Event,
};
use tokio::{signal, sync::oneshot};
use tracing::{info, warn, Level};
use uuid::Uuid;

use etl_orchestrator::{
    api::{self, AppState},
    build_orchestrator,
    config::{Backend, Config},
    ingest::ProcessingStatus,
};

#[derive(Parser, Debug)]
#[command(name = "etl-orchestrator")]
#[command(author, version, about = "Starts transformation jobs for newly arrived data files")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Use the in-memory store and a logging dispatcher instead of AWS
    #[arg(long, global = true)]
    local: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the event trigger endpoint
    Serve,

    /// Process one notification batch and exit non-zero if it fails
    Process {
        /// Event JSON file (reads stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show one ingestion record
    Get {
        file_id: Uuid,
    },

    /// List ingestion records by status
    List {
        /// INITIATED, IN_PROGRESS, COMPLETED or FAILED
        #[arg(short, long, default_value = "FAILED")]
        status: ProcessingStatus,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // LOG_* may come from .env too
    dotenvy::dotenv().ok();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let log_config = LogConfig::new("etl-orchestrator")
        .with_level(log_level)
        .with_directives("aws_config=warn,aws_smithy_runtime=warn,hyper=info")
        .apply_env()?;

    let _log_guard = init_logging(&log_config)?;

    let mut config = Config::load_unvalidated()?;
    if cli.local {
        config = config.with_backend(Backend::Memory);
    }
    config.validate()?;

    info!(backend = %config.backend, suffix = %config.ingest.target_suffix, "Configuration loaded");

    let orchestrator = build_orchestrator(&config).await;

    match cli.command {
        Command::Serve => {
            let state = AppState::new(orchestrator, config.backend);
            let app = api::router(state);

            let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
                .parse()
                .context("Invalid server address")?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Listening for notifications on {}", addr);

            serve_until_shutdown(
                listener,
                app,
                Duration::from_secs(config.server.shutdown_timeout_secs),
            )
            .await?;

            info!("Server shut down gracefully");
        },
        Command::Process { file } => {
            let event = match file {
                Some(path) => S3Event::from_path(&path)
                    .with_context(|| format!("Failed to read event from {}", path.display()))?,
                None => {
                    let mut payload = String::new();
                    std::io::stdin()
                        .read_to_string(&mut payload)
                        .context("Failed to read event from stdin")?;
                    S3Event::from_json(&payload)?
                },
            };

            let report = orchestrator.process_batch(&event).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        },
        Command::Get { file_id } => {
            let record = orchestrator
                .store()
                .get(file_id)
                .await?
                .with_context(|| format!("No ingestion record for {}", file_id))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        },
        Command::List { status } => {
            let records = orchestrator.store().list_by_status(status).await?;
            info!("Found {} records with status {}", records.len(), status);
            println!("{}", serde_json::to_string_pretty(&records)?);
        },
    }

    Ok(())
}

/// Serve until SIGINT/SIGTERM, then give in-flight batches `drain` to finish
///
/// A batch cut off here was not acknowledged, so it is redelivered.
async fn serve_until_shutdown(
    listener: tokio::net::TcpListener,
    app: axum::Router,
    drain: Duration,
) -> Result<()> {
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let shutdown = async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(());
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = async {
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(drain).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(drain_secs = drain.as_secs(), "Drain deadline reached; abandoning in-flight requests");
        },
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, draining"),
        _ = terminate => info!("Received SIGTERM, draining"),
    }
}
