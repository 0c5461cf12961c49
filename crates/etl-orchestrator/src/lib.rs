//! etlflow Orchestrator Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Reacts to file-arrival notifications from object storage: keeps a
//! lifecycle record per accepted file in the metadata table and starts one
//! transformation job run per file.
//!
//! # Overview
//!
//! - **Ingestion core** ([`ingest`]): filter, metadata store client, job
//!   dispatcher, and the orchestrator that ties them together
//! - **AWS clients** ([`aws`]): shared SDK configuration for DynamoDB and Glue
//! - **HTTP surface** ([`api`]): event trigger endpoint and record lookups
//! - **Configuration** ([`config`]): environment-based, resolved at startup
//!
//! # Example
//!
//! ```no_run
//! use etl_common::types::S3Event;
//! use etl_orchestrator::{build_orchestrator, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let orchestrator = build_orchestrator(&config).await;
//!     let event = S3Event::from_path("event.json")?;
//!     let report = orchestrator.process_batch(&event).await?;
//!     println!("dispatched {} files", report.dispatched_count());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod api;
pub mod aws;
pub mod config;
pub mod error;
pub mod ingest;
pub mod middleware;

pub use error::{AppError, IngestError, IngestResult};

use config::{Backend, Config};
use ingest::{
    DynamoMetadataStore, FileFilter, GlueJobDispatcher, InMemoryMetadataStore,
    IngestOrchestrator, LoggingDispatcher,
};

/// Construct the orchestrator and its collaborators for the configured backend
///
/// Clients are built once here and shared for the lifetime of the process.
pub async fn build_orchestrator(config: &Config) -> IngestOrchestrator {
    let filter = FileFilter::new(&config.ingest.target_suffix);

    match config.backend {
        Backend::Aws => {
            let sdk_config = aws::load_sdk_config(&config.aws).await;
            let store =
                DynamoMetadataStore::from_sdk_config(&sdk_config, &config.ingest.metadata_table);
            let dispatcher =
                GlueJobDispatcher::from_sdk_config(&sdk_config, &config.ingest.job_name);
            IngestOrchestrator::new(filter, Arc::new(store), Arc::new(dispatcher))
        },
        Backend::Memory => {
            tracing::warn!("Using in-memory metadata store; records are lost on exit");
            IngestOrchestrator::new(
                filter,
                Arc::new(InMemoryMetadataStore::new()),
                Arc::new(LoggingDispatcher),
            )
        },
    }
}
