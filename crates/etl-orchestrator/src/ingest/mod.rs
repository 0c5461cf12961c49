//! File ingestion core
//!
//! # Architecture
//!
//! - **filter**: decides whether a notification is in scope
//! - **store**: metadata store client ([`MetadataStore`])
//! - **dispatcher**: job dispatcher ([`JobDispatcher`])
//! - **orchestrator**: per-notification state machine and batch driver
//! - **models**: the ingestion record and its status
//! - **report**: batch accounting

pub mod dispatcher;
pub mod filter;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod store;

pub use dispatcher::{GlueJobDispatcher, JobDispatcher, LoggingDispatcher, RunId};
pub use filter::{FileFilter, FilterDecision, SkipReason};
pub use models::{IngestionRecord, ProcessingStatus};
pub use orchestrator::{BatchError, FileOutcome, IngestOrchestrator};
pub use report::{BatchReport, DispatchedFile};
pub use store::{DynamoMetadataStore, InMemoryMetadataStore, MetadataStore};
