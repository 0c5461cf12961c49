//! Metadata store client
//!
//! Typed access to the table of [`IngestionRecord`]s. Implementations must
//! tolerate concurrent calls for different file ids; no cross-record
//! locking is expected.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{IngestionRecord, ProcessingStatus};
use crate::error::IngestResult;

pub mod dynamo;
pub mod memory;

pub use dynamo::DynamoMetadataStore;
pub use memory::InMemoryMetadataStore;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Write a new `INITIATED` record
    ///
    /// Overwrites any record with the same key, so callers must use each
    /// file id for one record only.
    async fn create_initiated(
        &self,
        file_id: Uuid,
        source_path: &str,
        timestamp: DateTime<Utc>,
    ) -> IngestResult<()>;

    /// Move an existing record to `FAILED`
    ///
    /// Sets `error_message` and `updated_at`; leaves the source path and
    /// creation time untouched.
    async fn mark_failed(
        &self,
        file_id: Uuid,
        error_message: &str,
        timestamp: DateTime<Utc>,
    ) -> IngestResult<()>;

    async fn get(&self, file_id: Uuid) -> IngestResult<Option<IngestionRecord>>;

    /// All records currently in `status`, via the status index
    async fn list_by_status(&self, status: ProcessingStatus) -> IngestResult<Vec<IngestionRecord>>;
}
