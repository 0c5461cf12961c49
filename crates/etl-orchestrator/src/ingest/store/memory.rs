//! Process-local metadata store
//!
//! Backs the `memory` backend and local runs. Records live only as long as
//! the process.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::MetadataStore;
use crate::error::{IngestError, IngestResult};
use crate::ingest::models::{IngestionRecord, ProcessingStatus};

#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: RwLock<HashMap<Uuid, IngestionRecord>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of every record, oldest first
    pub async fn all(&self) -> Vec<IngestionRecord> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create_initiated(
        &self,
        file_id: Uuid,
        source_path: &str,
        timestamp: DateTime<Utc>,
    ) -> IngestResult<()> {
        let record = IngestionRecord::initiated(file_id, source_path, timestamp);
        self.records.write().await.insert(file_id, record);
        debug!("Created in-memory record for file ID: {}", file_id);
        Ok(())
    }

    async fn mark_failed(
        &self,
        file_id: Uuid,
        error_message: &str,
        timestamp: DateTime<Utc>,
    ) -> IngestResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&file_id)
            .ok_or_else(|| IngestError::StoreWriteFailed {
                file_id,
                message: "no ingestion record with this file id".to_string(),
            })?;

        record.mark_failed(error_message, timestamp);
        Ok(())
    }

    async fn get(&self, file_id: Uuid) -> IngestResult<Option<IngestionRecord>> {
        Ok(self.records.read().await.get(&file_id).cloned())
    }

    async fn list_by_status(&self, status: ProcessingStatus) -> IngestResult<Vec<IngestionRecord>> {
        Ok(self
            .all()
            .await
            .into_iter()
            .filter(|r| r.status == status)
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_mark_failed() {
        let store = InMemoryMetadataStore::new();
        let file_id = Uuid::new_v4();
        let created = Utc::now();

        store
            .create_initiated(file_id, "s3://etl-source/x.parquet", created)
            .await
            .unwrap();
        store
            .mark_failed(file_id, "quota exceeded", created + chrono::Duration::seconds(1))
            .await
            .unwrap();

        let record = store.get(file_id).await.unwrap().unwrap();
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("quota exceeded"));
        assert_eq!(record.source_path, "s3://etl-source/x.parquet");
        assert_eq!(record.created_at, created);
    }

    #[tokio::test]
    async fn test_mark_failed_requires_existing_record() {
        let store = InMemoryMetadataStore::new();
        let file_id = Uuid::new_v4();

        let err = store
            .mark_failed(file_id, "boom", Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::StoreWriteFailed { file_id: id, .. } if id == file_id));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let store = InMemoryMetadataStore::new();
        let ok = Uuid::new_v4();
        let bad = Uuid::new_v4();
        let now = Utc::now();

        store.create_initiated(ok, "s3://b/ok.parquet", now).await.unwrap();
        store.create_initiated(bad, "s3://b/bad.parquet", now).await.unwrap();
        store.mark_failed(bad, "boom", now).await.unwrap();

        let failed = store.list_by_status(ProcessingStatus::Failed).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].file_id, bad);

        let initiated = store.list_by_status(ProcessingStatus::Initiated).await.unwrap();
        assert_eq!(initiated.len(), 1);
        assert_eq!(initiated[0].file_id, ok);

        assert_eq!(store.len().await, 2);
    }
}
