//! Shared test fixtures
//!
//! Fakes for the metadata store and job dispatcher that append every call to
//! one shared log, so tests can assert on cross-collaborator ordering, and
//! that fail on demand.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use etl_common::types::{S3Bucket, S3Entity, S3Event, S3EventRecord, S3Object};
use etl_orchestrator::{
    ingest::{
        FileFilter, InMemoryMetadataStore, IngestOrchestrator, IngestionRecord, JobDispatcher,
        MetadataStore, ProcessingStatus, RunId,
    },
    IngestError, IngestResult,
};
use uuid::Uuid;

pub const BUCKET: &str = "etl-source";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateInitiated { file_id: Uuid, source_path: String },
    MarkFailed { file_id: Uuid, error_message: String },
    StartJob { file_id: Uuid, source_key: String },
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

/// In-memory store that logs calls and can be told to fail
pub struct RecordingStore {
    inner: InMemoryMetadataStore,
    log: CallLog,
    /// Source paths whose record creation fails
    fail_create: Mutex<Vec<String>>,
    fail_mark: Mutex<Option<String>>,
}

impl RecordingStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: InMemoryMetadataStore::new(),
            log,
            fail_create: Mutex::new(Vec::new()),
            fail_mark: Mutex::new(None),
        }
    }

    pub fn fail_create_for(&self, source_path: &str) {
        self.fail_create.lock().unwrap().push(source_path.to_string());
    }

    pub fn fail_mark_failed(&self, message: &str) {
        *self.fail_mark.lock().unwrap() = Some(message.to_string());
    }

    pub async fn records(&self) -> Vec<IngestionRecord> {
        self.inner.all().await
    }

    pub async fn records_for(&self, source_path: &str) -> Vec<IngestionRecord> {
        self.records()
            .await
            .into_iter()
            .filter(|r| r.source_path == source_path)
            .collect()
    }
}

#[async_trait]
impl MetadataStore for RecordingStore {
    async fn create_initiated(
        &self,
        file_id: Uuid,
        source_path: &str,
        timestamp: DateTime<Utc>,
    ) -> IngestResult<()> {
        self.log.lock().unwrap().push(Call::CreateInitiated {
            file_id,
            source_path: source_path.to_string(),
        });

        let should_fail = self
            .fail_create
            .lock()
            .unwrap()
            .iter()
            .any(|p| p == source_path);
        if should_fail {
            return Err(IngestError::StoreWriteFailed {
                file_id,
                message: "ProvisionedThroughputExceededException".to_string(),
            });
        }

        self.inner.create_initiated(file_id, source_path, timestamp).await
    }

    async fn mark_failed(
        &self,
        file_id: Uuid,
        error_message: &str,
        timestamp: DateTime<Utc>,
    ) -> IngestResult<()> {
        self.log.lock().unwrap().push(Call::MarkFailed {
            file_id,
            error_message: error_message.to_string(),
        });

        let injected = self.fail_mark.lock().unwrap().clone();
        if let Some(message) = injected {
            return Err(IngestError::StoreWriteFailed { file_id, message });
        }

        self.inner.mark_failed(file_id, error_message, timestamp).await
    }

    async fn get(&self, file_id: Uuid) -> IngestResult<Option<IngestionRecord>> {
        self.inner.get(file_id).await
    }

    async fn list_by_status(&self, status: ProcessingStatus) -> IngestResult<Vec<IngestionRecord>> {
        self.inner.list_by_status(status).await
    }
}

/// Dispatcher that logs calls, observes the store at start time, and can fail
pub struct RecordingDispatcher {
    log: CallLog,
    store: Arc<RecordingStore>,
    /// Source key -> engine error message
    failures: Mutex<HashMap<String, String>>,
    /// Record status seen at the moment each job was started
    observed: Mutex<Vec<Option<ProcessingStatus>>>,
}

impl RecordingDispatcher {
    pub fn new(log: CallLog, store: Arc<RecordingStore>) -> Self {
        Self {
            log,
            store,
            failures: Mutex::new(HashMap::new()),
            observed: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_for(&self, source_key: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(source_key.to_string(), message.to_string());
    }

    pub fn observed_statuses(&self) -> Vec<Option<ProcessingStatus>> {
        self.observed.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobDispatcher for RecordingDispatcher {
    async fn start(&self, file_id: Uuid, source_key: &str) -> IngestResult<RunId> {
        self.log.lock().unwrap().push(Call::StartJob {
            file_id,
            source_key: source_key.to_string(),
        });

        let status = self.store.get(file_id).await?.map(|r| r.status);
        self.observed.lock().unwrap().push(status);

        let failure = self.failures.lock().unwrap().get(source_key).cloned();
        match failure {
            Some(message) => Err(IngestError::DispatchFailed { file_id, message }),
            None => Ok(RunId::new(format!("jr_{}", file_id.simple()))),
        }
    }
}

/// Orchestrator wired to recording fakes
pub struct Harness {
    pub log: CallLog,
    pub store: Arc<RecordingStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub orchestrator: IngestOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        let log = new_log();
        let store = Arc::new(RecordingStore::new(log.clone()));
        let dispatcher = Arc::new(RecordingDispatcher::new(log.clone(), store.clone()));
        let orchestrator = IngestOrchestrator::new(
            FileFilter::new(".parquet"),
            store.clone(),
            dispatcher.clone(),
        );

        Self {
            log,
            store,
            dispatcher,
            orchestrator,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        calls(&self.log)
    }
}

pub fn notification(event_name: &str, key: &str) -> S3EventRecord {
    S3EventRecord {
        event_name: event_name.to_string(),
        event_source: Some("aws:s3".to_string()),
        event_time: Some("2024-05-01T12:00:00.000Z".to_string()),
        aws_region: Some("us-east-1".to_string()),
        s3: S3Entity {
            bucket: S3Bucket {
                name: BUCKET.to_string(),
                arn: Some(format!("arn:aws:s3:::{}", BUCKET)),
            },
            object: S3Object {
                key: key.to_string(),
                size: Some(1024),
                e_tag: None,
                sequencer: None,
            },
        },
    }
}

pub fn created(key: &str) -> S3EventRecord {
    notification("ObjectCreated:Put", key)
}

pub fn batch(records: Vec<S3EventRecord>) -> S3Event {
    S3Event { records }
}

pub fn source_path(key: &str) -> String {
    format!("s3://{}/{}", BUCKET, key)
}
