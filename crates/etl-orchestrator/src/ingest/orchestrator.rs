//! Ingestion orchestrator
//!
//! Drives each notification of a batch through
//! filter -> record creation -> job dispatch, in delivery order. Every
//! notification produces a [`FileOutcome`]; the batch driver stops at the
//! first `Failed` outcome and reports the whole batch as failed so the
//! delivery substrate redelivers it.
//!
//! Redelivery is not idempotent: files that were initiated before the
//! failing notification get a second record and a second job run when the
//! batch comes back, because every acceptance mints a fresh file id.

use std::sync::Arc;

use chrono::Utc;
use etl_common::types::{S3Event, S3EventRecord};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dispatcher::JobDispatcher,
    filter::{FileFilter, FilterDecision, SkipReason},
    report::{BatchReport, DispatchedFile},
    store::MetadataStore,
};
use crate::error::IngestError;

/// Terminal state of one notification
#[derive(Debug)]
pub enum FileOutcome {
    /// Filtered out; nothing was written or started
    Skipped(SkipReason),
    /// Record created and job run started
    Dispatched(DispatchedFile),
    /// Processing failed; `file_id` is set once a record was attempted
    Failed {
        file_id: Option<Uuid>,
        error: IngestError,
    },
}

/// The batch stopped at the notification at `position`
#[derive(Error, Debug)]
#[error("Batch aborted at notification {position} ({key}): {error}")]
pub struct BatchError {
    /// Zero-based index of the failing notification
    pub position: usize,
    /// Key of the failing notification as delivered
    pub key: String,
    #[source]
    pub error: IngestError,
    /// Work completed before the failure; none of it is rolled back
    pub report: BatchReport,
}

pub struct IngestOrchestrator {
    filter: FileFilter,
    store: Arc<dyn MetadataStore>,
    dispatcher: Arc<dyn JobDispatcher>,
}

impl IngestOrchestrator {
    pub fn new(
        filter: FileFilter,
        store: Arc<dyn MetadataStore>,
        dispatcher: Arc<dyn JobDispatcher>,
    ) -> Self {
        Self {
            filter,
            store,
            dispatcher,
        }
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Process a notification batch sequentially, stopping at the first failure
    ///
    /// Notifications after the failing one are not touched in this
    /// invocation.
    pub async fn process_batch(&self, event: &S3Event) -> Result<BatchReport, BatchError> {
        let mut report = BatchReport::new(event.records.len());
        info!(notifications = report.received, "Processing notification batch");

        for (position, record) in event.records.iter().enumerate() {
            match self.process_notification(record).await {
                FileOutcome::Skipped(_) => report.inc_skipped(),
                FileOutcome::Dispatched(file) => report.add_dispatched(file),
                FileOutcome::Failed { error, .. } => {
                    report.complete();
                    warn!(
                        position,
                        remaining = report.received - position - 1,
                        dispatched = report.dispatched_count(),
                        "Aborting batch; remaining notifications are left for redelivery"
                    );
                    return Err(BatchError {
                        position,
                        key: record.s3.object.key.clone(),
                        error,
                        report,
                    });
                },
            }
        }

        report.complete();
        info!(
            received = report.received,
            dispatched = report.dispatched_count(),
            skipped = report.skipped,
            duration_secs = report.duration_secs,
            "Notification batch completed"
        );

        Ok(report)
    }

    /// Drive one notification to a terminal state
    #[instrument(skip_all, fields(event = %record.event_name, key = %record.s3.object.key))]
    pub async fn process_notification(&self, record: &S3EventRecord) -> FileOutcome {
        let location = match self.filter.evaluate(record) {
            Ok(FilterDecision::InScope(location)) => location,
            Ok(FilterDecision::OutOfScope(reason)) => {
                info!(%reason, "Skipping notification");
                return FileOutcome::Skipped(reason);
            },
            Err(error) => {
                error!(%error, "Rejecting notification");
                return FileOutcome::Failed {
                    file_id: None,
                    error,
                };
            },
        };

        let file_id = Uuid::new_v4();
        let source_path = location.source_path();
        info!(%file_id, %source_path, "Processing file");

        if let Err(error) = self
            .store
            .create_initiated(file_id, &source_path, Utc::now())
            .await
        {
            error!(%file_id, %error, "Failed to create metadata record; job not started");
            return FileOutcome::Failed {
                file_id: Some(file_id),
                error,
            };
        }

        match self.dispatcher.start(file_id, &location.key).await {
            Ok(run_id) => {
                info!(%file_id, %run_id, "Successfully initiated processing");
                FileOutcome::Dispatched(DispatchedFile {
                    file_id,
                    source_path,
                    run_id,
                })
            },
            Err(error) => {
                error!(%file_id, %error, "Failed to start job run");
                self.record_failure(file_id, &error).await;
                FileOutcome::Failed {
                    file_id: Some(file_id),
                    error,
                }
            },
        }
    }

    /// Best-effort `FAILED` write; its own failure is logged and swallowed
    /// so the original error still reaches the caller.
    async fn record_failure(&self, file_id: Uuid, cause: &IngestError) {
        if let Err(mark_error) = self
            .store
            .mark_failed(file_id, &cause.message(), Utc::now())
            .await
        {
            error!(
                %file_id,
                error = %mark_error,
                original_error = %cause,
                "Failed to mark metadata record as failed"
            );
        }
    }
}
