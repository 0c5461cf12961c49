//! Data models for ingestion
//!
//! One [`IngestionRecord`] tracks the processing lifecycle of one accepted
//! file. The orchestrator writes `INITIATED` and `FAILED`; the
//! transformation job owns every other transition.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attribute names in the metadata table, shared with the transformation job
pub mod attr {
    pub const FILE_ID: &str = "file_id";
    pub const SOURCE_PATH: &str = "source_file_path";
    pub const STATUS: &str = "processing_status";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
    pub const ERROR_MESSAGE: &str = "error_message";
    pub const OUTPUT_PATH: &str = "output_file_path";
    pub const RECORD_COUNT: &str = "record_count";
}

/// Secondary index keyed by [`attr::STATUS`]
pub const STATUS_INDEX: &str = "status-index";

/// Lifecycle record for one accepted file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRecord {
    /// Generated at first sight of the file; never derived from its path
    pub file_id: Uuid,
    /// `s3://{bucket}/{decoded key}`
    pub source_path: String,
    pub status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Written by the transformation job on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Written by the transformation job on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
}

impl IngestionRecord {
    /// A freshly accepted file
    pub fn initiated(file_id: Uuid, source_path: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            file_id,
            source_path: source_path.into(),
            status: ProcessingStatus::Initiated,
            created_at: timestamp,
            updated_at: timestamp,
            error_message: None,
            output_path: None,
            record_count: None,
        }
    }

    /// Move to `FAILED`, leaving the source path and creation time alone
    pub fn mark_failed(&mut self, error_message: impl Into<String>, timestamp: DateTime<Utc>) {
        self.status = ProcessingStatus::Failed;
        self.error_message = Some(error_message.into());
        self.updated_at = timestamp;
    }

    pub fn is_failed(&self) -> bool {
        self.status == ProcessingStatus::Failed
    }
}

/// Processing status as stored in the metadata table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    /// Record created, job run requested
    Initiated,
    /// Job run picked the file up
    InProgress,
    /// Job run wrote its output
    Completed,
    /// Job start or job run failed
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Initiated => "INITIATED",
            ProcessingStatus::InProgress => "IN_PROGRESS",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProcessingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "INITIATED" => Ok(ProcessingStatus::Initiated),
            "IN_PROGRESS" => Ok(ProcessingStatus::InProgress),
            "COMPLETED" => Ok(ProcessingStatus::Completed),
            "FAILED" => Ok(ProcessingStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid processing status: {}", s)),
        }
    }
}

/// ISO-8601 UTC timestamp with millisecond precision
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp
///
/// The job writes naive timestamps with no offset; those are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
