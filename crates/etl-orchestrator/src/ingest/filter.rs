//! In-scope decision for arrival notifications

use etl_common::types::{ObjectLocation, S3EventRecord};

use crate::error::IngestResult;

/// Why a notification was left alone
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Not an "object created" event
    EventType { event_name: String },
    /// Decoded key does not end with the target suffix
    Suffix { key: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EventType { event_name } => write!(f, "event type {}", event_name),
            SkipReason::Suffix { key } => write!(f, "key {} has the wrong suffix", key),
        }
    }
}

/// Result of filtering one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    InScope(ObjectLocation),
    OutOfScope(SkipReason),
}

/// Accepts "object created" notifications whose decoded key ends with the
/// target suffix (case-sensitive)
#[derive(Debug, Clone)]
pub struct FileFilter {
    suffix: String,
}

impl FileFilter {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Classify a notification
    ///
    /// The key is decoded before the suffix check, so the returned location
    /// carries the decoded key. A key that cannot be decoded is an error,
    /// not a skip.
    pub fn evaluate(&self, record: &S3EventRecord) -> IngestResult<FilterDecision> {
        if !record.is_object_created() {
            return Ok(FilterDecision::OutOfScope(SkipReason::EventType {
                event_name: record.event_name.clone(),
            }));
        }

        let location = record.location()?;

        if self.matches(&location.key) {
            Ok(FilterDecision::InScope(location))
        } else {
            Ok(FilterDecision::OutOfScope(SkipReason::Suffix { key: location.key }))
        }
    }

    /// Suffix check on an already decoded key
    pub fn matches(&self, decoded_key: &str) -> bool {
        decoded_key.ends_with(&self.suffix)
    }
}
