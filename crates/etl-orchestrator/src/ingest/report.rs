//! Batch accounting
//!
//! What one invocation did, returned on success and attached to the error
//! on failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dispatcher::RunId;

/// A file whose record was created and whose job run was started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchedFile {
    pub file_id: Uuid,
    pub source_path: String,
    pub run_id: RunId,
}

/// Statistics collected while processing one notification batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Notifications in the batch
    pub received: usize,
    /// Notifications left alone by the filter
    pub skipped: usize,
    /// Files initiated in notification order
    pub dispatched: Vec<DispatchedFile>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_secs: f64,
}

impl BatchReport {
    pub fn new(received: usize) -> Self {
        Self {
            received,
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn inc_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn add_dispatched(&mut self, file: DispatchedFile) {
        self.dispatched.push(file);
    }

    /// Notifications that reached a terminal state in this invocation
    pub fn processed(&self) -> usize {
        self.skipped + self.dispatched.len()
    }

    pub fn dispatched_count(&self) -> usize {
        self.dispatched.len()
    }

    /// Stamp completion time and duration
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
        if let (Some(start), Some(end)) = (self.started_at, self.completed_at) {
            self.duration_secs = (end - start).num_milliseconds() as f64 / 1000.0;
        }
    }
}
