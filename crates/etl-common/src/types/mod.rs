//! Object-storage event notification types
//!
//! Models the notification batch delivered by the object store when new
//! objects land in a bucket. Only the fields the orchestrator needs are
//! required; everything else is carried along when present.
//!
//! Object keys arrive form-encoded: spaces become `+` and everything else
//! outside the unreserved set is percent-encoded. Use [`decode_object_key`]
//! (or [`S3EventRecord::location`]) before comparing or storing a key.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EtlError, Result};

/// Prefix shared by every "object created" event name
/// (`ObjectCreated:Put`, `ObjectCreated:CompleteMultipartUpload`, ...).
pub const OBJECT_CREATED_PREFIX: &str = "ObjectCreated";

/// A batch of notifications delivered in one invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3Event {
    /// Notifications in delivery order. Absent for `s3:TestEvent` notifications.
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

impl S3Event {
    /// Parse a notification batch from its JSON payload
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Read and parse a notification batch from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let payload = std::fs::read_to_string(path)?;
        Self::from_json(&payload)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A single notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    /// Event kind, e.g. `ObjectCreated:Put` or `ObjectRemoved:Delete`
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    pub s3: S3Entity,
}

impl S3EventRecord {
    /// Whether this notification belongs to the "object created" class
    pub fn is_object_created(&self) -> bool {
        self.event_name.starts_with(OBJECT_CREATED_PREFIX)
    }

    /// Bucket and decoded key of the object this notification refers to
    pub fn location(&self) -> Result<ObjectLocation> {
        Ok(ObjectLocation {
            bucket: self.s3.bucket.name.clone(),
            key: decode_object_key(&self.s3.object.key)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Object {
    /// Form-encoded object key, exactly as delivered
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequencer: Option<String>,
}

/// Fully-qualified location of an object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    /// Decoded object key
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `s3://{bucket}/{key}`
    pub fn source_path(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Decode a form-encoded object key
///
/// `+` is turned back into a space before percent-decoding, so a literal
/// plus sign must arrive as `%2B`. Truncated or non-hex escapes and escapes
/// that decode to invalid UTF-8 are rejected.
pub fn decode_object_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");

    if let Some(position) = find_malformed_escape(&spaced) {
        return Err(EtlError::KeyDecode {
            key: raw.to_string(),
            reason: format!("malformed percent escape at byte {}", position),
        });
    }

    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| EtlError::KeyDecode {
            key: raw.to_string(),
            reason: e.to_string(),
        })
}

fn find_malformed_escape(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'%')
        .map(|(i, _)| i)
        .find(|&i| {
            !matches!(
                (bytes.get(i + 1), bytes.get(i + 2)),
                (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
            )
        })
}
