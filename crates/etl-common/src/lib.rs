//! etlflow Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the etlflow project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all etlflow workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized tracing subscriber setup
//! - **Types**: Object-storage event notifications and key decoding
//!
//! # Example
//!
//! ```no_run
//! use etl_common::{Result, types::S3Event};
//!
//! fn count_created(payload: &str) -> Result<usize> {
//!     let event = S3Event::from_json(payload)?;
//!     Ok(event.records.iter().filter(|r| r.is_object_created()).count())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{EtlError, Result};
