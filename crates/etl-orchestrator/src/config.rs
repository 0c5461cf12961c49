//! Configuration management
//!
//! Resolved once at startup; constant for the lifetime of the process.

use serde::{Deserialize, Serialize};

use crate::aws::AwsConfig;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Suffix a decoded object key must end with to be processed.
pub const DEFAULT_TARGET_SUFFIX: &str = ".parquet";

/// Default host for the event trigger endpoint.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default port for the event trigger endpoint.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ingest: IngestSettings,
    pub aws: AwsConfig,
    pub server: ServerConfig,
    pub backend: Backend,
}

/// What the orchestrator targets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestSettings {
    /// Metadata table holding one record per accepted file
    pub metadata_table: String,
    /// Transformation job started for every accepted file
    pub job_name: String,
    /// Case-sensitive key suffix that puts a file in scope
    pub target_suffix: String,
}

/// Event trigger endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Which collaborators back the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// DynamoDB metadata table and Glue job runs
    #[default]
    Aws,
    /// Process-local record store and a dispatcher that only logs
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" => Ok(Backend::Aws),
            "memory" | "local" => Ok(Backend::Memory),
            _ => Err(anyhow::anyhow!("Invalid backend: {}", s)),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Aws => write!(f, "aws"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the environment, and defaults
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::load_unvalidated()?;
        config.validate()?;

        Ok(config)
    }

    /// Like [`Config::load`], for callers that adjust the result before validating
    pub fn load_unvalidated() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from environment variables without validating it
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match std::env::var("ORCHESTRATOR_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => Backend::default(),
        };

        Ok(Config {
            ingest: IngestSettings {
                metadata_table: std::env::var("METADATA_TABLE").unwrap_or_default(),
                job_name: std::env::var("GLUE_JOB_NAME").unwrap_or_default(),
                target_suffix: std::env::var("TARGET_SUFFIX")
                    .unwrap_or_else(|_| DEFAULT_TARGET_SUFFIX.to_string()),
            },
            aws: AwsConfig::from_env(),
            server: ServerConfig {
                host: std::env::var("ORCHESTRATOR_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("ORCHESTRATOR_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("ORCHESTRATOR_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            backend,
        })
    }

    /// Switch to the in-memory backend
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ingest.target_suffix.is_empty() {
            anyhow::bail!("TARGET_SUFFIX cannot be empty");
        }

        if self.backend == Backend::Aws {
            if self.ingest.metadata_table.trim().is_empty() {
                anyhow::bail!("METADATA_TABLE must be set when using the aws backend");
            }
            if self.ingest.job_name.trim().is_empty() {
                anyhow::bail!("GLUE_JOB_NAME must be set when using the aws backend");
            }
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if !self.ingest.target_suffix.starts_with('.') {
            tracing::warn!(
                suffix = %self.ingest.target_suffix,
                "Target suffix has no leading dot; keys are matched on the raw suffix"
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ingest: IngestSettings {
                metadata_table: String::new(),
                job_name: String::new(),
                target_suffix: DEFAULT_TARGET_SUFFIX.to_string(),
            },
            aws: AwsConfig::default(),
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            backend: Backend::Aws,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "METADATA_TABLE",
        "GLUE_JOB_NAME",
        "TARGET_SUFFIX",
        "ORCHESTRATOR_BACKEND",
        "ORCHESTRATOR_HOST",
        "ORCHESTRATOR_PORT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_requires_table_and_job_for_aws() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("METADATA_TABLE"));

        let mut config = Config::default();
        config.ingest.metadata_table = "etl-pipeline-metadata".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GLUE_JOB_NAME"));

        config.ingest.job_name = "etl-parquet-to-json".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_backend_needs_no_aws_targets() {
        let config = Config::default().with_backend(Backend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_suffix_rejected() {
        let mut config = Config::default().with_backend(Backend::Memory);
        config.ingest.target_suffix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("AWS".parse::<Backend>().unwrap(), Backend::Aws);
        assert_eq!("local".parse::<Backend>().unwrap(), Backend::Memory);
        assert!("postgres".parse::<Backend>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        std::env::set_var("METADATA_TABLE", "etl-pipeline-metadata");
        std::env::set_var("GLUE_JOB_NAME", "etl-parquet-to-json");
        std::env::set_var("ORCHESTRATOR_PORT", "9090");

        let config = Config::from_env().unwrap();
        assert_eq!(config.ingest.metadata_table, "etl-pipeline-metadata");
        assert_eq!(config.ingest.job_name, "etl-parquet-to-json");
        assert_eq!(config.ingest.target_suffix, DEFAULT_TARGET_SUFFIX);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.backend, Backend::Aws);
        assert!(config.validate().is_ok());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_unknown_backend() {
        clear_env();
        std::env::set_var("ORCHESTRATOR_BACKEND", "sqlite");

        assert!(Config::from_env().is_err());

        clear_env();
    }
}
