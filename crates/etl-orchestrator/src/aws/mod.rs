//! Shared AWS SDK configuration
//!
//! Both the metadata table client and the job engine client are built from
//! one [`SdkConfig`], loaded once per process and reused.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tracing::{debug, info};

pub mod config;

pub use config::AwsConfig;

/// Load the SDK configuration for the given settings
///
/// Static credentials and the endpoint override are applied when present;
/// otherwise the default provider chain and endpoints are used.
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    debug!("Loading AWS configuration: {:?}", config);

    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    if let Some(credentials) = config.credentials() {
        loader = loader.credentials_provider(credentials);
    }

    let sdk_config = loader.load().await;

    info!(
        region = %config.region,
        endpoint = config.endpoint.as_deref().unwrap_or("default"),
        "AWS configuration loaded"
    );

    sdk_config
}

/// Service message when the service sent a non-empty one, full error chain otherwise
///
/// The result is stored as `error_message`, so it is never empty.
pub(crate) fn sdk_error_message<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    err.message()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(err).to_string())
}
