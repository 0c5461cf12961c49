use aws_credential_types::Credentials;
use serde::{Deserialize, Serialize};
use std::env;

/// Provider name attached to credentials taken from configuration
pub const STATIC_PROVIDER_NAME: &str = "etlflow-static";

/// Default region when neither `AWS_REGION` nor `AWS_DEFAULT_REGION` is set.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

#[derive(Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    /// Endpoint override for local stacks (DynamoDB Local, LocalStack, ...)
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Set alongside the key pair by Lambda, ECS and assumed-role shells
    pub session_token: Option<String>,
}

impl AwsConfig {
    pub fn from_env() -> Self {
        Self {
            region: env::var("AWS_REGION")
                .or_else(|_| env::var("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|_| DEFAULT_AWS_REGION.to_string()),
            endpoint: env::var("AWS_ENDPOINT_URL").ok().filter(|v| !v.is_empty()),
            access_key: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            session_token: env::var("AWS_SESSION_TOKEN").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Static credentials against a local endpoint
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            region: DEFAULT_AWS_REGION.to_string(),
            endpoint: Some(endpoint.into()),
            access_key: Some("test".to_string()),
            secret_key: Some("test".to_string()),
            session_token: None,
        }
    }

    /// Static credentials, only when both halves are present
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.as_str())),
            _ => None,
        }
    }

    /// Fixed credentials for the SDK, carrying the session token when set
    ///
    /// `None` leaves credential resolution to the default provider chain.
    pub fn credentials(&self) -> Option<Credentials> {
        self.static_credentials().map(|(access_key, secret_key)| {
            Credentials::new(
                access_key,
                secret_key,
                self.session_token.clone(),
                None,
                STATIC_PROVIDER_NAME,
            )
        })
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_AWS_REGION.to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            session_token: None,
        }
    }
}

// Keeps the secret key and session token out of logs
impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_for_endpoint() {
        let config = AwsConfig::for_endpoint("http://localhost:8000");
        assert_eq!(config.endpoint, Some("http://localhost:8000".to_string()));
        assert_eq!(config.region, DEFAULT_AWS_REGION);
        assert_eq!(config.static_credentials(), Some(("test", "test")));
    }

    #[test]
    fn test_partial_credentials_are_ignored() {
        let config = AwsConfig {
            access_key: Some("AKIA".to_string()),
            ..AwsConfig::default()
        };
        assert_eq!(config.static_credentials(), None);
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AwsConfig {
            secret_key: Some("super-secret".to_string()),
            session_token: Some("session-secret".to_string()),
            ..AwsConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("session-secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("AWS_REGION", "eu-west-1");
        env::set_var("AWS_ENDPOINT_URL", "http://localhost:4566");
        env::remove_var("AWS_ACCESS_KEY_ID");
        env::remove_var("AWS_SECRET_ACCESS_KEY");

        let config = AwsConfig::from_env();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.static_credentials(), None);

        env::remove_var("AWS_REGION");
        env::remove_var("AWS_ENDPOINT_URL");
    }

    #[test]
    #[serial]
    fn test_from_env_keeps_session_token() {
        env::remove_var("AWS_ENDPOINT_URL");
        env::set_var("AWS_ACCESS_KEY_ID", "ASIAEXAMPLE");
        env::set_var("AWS_SECRET_ACCESS_KEY", "secret");
        env::set_var("AWS_SESSION_TOKEN", "tok");

        let config = AwsConfig::from_env();
        assert_eq!(config.static_credentials(), Some(("ASIAEXAMPLE", "secret")));
        assert_eq!(config.session_token.as_deref(), Some("tok"));

        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.access_key_id(), "ASIAEXAMPLE");
        assert_eq!(credentials.session_token(), Some("tok"));

        env::remove_var("AWS_ACCESS_KEY_ID");
        env::remove_var("AWS_SECRET_ACCESS_KEY");
        env::remove_var("AWS_SESSION_TOKEN");
    }
}
