//! Configuration management for the Nimbus client.
//!
//! All configuration is driven by environment variables.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{NimbusError, NimbusResult};

/// Default management API endpoint.
const DEFAULT_API_ENDPOINT: &str = "https://api.nimbuscloud.io/v1alpha5";

/// Global configuration for the Nimbus client.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NimbusConfig {
    /// Base URL of the management API, including any version prefix.
    pub api_endpoint: String,
    /// Access key identifier.
    pub access_key_id: String,
    /// Base64url-encoded (unpadded) secret key.
    #[serde(skip_serializing)]
    pub secret_key: String,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Lower bound of the retry back-off.
    pub retry_wait_min: Duration,
    /// Upper bound of the retry back-off.
    pub retry_wait_max: Duration,
    /// Interval between operation polls.
    pub poll_interval: Duration,
    /// Per-attempt HTTP timeout.
    pub request_timeout: Duration,
    /// Overall limit for waiting on an operation, if any.
    pub wait_timeout: Option<Duration>,
    /// Log level.
    pub log_level: String,
}

impl Default for NimbusConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_owned(),
            access_key_id: String::new(),
            secret_key: String::new(),
            max_retries: 2,
            retry_wait_min: Duration::from_secs(1),
            retry_wait_max: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(60),
            wait_timeout: None,
            log_level: "info".to_owned(),
        }
    }
}

impl NimbusConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("NIMBUS_API_ENDPOINT") {
            config.api_endpoint = v.trim_end_matches('/').to_owned();
        }
        if let Some(v) = lookup("NIMBUS_ACCESS_KEY_ID") {
            config.access_key_id = v;
        }
        if let Some(v) = lookup("NIMBUS_SECRET_KEY") {
            config.secret_key = v;
        }
        if let Some(v) = parse_var(&lookup, "NIMBUS_MAX_RETRIES") {
            config.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "NIMBUS_RETRY_WAIT_MIN_MS") {
            config.retry_wait_min = Duration::from_millis(v);
        }
        if let Some(v) = parse_var(&lookup, "NIMBUS_RETRY_WAIT_MAX_MS") {
            config.retry_wait_max = Duration::from_millis(v);
        }
        if let Some(v) = parse_var(&lookup, "NIMBUS_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(v);
        }
        if let Some(v) = parse_var(&lookup, "NIMBUS_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "NIMBUS_WAIT_TIMEOUT_SECS") {
            config.wait_timeout = Some(Duration::from_secs(v));
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Check that the configuration can authenticate against an http(s) endpoint.
    pub fn validate(&self) -> NimbusResult<()> {
        if self.access_key_id.is_empty() {
            return Err(NimbusError::Config(
                "NIMBUS_ACCESS_KEY_ID must be set".to_owned(),
            ));
        }
        if self.secret_key.is_empty() {
            return Err(NimbusError::Config("NIMBUS_SECRET_KEY must be set".to_owned()));
        }
        if !(self.api_endpoint.starts_with("https://") || self.api_endpoint.starts_with("http://"))
        {
            return Err(NimbusError::Config(format!(
                "api endpoint must be an http(s) URL: {}",
                self.api_endpoint
            )));
        }
        if self.retry_wait_min > self.retry_wait_max {
            return Err(NimbusError::Config(
                "retry wait minimum exceeds retry wait maximum".to_owned(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    if let Ok(value) = raw.trim().parse() {
        Some(value)
    } else {
        warn!(variable = name, value = %raw, "ignoring unparseable configuration value");
        None
    }
}
