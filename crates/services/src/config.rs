use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_MS: u64 = 1_000;
pub const DEFAULT_FORM_VERSION: &str = "1.0";

/// Connection settings for the booking backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingConfig {
    pub base_url: String,
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub form_version: String,
}

impl BookingConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            attempt_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            form_version: DEFAULT_FORM_VERSION.to_string(),
        }
    }

    /// Reads `BOOKING_*` variables. Returns `None` without a base URL.
    ///
    /// Unparseable numbers fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`BookingConfig::from_env`], but explains what is missing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingBaseUrl` when the variable is unset and
    /// `ConfigError::InvalidBaseUrl` when it does not parse as a URL.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::from_env().ok_or(ConfigError::MissingBaseUrl)?;
        config.check()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` when the base URL does not parse.
    pub fn check(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url)
            .map(|_| ())
            .map_err(|source| ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                source,
            })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup("BOOKING_API_BASE_URL")?;
        if base_url.trim().is_empty() {
            return None;
        }
        let mut config = Self::new(base_url.trim());

        if let Some(secs) = lookup("BOOKING_API_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok())
        {
            if secs > 0 {
                config.attempt_timeout = Duration::from_secs(secs);
            }
        }
        if let Some(attempts) = lookup("BOOKING_MAX_ATTEMPTS").and_then(|v| v.parse::<u32>().ok()) {
            if attempts > 0 {
                config.max_attempts = attempts;
            }
        }
        if let Some(ms) = lookup("BOOKING_RETRY_BASE_MS").and_then(|v| v.parse::<u64>().ok()) {
            config.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(version) = lookup("BOOKING_FORM_VERSION").filter(|v| !v.trim().is_empty()) {
            config.form_version = version.trim().to_string();
        }
        Some(config)
    }

    /// Joins `path` onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_base_delay)
            .with_attempt_timeout(self.attempt_timeout)
    }
}
