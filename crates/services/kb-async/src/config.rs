use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};

use crate::auth::ApiKey;
use crate::error::KbError;
use crate::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, RetryPolicy};

/// Default knowledge-base API base URL
pub const KB_DEFAULT_BASE: &str = "https://api.vectorkb.io";
/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default `User-Agent` header value
pub const DEFAULT_USER_AGENT: &str = concat!("kb-async/", env!("CARGO_PKG_VERSION"));
/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "VK_API_KEY";
/// Environment variable overriding the base URL
pub const ENV_BASE_URL: &str = "VK_BASE_URL";

/// Helper to read and normalize an env var (trim + filter empty).
fn env_trimmed(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration for the knowledge-base client
///
/// Debug output automatically redacts `api_key` via [`SecretString`].
#[derive(Clone, Debug)]
pub struct KbConfig {
    api_base: String,
    api_key: Option<SecretString>,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    retry_max_delay: Duration,
    user_agent: String,
    debug: bool,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            api_base: env_trimmed(ENV_BASE_URL).unwrap_or_else(|| KB_DEFAULT_BASE.into()),
            api_key: env_trimmed(ENV_API_KEY).map(SecretString::from),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_BASE_DELAY,
            retry_max_delay: DEFAULT_MAX_DELAY,
            user_agent: DEFAULT_USER_AGENT.into(),
            debug: false,
        }
    }
}

impl KbConfig {
    /// Creates a new configuration with default settings
    ///
    /// Attempts to read from environment variables:
    /// - `VK_API_KEY` for the API key
    /// - `VK_BASE_URL` for a custom API base URL (defaults to `https://api.vectorkb.io`)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the API key
    ///
    /// The key is validated when the client is built, not here.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets the per-attempt timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry budget (0 to 5)
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the first retry delay and the delay ceiling
    #[must_use]
    pub const fn with_retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max;
        self
    }

    /// Overrides the `User-Agent` header
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enables per-attempt debug logging
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Returns the configured API base URL
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the configured retry budget
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Configuration trait for the client
///
/// Implement this trait to supply credentials and transport settings from a
/// custom source.
pub trait Config: Send + Sync {
    /// Returns the non-auth headers sent with every request
    ///
    /// # Errors
    ///
    /// Returns an error if header values contain invalid characters.
    fn headers(&self) -> Result<HeaderMap, KbError>;

    /// Constructs the full URL for an API endpoint
    fn url(&self, path: &str) -> String;

    /// Returns query parameters to include in every request
    fn query(&self) -> Vec<(&str, &str)>;

    /// Parses and validates the credential
    ///
    /// # Errors
    ///
    /// Returns an `InvalidApiKey` error if the key is missing or malformed.
    fn api_key(&self) -> Result<ApiKey, KbError>;

    /// Builds the retry policy
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the retry bounds are invalid.
    fn retry_policy(&self) -> Result<RetryPolicy, KbError>;

    /// Per-attempt timeout
    fn timeout(&self) -> Duration;

    /// Whether per-attempt debug logging is enabled
    fn debug(&self) -> bool;

    /// Validates the remaining settings
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid setting.
    fn validate(&self) -> Result<(), KbError>;
}

impl Config for KbConfig {
    fn headers(&self) -> Result<HeaderMap, KbError> {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|_| KbError::config("Invalid user-agent value"))?,
        );
        Ok(h)
    }

    fn url(&self, path: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn query(&self) -> Vec<(&str, &str)> {
        vec![]
    }

    fn api_key(&self) -> Result<ApiKey, KbError> {
        let raw = self
            .api_key
            .as_ref()
            .map(|s| s.expose_secret())
            .unwrap_or_default();
        ApiKey::parse(raw)
    }

    fn retry_policy(&self) -> Result<RetryPolicy, KbError> {
        RetryPolicy::new(self.max_retries)?.with_delays(self.retry_base_delay, self.retry_max_delay)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn debug(&self) -> bool {
        self.debug
    }

    fn validate(&self) -> Result<(), KbError> {
        let url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| KbError::config(format!("Invalid base URL '{}': {e}", self.api_base)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(KbError::config(format!(
                "Base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(KbError::config("timeout must be greater than zero"));
        }
        Ok(())
    }
}
