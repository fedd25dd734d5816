use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::Retryable;
use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};

use crate::auth::{ApiKey, Environment};
use crate::classify::{RawFailure, classify};
use crate::config::{Config, KbConfig};
use crate::error::{ErrorKind, KbError};
use crate::retry::RetryPolicy;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Knowledge-base API client
///
/// The client is generic over a [`Config`] implementation that provides
/// credentials and transport settings. Everything is validated once in
/// [`Client::with_config`]; afterwards the client is read-only and can be
/// shared freely between concurrent calls.
#[derive(Debug, Clone)]
pub struct Client<C: Config> {
    http: reqwest::Client,
    config: C,
    api_key: ApiKey,
    policy: RetryPolicy,
}

impl Client<KbConfig> {
    /// Creates a new client with default configuration
    ///
    /// Uses environment variables:
    /// - `VK_API_KEY` for the API key
    /// - `VK_BASE_URL` for a custom API base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing or malformed.
    pub fn new() -> Result<Self, KbError> {
        Self::with_config(KbConfig::new())
    }

    /// Creates a client for `api_key` with every other setting at its default
    ///
    /// # Errors
    ///
    /// Returns an `InvalidApiKey` error if the key is malformed.
    pub fn from_api_key(api_key: impl Into<String>) -> Result<Self, KbError> {
        Self::with_config(KbConfig::new().with_api_key(api_key))
    }
}

impl<C: Config> Client<C> {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails before any network access if the credential, the retry bounds,
    /// the base URL or the timeout are invalid, or if the HTTP client cannot
    /// be built.
    pub fn with_config(config: C) -> Result<Self, KbError> {
        config.validate()?;
        let api_key = config.api_key()?;
        let policy = config.retry_policy()?;

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout()))
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                KbError::new(ErrorKind::InitializationError)
                    .with_message(format!("Failed to build HTTP client: {e}"))
            })?;

        tracing::debug!(
            key = %api_key.redacted(),
            environment = %api_key.environment(),
            max_retries = policy.max_retries(),
            "knowledge-base client initialized"
        );

        Ok(Self {
            http,
            config,
            api_key,
            policy,
        })
    }

    /// Replaces the HTTP client with a custom one
    ///
    /// The replacement's own timeout settings take effect.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Returns a reference to the client's configuration
    #[must_use]
    pub const fn config(&self) -> &C {
        &self.config
    }

    /// Environment of the configured API key
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.api_key.environment()
    }

    /// The retry policy applied to every call
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends a GET request and decodes the JSON response
    ///
    /// # Errors
    ///
    /// Returns the last classified error once retries are exhausted or a
    /// non-retryable failure occurs.
    pub async fn get<O: DeserializeOwned>(&self, path: &str) -> Result<O, KbError> {
        let mk = || self.request(Method::GET, path).build();
        self.execute(Method::GET, path, mk).await
    }

    /// Sends a GET request with query parameters and decodes the JSON response
    ///
    /// Parameters that serialize to nothing leave the URL without a query string.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn get_with_query<Q, O>(&self, path: &str, query: &Q) -> Result<O, KbError>
    where
        Q: Serialize + Sync + ?Sized,
        O: DeserializeOwned,
    {
        let mk = || self.request(Method::GET, path).query(query).build();
        self.execute(Method::GET, path, mk).await
    }

    /// Sends a POST request with a JSON body and decodes the JSON response
    ///
    /// The body is re-serialized from the same value on every attempt.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn post<I, O>(&self, path: &str, body: &I) -> Result<O, KbError>
    where
        I: Serialize + Sync + ?Sized,
        O: DeserializeOwned,
    {
        let mk = || self.request(Method::POST, path).json(body).build();
        self.execute(Method::POST, path, mk).await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.config.url(path))
            .query(&self.config.query())
    }

    async fn execute<O, M>(&self, method: Method, path: &str, mk: M) -> Result<O, KbError>
    where
        O: DeserializeOwned,
        M: Fn() -> Result<reqwest::Request, reqwest::Error> + Send + Sync,
    {
        let bytes = self.execute_raw(&method, path, mk).await?;
        let resp: O =
            serde_json::from_slice(&bytes).map_err(|e| crate::error::map_deser(&e, &bytes))?;
        Ok(resp)
    }

    async fn execute_raw<M>(
        &self,
        method: &Method,
        path: &str,
        mk: M,
    ) -> Result<bytes::Bytes, KbError>
    where
        M: Fn() -> Result<reqwest::Request, reqwest::Error> + Send + Sync,
    {
        let attempts = AtomicU32::new(0);
        let debug = self.config.debug();

        let result = (|| async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            if debug {
                tracing::debug!(%method, path, attempt, "sending request");
            }
            self.attempt(&mk).await.map_err(classify)
        })
        .retry(self.policy.backoff_builder())
        .when(|err: &KbError| {
            let attempt = attempts.load(Ordering::SeqCst).saturating_sub(1);
            self.policy.should_retry(err, attempt)
        })
        .notify(|err: &KbError, delay: Duration| {
            tracing::warn!(
                %method,
                path,
                kind = %err.kind(),
                status = err.status(),
                attempt = attempts.load(Ordering::SeqCst),
                delay_ms = delay.as_millis() as u64,
                "retrying request"
            );
        })
        .await;

        if let Err(err) = &result {
            tracing::debug!(
                %method,
                path,
                kind = %err.kind(),
                status = err.status(),
                attempts = attempts.load(Ordering::SeqCst),
                request_id = err.request_id(),
                "request failed"
            );
        }
        result
    }

    async fn attempt<M>(&self, mk: &M) -> Result<bytes::Bytes, RawFailure>
    where
        M: Fn() -> Result<reqwest::Request, reqwest::Error> + Send + Sync,
    {
        let mut request = mk()?;
        let headers = request.headers_mut();
        headers.extend(self.config.headers()?);
        let (name, value) = self.api_key.auth_header()?;
        headers.insert(name, value);

        let response = self.http.execute(request).await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(body);
        }

        Err(RawFailure::Http {
            status,
            headers: response_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TEST_API_KEY, fast_config};

    #[test]
    fn construction_validates_key() {
        let err = Client::with_config(fast_config("http://localhost").with_api_key("invalid_key"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidApiKey);
    }

    #[test]
    fn construction_validates_retry_budget() {
        let err = Client::with_config(fast_config("http://localhost").with_max_retries(9))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[test]
    fn construction_exposes_environment_and_policy() {
        let client = Client::with_config(fast_config("http://localhost").with_max_retries(2))
            .unwrap();
        assert_eq!(client.environment(), Environment::Test);
        assert_eq!(client.retry_policy().max_retries(), 2);
    }

    #[test]
    fn debug_output_redacts_key() {
        let client = Client::with_config(fast_config("http://localhost")).unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains(TEST_API_KEY));
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client<KbConfig>>();
    }
}
