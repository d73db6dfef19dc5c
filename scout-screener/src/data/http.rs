//! Shared HTTP transport for the REST adapters.
//!
//! One `reqwest::Client` per process. A counting semaphore bounds in-flight
//! requests; a permit is held for the whole retry sequence of one request.

use rand::Rng;
use reqwest::StatusCode;
use scout_common::config::HttpConfig;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

use super::provider::ProviderError;

/// Exponential backoff for `attempt` (1-based) plus up to 10% jitter.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let delay_ms = (base.as_millis() as u64).saturating_mul(1u64 << exp);
    let jitter_cap = delay_ms / 10;
    let jitter = if jitter_cap > 0 {
        rand::thread_rng().gen_range(0..=jitter_cap)
    } else {
        0
    };
    Duration::from_millis(delay_ms + jitter)
}

/// Rate-bounded JSON fetcher with retry.
pub struct HttpFetcher {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    max_attempts: u32,
    base_delay: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from shared HTTP settings.
    pub fn new(config: &HttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Stop admitting requests. Waiting and future calls fail with
    /// [`ProviderError::Cancelled`].
    pub fn close(&self) {
        self.permits.close();
    }

    /// Number of requests that could start right now.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// GET `url` with `query` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ProviderError::Cancelled)?;

        let mut attempt = 1;
        loop {
            match self.try_once(url, query).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_recoverable() && attempt < self.max_attempts => {
                    let delay = backoff_delay(self.base_delay, attempt);
                    debug!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}
