// src/fetch.rs
//! Page fetching with bounded exponential backoff.
//!
//! The retry policy is separated from the HTTP call ([`PageTransport`]) so the
//! policy can be exercised without a network.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::config::{MonitorConfig, RetryConfig};
use crate::error::{FetchError, TransportError};

/// One HTTP GET attempt, classified into transient vs fatal failures.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<String, TransportError>;
}

/// Production transport: reqwest with a request timeout, following redirects.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransportError::Fatal(format!("build http client: {e}")))?;
        Ok(Self { client })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() {
        TransportError::Transient(e.to_string())
    } else {
        TransportError::Fatal(e.to_string())
    }
}

#[async_trait]
impl PageTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<String, TransportError> {
        let resp = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Fatal(format!("HTTP {status} from {url}")));
        }
        resp.text().await.map_err(classify)
    }
}

/// Exponential backoff: one initial attempt plus up to `max_retries` retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: u32,
}

impl RetryPolicy {
    /// Wait before the `retry`-th retry (1-based): `initial * factor^(retry-1)`.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1);
        let mult = self.backoff_factor.max(1).saturating_pow(exp);
        self.initial_delay.saturating_mul(mult)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            backoff_factor: cfg.backoff_factor,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        (&RetryConfig::default()).into()
    }
}

pub struct Fetcher<T> {
    transport: T,
    url: String,
    headers: HeaderMap,
    policy: RetryPolicy,
}

impl<T: PageTransport> Fetcher<T> {
    pub fn new(transport: T, url: impl Into<String>, headers: HeaderMap, policy: RetryPolicy) -> Self {
        Self {
            transport,
            url: url.into(),
            headers,
            policy,
        }
    }

    pub fn from_config(transport: T, cfg: &MonitorConfig) -> Result<Self, FetchError> {
        let headers = build_headers(cfg)?;
        Ok(Self::new(
            transport,
            cfg.target_url.clone(),
            headers,
            RetryPolicy::from(&cfg.retry),
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches the page body. Only transient failures are retried.
    pub async fn fetch(&self) -> Result<String, FetchError> {
        let mut retries: u32 = 0;
        loop {
            match self.transport.get(&self.url, &self.headers).await {
                Ok(body) => {
                    debug!(target: "fetch", bytes = body.len(), retries, "page fetched");
                    return Ok(body);
                }
                Err(TransportError::Transient(msg)) => {
                    retries += 1;
                    if retries > self.policy.max_retries {
                        error!(
                            target: "fetch",
                            attempts = retries,
                            "final request failure after {} retries: {msg}",
                            self.policy.max_retries
                        );
                        counter!("fetch_failures_total").increment(1);
                        return Err(FetchError::Exhausted {
                            attempts: retries,
                            last: msg,
                        });
                    }
                    let delay = self.policy.delay_before_retry(retries);
                    info!(
                        target: "fetch",
                        "retry {retries}/{} in {:?}: {msg}",
                        self.policy.max_retries,
                        delay
                    );
                    counter!("fetch_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
                Err(TransportError::Fatal(msg)) => {
                    warn!(target: "fetch", attempts = retries + 1, "page fetch failed: {msg}");
                    counter!("fetch_failures_total").increment(1);
                    return Err(FetchError::Fatal(msg));
                }
            }
        }
    }
}

fn build_headers(cfg: &MonitorConfig) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent)
        .map_err(|e| FetchError::Fatal(format!("invalid user agent: {e}")))?;
    headers.insert(USER_AGENT, ua);
    for (k, v) in &cfg.extra_headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|e| FetchError::Fatal(format!("invalid header name {k}: {e}")))?;
        let value = HeaderValue::from_str(v)
            .map_err(|e| FetchError::Fatal(format!("invalid header value for {k}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
