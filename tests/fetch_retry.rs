// tests/fetch_retry.rs
//
// Backoff behaviour of the page fetcher against a scripted transport.
// Runs on a paused tokio clock, so the 1s/2s/4s... waits are exact and instant.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use page_change_monitor::error::{FetchError, TransportError};
use page_change_monitor::fetch::{Fetcher, PageTransport, RetryPolicy};
use reqwest::header::HeaderMap;
use tokio::time::Instant;

/// Fails the first `fail_first` calls with `failure`, then serves `body`.
#[derive(Clone)]
struct Scripted {
    calls: Arc<AtomicU32>,
    fail_first: u32,
    failure: TransportError,
}

impl Scripted {
    fn new(fail_first: u32, failure: TransportError) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            fail_first,
            failure,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageTransport for Scripted {
    async fn get(&self, _url: &str, _headers: &HeaderMap) -> Result<String, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            Err(self.failure.clone())
        } else {
            Ok("<main><article>ok</article></main>".to_string())
        }
    }
}

fn fetcher(t: Scripted) -> Fetcher<Scripted> {
    Fetcher::new(t, "https://example.test/", HeaderMap::new(), RetryPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_ten_times_with_doubling_delays() {
    let t = Scripted::new(u32::MAX, TransportError::Transient("connection reset".into()));
    let f = fetcher(t.clone());

    let start = Instant::now();
    let err = f.fetch().await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Exhausted {
            attempts: 11,
            last: "connection reset".into()
        }
    );
    // initial attempt + max_retries retries
    assert_eq!(t.calls(), 11);
    // 1 + 2 + 4 + ... + 512
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(1023), "waited {waited:?}");
    assert!(waited < Duration::from_secs(1024), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_is_not_retried() {
    let t = Scripted::new(u32::MAX, TransportError::Fatal("HTTP 404".into()));
    let f = fetcher(t.clone());

    let start = Instant::now();
    let err = f.fetch().await.unwrap_err();

    assert_eq!(err, FetchError::Fatal("HTTP 404".into()));
    assert_eq!(t.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn recovers_after_a_few_transient_errors() {
    let t = Scripted::new(3, TransportError::Transient("timed out".into()));
    let f = fetcher(t.clone());

    let start = Instant::now();
    let body = f.fetch().await.expect("fourth attempt succeeds");

    assert!(body.contains("ok"));
    assert_eq!(t.calls(), 4);
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(7) && waited < Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn zero_retries_means_single_attempt() {
    let t = Scripted::new(u32::MAX, TransportError::Transient("refused".into()));
    let policy = RetryPolicy {
        max_retries: 0,
        ..RetryPolicy::default()
    };
    let f = Fetcher::new(t.clone(), "https://example.test/", HeaderMap::new(), policy);

    assert!(matches!(
        f.fetch().await,
        Err(FetchError::Exhausted { attempts: 1, .. })
    ));
    assert_eq!(t.calls(), 1);
}
