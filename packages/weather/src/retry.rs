//! Bounded retry for weather lookups.
//!
//! Every request to the weather API goes through [`send_json`]. Timeouts,
//! connection failures, HTTP 429 and HTTP 5xx are retried with
//! exponential backoff up to [`RetryPolicy::max_attempts`] total
//! attempts. Other 4xx responses are permanent and fail immediately.

use std::future::Future;
use std::time::Duration;

use crate::WeatherError;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each retry.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before attempt number `attempt` (1-based; the first attempt
    /// has no delay).
    fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.initial_backoff
            .saturating_mul(1u32 << (attempt - 2).min(16))
    }
}

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// Worth retrying.
    Transient(String),
    /// Give up now.
    Permanent(WeatherError),
}

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// attempts run out.
///
/// # Errors
///
/// Returns the permanent error unchanged, or [`WeatherError::Exhausted`]
/// carrying the last transient failure.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, WeatherError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            log::warn!("  retry {}/{} in {delay:?}...", attempt - 1, max_attempts - 1);
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Permanent(e)) => return Err(e),
            Err(AttemptError::Transient(message)) => {
                log::warn!("  transient error: {message}");
                last_error = message;
            }
        }
    }

    Err(WeatherError::Exhausted {
        attempts: max_attempts,
        message: last_error,
    })
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// `build_request` is called on each attempt since builders are consumed
/// by `.send()`.
///
/// # Errors
///
/// Returns [`WeatherError`] if the request fails permanently, retries are
/// exhausted, or the body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    policy: &RetryPolicy,
    build_request: F,
) -> Result<serde_json::Value, WeatherError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let build_request = &build_request;
    let text = with_retries(policy, || async move {
        let response = build_request().send().await.map_err(classify)?;
        if let Some(e) = classify_status(response.status()) {
            return Err(e);
        }
        response.text().await.map_err(classify)
    })
    .await?;

    serde_json::from_str(&text).map_err(|e| WeatherError::Parse {
        message: format!("JSON parse failed: {e} (received {} bytes)", text.len()),
    })
}

/// Maps a non-success HTTP status to an attempt failure.
///
/// 429 and 5xx are transient, other 4xx are permanent, and anything else
/// is `None`.
fn classify_status(status: reqwest::StatusCode) -> Option<AttemptError> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Some(AttemptError::Transient(format!("HTTP {status} (rate limited)")))
    } else if status.is_server_error() {
        Some(AttemptError::Transient(format!("HTTP {status} (server error)")))
    } else if status.is_client_error() {
        Some(AttemptError::Permanent(WeatherError::Rejected {
            status: status.as_u16(),
        }))
    } else {
        None
    }
}

fn classify(e: reqwest::Error) -> AttemptError {
    if is_transient(&e) {
        AttemptError::Transient(e.to_string())
    } else {
        AttemptError::Permanent(WeatherError::Http(e))
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    const FAST: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::ZERO,
    };

    #[test]
    fn status_rules() {
        use reqwest::StatusCode;

        for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::SERVICE_UNAVAILABLE] {
            assert!(matches!(
                classify_status(status),
                Some(AttemptError::Transient(_))
            ));
        }
        for status in [StatusCode::NOT_FOUND, StatusCode::UNAUTHORIZED] {
            assert!(matches!(
                classify_status(status),
                Some(AttemptError::Permanent(WeatherError::Rejected { status: code }))
                    if code == status.as_u16()
            ));
        }
        assert!(classify_status(StatusCode::OK).is_none());
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retries(&FAST, || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AttemptError::Transient("timeout".to_string()))
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = with_retries(&FAST, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AttemptError::Transient("HTTP 503".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            WeatherError::Exhausted { attempts, message } => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "HTTP 503");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = with_retries(&FAST, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AttemptError::Permanent(WeatherError::Rejected { status: 401 }))
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, WeatherError::Rejected { status: 401 }));
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1_000));
        assert_eq!(policy.delay_before(4), Duration::from_millis(2_000));
    }
}
