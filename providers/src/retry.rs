//! HTTP retry policy with exponential backoff.
//!
//! - Max retries: 2 (3 total attempts)
//! - Backoff: 500ms doubling per attempt, capped at 8s
//! - Jitter: down-jitter up to 25% (multiplier in [0.75, 1.0])
//!
//! Retryable: HTTP 408, 409, 429, 5xx, and connection/timeout errors.
//! A `Retry-After` (or `Retry-After-Ms`) header under 60s replaces the computed delay.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Down-jitter factor (0.25 = up to 25% reduction).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

fn bounded(delay: Duration) -> Option<Duration> {
    (delay > Duration::ZERO && delay < MAX_RETRY_AFTER).then_some(delay)
}

#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let from_ms = header("retry-after-ms")
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|ms| ms.is_finite() && *ms > 0.0)
        .and_then(|ms| bounded(Duration::from_secs_f64(ms / 1000.0)));

    from_ms.or_else(|| {
        header("retry-after")
            .and_then(|s| s.parse::<u64>().ok())
            .and_then(|secs| bounded(Duration::from_secs(secs)))
    })
}

/// Whether a failed response should be retried.
///
/// An `x-should-retry: true|false` header from the server wins over the status table.
#[must_use]
pub fn should_retry(status: StatusCode, headers: &HeaderMap) -> bool {
    match headers.get("x-should-retry").and_then(|v| v.to_str().ok()) {
        Some(v) if v.eq_ignore_ascii_case("true") => true,
        Some(v) if v.eq_ignore_ascii_case("false") => false,
        _ => matches!(status.as_u16(), 408 | 409 | 429 | 500..=599),
    }
}

/// Delay before retry number `backoff_step + 1`.
#[must_use]
pub fn calculate_retry_delay(
    backoff_step: u32,
    config: &RetryConfig,
    headers: Option<&HeaderMap>,
) -> Duration {
    if let Some(delay) = headers.and_then(parse_retry_after) {
        return delay;
    }

    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

/// Outcome of a retried request.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx response.
    Success(Response),
    /// Non-2xx response, either non-retryable or after exhausting retries.
    HttpError(Response),
    /// Transport failure after `attempts` tries.
    ConnectionError {
        attempts: u32,
        source: reqwest::Error,
    },
    /// Transport failure that retrying cannot fix (e.g. an invalid request).
    NonRetryable(reqwest::Error),
}

/// Send a request, rebuilding it with `build_request` for every attempt.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        let can_retry = attempt < config.max_retries;

        match build_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return RetryOutcome::Success(response);
                }
                if !can_retry || !should_retry(status, response.headers()) {
                    return RetryOutcome::HttpError(response);
                }
                let delay = calculate_retry_delay(attempt, config, Some(response.headers()));
                tracing::debug!(
                    %status,
                    retry = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying request after error status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if !is_retryable_error(&e) {
                    return RetryOutcome::NonRetryable(e);
                }
                if !can_retry {
                    return RetryOutcome::ConnectionError {
                        attempts: attempt + 1,
                        source: e,
                    };
                }
                let delay = calculate_retry_delay(attempt, config, None);
                tracing::debug!(
                    error = %e,
                    retry = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying request after connection error"
                );
                tokio::time::sleep(delay).await;
            }
        }

        attempt += 1;
    }
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}


#[cfg(test)]
mod integration_tests {
    use super::{Duration, RetryConfig, RetryOutcome, StatusCode, send_with_retry};
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry_config() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn retries_rate_limit_then_succeeds() {
        let server = MockServer::start().await;
        let attempt = AtomicU32::new(0);

        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(move |_: &wiremock::Request| {
                if attempt.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(429)
                } else {
                    ResponseTemplate::new(200).set_body_string("ok")
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/generate", server.uri());
        let outcome = send_with_retry(|| client.post(&url), &fast_retry_config()).await;

        match outcome {
            RetryOutcome::Success(response) => assert_eq!(response.status(), StatusCode::OK),
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausts_retries_on_persistent_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/generate", server.uri());
        let outcome = send_with_retry(|| client.post(&url), &fast_retry_config()).await;

        match outcome {
            RetryOutcome::HttpError(response) => {
                assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            }
            other => panic!("expected HttpError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_request_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/generate", server.uri());
        let outcome = send_with_retry(|| client.post(&url), &fast_retry_config()).await;

        assert!(matches!(outcome, RetryOutcome::HttpError(r) if r.status() == StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn zero_retries_makes_a_single_attempt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/generate", server.uri());
        let config = RetryConfig {
            max_retries: 0,
            ..fast_retry_config()
        };
        let outcome = send_with_retry(|| client.post(&url), &config).await;

        assert!(matches!(outcome, RetryOutcome::HttpError(_)));
    }
}
