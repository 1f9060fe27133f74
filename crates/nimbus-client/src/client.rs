//! The retrying client.
//!
//! [`RetryingClient`] sends a request through its transport, asks the retry
//! policy what to do with the outcome, and waits out an exponential back-off
//! between attempts. The request body is buffered so every attempt resends
//! the same bytes. A `Retry-After` header on `429` or `503` overrides the
//! computed back-off. Both the attempt and the wait abort as soon as the
//! context finishes.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};
use nimbus_core::{Context, NimbusConfig};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::retry::{CheckRetry, check_retry};
use crate::transport::{HttpRequest, HttpResponse, HttpSend, RequestMethod};

/// Retry budget and back-off bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Back-off before the first retry.
    pub wait_min: Duration,
    /// Upper bound for any single back-off.
    pub wait_max: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            wait_min: Duration::from_secs(1),
            wait_max: Duration::from_secs(30),
        }
    }
}

impl From<&NimbusConfig> for RetryConfig {
    fn from(config: &NimbusConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            wait_min: config.retry_wait_min,
            wait_max: config.retry_wait_max,
        }
    }
}

impl RetryConfig {
    /// Back-off before retry number `attempt` (zero-based), ignoring any server hint.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.wait_min
            .checked_mul(factor)
            .unwrap_or(self.wait_max)
            .min(self.wait_max)
    }
}

/// Sends requests with retries, back-off and cancellation.
#[derive(Debug, Clone)]
pub struct RetryingClient<S> {
    transport: S,
    config: RetryConfig,
    check_retry: CheckRetry,
}

impl<S: HttpSend> RetryingClient<S> {
    /// Create a client using the default retry policy.
    pub fn new(transport: S, config: RetryConfig) -> Self {
        Self {
            transport,
            config,
            check_retry,
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_check_retry(mut self, check_retry: CheckRetry) -> Self {
        self.check_retry = check_retry;
        self
    }

    /// The retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &S {
        &self.transport
    }

    /// Send `request`, retrying as the policy allows.
    ///
    /// Returns the final response whatever its status. Errors are the policy's
    /// error for the final attempt, the transport error when the policy gave
    /// none, [`ClientError::RetriesExhausted`] once the budget is spent, or
    /// [`ClientError::Context`] when the context finishes first.
    pub async fn execute(&self, ctx: &Context, request: HttpRequest) -> ClientResult<HttpResponse> {
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();
        let url = parts.uri.to_string();

        let mut attempt: u32 = 0;
        loop {
            if let Some(err) = ctx.err() {
                return Err(ClientError::Context(err));
            }
            let request = rebuild(&parts, &body);
            let outcome = tokio::select! {
                biased;
                err = ctx.done() => Err(ClientError::Context(err)),
                result = self.transport.send(request) => result,
            };
            let outcome = outcome.map(|mut response| {
                if response.extensions().get::<RequestMethod>().is_none() {
                    response
                        .extensions_mut()
                        .insert(RequestMethod(method.clone()));
                }
                response
            });

            let decision = (self.check_retry)(ctx, outcome.as_ref());
            if !decision.retry {
                debug!(%method, %url, attempts = attempt + 1, "request finished");
                return match decision.error {
                    Some(err) => Err(err),
                    None => outcome,
                };
            }

            if attempt >= self.config.max_retries {
                warn!(%method, %url, attempts = attempt + 1, "giving up");
                return Err(ClientError::RetriesExhausted {
                    method,
                    url,
                    attempts: attempt + 1,
                    last: decision.error.or_else(|| outcome.err()).map(Box::new),
                });
            }

            let wait = self.wait_before_retry(attempt, outcome.as_ref().ok());
            let reason = match &outcome {
                Ok(response) => response.status().to_string(),
                Err(err) => err.to_string(),
            };
            warn!(
                %method,
                %url,
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                %reason,
                "retrying request"
            );
            drop(outcome);

            ctx.sleep(wait).await?;
            attempt += 1;
        }
    }

    fn wait_before_retry(&self, attempt: u32, response: Option<&HttpResponse>) -> Duration {
        let hinted = response
            .filter(|r| {
                matches!(
                    r.status(),
                    StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
                )
            })
            .and_then(|r| retry_after(r.headers(), Utc::now()));
        match hinted {
            Some(wait) => wait.min(self.config.wait_max),
            None => self.config.backoff(attempt),
        }
    }
}

/// Parse a `Retry-After` header given in seconds or as an HTTP date.
///
/// A date in the past yields a zero wait.
#[must_use]
pub fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        at.with_timezone(&Utc)
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

fn rebuild(parts: &http::request::Parts, body: &Bytes) -> HttpRequest {
    let mut request = http::Request::new(body.clone());
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = parts.uri.clone();
    *request.version_mut() = parts.version;
    *request.headers_mut() = parts.headers.clone();
    request
}
