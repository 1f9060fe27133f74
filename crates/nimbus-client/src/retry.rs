//! The retry policy.
//!
//! [`check_retry`] looks at the outcome of one attempt and decides whether the
//! [`RetryingClient`](crate::RetryingClient) should try again. Rules, first
//! match wins:
//!
//! 1. POST requests are never retried; the outcome is returned as-is.
//! 2. A finished context stops retrying with the context's error.
//! 3. Transport failures are retried unless they are permanent (redirect
//!    limit, bad scheme, bad header, untrusted certificate). Signing and
//!    request-building failures are never retried.
//! 4. `429 Too Many Requests` is retried.
//! 5. `5xx` other than `501 Not Implemented` is retried, and reported as an
//!    unexpected status should the budget run out.
//! 6. Anything else is final.

use http::{Method, StatusCode};
use nimbus_core::Context;

use crate::error::ClientError;
use crate::transport::{HttpResponse, RequestMethod};

/// What to do after an attempt.
#[derive(Debug, Clone)]
pub struct RetryDecision {
    /// Whether to make another attempt.
    pub retry: bool,
    /// The error to report for this attempt, replacing the raw outcome.
    pub error: Option<ClientError>,
}

impl RetryDecision {
    fn stop() -> Self {
        Self {
            retry: false,
            error: None,
        }
    }

    fn stop_with(error: ClientError) -> Self {
        Self {
            retry: false,
            error: Some(error),
        }
    }

    fn again() -> Self {
        Self {
            retry: true,
            error: None,
        }
    }

    fn again_with(error: ClientError) -> Self {
        Self {
            retry: true,
            error: Some(error),
        }
    }
}

/// Signature of a retry policy, so callers can substitute their own.
pub type CheckRetry = fn(&Context, Result<&HttpResponse, &ClientError>) -> RetryDecision;

/// The default retry policy.
pub fn check_retry(ctx: &Context, outcome: Result<&HttpResponse, &ClientError>) -> RetryDecision {
    if is_post(outcome) {
        return RetryDecision::stop();
    }

    if let Some(err) = ctx.err() {
        return RetryDecision::stop_with(ClientError::Context(err));
    }

    match outcome {
        Err(err) => {
            if is_permanent(err) {
                RetryDecision::stop_with(err.clone())
            } else {
                RetryDecision::again()
            }
        }
        Ok(response) => {
            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                RetryDecision::again()
            } else if status.as_u16() >= 500 && status != StatusCode::NOT_IMPLEMENTED {
                RetryDecision::again_with(ClientError::UnexpectedStatus { status })
            } else {
                RetryDecision::stop()
            }
        }
    }
}

fn is_post(outcome: Result<&HttpResponse, &ClientError>) -> bool {
    match outcome {
        Ok(response) => response
            .extensions()
            .get::<RequestMethod>()
            .is_some_and(|m| m.0 == Method::POST),
        Err(ClientError::Transport(err)) => err.method == Method::POST,
        // Errors that carry no method: fall back to the rendered text.
        Err(err) => err.to_string().contains("POST"),
    }
}

fn is_permanent(err: &ClientError) -> bool {
    match err {
        ClientError::Transport(err) => err.kind.is_permanent(),
        ClientError::Signing(_) | ClientError::InvalidRequest(_) | ClientError::Context(_) => true,
        _ => false,
    }
}
