//! Error types for the Nimbus HTTP client.
//!
//! [`ClientError`] covers every way a call can fail: the request could not be
//! signed, the transport failed, the context finished, the retry budget ran
//! out, or the API answered with a non-success status.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use nimbus_auth::AuthError;
use nimbus_core::ContextError;

/// Broad classes of transport failure, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The redirect limit was hit.
    TooManyRedirects,
    /// The URL scheme is not supported.
    InvalidScheme,
    /// A header name or value was rejected.
    InvalidHeader,
    /// The server certificate is not trusted.
    UntrustedCertificate,
    /// The attempt timed out.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The response body could not be read.
    Body,
    /// Anything else.
    Other,
}

impl TransportErrorKind {
    /// Whether the failure is a configuration or policy problem that a retry cannot fix.
    #[must_use]
    pub fn is_permanent(self) -> bool {
        matches!(
            self,
            Self::TooManyRedirects
                | Self::InvalidScheme
                | Self::InvalidHeader
                | Self::UntrustedCertificate
        )
    }
}

/// A failed attempt that produced no response.
///
/// Displays as `METHOD "url": message`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{method} \"{url}\": {message}")]
pub struct TransportError {
    /// Method of the request that failed.
    pub method: Method,
    /// URL of the request that failed.
    pub url: String,
    /// Failure class.
    pub kind: TransportErrorKind,
    /// Description of the failure, including its causes.
    pub message: String,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(
        method: Method,
        url: impl Into<String>,
        kind: TransportErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Errors returned by the Nimbus HTTP client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The request could not be signed and was not sent.
    #[error("failed to sign request: {0}")]
    Signing(#[from] AuthError),

    /// The transport failed without producing a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The call's context was cancelled or its deadline passed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A retryable server status; reported while retrying.
    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus {
        /// The status received.
        status: StatusCode,
    },

    /// Every attempt allowed by the retry budget failed.
    #[error("{method} {url} giving up after {attempts} attempt(s)")]
    RetriesExhausted {
        /// Method of the request.
        method: Method,
        /// URL of the request.
        url: String,
        /// Attempts made, including the first.
        attempts: u32,
        /// The last attempt's error, if it had one.
        #[source]
        last: Option<Box<ClientError>>,
    },

    /// The API answered with a non-success status.
    #[error("API request failed with status {status}: {}", String::from_utf8_lossy(.body))]
    Api {
        /// The status received.
        status: StatusCode,
        /// The raw response body, usually an [`ErrorEnvelope`].
        body: Bytes,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    /// The request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] Arc<serde_json::Error>),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A plain message, typically unpacked from an API error envelope.
    #[error("{0}")]
    Message(String),
}

/// Convenience result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// The `{code, message}` body the API uses to report failures.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorEnvelope {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable description.
    pub message: String,
}
