//! Error types for request signing and verification.
//!
//! All failures are represented by [`AuthError`]. Signing failures abort the
//! request before it is sent; verification failures reject a received request.

/// Errors that can occur while signing or verifying a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// A query parameter used `;` as a separator.
    #[error("invalid semicolon separator in query")]
    InvalidSemicolonSeparator,

    /// A query parameter contained a malformed percent escape.
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),

    /// The secret key is not valid unpadded base64url.
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// A computed header value could not be represented as an HTTP header.
    #[error("invalid header value for {0}")]
    InvalidHeaderValue(&'static str),

    /// The `Authorization` header is missing from the request.
    #[error("missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed.
    #[error("invalid Authorization header format")]
    InvalidAuthHeader,

    /// The signing protocol version is not supported.
    #[error("unsupported signature version: {0}")]
    UnsupportedVersion(String),

    /// The timestamp header is missing from the request.
    #[error("missing timestamp header")]
    MissingTimestamp,

    /// The key id was not found in the credential store.
    #[error("access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The computed signature does not match the provided signature.
    #[error("signature does not match")]
    SignatureDoesNotMatch,
}
