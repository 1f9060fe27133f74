//! Request signing.
//!
//! [`Signer`] computes the timestamp and `Authorization` headers for a request:
//!
//! 1. Format the current UTC time as RFC 3339 (seconds precision, `Z` suffix).
//! 2. Build the canonical message from the decoded path, the canonical query,
//!    the method and the timestamp.
//! 3. Decode the secret key from unpadded base64url.
//! 4. HMAC-SHA256 the canonical message with the decoded secret.
//! 5. Emit `Bearer {version}:{key_id}:{base64url(signature)}`.
//!
//! Signing never sends anything; it only mutates headers. A canonicalization
//! or key-decoding failure is returned as an error and no header is written.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use http::{HeaderName, HeaderValue, Method, Uri};
use sha2::Sha256;
use tracing::debug;

use crate::canonical::{build_canonical_message, canonical_path, canonicalize_query};
use crate::credentials::Credential;
use crate::error::AuthError;

/// Protocol version tag carried in the `Authorization` header.
pub const AUTH_VERSION: &str = "1.0";

/// Default name of the header carrying the signing timestamp.
pub const TIMESTAMP_HEADER: &str = "x-nimbus-timestamp";

type HmacSha256 = Hmac<Sha256>;

/// Signs requests with a shared-secret credential.
///
/// The credential is read-only and shared, so a `Signer` can be cloned freely
/// and used from concurrent tasks.
#[derive(Debug, Clone)]
pub struct Signer {
    credential: Arc<Credential>,
    timestamp_header: HeaderName,
}

impl Signer {
    /// Create a signer using the default timestamp header.
    #[must_use]
    pub fn new(credential: Credential) -> Self {
        Self {
            credential: Arc::new(credential),
            timestamp_header: HeaderName::from_static(TIMESTAMP_HEADER),
        }
    }

    /// Use a different timestamp header name.
    #[must_use]
    pub fn with_timestamp_header(mut self, header: HeaderName) -> Self {
        self.timestamp_header = header;
        self
    }

    /// The header the timestamp is written to.
    #[must_use]
    pub fn timestamp_header(&self) -> &HeaderName {
        &self.timestamp_header
    }

    /// The access key id requests are signed with.
    #[must_use]
    pub fn key_id(&self) -> &str {
        self.credential.key_id()
    }

    /// Compute the `Authorization` header value for the given request line and timestamp.
    pub fn authorization(
        &self,
        method: &Method,
        uri: &Uri,
        timestamp: &str,
    ) -> Result<String, AuthError> {
        let canonical_query = canonicalize_query(uri.query().unwrap_or("")).into_result()?;
        let path = canonical_path(uri.path());
        let message = build_canonical_message(&path, &canonical_query, method.as_str(), timestamp);

        debug!(
            key_id = %self.credential.key_id(),
            canonical_message = %String::from_utf8_lossy(&message),
            "built canonical message"
        );

        let secret = self.credential.decode_secret()?;
        let signature = compute_signature(&secret, &message);
        Ok(format_authorization(self.credential.key_id(), &signature))
    }

    /// Sign a request with the current time.
    pub fn sign_request<B>(&self, request: &mut http::Request<B>) -> Result<(), AuthError> {
        self.sign_request_at(request, Utc::now())
    }

    /// Sign a request as of `now`.
    pub fn sign_request_at<B>(
        &self,
        request: &mut http::Request<B>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let timestamp = format_timestamp(now);
        let authorization = self.authorization(request.method(), request.uri(), &timestamp)?;

        let timestamp_value = HeaderValue::from_str(&timestamp)
            .map_err(|_| AuthError::InvalidHeaderValue("timestamp"))?;
        let authorization_value = HeaderValue::from_str(&authorization)
            .map_err(|_| AuthError::InvalidHeaderValue("Authorization"))?;

        let headers = request.headers_mut();
        headers.insert(self.timestamp_header.clone(), timestamp_value);
        headers.insert(http::header::AUTHORIZATION, authorization_value);
        Ok(())
    }
}

/// Format a timestamp the way the timestamp header carries it.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use nimbus_auth::signer::format_timestamp;
///
/// let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
/// assert_eq!(format_timestamp(now), "2024-05-01T12:30:00Z");
/// ```
#[must_use]
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Compute the HMAC-SHA256 of `message` and return it as unpadded base64url.
#[must_use]
pub fn compute_signature(secret: &[u8], message: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(hmac_sha256(secret, message))
}

/// Build the `Authorization` header value.
#[must_use]
pub fn format_authorization(key_id: &str, signature: &str) -> String {
    format!("Bearer {AUTH_VERSION}:{key_id}:{signature}")
}

/// Compute HMAC-SHA256 and return the raw bytes.
pub(crate) fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = <HmacSha256 as KeyInit>::new_from_slice(key)
        .expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
