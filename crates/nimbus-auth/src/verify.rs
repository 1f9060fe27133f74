//! Signature verification for received requests.
//!
//! The verifying side of the signing protocol:
//!
//! 1. Parse the `Authorization` header into version, key id and signature.
//! 2. Resolve the secret for the key id via the credential provider.
//! 3. Rebuild the canonical message from the received request and timestamp header.
//! 4. Recompute the signature and compare it in constant time.
//!
//! The main entry point is [`verify_request`].

use subtle::ConstantTimeEq;
use tracing::debug;

use crate::credentials::{Credential, CredentialProvider};
use crate::error::AuthError;
use crate::signer::{AUTH_VERSION, Signer, TIMESTAMP_HEADER};

/// Parsed components of an `Authorization: Bearer {version}:{key_id}:{signature}` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAuthorization {
    /// Protocol version tag.
    pub version: String,
    /// Access key id.
    pub key_id: String,
    /// Unpadded base64url signature.
    pub signature: String,
}

/// Parse an `Authorization` header value.
///
/// # Examples
///
/// ```
/// use nimbus_auth::verify::parse_authorization_header;
///
/// let parsed = parse_authorization_header("Bearer 1.0:key-1:c2ln").unwrap();
/// assert_eq!(parsed.key_id, "key-1");
/// assert_eq!(parsed.signature, "c2ln");
/// ```
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuthorization, AuthError> {
    let credentials = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?;
    let (version, rest) = credentials
        .split_once(':')
        .ok_or(AuthError::InvalidAuthHeader)?;
    let (key_id, signature) = rest.rsplit_once(':').ok_or(AuthError::InvalidAuthHeader)?;

    if key_id.is_empty() || signature.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    if version != AUTH_VERSION {
        return Err(AuthError::UnsupportedVersion(version.to_owned()));
    }

    Ok(ParsedAuthorization {
        version: version.to_owned(),
        key_id: key_id.to_owned(),
        signature: signature.to_owned(),
    })
}

/// Verify a signed request, reading the timestamp from the default header.
///
/// Returns the key id that signed the request.
pub fn verify_request(
    parts: &http::request::Parts,
    provider: &dyn CredentialProvider,
) -> Result<String, AuthError> {
    verify_request_with_header(parts, provider, TIMESTAMP_HEADER)
}

/// Verify a signed request whose timestamp travels in `timestamp_header`.
pub fn verify_request_with_header(
    parts: &http::request::Parts,
    provider: &dyn CredentialProvider,
    timestamp_header: &str,
) -> Result<String, AuthError> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;
    let parsed = parse_authorization_header(header)?;

    let timestamp = parts
        .headers
        .get(timestamp_header)
        .ok_or(AuthError::MissingTimestamp)?
        .to_str()
        .map_err(|_| AuthError::MissingTimestamp)?;

    let secret = provider.get_secret_key(&parsed.key_id)?;
    let signer = Signer::new(Credential::new(parsed.key_id.clone(), secret));
    let expected = signer.authorization(&parts.method, &parts.uri, timestamp)?;

    let provided = header.as_bytes();
    if provided.ct_eq(expected.as_bytes()).into() {
        debug!(key_id = %parsed.key_id, "signature verification succeeded");
        Ok(parsed.key_id)
    } else {
        debug!(key_id = %parsed.key_id, "signature mismatch");
        Err(AuthError::SignatureDoesNotMatch)
    }
}
