//! Canonical message construction for request signing.
//!
//! The signed message is built from four newline-terminated components:
//!
//! ```text
//! Path\n
//! CanonicalQueryString\n
//! HTTPRequestMethod\n
//! Timestamp\n
//! ```
//!
//! The query string is normalized so that two requests carrying the same
//! parameters produce the same message regardless of parameter order.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};

use crate::error::AuthError;

/// The set of bytes that must be percent-encoded in query keys and values.
///
/// Everything except unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`)
/// is encoded. Spaces are rendered as `+` by [`query_escape`].
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The result of canonicalizing a raw query string.
///
/// Malformed parameters do not stop canonicalization: `query` holds every
/// parameter that could be decoded, and `error` the first problem found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalQuery {
    /// The canonical query string.
    pub query: String,
    /// The first error encountered, if any.
    pub error: Option<AuthError>,
}

impl CanonicalQuery {
    /// Convert into a `Result`, failing if any parameter was rejected.
    pub fn into_result(self) -> Result<String, AuthError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.query),
        }
    }
}

/// Build the canonical query string.
///
/// Parameters are decoded, grouped by key, sorted by key and re-encoded. Values
/// of a repeated key keep their original relative order.
///
/// # Examples
///
/// ```
/// use nimbus_auth::canonical::canonicalize_query;
///
/// assert_eq!(canonicalize_query("b=2&a=1").query, "a=1&b=2");
/// assert_eq!(canonicalize_query("q=hello%20world").query, "q=hello+world");
///
/// let partial = canonicalize_query("a=1;b=2&c=3");
/// assert_eq!(partial.query, "c=3");
/// assert!(partial.error.is_some());
/// ```
#[must_use]
pub fn canonicalize_query(raw: &str) -> CanonicalQuery {
    let mut params: BTreeMap<Vec<u8>, Vec<Vec<u8>>> = BTreeMap::new();
    let mut first_error = None;

    for token in raw.split('&') {
        if token.contains(';') {
            first_error.get_or_insert(AuthError::InvalidSemicolonSeparator);
            continue;
        }
        if token.is_empty() {
            continue;
        }

        let (key, value) = token.split_once('=').unwrap_or((token, ""));
        let decoded = query_unescape(key).and_then(|k| query_unescape(value).map(|v| (k, v)));
        match decoded {
            Ok((key, value)) => params.entry(key).or_default().push(value),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    let mut query = String::with_capacity(raw.len());
    for (key, values) in &params {
        let key = query_escape(key);
        for value in values {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&key);
            query.push('=');
            query.push_str(&query_escape(value));
        }
    }

    CanonicalQuery {
        query,
        error: first_error,
    }
}

/// Build the message that is signed.
///
/// The path is taken as raw decoded bytes, so the message is a byte string
/// rather than text.
///
/// # Examples
///
/// ```
/// use nimbus_auth::canonical::build_canonical_message;
///
/// let message = build_canonical_message(b"/v1/projects", "limit=5", "GET", "2024-05-01T12:00:00Z");
/// assert_eq!(message, b"/v1/projects\nlimit=5\nGET\n2024-05-01T12:00:00Z\n");
/// ```
#[must_use]
pub fn build_canonical_message(
    path: &[u8],
    canonical_query: &str,
    method: &str,
    timestamp: &str,
) -> Vec<u8> {
    let mut message =
        Vec::with_capacity(path.len() + canonical_query.len() + method.len() + timestamp.len() + 4);
    for component in [path, canonical_query.as_bytes(), method.as_bytes(), timestamp.as_bytes()] {
        message.extend_from_slice(component);
        message.push(b'\n');
    }
    message
}

/// Decode a raw URI path for signing.
///
/// The signature covers the decoded path bytes, so `/a%20b` and `/a b` sign
/// alike. Escapes that decode to invalid UTF-8 are kept byte for byte.
#[must_use]
pub fn canonical_path(raw_path: &str) -> Vec<u8> {
    percent_decode_str(raw_path).collect()
}

/// Decode a query component: `+` becomes a space and `%XX` becomes a byte.
fn query_unescape(component: &str) -> Result<Vec<u8>, AuthError> {
    let bytes = component.as_bytes();
    for (i, _) in component.match_indices('%') {
        let well_formed = bytes
            .get(i + 1..i + 3)
            .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            let end = (i + 3).min(bytes.len());
            return Err(AuthError::InvalidEscape(
                String::from_utf8_lossy(&bytes[i..end]).into_owned(),
            ));
        }
    }

    let spaced = component.replace('+', " ");
    Ok(percent_decode_str(&spaced).collect())
}

/// Encode a query component, rendering spaces as `+`.
fn query_escape(component: &[u8]) -> String {
    percent_encode(component, QUERY_ENCODE_SET)
        .map(|chunk| if chunk == "%20" { "+" } else { chunk })
        .collect()
}
