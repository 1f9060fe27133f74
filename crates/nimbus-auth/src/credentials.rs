//! Credentials and credential lookup.
//!
//! A [`Credential`] is what a client signs with. The [`CredentialProvider`]
//! trait resolves a key id to its secret on the verifying side, with
//! [`StaticCredentialProvider`] as an in-memory implementation.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::AuthError;

/// An access key id and its base64url-encoded (unpadded) secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    key_id: String,
    secret_key: String,
}

impl Credential {
    /// Create a credential. The secret is decoded lazily, on every signature.
    pub fn new(key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// The access key id.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The encoded secret key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Decode the secret key into raw HMAC key bytes.
    pub fn decode_secret(&self) -> Result<Vec<u8>, AuthError> {
        decode_secret(&self.secret_key)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key_id", &self.key_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Decode an unpadded base64url secret.
pub(crate) fn decode_secret(encoded: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| AuthError::InvalidSecretKey(e.to_string()))
}

/// Trait for looking up encoded secret keys by key id.
///
/// Implementations may back this with a database, configuration file,
/// or any other credential store.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the encoded secret key for the given key id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessKeyNotFound`] if the key id is not recognized.
    fn get_secret_key(&self, key_id: &str) -> Result<String, AuthError>;
}

/// A simple in-memory credential provider backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use nimbus_auth::credentials::{CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![
///     ("key-1".to_owned(), "c2VjcmV0LWtleQ".to_owned()),
/// ]);
///
/// assert_eq!(provider.get_secret_key("key-1").unwrap(), "c2VjcmV0LWtleQ");
/// ```
#[derive(Clone)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl StaticCredentialProvider {
    /// Create a provider from (key_id, secret_key) pairs.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }
}

impl From<&Credential> for StaticCredentialProvider {
    fn from(credential: &Credential) -> Self {
        Self::new([(
            credential.key_id().to_owned(),
            credential.secret_key().to_owned(),
        )])
    }
}

impl fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field("key_ids", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret_key(&self, key_id: &str) -> Result<String, AuthError> {
        self.credentials
            .get(key_id)
            .cloned()
            .ok_or_else(|| AuthError::AccessKeyNotFound(key_id.to_owned()))
    }
}
