//! HMAC-SHA256 request signing for the Nimbus management API.
//!
//! Every request sent to the management API carries two headers: a timestamp
//! (`X-Nimbus-Timestamp`, RFC 3339 UTC) and an `Authorization` header of the
//! form `Bearer 1.0:{key_id}:{signature}`. The signature is the unpadded
//! base64url encoding of an HMAC-SHA256 over the canonical message:
//!
//! ```text
//! {path}\n
//! {canonical query}\n
//! {method}\n
//! {timestamp}\n
//! ```
//!
//! # Usage
//!
//! ```rust
//! use nimbus_auth::{Credential, Signer};
//!
//! let signer = Signer::new(Credential::new("key-1", "c2VjcmV0LWtleQ"));
//! let mut request = http::Request::builder()
//!     .method("GET")
//!     .uri("https://api.example.com/v1/projects?limit=10")
//!     .body(())
//!     .unwrap();
//! signer.sign_request(&mut request).unwrap();
//! assert!(request.headers().contains_key(http::header::AUTHORIZATION));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Query canonicalization and canonical message construction
//! - [`credentials`] - Credentials and the credential provider trait
//! - [`error`] - Authentication error types
//! - [`signer`] - Request signing
//! - [`verify`] - Signature verification for received requests

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod signer;
pub mod verify;

pub use credentials::{Credential, CredentialProvider, StaticCredentialProvider};
pub use error::AuthError;
pub use signer::{AUTH_VERSION, Signer, TIMESTAMP_HEADER};
pub use verify::verify_request;
