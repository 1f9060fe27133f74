//! Signed, retried HTTP client for the Nimbus management API.
//!
//! The client is a stack of small [`HttpSend`] layers:
//!
//! ```text
//! ApiClient (paths, JSON, non-2xx → ClientError::Api)
//!     → RetryingClient (retry budget, back-off, check_retry policy)
//!         → AuthenticatingTransport (timestamp + Authorization headers)
//!             → ReqwestTransport (network I/O)
//! ```
//!
//! Every layer takes a [`Context`](nimbus_core::Context); cancelling it aborts
//! the in-flight attempt and any back-off wait.
//!
//! # Modules
//!
//! - [`api`] - Typed JSON calls against the management API
//! - [`auth`] - The signing transport decorator
//! - [`client`] - The retrying client
//! - [`error`] - Client error types
//! - [`retry`] - The retry policy
//! - [`transport`] - The transport trait and its reqwest implementation
//! - [`unpack`] - Human-readable messages from API error envelopes

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod retry;
pub mod transport;
pub mod unpack;

#[cfg(test)]
mod testing;

pub use api::ApiClient;
pub use auth::AuthenticatingTransport;
pub use client::{RetryConfig, RetryingClient, retry_after};
pub use error::{ClientError, ClientResult, ErrorEnvelope, TransportError, TransportErrorKind};
pub use retry::{CheckRetry, RetryDecision, check_retry};
pub use transport::{HttpRequest, HttpResponse, HttpSend, ReqwestTransport, RequestMethod};
pub use unpack::{api_error_message, unpack_api_error};
