//! The transport abstraction and its reqwest implementation.
//!
//! [`HttpSend`] is the seam every client layer is built on: it takes a fully
//! formed request and yields a fully buffered response. Implementations record
//! the request method on every response (as a [`RequestMethod`] extension) and
//! on every [`TransportError`], so the retry policy can tell which method an
//! attempt used.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use tracing::debug;

use crate::error::{ClientError, TransportError, TransportErrorKind};

/// Outbound request with a buffered body.
pub type HttpRequest = http::Request<Bytes>;

/// Inbound response with a fully read body.
pub type HttpResponse = http::Response<Bytes>;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The method of the request a response answers, stored in the response extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMethod(pub Method);

/// Something that can send an HTTP request.
///
/// # Object Safety
///
/// The returned future is boxed so layers can be stacked behind `Arc<dyn HttpSend>`.
pub trait HttpSend: Send + Sync {
    /// Send one request and buffer the response.
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>>;
}

impl<T: HttpSend + ?Sized> HttpSend for Arc<T> {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        (**self).send(request)
    }
}

impl<T: HttpSend + ?Sized> HttpSend for Box<T> {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        (**self).send(request)
    }
}

/// Network transport backed by [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Redirects followed before giving up.
    pub const MAX_REDIRECTS: usize = 10;

    /// Build a transport with a per-attempt timeout.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(Self::MAX_REDIRECTS))
            .user_agent(concat!("nimbus-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ClientError::InvalidRequest(format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    #[must_use]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpSend for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        Box::pin(async move {
            let method = request.method().clone();
            let url = request.uri().to_string();
            let to_error = |e: &reqwest::Error| {
                TransportError::new(method.clone(), url.clone(), classify(e), describe(e))
            };

            let request = reqwest::Request::try_from(request).map_err(|e| to_error(&e))?;
            let response = self.client.execute(request).await.map_err(|e| to_error(&e))?;

            let status = response.status();
            let version = response.version();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(|e| to_error(&e))?;

            debug!(%method, %url, %status, body_len = body.len(), "received response");

            let mut out = http::Response::new(body);
            *out.status_mut() = status;
            *out.version_mut() = version;
            *out.headers_mut() = headers;
            out.extensions_mut().insert(RequestMethod(method));
            Ok(out)
        })
    }
}

/// Map a reqwest error onto the kinds the retry policy distinguishes.
fn classify(err: &reqwest::Error) -> TransportErrorKind {
    // Only the causes: reqwest's own message embeds the URL.
    let text = err
        .source()
        .map(describe)
        .unwrap_or_default()
        .to_ascii_lowercase();

    if err.is_redirect() || text.contains("too many redirects") {
        TransportErrorKind::TooManyRedirects
    } else if text.contains("certificate") || text.contains("unknownissuer") {
        TransportErrorKind::UntrustedCertificate
    } else if text.contains("scheme") {
        TransportErrorKind::InvalidScheme
    } else if text.contains("invalid header") || text.contains("header value") {
        TransportErrorKind::InvalidHeader
    } else if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Other
    }
}

/// Render an error with its whole source chain.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
