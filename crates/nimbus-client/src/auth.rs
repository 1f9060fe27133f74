//! The signing transport decorator.
//!
//! [`AuthenticatingTransport`] composes a [`Signer`] with any inner
//! [`HttpSend`]: it stamps the timestamp and `Authorization` headers onto each
//! request and hands it to the inner transport. A request that cannot be
//! signed is never sent. Errors of the inner transport pass through unchanged.

use nimbus_auth::Signer;

use crate::error::ClientError;
use crate::transport::{BoxFuture, HttpRequest, HttpResponse, HttpSend};

/// Signs every request before delegating to the inner transport.
#[derive(Debug, Clone)]
pub struct AuthenticatingTransport<S> {
    inner: S,
    signer: Signer,
}

impl<S> AuthenticatingTransport<S> {
    /// Wrap `inner` so that every request is signed by `signer`.
    pub fn new(inner: S, signer: Signer) -> Self {
        Self { inner, signer }
    }

    /// The signer in use.
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: HttpSend> HttpSend for AuthenticatingTransport<S> {
    fn send(&self, mut request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        if let Err(err) = self.signer.sign_request(&mut request) {
            tracing::warn!(
                method = %request.method(),
                uri = %request.uri(),
                error = %err,
                "refusing to send unsigned request"
            );
            return Box::pin(std::future::ready(Err(ClientError::Signing(err))));
        }
        self.inner.send(request)
    }
}
