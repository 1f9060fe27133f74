//! Typed JSON calls against the management API.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderValue, Method};
use nimbus_auth::{Credential, Signer};
use nimbus_core::{Context, NimbusConfig};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::AuthenticatingTransport;
use crate::client::{RetryConfig, RetryingClient};
use crate::error::{ClientError, ClientResult};
use crate::transport::{HttpResponse, HttpSend, ReqwestTransport};

const APPLICATION_JSON: &str = "application/json";

/// Management API client: resolves paths against a base URL, encodes and
/// decodes JSON, and turns non-success statuses into [`ClientError::Api`].
#[derive(Debug, Clone)]
pub struct ApiClient<S = AuthenticatingTransport<ReqwestTransport>> {
    base_url: String,
    client: RetryingClient<S>,
}

impl ApiClient {
    /// Build the standard signed, retried client from configuration.
    pub fn from_config(config: &NimbusConfig) -> ClientResult<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        let signer = Signer::new(Credential::new(
            config.access_key_id.clone(),
            config.secret_key.clone(),
        ));
        let client = RetryingClient::new(
            AuthenticatingTransport::new(transport, signer),
            RetryConfig::from(config),
        );
        Ok(Self::new(config.api_endpoint.clone(), client))
    }
}

impl<S: HttpSend> ApiClient<S> {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, client: RetryingClient<S>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }

    /// The API base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The retrying client requests go through.
    pub fn client(&self) -> &RetryingClient<S> {
        &self.client
    }

    /// Resolve `path` against the base URL. Absolute URLs are returned unchanged.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            return path.to_owned();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and return the successful response.
    ///
    /// A response outside `2xx` becomes [`ClientError::Api`] carrying the raw body.
    pub async fn execute(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> ClientResult<HttpResponse> {
        let url = self.url(path);
        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(url.as_str())
            .header(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        }
        let request = builder
            .body(body.unwrap_or_default())
            .map_err(|e| ClientError::InvalidRequest(format!("{method} {url}: {e}")))?;

        let response = self.client.execute(ctx, request).await?;
        let status = response.status();
        debug!(%method, %url, %status, "API call completed");

        if status.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Api {
                status,
                body: response.into_body(),
            })
        }
    }

    /// `GET` a JSON resource.
    pub async fn get<T: DeserializeOwned>(&self, ctx: &Context, path: &str) -> ClientResult<T> {
        self.call(ctx, Method::GET, path, None::<&()>).await
    }

    /// `POST` a JSON body. Never retried.
    pub async fn post<B, T>(&self, ctx: &Context, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(ctx, Method::POST, path, Some(body)).await
    }

    /// `PUT` a JSON body.
    pub async fn put<B, T>(&self, ctx: &Context, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(ctx, Method::PUT, path, Some(body)).await
    }

    /// `PATCH` a JSON body.
    pub async fn patch<B, T>(&self, ctx: &Context, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(ctx, Method::PATCH, path, Some(body)).await
    }

    /// `DELETE` a resource.
    pub async fn delete<T: DeserializeOwned>(&self, ctx: &Context, path: &str) -> ClientResult<T> {
        self.call(ctx, Method::DELETE, path, None::<&()>).await
    }

    async fn call<B, T>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body
            .map(|b| serde_json::to_vec(b).map(Bytes::from))
            .transpose()
            .map_err(|e| ClientError::Encode(Arc::new(e)))?;
        let response = self.execute(ctx, method, path, body).await?;
        decode(response.body())
    }
}

/// Decode a JSON body. An empty body decodes as `null`, so `()` and `Option`
/// targets accept `204 No Content`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> ClientResult<T> {
    let body = if body.is_empty() { b"null".as_slice() } else { body };
    serde_json::from_slice(body).map_err(|e| ClientError::Decode(Arc::new(e)))
}
