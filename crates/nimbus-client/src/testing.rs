//! Scripted transport shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::error::{ClientError, TransportError, TransportErrorKind};
use crate::transport::{BoxFuture, HttpRequest, HttpResponse, HttpSend, RequestMethod};

/// One scripted answer.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Status(u16),
    StatusWithHeader(u16, &'static str, &'static str),
    Json(u16, &'static str),
    Fail(TransportErrorKind),
}

/// Answers requests from a script and records what it was sent.
///
/// Once the script runs out the last reply repeats.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    seen: Mutex<Vec<(Method, String, HeaderMap, Bytes)>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub(crate) fn seen(&self) -> Vec<(Method, String, HeaderMap, Bytes)> {
        self.seen.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Reply {
        let mut last = self.last.lock().unwrap();
        if let Some(reply) = self.script.lock().unwrap().pop_front() {
            *last = Some(reply);
        }
        last.clone().expect("script must not be empty")
    }
}

impl HttpSend for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        let (parts, body) = request.into_parts();
        let url = parts.uri.to_string();
        self.seen.lock().unwrap().push((
            parts.method.clone(),
            url.clone(),
            parts.headers.clone(),
            body,
        ));

        let build = |status: u16, body: Bytes| {
            let mut response = http::Response::builder()
                .status(status)
                .body(body)
                .unwrap();
            response
                .extensions_mut()
                .insert(RequestMethod(parts.method.clone()));
            response
        };

        let result = match self.next_reply() {
            Reply::Status(status) => Ok(build(status, Bytes::new())),
            Reply::StatusWithHeader(status, name, value) => {
                let mut response = build(status, Bytes::new());
                response
                    .headers_mut()
                    .insert(name, http::HeaderValue::from_static(value));
                Ok(response)
            }
            Reply::Json(status, body) => Ok(build(status, Bytes::from_static(body.as_bytes()))),
            Reply::Fail(kind) => Err(ClientError::Transport(TransportError::new(
                parts.method.clone(),
                url,
                kind,
                "scripted failure",
            ))),
        };
        Box::pin(std::future::ready(result))
    }
}
