//! Human-readable messages from API error envelopes.
//!
//! Error bodies from the API are `{code, message}` envelopes. When the
//! failure originated in a backend RPC, the message embeds the RPC status
//! (`rpc error: code = NotFound desc = vm not found`); only the text after
//! `desc = ` is meant for people.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ClientError, ErrorEnvelope};

static RPC_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r".*desc = (.*)").expect("RPC description pattern is valid")
});

/// The human-readable message inside an API error, if there is one.
///
/// Only [`ClientError::Api`] bodies that decode as an [`ErrorEnvelope`] have
/// a message. An embedded `desc = ` description wins over the full text.
#[must_use]
pub fn api_error_message(err: &ClientError) -> Option<String> {
    let ClientError::Api { body, .. } = err else {
        return None;
    };
    let envelope: ErrorEnvelope = serde_json::from_slice(body).ok()?;
    let message = RPC_DESCRIPTION
        .captures(&envelope.message)
        .and_then(|caps| caps.get(1))
        .map_or(envelope.message.as_str(), |m| m.as_str());
    Some(message.to_owned())
}

/// Replace an API error with its human-readable message.
///
/// Any other error, or an API error whose body is not an envelope, is
/// returned unchanged.
#[must_use]
pub fn unpack_api_error(err: ClientError) -> ClientError {
    match api_error_message(&err) {
        Some(message) => ClientError::Message(message),
        None => err,
    }
}
