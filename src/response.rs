//! Classification of query endpoint responses.
//!
//! The query endpoint answers with a JSON document. A request failed when the
//! HTTP status is outside the success range, or when the document carries an
//! `error` field, either at the top level or inside any element of a
//! top-level array. A successful status with a body that is not JSON is
//! reported as [`QueryResponse::Undecodable`], which callers treat as "no
//! result data" rather than as a failure.

use alloc::format;
use alloc::string::{String, ToString};
use serde_json::Value;

/// Outcome of one request to the query endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    /// The query ran; the decoded response body.
    Rows(Value),
    /// Successful status, but the body could not be decoded as JSON.
    Undecodable {
        /// Decoder error message.
        reason: String,
    },
    /// The endpoint rejected the query.
    Failed(String),
}

impl QueryResponse {
    /// Classify a raw HTTP response.
    #[must_use]
    pub fn from_http(status: u16, body: &str) -> Self {
        if !(200..=299).contains(&status) {
            return Self::Failed(format!("HTTP {status}: {body}"));
        }
        Self::from_body(body)
    }

    /// Classify the body of a response whose status reported success.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => match embedded_error(&value) {
                Some(error) => Self::Failed(error_message(error)),
                None => Self::Rows(value),
            },
            Err(err) => Self::Undecodable {
                reason: err.to_string(),
            },
        }
    }

    /// Returns true for [`QueryResponse::Failed`].
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Find the `error` field of a response document, if any.
fn embedded_error(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => map.get("error"),
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.as_object().and_then(|map| map.get("error"))),
        _ => None,
    }
}

/// Render an `error` value as a human readable message.
fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}
