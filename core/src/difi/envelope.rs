/// DiFi response envelope
///
/// `{"DiFi": {"status": .., "response": {"calls": [{"response": {"status": .., "content": ..}}]}}}`
use crate::error::{Result, WatchError};
use serde::Deserialize;
use serde_json::Value;
use std::ops::Range;

const SUCCESS: &str = "SUCCESS";

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "DiFi")]
    pub difi: Batch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Batch {
    pub status: String,
    #[serde(default)]
    pub response: BatchResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Call {
    pub response: CallResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallResponse {
    pub status: String,
    /// Structured JSON or `{"body": "<html>"}` depending on the call
    #[serde(default)]
    pub content: Value,
}

impl Envelope {
    /// Decode a raw response body
    pub fn from_body(body: &str, context: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| {
            WatchError::parse(
                context,
                format!("response is not a DiFi envelope ({}): {}", e, truncate(body)),
            )
        })
    }

    /// Content of call `index`
    pub fn content(&self, index: usize) -> Option<&Value> {
        self.difi
            .response
            .calls
            .get(index)
            .map(|call| &call.response.content)
    }

    /// HTML carried in `content.body` of call `index`
    pub fn html_body(&self, index: usize, context: &str) -> Result<&str> {
        self.content(index)
            .and_then(|c| c.get("body"))
            .and_then(Value::as_str)
            .ok_or_else(|| WatchError::parse(context, "call content has no HTML body"))
    }
}

/// Call slots a validation applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIndices(Vec<usize>);

impl From<usize> for CallIndices {
    fn from(index: usize) -> Self {
        Self(vec![index])
    }
}

impl From<Range<usize>> for CallIndices {
    fn from(range: Range<usize>) -> Self {
        Self(range.collect())
    }
}

impl From<&[usize]> for CallIndices {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl From<Vec<usize>> for CallIndices {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

/// True when the batch and every addressed call report success. A call slot
/// missing from the response counts as a failure.
pub fn validate(envelope: &Envelope, calls: impl Into<CallIndices>) -> bool {
    if !is_success(&envelope.difi.status) {
        return false;
    }

    calls.into().0.into_iter().all(|index| {
        envelope
            .difi
            .response
            .calls
            .get(index)
            .map(|call| is_success(&call.response.status))
            .unwrap_or(false)
    })
}

fn is_success(status: &str) -> bool {
    status.eq_ignore_ascii_case(SUCCESS)
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(512) {
        Some((i, _)) => &body[..i],
        None => body,
    }
}
