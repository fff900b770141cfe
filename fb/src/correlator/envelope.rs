//! Wire envelopes exchanged with the plugin
//!
//! Every frame is one JSON object. Outbound requests carry `type`, `requestId`
//! and `payload`; the plugin answers with `{"type": "ack", "requestId": n, ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::messages::RequestId;

/// Message type the plugin uses for acknowledgments
pub const ACK_TYPE: &str = "ack";

/// Outbound request envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    pub payload: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, request_id: RequestId, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            request_id,
            payload,
        }
    }

    /// Serialize to the text frame sent over the socket
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Classification of one raw inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// An acknowledgment; `body` is the whole inbound object
    Ack { request_id: RequestId, body: Value },

    /// Valid JSON that is not an acknowledgment, or an ack without a usable id
    Ignored,

    /// Not JSON at all
    Malformed,
}

impl Inbound {
    pub fn parse(raw: &str) -> Self {
        let body: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => return Self::Malformed,
        };

        if body.get("type").and_then(Value::as_str) != Some(ACK_TYPE) {
            return Self::Ignored;
        }

        match body.get("requestId").and_then(request_id_of) {
            Some(request_id) => Self::Ack { request_id, body },
            None => Self::Ignored,
        }
    }
}

/// Read a correlation id, accepting integral floats such as `1.0`
fn request_id_of(value: &Value) -> Option<RequestId> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64)
            .map(|f| f as RequestId)
    })
}

/// Typed view over an acknowledgment body
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub request_id: RequestId,
    pub message: Option<String>,
}

impl Ack {
    pub fn from_body(body: &Value) -> Option<Self> {
        let request_id = body.get("requestId").and_then(request_id_of)?;
        let message = body.get("message").and_then(Value::as_str).map(str::to_string);
        Some(Self { request_id, message })
    }
}
