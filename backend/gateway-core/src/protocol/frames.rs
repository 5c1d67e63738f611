//! JSON frames exchanged with the gateway.
//!
//! Every frame is a JSON object tagged by its `type` field:
//!
//! - `req`   - client → gateway request
//! - `res`   - gateway → client response, correlated by `id`
//! - `event` - gateway → client push, optionally sequenced by `seq`

use crate::error::GatewayError;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    Req(RequestFrame),
    Res(ResponseFrame),
    Event(EventFrame),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorShape {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(
        default,
        deserialize_with = "lenient_seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub seq: Option<u64>,
}

/// A `seq` that is not a non-negative integer is treated as absent.
fn lenient_seq<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_u64))
}

impl ResponseFrame {
    /// Convert into the caller-facing result.
    ///
    /// An `ok` response without a payload resolves to `Value::Null`.
    pub fn into_result(self) -> Result<Value, GatewayError> {
        if self.ok {
            return Ok(self.payload.unwrap_or(Value::Null));
        }

        let message = self
            .error
            .map(|error| error.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "request failed".to_string());

        Err(GatewayError::request_failed(message))
    }
}

/// Serialize a `req` frame.
///
/// `Null` params are sent as an empty object.
pub fn encode_request(id: &str, method: &str, params: Value) -> Result<String, GatewayError> {
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    let frame = Frame::Req(RequestFrame {
        id: id.to_string(),
        method: method.to_string(),
        params,
    });

    Ok(serde_json::to_string(&frame)?)
}

/// Parse one inbound text frame.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidResponse`] for anything that is not a JSON
/// object with a known `type`.
#[track_caller]
pub fn decode_frame(text: &str) -> Result<Frame, GatewayError> {
    let value: Value = serde_json::from_str(text)?;

    let Some(object) = value.as_object() else {
        return Err(GatewayError::invalid_response("frame is not a JSON object"));
    };

    if !object.get("type").is_some_and(Value::is_string) {
        return Err(GatewayError::invalid_response("frame has no type"));
    }

    Ok(serde_json::from_value(value)?)
}
