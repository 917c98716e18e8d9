//! Wire protocol for the realtime endpoint
//!
//! Every inbound frame is a JSON object tagged with a `type` discriminator:
//!
//! ```text
//! {"type": "event", "data": {"channels": [...], "payload": ..., "timestamp": ...}}
//! {"type": "error", "data": {"message": "...", "code": 1234}}
//! {"type": "pong"}
//! ```
//!
//! Malformed frames are a parse error for the caller to log and drop; they
//! are never fatal to the connection.

use crate::traits::{RealtimeError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Outbound heartbeat frame
pub const PING_FRAME: &str = r#"{"type":"ping"}"#;

const TYPE_ERROR: &str = "error";
const TYPE_EVENT: &str = "event";
const TYPE_PONG: &str = "pong";

/// Raw envelope shared by all inbound frames
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
}

/// An inbound event before per-subscription payload decoding
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub channels: Vec<String>,
    pub payload: Value,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A server-reported error delivered over the realtime connection
///
/// These are informational: the server keeps the connection open.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
}

/// Classified inbound frame
#[derive(Debug)]
pub enum InboundMessage {
    Event(RawEvent),
    ServerError(ServerError),
    Pong,
    /// Recognized envelope with an unknown `type` tag
    Unknown(String),
}

/// Parse and classify one inbound text frame
pub fn parse_frame(text: &str) -> Result<InboundMessage> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|e| RealtimeError::Parse(e.to_string()))?;

    match frame.kind.as_str() {
        TYPE_EVENT => {
            let data = frame
                .data
                .ok_or_else(|| RealtimeError::Parse("event frame without data".into()))?;
            let event: RawEvent =
                serde_json::from_value(data).map_err(|e| RealtimeError::Parse(e.to_string()))?;
            Ok(InboundMessage::Event(event))
        }
        TYPE_ERROR => {
            let data = frame
                .data
                .ok_or_else(|| RealtimeError::Parse("error frame without data".into()))?;
            let error: ServerError =
                serde_json::from_value(data).map_err(|e| RealtimeError::Parse(e.to_string()))?;
            Ok(InboundMessage::ServerError(error))
        }
        TYPE_PONG => Ok(InboundMessage::Pong),
        other => Ok(InboundMessage::Unknown(other.to_string())),
    }
}

/// A typed event delivered to a subscription callback
///
/// The payload has been decoded according to the type the subscription was
/// registered with. Different subscriptions may decode the same raw payload
/// into different types.
#[derive(Debug, Clone)]
pub struct RealtimeEvent<T> {
    /// Channels the event was tagged with by the server
    pub channels: Vec<String>,
    /// Server-side timestamp, if present on the frame
    pub timestamp: Option<String>,
    /// Decoded payload
    pub payload: T,
}
