// Socket.IO v4 framing over Engine.IO v4 text frames
//
// Engine.IO packet types: 0 open, 1 close, 2 ping, 3 pong, 4 message,
// 5 upgrade, 6 noop. A message carries a Socket.IO packet whose types are:
// 0 connect, 1 disconnect, 2 event, 3 ack, 4 connect_error.
use serde_json::{json, Value};
use thiserror::Error;

pub const PONG_FRAME: &str = "3";

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,

    #[error("unknown packet type '{0}'")]
    UnknownType(char),

    #[error("malformed payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Value),
    Disconnect,
    Event { topic: String, payload: Value },
    Ack,
    ConnectError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Value),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Namespace connect frame carrying the session token as auth data.
pub fn connect_frame(token: &str) -> String {
    format!("40{}", json!({ "token": token }))
}

pub fn decode(frame: &str) -> Result<Packet, CodecError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(Packet::Open(parse_json(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket(rest).map(Packet::Message),
        '5' => Ok(Packet::Upgrade),
        '6' => Ok(Packet::Noop),
        other => Err(CodecError::UnknownType(other)),
    }
}

fn parse_json(raw: &str) -> Result<Value, CodecError> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).map_err(|e| CodecError::Payload(e.to_string()))
}

/// Strips the optional `/namespace,` prefix and ack id digits.
fn body_of(raw: &str) -> &str {
    let raw = match raw.strip_prefix('/') {
        Some(after) => after.split_once(',').map(|(_, body)| body).unwrap_or(""),
        None => raw,
    };
    raw.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_socket(raw: &str) -> Result<SocketPacket, CodecError> {
    let mut chars = raw.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let body = body_of(chars.as_str());

    match kind {
        '0' => Ok(SocketPacket::Connect(parse_json(body)?)),
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let Value::Array(mut items) = parse_json(body)? else {
                return Err(CodecError::Payload("event is not an array".to_string()));
            };
            if items.is_empty() {
                return Err(CodecError::Payload("event without a name".to_string()));
            }
            let payload = if items.len() > 1 { items.remove(1) } else { Value::Null };
            let Value::String(topic) = items.swap_remove(0) else {
                return Err(CodecError::Payload("event name is not a string".to_string()));
            };
            Ok(SocketPacket::Event { topic, payload })
        }
        '3' => Ok(SocketPacket::Ack),
        '4' => {
            let value = parse_json(body)?;
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            Ok(SocketPacket::ConnectError(message))
        }
        other => Err(CodecError::UnknownType(other)),
    }
}
