//! Parsing, validation, and construction of envelopes (spec §4.1).
//!
//! Mirrors the original `helper.go`'s `mustJSON`/`newMessage`/
//! `newErrorMessage`: envelope construction never panics, and a missing
//! `data` is always normalized to JSON `null` (invariant E2).

use serde::de::DeserializeOwned;

use crate::constants::{MAX_CHAT_MESSAGE_CODEPOINTS, MAX_FRAME_BYTES, MAX_ROOM_CODEPOINTS};
use crate::envelope::{Envelope, EnvelopeType};
use crate::error::ProtocolError;
use crate::payload::RoomUser;

/// Parse and envelope-validate a raw incoming frame.
///
/// Enforces the frame size cap, rejects unknown `type` values, and
/// otherwise defers field-shape validation to serde.
pub fn parse_incoming(bytes: &[u8]) -> Result<Envelope, ProtocolError> {
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(bytes.len()));
    }

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let type_str = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProtocolError::InvalidJson("missing `type` field".to_string()))?;

    if EnvelopeType::from_wire_str(type_str).is_none() {
        return Err(ProtocolError::UnknownType(type_str.to_string()));
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
}

/// Trim a `room` field and enforce the code-point cap. A blank result after
/// trimming is treated as absent, matching "empty or absent ⇒ none" (§6).
pub fn validate_room(raw: Option<&str>) -> Result<Option<String>, ProtocolError> {
    let trimmed = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if let Some(room) = &trimmed {
        let len = room.chars().count();
        if len > MAX_ROOM_CODEPOINTS {
            return Err(ProtocolError::InvalidRoom(format!(
                "{len} code points exceeds maximum of {MAX_ROOM_CODEPOINTS}"
            )));
        }
    }

    Ok(trimmed)
}

/// Trim a chat message and enforce non-empty / length bounds (spec §4.3).
pub fn validate_chat_message(raw: &str) -> Result<String, ProtocolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::EmptyChatMessage);
    }
    if trimmed.chars().count() > MAX_CHAT_MESSAGE_CODEPOINTS {
        return Err(ProtocolError::ChatMessageTooLong);
    }
    Ok(trimmed.to_string())
}

/// Overwrite `from` with the producing connection's user id (invariant E1).
/// The hub calls this defensively even though the connection endpoint
/// already did it (spec §4.3).
pub fn stamp_from(env: &mut Envelope, user_id: &str) {
    env.from = user_id.to_string();
}

/// Decode a type-specific payload out of an envelope's opaque `data`.
pub fn decode_payload<T: DeserializeOwned>(env: &Envelope) -> Result<T, ProtocolError> {
    serde_json::from_value(env.data.clone()).map_err(|e| ProtocolError::InvalidPayload(e.to_string()))
}

/// The canonical internal-error envelope, used whenever marshalling a
/// synthetic frame would otherwise fail (spec §4.1).
pub fn internal_error_bytes() -> Vec<u8> {
    br#"{"type":"general.error","data":{"error":"internal error"},"from":"system"}"#.to_vec()
}

/// Serialize an envelope, falling back to the canonical internal-error
/// frame rather than ever propagating a marshal failure.
pub fn to_json_bytes(env: &Envelope) -> Vec<u8> {
    serde_json::to_vec(env).unwrap_or_else(|_| internal_error_bytes())
}

/// Build a server-originated `general.error` envelope.
pub fn build_error(room: Option<String>, message: impl Into<String>) -> Envelope {
    Envelope {
        kind: EnvelopeType::GeneralError,
        room,
        data: serde_json::json!({ "error": message.into() }),
        from: "system".to_string(),
    }
}

/// Build a `room.users` presence snapshot for `room`.
pub fn build_room_users(room: String, users: Vec<RoomUser>) -> Envelope {
    let data = serde_json::to_value(crate::payload::RoomUsersPayload { users })
        .unwrap_or(serde_json::Value::Null);
    Envelope {
        kind: EnvelopeType::RoomUsers,
        room: Some(room),
        data,
        from: "system".to_string(),
    }
}
