//! The wire envelope: `{type, room, data, from}` (spec §3, §6).

use serde::{Deserialize, Serialize};

/// The closed set of envelope `type` values.
///
/// Deserializing an envelope whose `type` is not one of these fails with a
/// serde error, which the codec surfaces as [`crate::ProtocolError::UnknownType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvelopeType {
    #[serde(rename = "chat.join")]
    ChatJoin,
    #[serde(rename = "chat.leave")]
    ChatLeave,
    #[serde(rename = "chat.message")]
    ChatMessage,
    #[serde(rename = "chat.typing")]
    ChatTyping,
    #[serde(rename = "room.users")]
    RoomUsers,
    #[serde(rename = "utils.generateRoomID")]
    GenerateRoomId,
    #[serde(rename = "webrtc.offer")]
    WebrtcOffer,
    #[serde(rename = "webrtc.answer")]
    WebrtcAnswer,
    #[serde(rename = "webrtc.iceCandidate")]
    WebrtcIceCandidate,
    #[serde(rename = "general.error")]
    GeneralError,
}

impl EnvelopeType {
    /// The exact wire string for this type, for logging.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::ChatJoin => "chat.join",
            Self::ChatLeave => "chat.leave",
            Self::ChatMessage => "chat.message",
            Self::ChatTyping => "chat.typing",
            Self::RoomUsers => "room.users",
            Self::GenerateRoomId => "utils.generateRoomID",
            Self::WebrtcOffer => "webrtc.offer",
            Self::WebrtcAnswer => "webrtc.answer",
            Self::WebrtcIceCandidate => "webrtc.iceCandidate",
            Self::GeneralError => "general.error",
        }
    }

    /// Whether this type requires a non-empty `room` (spec §6 table).
    pub fn requires_room(&self) -> bool {
        !matches!(self, Self::GenerateRoomId | Self::GeneralError)
    }

    /// Look up a type by its exact wire string, rejecting anything outside
    /// the closed set.
    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "chat.join" => Some(Self::ChatJoin),
            "chat.leave" => Some(Self::ChatLeave),
            "chat.message" => Some(Self::ChatMessage),
            "chat.typing" => Some(Self::ChatTyping),
            "room.users" => Some(Self::RoomUsers),
            "utils.generateRoomID" => Some(Self::GenerateRoomId),
            "webrtc.offer" => Some(Self::WebrtcOffer),
            "webrtc.answer" => Some(Self::WebrtcAnswer),
            "webrtc.iceCandidate" => Some(Self::WebrtcIceCandidate),
            "general.error" => Some(Self::GeneralError),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

fn null_data() -> serde_json::Value {
    serde_json::Value::Null
}

/// The on-wire frame. Field names are exact per spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    /// Optional; empty or absent means "no room" (spec §3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Opaque to the codec beyond being valid JSON; defaults to `null`
    /// when absent (invariant E2).
    #[serde(default = "null_data")]
    pub data: serde_json::Value,
    /// Server-authoritative on egress (invariant E1). Whatever a client
    /// sends here is overwritten before routing.
    #[serde(default)]
    pub from: String,
}

impl Envelope {
    /// Build a new envelope with the given `data`, defaulting to `null`
    /// when none is supplied. `from` is left blank for the caller to stamp.
    pub fn new(kind: EnvelopeType, room: Option<String>, data: serde_json::Value) -> Self {
        Self {
            kind,
            room,
            data,
            from: String::new(),
        }
    }
}
