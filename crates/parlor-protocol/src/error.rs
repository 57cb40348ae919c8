//! Protocol-layer errors.

use std::fmt;

/// Errors produced while parsing, validating, or decoding an envelope.
#[derive(Debug)]
pub enum ProtocolError {
    /// The raw frame exceeded [`crate::constants::MAX_FRAME_BYTES`].
    FrameTooLarge(usize),
    /// The frame was not valid JSON, or not a JSON object.
    InvalidJson(String),
    /// `type` was not one of the closed set.
    UnknownType(String),
    /// `room` was present but exceeded the code-point limit, or was blank
    /// after trimming where a non-empty room is required.
    InvalidRoom(String),
    /// A room-scoped envelope arrived with no usable `room`.
    MissingRoom,
    /// `data` did not match the shape expected for this envelope's `type`.
    InvalidPayload(String),
    /// `chat.message` payload was empty after trimming.
    EmptyChatMessage,
    /// `chat.message` payload exceeded the code-point limit.
    ChatMessageTooLong,
    /// A WebRTC signalling payload was missing a non-empty `to`.
    MissingTarget,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameTooLarge(n) => write!(f, "frame of {n} bytes exceeds maximum"),
            Self::InvalidJson(msg) => write!(f, "invalid envelope: {msg}"),
            Self::UnknownType(t) => write!(f, "unknown message type: {t}"),
            Self::InvalidRoom(msg) => write!(f, "invalid room: {msg}"),
            Self::MissingRoom => write!(f, "room is required for this message type"),
            Self::InvalidPayload(msg) => write!(f, "invalid payload: {msg}"),
            Self::EmptyChatMessage => write!(f, "chat message must not be empty"),
            Self::ChatMessageTooLong => write!(f, "chat message exceeds maximum length"),
            Self::MissingTarget => write!(f, "missing target peer"),
        }
    }
}

impl std::error::Error for ProtocolError {}
