//! Typed payload shapes carried in an envelope's `data` field (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTypingPayload {
    pub typing: bool,
}

/// A single room member, as listed in a `room.users` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUser {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUsersPayload {
    pub users: Vec<RoomUser>,
}

/// Shared shape for `webrtc.offer` and `webrtc.answer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebrtcSdpPayload {
    pub sdp: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebrtcIceCandidatePayload {
    pub candidate: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRoomIdPayload {
    #[serde(rename = "roomID")]
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}
