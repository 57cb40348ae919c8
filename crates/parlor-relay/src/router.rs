//! Message routing: decides what a hub should do with one inbound envelope
//! from an already-member-checked connection (spec §4.3, §6, §7).
//!
//! Grounded on the original `client.go`'s `readPump` type switch and on
//! `tallow-relay::websocket`'s `bridge_ws_multi` broadcast-to-room idiom,
//! which WebRTC signalling reuses as-is here: spec §4.3's table and §6 call
//! for fanning these frames out to the whole room, leaving `to`-filtering
//! to the client. Kept free of `tokio` and of the rooms map itself:
//! [`Hub`](crate::hub::Hub) owns membership and calls in here only to
//! decide what an envelope *means*.

use parlor_protocol::codec;
use parlor_protocol::payload::{ChatMessagePayload, ChatTypingPayload, WebrtcIceCandidatePayload, WebrtcSdpPayload};
use parlor_protocol::{Envelope, EnvelopeType};

/// Whether a rejected dispatch should count against the connection's
/// protocol-error budget (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ok,
    /// Malformed or out-of-bounds payload: counts against the budget.
    PayloadError,
    /// Acting on a room the sender isn't a member of: does not count.
    AuthorizationError,
}

/// What a hub should do in response to one inbound envelope.
pub enum Decision {
    Join,
    /// A no-op if the sender wasn't a member; otherwise remove them.
    Leave,
    /// Fan out `Envelope` to every current member of the sender's room
    /// (also used for WebRTC signalling; `to`-filtering is a client
    /// concern, spec §6).
    Broadcast(Envelope),
    /// Send `message` back to the sender only, as a `general.error`.
    PrivateError {
        message: String,
        outcome: DispatchOutcome,
    },
}

fn payload_error(message: impl Into<String>) -> Decision {
    Decision::PrivateError {
        message: message.into(),
        outcome: DispatchOutcome::PayloadError,
    }
}

fn auth_error(message: impl Into<String>) -> Decision {
    Decision::PrivateError {
        message: message.into(),
        outcome: DispatchOutcome::AuthorizationError,
    }
}

/// `envelope.from` must already be server-stamped (spec invariant E1); the
/// hub does this before calling in here.
pub fn decide(envelope: &Envelope, is_member: bool) -> Decision {
    match envelope.kind {
        EnvelopeType::ChatJoin => Decision::Join,
        EnvelopeType::ChatLeave => Decision::Leave,

        EnvelopeType::ChatMessage => {
            if !is_member {
                return auth_error("not a member of this room");
            }
            let payload: ChatMessagePayload = match codec::decode_payload(envelope) {
                Ok(p) => p,
                Err(e) => return payload_error(e.to_string()),
            };
            let message = match codec::validate_chat_message(&payload.message) {
                Ok(m) => m,
                Err(e) => return payload_error(e.to_string()),
            };
            let mut out = envelope.clone();
            out.data = serde_json::json!(ChatMessagePayload { message });
            Decision::Broadcast(out)
        }

        EnvelopeType::ChatTyping => {
            if !is_member {
                return auth_error("not a member of this room");
            }
            if codec::decode_payload::<ChatTypingPayload>(envelope).is_err() {
                return payload_error("invalid typing payload");
            }
            Decision::Broadcast(envelope.clone())
        }

        EnvelopeType::WebrtcOffer | EnvelopeType::WebrtcAnswer => {
            if !is_member {
                return auth_error("not a member of this room");
            }
            let payload: WebrtcSdpPayload = match codec::decode_payload(envelope) {
                Ok(p) => p,
                Err(e) => return payload_error(e.to_string()),
            };
            if payload.to.trim().is_empty() {
                return payload_error("missing target");
            }
            Decision::Broadcast(envelope.clone())
        }

        EnvelopeType::WebrtcIceCandidate => {
            if !is_member {
                return auth_error("not a member of this room");
            }
            let payload: WebrtcIceCandidatePayload = match codec::decode_payload(envelope) {
                Ok(p) => p,
                Err(e) => return payload_error(e.to_string()),
            };
            if payload.to.trim().is_empty() {
                return payload_error("missing target");
            }
            Decision::Broadcast(envelope.clone())
        }

        EnvelopeType::RoomUsers | EnvelopeType::GeneralError | EnvelopeType::GenerateRoomId => {
            payload_error("invalid message type for this channel")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_protocol::codec::parse_incoming;

    fn stamped(raw: &str) -> Envelope {
        let mut env = parse_incoming(raw.as_bytes()).unwrap();
        env.from = "u1".to_string();
        env
    }

    #[test]
    fn join_is_unconditional() {
        let env = stamped(r#"{"type":"chat.join","room":"r1"}"#);
        assert!(matches!(decide(&env, false), Decision::Join));
    }

    #[test]
    fn message_requires_membership() {
        let env = stamped(r#"{"type":"chat.message","room":"r1","data":{"message":"hi"}}"#);
        match decide(&env, false) {
            Decision::PrivateError { outcome, .. } => {
                assert_eq!(outcome, DispatchOutcome::AuthorizationError)
            }
            _ => panic!("expected private error"),
        }
    }

    #[test]
    fn empty_message_is_payload_error() {
        let env = stamped(r#"{"type":"chat.message","room":"r1","data":{"message":"   "}}"#);
        match decide(&env, true) {
            Decision::PrivateError { outcome, .. } => {
                assert_eq!(outcome, DispatchOutcome::PayloadError)
            }
            _ => panic!("expected private error"),
        }
    }

    #[test]
    fn offer_without_target_is_payload_error() {
        let env = stamped(r#"{"type":"webrtc.offer","room":"r1","data":{"sdp":"x","to":""}}"#);
        match decide(&env, true) {
            Decision::PrivateError { outcome, .. } => {
                assert_eq!(outcome, DispatchOutcome::PayloadError)
            }
            _ => panic!("expected private error"),
        }
    }

    #[test]
    fn offer_with_target_broadcasts_to_room() {
        let env = stamped(r#"{"type":"webrtc.offer","room":"r1","data":{"sdp":"x","to":"u2"}}"#);
        match decide(&env, true) {
            Decision::Broadcast(out) => assert_eq!(out.kind, EnvelopeType::WebrtcOffer),
            _ => panic!("expected broadcast"),
        }
    }

    #[test]
    fn server_originated_types_rejected_from_client() {
        let env = stamped(r#"{"type":"room.users","room":"r1"}"#);
        match decide(&env, true) {
            Decision::PrivateError { outcome, .. } => {
                assert_eq!(outcome, DispatchOutcome::PayloadError)
            }
            _ => panic!("expected private error"),
        }
    }
}
