//! Connection Endpoint: the read pump and write pump bridging one
//! WebSocket to the hub layer (spec §4.2).
//!
//! Grounded on `tallow-relay::websocket`'s `bridge_ws_multi` for the
//! split-socket, `tokio::select!`-driven bridging idiom, and on the
//! original `client.go`'s `readPump`/`writePump` for the deadline and
//! heartbeat discipline this version keeps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMsg, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, timeout};
use tracing::debug;
use uuid::Uuid;

use parlor_protocol::codec;
use parlor_protocol::constants::{
    HEARTBEAT_INTERVAL_SECS, INGRESS_BURST, INGRESS_RATE_PER_SEC, MAX_PROTOCOL_ERRORS,
    MAX_RATE_LIMIT_DROPS, READ_DEADLINE_SECS, WRITE_DEADLINE_SECS,
};
use parlor_protocol::payload::GenerateRoomIdPayload;
use parlor_protocol::{Envelope, EnvelopeType};

use crate::auth::Identity;
use crate::hub::{ConnId, InboundItem, Member};
use crate::hub_manager::HubManager;
use crate::rate_limit::TokenBucket;
use crate::router::DispatchOutcome;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

fn next_conn_id() -> ConnId {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

/// Drive one WebSocket end to end: spawn the write pump, run the read pump
/// inline, and tear both down together on exit.
pub async fn handle_connection(
    socket: WebSocket,
    identity: Identity,
    hubs: Arc<HubManager>,
    outbound_capacity: usize,
) {
    let conn_id = next_conn_id();
    let (sink, stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<Vec<u8>>(outbound_capacity);

    let member = Member {
        id: conn_id,
        user_id: identity.user_id.clone(),
        username: identity.username.clone(),
        outbound: outbound_tx.clone(),
    };

    let write_task = tokio::spawn(write_pump(sink, outbound_rx));

    read_pump(stream, &identity, &hubs, member, &outbound_tx).await;

    hubs.disconnect_everywhere(conn_id);
    write_task.abort();
    debug!(conn_id, user_id = %identity.user_id, "connection closed");
}

/// Consume the hub-bound outbound queue and a heartbeat timer, writing both
/// to the socket. Never waits on anything but its own queue and timer, so a
/// slow hub can't stall the writer (spec §4.3's fan-out discipline depends
/// on this queue always being drained promptly).
async fn write_pump(
    mut sink: futures::stream::SplitSink<WebSocket, WsMsg>,
    mut outbound_rx: mpsc::Receiver<Vec<u8>>,
) {
    let mut heartbeat = interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    heartbeat.tick().await;

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break };
                let sent = timeout(
                    Duration::from_secs(WRITE_DEADLINE_SECS),
                    sink.send(WsMsg::Binary(Bytes::from(frame))),
                )
                .await;
                if !matches!(sent, Ok(Ok(()))) {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                let sent = timeout(
                    Duration::from_secs(WRITE_DEADLINE_SECS),
                    sink.send(WsMsg::Ping(Bytes::new())),
                )
                .await;
                if !matches!(sent, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
}

/// Read frames off the socket until the read deadline lapses, the peer
/// closes, or the protocol-error budget is exhausted (spec §4.2, §7).
async fn read_pump(
    mut stream: futures::stream::SplitStream<WebSocket>,
    identity: &Identity,
    hubs: &HubManager,
    member: Member,
    outbound_tx: &mpsc::Sender<Vec<u8>>,
) {
    let mut state = ReadState::new();

    loop {
        let next = timeout(Duration::from_secs(READ_DEADLINE_SECS), stream.next()).await;
        let Ok(Some(Ok(msg))) = next else { break };

        let bytes = match msg {
            WsMsg::Text(t) => t.as_bytes().to_vec(),
            WsMsg::Binary(b) => b.to_vec(),
            WsMsg::Ping(_) | WsMsg::Pong(_) => continue,
            WsMsg::Close(_) => break,
        };

        if process_frame(&bytes, identity, hubs, &member, outbound_tx, &mut state).await {
            break;
        }
    }
}

/// Per-connection counters the read pump carries across frames: the
/// ingress rate limiter and the two independent budgets of spec §7.
struct ReadState {
    limiter: TokenBucket,
    /// Envelope/payload rejections; closes past `MAX_PROTOCOL_ERRORS`.
    protocol_errors: u32,
    /// Rate-limit refusals; closes past `MAX_RATE_LIMIT_DROPS`, tracked
    /// separately so a bursty-but-otherwise-valid client isn't penalized
    /// against the protocol-error budget (spec §4.2 step 2, §4.5).
    ingress_drops: u32,
}

impl ReadState {
    fn new() -> Self {
        Self {
            limiter: TokenBucket::new(INGRESS_RATE_PER_SEC, INGRESS_BURST),
            protocol_errors: 0,
            ingress_drops: 0,
        }
    }
}

/// Validate and dispatch one already-framed message. Returns `true` once
/// the caller should close the connection.
async fn process_frame(
    bytes: &[u8],
    identity: &Identity,
    hubs: &HubManager,
    member: &Member,
    outbound_tx: &mpsc::Sender<Vec<u8>>,
    state: &mut ReadState,
) -> bool {
    if !state.limiter.try_consume() {
        state.ingress_drops += 1;
        let env = codec::build_error(None, "Rate limit exceeded");
        let _ = outbound_tx.try_send(codec::to_json_bytes(&env));
        return state.ingress_drops > MAX_RATE_LIMIT_DROPS;
    }

    let mut envelope = match codec::parse_incoming(bytes) {
        Ok(env) => env,
        Err(err) => return bump_and_check(&mut state.protocol_errors, outbound_tx, err.to_string()),
    };

    let room = match codec::validate_room(envelope.room.as_deref()) {
        Ok(room) => room,
        Err(err) => return bump_and_check(&mut state.protocol_errors, outbound_tx, err.to_string()),
    };
    envelope.room = room;

    if envelope.kind.requires_room() && envelope.room.is_none() {
        return bump_and_check(&mut state.protocol_errors, outbound_tx, "room is required");
    }

    codec::stamp_from(&mut envelope, &identity.user_id);

    if envelope.kind == EnvelopeType::GenerateRoomId {
        let mut response = Envelope::new(
            EnvelopeType::GenerateRoomId,
            None,
            serde_json::json!(GenerateRoomIdPayload {
                room_id: Uuid::new_v4().to_string(),
            }),
        );
        response.from = "system".to_string();
        let _ = outbound_tx.try_send(codec::to_json_bytes(&response));
        return false;
    }

    let hub = hubs.route(envelope.room.as_deref().expect("non-generateRoomID types require a room"));
    let (reply_tx, reply_rx) = oneshot::channel();
    let item = InboundItem {
        member: member.clone(),
        envelope,
        reply: reply_tx,
    };
    if hub.try_route(item).is_err() {
        return bump_and_check(&mut state.protocol_errors, outbound_tx, "server busy");
    }

    if let Ok(DispatchOutcome::PayloadError) = reply_rx.await {
        state.protocol_errors += 1;
        if state.protocol_errors > MAX_PROTOCOL_ERRORS {
            return true;
        }
    }
    false
}

/// Increment the protocol-error counter, tell the sender why, and return
/// `true` once the budget (spec §7) is exceeded. The connection survives
/// exactly `MAX_PROTOCOL_ERRORS` errors and closes only on the next one.
fn bump_and_check(counter: &mut u32, outbound_tx: &mpsc::Sender<Vec<u8>>, message: impl Into<String>) -> bool {
    *counter += 1;
    let env = codec::build_error(None, message);
    let _ = outbound_tx.try_send(codec::to_json_bytes(&env));
    *counter > MAX_PROTOCOL_ERRORS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub_manager::HubManager;

    fn identity() -> Identity {
        Identity {
            user_id: "u1".to_string(),
            username: "alice".to_string(),
        }
    }

    fn member(outbound_tx: mpsc::Sender<Vec<u8>>) -> Member {
        Member {
            id: 1,
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            outbound: outbound_tx,
        }
    }

    #[tokio::test]
    async fn generate_room_id_responds_with_system_stamped_from() {
        let hubs = HubManager::spawn(2, 16, 16);
        let (outbound_tx, mut outbound_rx) = mpsc::channel(8);
        let identity = identity();
        let member = member(outbound_tx.clone());
        let mut state = ReadState::new();

        let closed = process_frame(
            br#"{"type":"utils.generateRoomID"}"#,
            &identity,
            &hubs,
            &member,
            &outbound_tx,
            &mut state,
        )
        .await;
        assert!(!closed);

        let frame = outbound_rx.recv().await.unwrap();
        let env: Envelope = serde_json::from_slice(&frame).unwrap();
        assert_eq!(env.kind, EnvelopeType::GenerateRoomId);
        assert_eq!(env.from, "system", "generateRoomID response must be server-stamped");
        let payload: GenerateRoomIdPayload = serde_json::from_value(env.data).unwrap();
        assert!(!payload.room_id.is_empty());
    }

    #[tokio::test]
    async fn connection_survives_exactly_ten_bad_frames_and_closes_on_the_eleventh() {
        let hubs = HubManager::spawn(2, 16, 16);
        let (outbound_tx, mut outbound_rx) = mpsc::channel(32);
        let identity = identity();
        let member = member(outbound_tx.clone());
        let mut state = ReadState::new();

        for i in 0..10 {
            let closed = process_frame(
                br#"{"type":"not.a.real.type"}"#,
                &identity,
                &hubs,
                &member,
                &outbound_tx,
                &mut state,
            )
            .await;
            assert!(!closed, "frame {i} should not close the connection yet");
            let _ = outbound_rx.recv().await.unwrap();
        }

        let closed = process_frame(
            br#"{"type":"not.a.real.type"}"#,
            &identity,
            &hubs,
            &member,
            &outbound_tx,
            &mut state,
        )
        .await;
        assert!(closed, "the 11th bad frame must close the connection");
    }

    #[tokio::test]
    async fn rate_limit_drops_use_a_separate_budget_from_protocol_errors() {
        let hubs = HubManager::spawn(2, 16, 16);
        let (outbound_tx, mut outbound_rx) = mpsc::channel(32);
        let identity = identity();
        let member = member(outbound_tx.clone());
        let mut state = ReadState::new();
        state.limiter = TokenBucket::new(0, 0); // every send is rate-limited

        for i in 0..5 {
            let closed = process_frame(
                br#"{"type":"chat.join","room":"r1"}"#,
                &identity,
                &hubs,
                &member,
                &outbound_tx,
                &mut state,
            )
            .await;
            assert!(!closed, "drop {i} should not close the connection yet");
            let frame = outbound_rx.recv().await.unwrap();
            let env: Envelope = serde_json::from_slice(&frame).unwrap();
            assert_eq!(env.kind, EnvelopeType::GeneralError);
        }
        assert_eq!(state.protocol_errors, 0, "rate-limit drops must not touch the protocol-error budget");

        let closed = process_frame(
            br#"{"type":"chat.join","room":"r1"}"#,
            &identity,
            &hubs,
            &member,
            &outbound_tx,
            &mut state,
        )
        .await;
        assert!(closed, "the 6th consecutive rate-limit drop must close the connection");
    }
}
