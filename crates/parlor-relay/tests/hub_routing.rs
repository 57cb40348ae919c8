//! End-to-end exercise of the hub layer without a WebSocket transport: a
//! real `HubManager`, real room routing, real fan-out queues. Stands in for
//! the seed scenarios that need two independent "connections" trading
//! frames through whichever shard actually owns their room.

use parlor_protocol::codec::parse_incoming;
use parlor_protocol::payload::{ChatMessagePayload, RoomUsersPayload};
use parlor_relay::hub::{InboundItem, Member};
use parlor_relay::hub_manager::HubManager;
use tokio::sync::{mpsc, oneshot};

fn member(id: u64, user_id: &str, username: &str) -> (Member, mpsc::Receiver<Vec<u8>>) {
    let (tx, rx) = mpsc::channel(8);
    (
        Member {
            id,
            user_id: user_id.to_string(),
            username: username.to_string(),
            outbound: tx,
        },
        rx,
    )
}

async fn send(hubs: &HubManager, room: &str, member: &Member, raw: &str) {
    let envelope = parse_incoming(raw.as_bytes()).unwrap();
    let (reply_tx, reply_rx) = oneshot::channel();
    hubs.route(room)
        .try_route(InboundItem {
            member: member.clone(),
            envelope,
            reply: reply_tx,
        })
        .map_err(|_| "hub saturated")
        .unwrap();
    reply_rx.await.unwrap();
}

#[tokio::test]
async fn two_members_exchange_a_chat_message_with_server_stamped_from() {
    let hubs = HubManager::spawn(8, 64, 64);
    let (alice, mut alice_rx) = member(1, "alice-id", "alice");
    let (bob, mut bob_rx) = member(2, "bob-id", "bob");

    send(&hubs, "lobby", &alice, r#"{"type":"chat.join","room":"lobby"}"#).await;
    let _ = alice_rx.recv().await.unwrap();

    send(&hubs, "lobby", &bob, r#"{"type":"chat.join","room":"lobby"}"#).await;
    let _ = alice_rx.recv().await.unwrap(); // presence update after bob joins
    let _ = bob_rx.recv().await.unwrap();

    send(
        &hubs,
        "lobby",
        &alice,
        r#"{"type":"chat.message","room":"lobby","data":{"message":"hello"},"from":"someone-else"}"#,
    )
    .await;

    for rx in [&mut alice_rx, &mut bob_rx] {
        let frame = rx.recv().await.unwrap();
        let env: parlor_protocol::Envelope = serde_json::from_slice(&frame).unwrap();
        assert_eq!(env.kind, parlor_protocol::EnvelopeType::ChatMessage);
        assert_eq!(env.from, "alice-id", "from must be server-stamped, not client-supplied");
        let payload: ChatMessagePayload = serde_json::from_value(env.data).unwrap();
        assert_eq!(payload.message, "hello");
    }
}

#[tokio::test]
async fn rooms_with_different_names_can_land_on_different_shards() {
    let hubs = HubManager::spawn(16, 64, 64);
    let (a, mut a_rx) = member(1, "u1", "alice");
    let (b, mut b_rx) = member(2, "u2", "bob");

    send(&hubs, "room-a", &a, r#"{"type":"chat.join","room":"room-a"}"#).await;
    send(&hubs, "room-b", &b, r#"{"type":"chat.join","room":"room-b"}"#).await;

    // Each joiner only sees their own room's presence snapshot, never the
    // other's, regardless of whether the two rooms share a shard.
    let a_frame = a_rx.recv().await.unwrap();
    let a_env: parlor_protocol::Envelope = serde_json::from_slice(&a_frame).unwrap();
    let a_payload: RoomUsersPayload = serde_json::from_value(a_env.data).unwrap();
    assert_eq!(a_payload.users.len(), 1);
    assert_eq!(a_payload.users[0].user_id, "u1");

    let b_frame = b_rx.recv().await.unwrap();
    let b_env: parlor_protocol::Envelope = serde_json::from_slice(&b_frame).unwrap();
    let b_payload: RoomUsersPayload = serde_json::from_value(b_env.data).unwrap();
    assert_eq!(b_payload.users.len(), 1);
    assert_eq!(b_payload.users[0].user_id, "u2");
}

#[tokio::test]
async fn disconnect_everywhere_removes_membership_from_whichever_shard_owns_the_room() {
    let hubs = HubManager::spawn(8, 64, 64);
    let (a, mut a_rx) = member(1, "u1", "alice");
    let (b, mut b_rx) = member(2, "u2", "bob");

    send(&hubs, "room-x", &a, r#"{"type":"chat.join","room":"room-x"}"#).await;
    let _ = a_rx.recv().await.unwrap();
    send(&hubs, "room-x", &b, r#"{"type":"chat.join","room":"room-x"}"#).await;
    let _ = a_rx.recv().await.unwrap();
    let _ = b_rx.recv().await.unwrap();

    hubs.disconnect_everywhere(a.id);

    let frame = tokio::time::timeout(std::time::Duration::from_millis(200), b_rx.recv())
        .await
        .expect("presence update after disconnect")
        .unwrap();
    let env: parlor_protocol::Envelope = serde_json::from_slice(&frame).unwrap();
    let payload: RoomUsersPayload = serde_json::from_value(env.data).unwrap();
    assert_eq!(payload.users.len(), 1);
    assert_eq!(payload.users[0].user_id, "u2");
}
