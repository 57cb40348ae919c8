//! Hub: single-writer owner of a disjoint subset of rooms (spec §4.3).
//!
//! Grounded on `tallow-relay::room::{Room, RoomManager}` for the
//! membership-map shape and on the original `hub.go`'s `select!`-over-two-
//! channels event loop (`register`/`unregister`/`broadcast` generalize here
//! to `inbound`/`disconnect`). Unlike the teacher's `DashMap`-backed
//! `RoomManager`, this hub's `rooms` map is plain and owned exclusively by
//! its own task — concurrent correctness here comes from single-writer
//! discipline, not from a concurrent map (spec §5).

use std::collections::HashMap;

use parlor_protocol::codec;
use parlor_protocol::constants::MAX_CONSECUTIVE_DROPS;
use parlor_protocol::payload::RoomUser;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::router::{self, DispatchOutcome};

/// Unique id for a connection, stable for its lifetime.
pub type ConnId = u64;

/// What a hub needs to know about a member of one of its rooms to fan
/// frames out to it and, on repeated failure, evict it.
#[derive(Clone)]
pub struct Member {
    pub id: ConnId,
    pub user_id: String,
    pub username: String,
    pub outbound: mpsc::Sender<Vec<u8>>,
}

impl Member {
    fn as_room_user(&self) -> RoomUser {
        RoomUser {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
        }
    }
}

/// A unit of work handed from a connection's read pump to the owning hub.
pub struct InboundItem {
    pub member: Member,
    pub envelope: parlor_protocol::Envelope,
    /// Lets the read pump learn whether this dispatch should count against
    /// the connection's protocol-error budget (spec §7) without the hub
    /// reaching across tasks to mutate a counter it doesn't own.
    pub reply: oneshot::Sender<DispatchOutcome>,
}

/// A cloneable front door to one hub shard.
#[derive(Clone)]
pub struct HubHandle {
    pub inbound: mpsc::Sender<InboundItem>,
    pub disconnect: mpsc::Sender<ConnId>,
}

impl HubHandle {
    /// Non-blocking enqueue; `Err` means the hub is saturated (spec §4.2
    /// step 5: treated by the caller as a backpressure error).
    pub fn try_route(&self, item: InboundItem) -> Result<(), InboundItem> {
        self.inbound.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(item) => item,
            mpsc::error::TrySendError::Closed(item) => item,
        })
    }

    /// Non-blocking disconnect request; failures are tolerated (spec §4.4:
    /// the connection will be evicted lazily on the next failed fan-out).
    pub fn request_disconnect(&self, conn: ConnId) {
        let _ = self.disconnect.try_send(conn);
    }
}

/// Single-writer owner of a shard's rooms.
pub struct Hub {
    shard_id: usize,
    rooms: HashMap<String, HashMap<ConnId, Member>>,
    /// Consecutive undelivered fan-out attempts per member, tracked within
    /// this shard (spec §3's per-connection drop counter, scoped to the
    /// hub doing the sending, since a single connection may be a member of
    /// rooms owned by several shards at once — see spec §4.3 Invariant H1).
    drop_counts: HashMap<ConnId, u32>,
    inbound_rx: mpsc::Receiver<InboundItem>,
    disconnect_rx: mpsc::Receiver<ConnId>,
    disconnect_tx: mpsc::Sender<ConnId>,
}

impl Hub {
    pub fn new(
        shard_id: usize,
        inbound_rx: mpsc::Receiver<InboundItem>,
        disconnect_rx: mpsc::Receiver<ConnId>,
        disconnect_tx: mpsc::Sender<ConnId>,
    ) -> Self {
        Self {
            shard_id,
            rooms: HashMap::new(),
            drop_counts: HashMap::new(),
            inbound_rx,
            disconnect_rx,
            disconnect_tx,
        }
    }

    /// Run the event loop. Returns only when both queues are closed, which
    /// only happens at process shutdown (spec §4.3: hubs do not terminate
    /// during the life of the process).
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(conn_id) = self.disconnect_rx.recv() => {
                    self.handle_disconnect(conn_id).await;
                }
                Some(item) = self.inbound_rx.recv() => {
                    self.handle_inbound(item).await;
                }
                else => break,
            }
        }
        info!(shard = self.shard_id, "hub loop exiting");
    }

    async fn handle_disconnect(&mut self, conn_id: ConnId) {
        let mut affected_rooms = Vec::new();
        self.rooms.retain(|room, members| {
            if members.remove(&conn_id).is_some() {
                affected_rooms.push(room.clone());
            }
            !members.is_empty()
        });
        self.drop_counts.remove(&conn_id);

        for room in affected_rooms {
            self.broadcast_presence(&room).await;
        }
    }

    async fn handle_inbound(&mut self, item: InboundItem) {
        let InboundItem {
            member,
            mut envelope,
            reply,
        } = item;

        // Defensive re-stamp: the hub is the security boundary for egress
        // (spec §4.3), even though the connection endpoint already did this.
        codec::stamp_from(&mut envelope, &member.user_id);

        let room = envelope.room.clone();
        let is_member = room
            .as_deref()
            .map(|r| self.is_member(r, member.id))
            .unwrap_or(false);
        let decision = router::decide(&envelope, is_member);

        let outcome = match decision {
            router::Decision::Join => {
                self.join(room.as_ref().expect("chat.join requires room"), &member)
                    .await;
                DispatchOutcome::Ok
            }
            router::Decision::Leave => {
                if let Some(room) = &room {
                    self.leave(room, member.id).await;
                }
                DispatchOutcome::Ok
            }
            router::Decision::Broadcast(out_envelope) => {
                let room = room.expect("room-scoped broadcast requires room");
                self.fan_out(&room, &out_envelope).await;
                DispatchOutcome::Ok
            }
            router::Decision::PrivateError { message, outcome } => {
                self.send_private(&member, codec::build_error(room, message))
                    .await;
                outcome
            }
        };

        let _ = reply.send(outcome);
    }

    fn is_member(&self, room: &str, conn_id: ConnId) -> bool {
        self.rooms
            .get(room)
            .map(|members| members.contains_key(&conn_id))
            .unwrap_or(false)
    }

    async fn join(&mut self, room: &str, member: &Member) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(member.id, member.clone());
        debug!(shard = self.shard_id, room, conn = member.id, "joined room");
        self.broadcast_presence(room).await;
    }

    async fn leave(&mut self, room: &str, conn_id: ConnId) {
        let mut now_empty = false;
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&conn_id);
            now_empty = members.is_empty();
        }
        if now_empty {
            self.rooms.remove(room);
            debug!(shard = self.shard_id, room, "room emptied and removed");
            return;
        }
        self.broadcast_presence(room).await;
    }

    /// Broadcast a `room.users` snapshot to the room's current members, if
    /// any remain (spec §4.3: "A presence snapshot is broadcast on every
    /// transition in which the set changed"; no recipient, no snapshot).
    async fn broadcast_presence(&mut self, room: &str) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        if members.is_empty() {
            return;
        }
        let users: Vec<RoomUser> = members.values().map(Member::as_room_user).collect();
        let snapshot = codec::build_room_users(room.to_string(), users);
        self.fan_out(room, &snapshot).await;
    }

    /// Fan out a serialized envelope to every current member of `room`,
    /// never blocking on a slow recipient (spec §4.3, P7).
    async fn fan_out(&mut self, room: &str, envelope: &parlor_protocol::Envelope) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        let bytes = codec::to_json_bytes(envelope);
        let recipients: Vec<Member> = members.values().cloned().collect();

        let mut evicted = Vec::new();
        for recipient in &recipients {
            match recipient.outbound.try_send(bytes.clone()) {
                Ok(()) => {
                    self.drop_counts.remove(&recipient.id);
                }
                Err(_) => {
                    let count = self.drop_counts.entry(recipient.id).or_insert(0);
                    *count += 1;
                    if *count >= MAX_CONSECUTIVE_DROPS {
                        evicted.push(recipient.id);
                    }
                }
            }
        }

        for conn_id in evicted {
            // Non-blocking; if the disconnect queue is also full the next
            // failed fan-out will try again (spec §4.3).
            let _ = self.disconnect_tx.try_send(conn_id);
        }
    }

    async fn send_private(&mut self, member: &Member, envelope: parlor_protocol::Envelope) {
        let bytes = codec::to_json_bytes(&envelope);
        let _ = member.outbound.try_send(bytes);
    }
}
