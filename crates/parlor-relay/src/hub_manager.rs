//! Spawns the fixed array of hub shards and routes rooms to them.
//!
//! Grounded on `original_source/server/internal/ws/manager.go`'s
//! `NewManager`/`GetHubForRoom`/`DisconnectClient`: a fixed-size hash-routed
//! array of hubs, each running on its own goroutine there and its own
//! `tokio` task here (spec §4.4).

use tokio::sync::mpsc;

use crate::hub::{Hub, HubHandle};

/// FNV-1a, 32-bit, as named by spec §4.4 — the standard non-cryptographic
/// hash used to pick a deterministic, stable shard for a room name.
fn fnv1a_32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Owns every hub shard and routes room names to the shard that owns them.
pub struct HubManager {
    hubs: Vec<HubHandle>,
}

impl HubManager {
    /// Spawn `shard_count` hubs (clamped to at least 1), each buffering up
    /// to `inbound_capacity` inbound items and `disconnect_capacity`
    /// disconnect requests.
    pub fn spawn(shard_count: usize, inbound_capacity: usize, disconnect_capacity: usize) -> Self {
        let shard_count = shard_count.max(1);
        let mut hubs = Vec::with_capacity(shard_count);
        for shard_id in 0..shard_count {
            let (inbound_tx, inbound_rx) = mpsc::channel(inbound_capacity);
            let (disconnect_tx, disconnect_rx) = mpsc::channel(disconnect_capacity);
            let hub = Hub::new(shard_id, inbound_rx, disconnect_rx, disconnect_tx.clone());
            tokio::spawn(hub.run());
            hubs.push(HubHandle {
                inbound: inbound_tx,
                disconnect: disconnect_tx,
            });
        }
        Self { hubs }
    }

    /// Deterministically route a room name to the hub that owns it
    /// (invariant H1: a room lives in exactly one hub for its lifetime,
    /// since the same name always hashes to the same shard).
    pub fn route(&self, room: &str) -> &HubHandle {
        let idx = (fnv1a_32(room.as_bytes()) as usize) % self.hubs.len();
        &self.hubs[idx]
    }

    /// Ask every hub shard to drop a connection, since a connection may be
    /// a member of rooms spread across several shards at once (spec §4.4).
    pub fn disconnect_everywhere(&self, conn_id: crate::hub::ConnId) {
        for hub in &self.hubs {
            hub.request_disconnect(conn_id);
        }
    }

    pub fn shard_count(&self) -> usize {
        self.hubs.len()
    }
}
