//! Server configuration shape.
//!
//! Populating this struct from environment variables or a file is the job
//! of the external configuration-loading collaborator (spec §1); this
//! module only defines the shape, its defaults, and clamping, the same
//! boundary `tallow-relay::config::RelayConfig` draws.

use parlor_protocol::constants::{
    HUB_DISCONNECT_QUEUE_CAPACITY, HUB_INBOUND_QUEUE_CAPACITY, OUTBOUND_QUEUE_CAPACITY,
};

/// Runtime configuration for a messaging core instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Number of hub shards. Clamped to at least 1 (spec §4.4).
    pub shard_count: usize,
    /// Capacity of each hub's inbound work-item queue.
    pub hub_inbound_capacity: usize,
    /// Capacity of each hub's disconnect-request queue.
    pub hub_disconnect_capacity: usize,
    /// Capacity of each connection's outbound queue.
    pub outbound_queue_capacity: usize,
}

impl ServerConfig {
    /// Recommended default shard count: 4x the available CPUs (spec §4.4).
    pub fn default_shard_count() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get() * 4)
            .unwrap_or(4)
    }

    /// Clamp out-of-range values. `shard_count` of 0 becomes 1 per §4.4.
    pub fn validate(&mut self) {
        if self.shard_count == 0 {
            self.shard_count = 1;
        }
        if self.hub_inbound_capacity == 0 {
            self.hub_inbound_capacity = HUB_INBOUND_QUEUE_CAPACITY;
        }
        if self.hub_disconnect_capacity == 0 {
            self.hub_disconnect_capacity = HUB_DISCONNECT_QUEUE_CAPACITY;
        }
        if self.outbound_queue_capacity == 0 {
            self.outbound_queue_capacity = OUTBOUND_QUEUE_CAPACITY;
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            shard_count: Self::default_shard_count(),
            hub_inbound_capacity: HUB_INBOUND_QUEUE_CAPACITY,
            hub_disconnect_capacity: HUB_DISCONNECT_QUEUE_CAPACITY,
            outbound_queue_capacity: OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_shard_count_clamps_to_one() {
        let mut cfg = ServerConfig {
            shard_count: 0,
            ..Default::default()
        };
        cfg.validate();
        assert_eq!(cfg.shard_count, 1);
    }

    #[test]
    fn default_has_sane_capacities() {
        let cfg = ServerConfig::default();
        assert!(cfg.shard_count >= 1);
        assert!(cfg.hub_inbound_capacity > 0);
        assert!(cfg.outbound_queue_capacity > 0);
    }
}
