//! Protocol constants, bit-exact for interoperability (spec §4.1, §6).

/// Hard maximum size of a single incoming frame, in bytes.
pub const MAX_FRAME_BYTES: usize = 65536;

/// Maximum length of a trimmed `room` field, in Unicode scalar values.
pub const MAX_ROOM_CODEPOINTS: usize = 128;

/// Maximum length of a trimmed chat message, in Unicode scalar values.
pub const MAX_CHAT_MESSAGE_CODEPOINTS: usize = 5000;

/// Consecutive protocol errors a connection may accrue before forced close.
pub const MAX_PROTOCOL_ERRORS: u32 = 10;

/// Consecutive undelivered fan-out attempts before a hub evicts the recipient.
pub const MAX_CONSECUTIVE_DROPS: u32 = 5;

/// Ingress token-bucket refill rate, tokens per second.
pub const INGRESS_RATE_PER_SEC: u32 = 10;

/// Ingress token-bucket burst capacity.
pub const INGRESS_BURST: u32 = 15;

/// Consecutive rate-limited ingress drops before forced close.
pub const MAX_RATE_LIMIT_DROPS: u32 = 5;

/// Server write-side heartbeat interval (9/10 of the read deadline).
pub const HEARTBEAT_INTERVAL_SECS: u64 = 54;

/// Read-side liveness deadline; refreshed on every received heartbeat reply.
pub const READ_DEADLINE_SECS: u64 = 60;

/// Per-write deadline for the write pump.
pub const WRITE_DEADLINE_SECS: u64 = 10;

/// Capacity of a connection's bounded outbound queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 8;

/// Capacity of a hub's inbound work-item queue.
pub const HUB_INBOUND_QUEUE_CAPACITY: usize = 10240;

/// Capacity of a hub's disconnect-request queue.
pub const HUB_DISCONNECT_QUEUE_CAPACITY: usize = 4096;
