//! Sharded room hub, connection endpoints, and WebSocket transport for the
//! realtime messaging core. See `parlor_protocol` for the wire shape this
//! crate routes.

pub mod auth;
pub mod config;
pub mod connection;
pub mod hub;
pub mod hub_manager;
pub mod rate_limit;
pub mod router;
pub mod server;
