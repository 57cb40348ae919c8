//! Wire envelope, payload types, and codec for the realtime messaging core.
//!
//! This crate owns the wire shape (the Frame Codec of the design) and
//! nothing else: no sockets, no room state, no tokio. `parlor-relay`
//! builds the rest of the system on top of it.

pub mod codec;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod payload;

pub use envelope::{Envelope, EnvelopeType};
pub use error::ProtocolError;
