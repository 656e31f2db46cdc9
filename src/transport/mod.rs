//! TLS transport with adaptive fingerprint control.
//!
//! - `engine`: the seam a TLS implementation plugs into
//! - `connector`: BoringSSL engine via tokio-boring
//! - `adaptive`: retry-and-mutate controller
//! - `memory`: per-destination rejected-group memory

pub mod adaptive;
pub mod connector;
pub mod engine;
pub mod memory;

pub use adaptive::{AdaptiveConnector, DEFAULT_HANDSHAKE_TIMEOUT};
pub use connector::BoringEngine;
pub use engine::{HandshakeEngine, HandshakeFailure};
pub use memory::{DestinationKey, FingerprintMemory, RejectedGroups};
