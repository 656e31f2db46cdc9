//! # Mimic
//!
//! Browser-faithful TLS, HTTP/2 and QUIC client fingerprints.
//!
//! Mimic builds ClientHello specs from browser presets or captured bytes,
//! encodes and decodes HTTP/2 fingerprint strings, selects QUIC transport
//! profiles, and drives BoringSSL handshakes that adapt when a server
//! rejects a key-exchange group.

pub mod error;
pub mod headers;
pub mod version;

// Fingerprint construction
pub mod fingerprint;

// Handshake driving
pub mod transport;

// Re-exports
pub use error::{Error, Result};
pub use fingerprint::{
    ClientHelloSpec, FingerprintProfile, HelloInput, Http2Spec, QuicId, QuicProfile,
};
pub use transport::{AdaptiveConnector, BoringEngine, FingerprintMemory, HandshakeEngine};
pub use version::HttpVersion;
