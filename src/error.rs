//! Error types for mimic crate.

use std::io;
use std::time::Duration;

use crate::transport::engine::HandshakeFailure;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building fingerprints or driving handshakes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unsupported or malformed input kind given to a builder or selector.
    #[error("unsupported input: {0}")]
    InputKind(String),

    /// Fingerprint string failed structural validation.
    #[error("fingerprint format error: {0}")]
    Format(String),

    /// Captured ClientHello could not be decoded.
    #[error("ClientHello decode error: {0}")]
    ClientHello(String),

    /// Hex capture was not valid hex.
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Handshake failed with an error that is not a group rejection.
    /// Displayed exactly as the engine reported it.
    #[error("{0}")]
    UnrecognizedHandshake(HandshakeFailure),

    /// Every group the peer is known to reject has been pruned and it still fails.
    #[error("{source}")]
    ExhaustedAdaptation {
        server_name: String,
        group: u16,
        source: HandshakeFailure,
    },

    /// Peer rejected a group during the handshake itself. The group has been
    /// recorded; the consumed transport cannot be reused for a retry.
    #[error("{server_name} rejected group {group}: {source}")]
    GroupRejected {
        server_name: String,
        group: u16,
        source: HandshakeFailure,
    },

    /// QUIC error.
    #[error("QUIC error: {0}")]
    Quic(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Handshake did not complete in time.
    #[error("Connect timeout after {0:?}")]
    ConnectTimeout(Duration),

    /// Caller cancelled the attempt.
    #[error("handshake cancelled")]
    Cancelled,
}

impl Error {
    /// Create an input kind error.
    pub fn input_kind(message: impl Into<String>) -> Self {
        Self::InputKind(message.into())
    }

    /// Create a fingerprint format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Create a ClientHello decode error.
    pub fn client_hello(message: impl Into<String>) -> Self {
        Self::ClientHello(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a QUIC error.
    pub fn quic(message: impl Into<String>) -> Self {
        Self::Quic(message.into())
    }

    /// The underlying engine failure, for errors that carry one.
    pub fn handshake_failure(&self) -> Option<&HandshakeFailure> {
        match self {
            Self::UnrecognizedHandshake(failure) => Some(failure),
            Self::ExhaustedAdaptation { source, .. } | Self::GroupRejected { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
