//! Seam between the adaptive controller and a concrete TLS engine.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::fingerprint::tls::ClientHelloSpec;

/// Text shape of a group rejection, for engines that only report strings.
static REJECTED_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"unsupported Curve in KeyShareExtension: CurveID\((\d+)\)")
        .expect("static regex is valid")
});

/// Failure reported by a [`HandshakeEngine`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeFailure {
    /// The engine (or the peer) cannot use this group.
    #[error("unsupported Curve in KeyShareExtension: CurveID({0})")]
    UnsupportedGroup(u16),

    /// Anything else, as the engine phrased it.
    #[error("{0}")]
    Engine(String),
}

impl HandshakeFailure {
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }

    /// Group id this failure rejects, if it is a group rejection.
    ///
    /// The structured variant wins; otherwise the message is matched against
    /// the known rejection text. The text contract of third-party engines is
    /// not stable, so engines should prefer [`HandshakeFailure::UnsupportedGroup`].
    pub fn rejected_group(&self) -> Option<u16> {
        match self {
            Self::UnsupportedGroup(group) => Some(*group),
            Self::Engine(message) => REJECTED_GROUP
                .captures(message)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok()),
        }
    }
}

/// A TLS engine that can be configured from a [`ClientHelloSpec`] and then
/// drive a handshake over a caller-supplied transport.
///
/// `apply` is synchronous and may reject parameters (typically a group it
/// cannot offer). `handshake` consumes the transport; dropping the returned
/// future must abort the handshake.
#[async_trait]
pub trait HandshakeEngine: Send + Sync {
    /// Transport the handshake runs over.
    type Transport: Send + 'static;
    /// Engine state produced by `apply`.
    type Prepared: Send;
    /// Established session.
    type Stream: Send;

    /// Configure the engine for one attempt.
    fn apply(
        &self,
        spec: &ClientHelloSpec,
        server_name: &str,
    ) -> Result<Self::Prepared, HandshakeFailure>;

    /// Run the handshake.
    async fn handshake(
        &self,
        prepared: Self::Prepared,
        server_name: &str,
        transport: Self::Transport,
    ) -> Result<Self::Stream, HandshakeFailure>;
}
