use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use mimic::fingerprint::tls::{ClientHelloSpec, Extension, KeyShare};
use mimic::transport::{HandshakeEngine, HandshakeFailure};

/// Session produced by [`ScriptedEngine`]: which dial it ran on and the
/// spec it was configured with.
#[derive(Debug)]
pub struct ScriptedSession {
    pub transport: u32,
    pub spec: ClientHelloSpec,
}

/// In-memory engine with scripted failures.
#[derive(Default)]
pub struct ScriptedEngine {
    /// Groups `apply` refuses with a structured rejection.
    pub unsupported: BTreeSet<u16>,
    /// Group `apply` refuses on every call, present in the spec or not.
    pub always_reject: Option<u16>,
    /// Key-share groups the simulated peer refuses, reported as text.
    pub peer_rejects: BTreeSet<u16>,
    /// Failure message for every handshake.
    pub fail_with: Option<String>,
    pub handshake_delay: Option<Duration>,
    pub applied: Mutex<Vec<ClientHelloSpec>>,
    pub handshakes: AtomicUsize,
}

impl ScriptedEngine {
    pub fn applied(&self) -> Vec<ClientHelloSpec> {
        self.applied.lock().clone()
    }

    pub fn apply_count(&self) -> usize {
        self.applied.lock().len()
    }

    pub fn handshake_count(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HandshakeEngine for ScriptedEngine {
    type Transport = u32;
    type Prepared = ClientHelloSpec;
    type Stream = ScriptedSession;

    fn apply(
        &self,
        spec: &ClientHelloSpec,
        _server_name: &str,
    ) -> Result<ClientHelloSpec, HandshakeFailure> {
        self.applied.lock().push(spec.clone());
        if let Some(group) = self.always_reject {
            return Err(HandshakeFailure::UnsupportedGroup(group));
        }
        let offered = spec
            .key_share_groups()
            .unwrap_or_default()
            .into_iter()
            .chain(spec.supported_groups().unwrap_or_default().iter().copied());
        for group in offered {
            if self.unsupported.contains(&group) {
                return Err(HandshakeFailure::UnsupportedGroup(group));
            }
        }
        Ok(spec.clone())
    }

    async fn handshake(
        &self,
        prepared: ClientHelloSpec,
        _server_name: &str,
        transport: u32,
    ) -> Result<ScriptedSession, HandshakeFailure> {
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.handshake_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(HandshakeFailure::engine(message.clone()));
        }
        if let Some(group) = prepared
            .key_share_groups()
            .unwrap_or_default()
            .into_iter()
            .find(|g| self.peer_rejects.contains(g))
        {
            return Err(HandshakeFailure::engine(format!(
                "remote error: tls: unsupported Curve in KeyShareExtension: CurveID({})",
                group
            )));
        }
        Ok(ScriptedSession {
            transport,
            spec: prepared,
        })
    }
}

/// Minimal hello offering `groups`, with a key share for each of `shares`.
pub fn hello_with_groups(groups: &[u16], shares: &[u16]) -> ClientHelloSpec {
    let mut spec = ClientHelloSpec::new();
    spec.cipher_suites = vec![0x1301, 0xc02b];
    spec.extensions = vec![
        Extension::ServerName,
        Extension::SupportedGroups(groups.to_vec()),
        Extension::Alpn(vec!["h2".to_string(), "http/1.1".to_string()]),
        Extension::KeyShare(shares.iter().map(|g| KeyShare::new(*g)).collect()),
    ];
    spec
}
