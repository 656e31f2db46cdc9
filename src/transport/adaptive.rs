//! Adaptive TLS connector.
//!
//! Wraps a [`HandshakeEngine`] and keeps retrying with a narrowed
//! ClientHello whenever the engine or the peer rejects a key-exchange group.
//! Rejections are remembered per destination in a shared
//! [`FingerprintMemory`], so later connections skip the failing round trip.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::engine::{HandshakeEngine, HandshakeFailure};
use super::memory::FingerprintMemory;
use crate::error::{Error, Result};
use crate::fingerprint::tls::ClientHelloSpec;
use crate::version::HttpVersion;

/// Default handshake deadline.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry-and-mutate controller around a TLS engine.
pub struct AdaptiveConnector<E> {
    engine: E,
    memory: Arc<FingerprintMemory>,
    http_version: HttpVersion,
    handshake_timeout: Option<Duration>,
}

impl<E: HandshakeEngine> AdaptiveConnector<E> {
    /// Connector with a private memory, HTTP/2 ALPN and the default timeout.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            memory: Arc::new(FingerprintMemory::new()),
            http_version: HttpVersion::default(),
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
        }
    }

    /// Share a memory with other connectors.
    pub fn with_memory(mut self, memory: Arc<FingerprintMemory>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_http_version(mut self, version: HttpVersion) -> Self {
        self.http_version = version;
        self
    }

    /// `None` waits for the handshake indefinitely.
    pub fn with_handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn memory(&self) -> &Arc<FingerprintMemory> {
        &self.memory
    }

    pub fn http_version(&self) -> HttpVersion {
        self.http_version
    }

    /// Spec as the first attempt will send it: ALPN rewritten for the HTTP
    /// version, groups the destination already rejected pruned.
    pub fn prepare(&self, mut spec: ClientHelloSpec, server_name: &str) -> ClientHelloSpec {
        spec.apply_http_version(self.http_version);
        self.memory.prune(server_name, &mut spec);
        spec
    }

    /// Learn from a failed attempt and narrow `spec` for the next one.
    ///
    /// Returns `Ok(())` when the spec changed and another attempt is worth
    /// making.
    fn absorb(
        &self,
        server_name: &str,
        spec: &mut ClientHelloSpec,
        failure: HandshakeFailure,
    ) -> Result<()> {
        let Some(group) = failure.rejected_group() else {
            debug!(server_name, error = %failure, "handshake failure is not a group rejection");
            return Err(Error::UnrecognizedHandshake(failure));
        };

        let learned = self.memory.record_rejected_group(server_name, group);
        // A concurrent attempt may have recorded the group first; pruning
        // still decides whether this spec can improve.
        let narrowed = self.memory.prune(server_name, spec);
        if !narrowed {
            warn!(
                server_name,
                group, learned, "group rejected again, no fingerprint adjustment left"
            );
            return Err(Error::ExhaustedAdaptation {
                server_name: server_name.to_string(),
                group,
                source: failure,
            });
        }

        warn!(server_name, group, "group rejected, retrying with pruned ClientHello");
        Ok(())
    }

    /// Apply `spec` to the engine, pruning until the engine accepts it.
    fn apply(&self, spec: &mut ClientHelloSpec, server_name: &str) -> Result<E::Prepared> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(server_name, attempt, "applying ClientHello");
            match self.engine.apply(spec, server_name) {
                Ok(prepared) => return Ok(prepared),
                Err(failure) => self.absorb(server_name, spec, failure)?,
            }
        }
    }

    /// Run one handshake under the timeout, racing `cancel`.
    async fn drive<C>(
        &self,
        prepared: E::Prepared,
        server_name: &str,
        transport: E::Transport,
        cancel: Pin<&mut C>,
    ) -> Result<std::result::Result<E::Stream, HandshakeFailure>>
    where
        C: Future<Output = ()>,
    {
        let handshake = self.engine.handshake(prepared, server_name, transport);
        let bounded = async {
            match self.handshake_timeout {
                Some(limit) => tokio::time::timeout(limit, handshake)
                    .await
                    .map_err(|_| Error::ConnectTimeout(limit)),
                None => Ok(handshake.await),
            }
        };

        tokio::select! {
            biased;
            _ = cancel => {
                debug!(server_name, "handshake cancelled");
                Err(Error::Cancelled)
            }
            outcome = bounded => outcome,
        }
    }

    /// Handshake over a single caller-supplied transport.
    ///
    /// Engine-side group rejections are retried before any bytes are sent.
    /// A rejection during the handshake itself consumes the transport, so it
    /// is recorded for future connections and surfaced as
    /// [`Error::GroupRejected`]. Use [`connect_with`](Self::connect_with) to
    /// retry on a fresh transport instead.
    pub async fn connect<C>(
        &self,
        spec: ClientHelloSpec,
        server_name: &str,
        transport: E::Transport,
        cancel: C,
    ) -> Result<E::Stream>
    where
        C: Future<Output = ()>,
    {
        let mut spec = self.prepare(spec, server_name);
        let prepared = self.apply(&mut spec, server_name)?;

        tokio::pin!(cancel);
        match self
            .drive(prepared, server_name, transport, cancel.as_mut())
            .await?
        {
            Ok(stream) => {
                debug!(server_name, "handshake complete");
                Ok(stream)
            }
            Err(failure) => match failure.rejected_group() {
                Some(group) => {
                    self.memory.record_rejected_group(server_name, group);
                    warn!(server_name, group, "peer rejected group during handshake");
                    Err(Error::GroupRejected {
                        server_name: server_name.to_string(),
                        group,
                        source: failure,
                    })
                }
                None => Err(Error::UnrecognizedHandshake(failure)),
            },
        }
    }

    /// Handshake, dialing a fresh transport for every attempt so rejections
    /// at any stage lead to a retry with the narrowed spec.
    pub async fn connect_with<D, F, C>(
        &self,
        spec: ClientHelloSpec,
        server_name: &str,
        mut dial: D,
        cancel: C,
    ) -> Result<E::Stream>
    where
        D: FnMut() -> F,
        F: Future<Output = Result<E::Transport>>,
        C: Future<Output = ()>,
    {
        let mut spec = self.prepare(spec, server_name);
        tokio::pin!(cancel);

        loop {
            let prepared = self.apply(&mut spec, server_name)?;
            let transport = tokio::select! {
                biased;
                _ = cancel.as_mut() => return Err(Error::Cancelled),
                dialed = dial() => dialed?,
            };

            match self
                .drive(prepared, server_name, transport, cancel.as_mut())
                .await?
            {
                Ok(stream) => {
                    debug!(server_name, "handshake complete");
                    return Ok(stream);
                }
                Err(failure) => self.absorb(server_name, &mut spec, failure)?,
            }
        }
    }
}

impl<E> std::fmt::Debug for AdaptiveConnector<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveConnector")
            .field("destinations", &self.memory.len())
            .field("http_version", &self.http_version)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}
