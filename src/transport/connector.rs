//! BoringSSL handshake engine.
//!
//! Translates a [`ClientHelloSpec`] into BoringSSL context settings. Groups
//! BoringSSL cannot offer are reported as
//! [`HandshakeFailure::UnsupportedGroup`] so the adaptive controller can
//! prune them and retry.

use std::fmt;
use std::io::Read;
use std::marker::PhantomData;

use async_trait::async_trait;
use boring::ssl::{
    ConnectConfiguration, SslConnector, SslMethod, SslSessionCacheMode, SslVerifyMode, SslVersion,
};
use boring::x509::X509;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_boring::SslStream;
use tracing::{trace, warn};

use super::adaptive::AdaptiveConnector;
use super::engine::{HandshakeEngine, HandshakeFailure};
use crate::error::{Error, Result};
use crate::fingerprint::tls::{
    cert_compression, extension_id, group, is_grease, tls_version, ClientHelloSpec, Extension,
};

// FFI bindings for BoringSSL extension control
use boring_sys::{CRYPTO_BUFFER, SSL, SSL_CTX};
use std::os::raw::c_int;

extern "C" {
    /// Enable GREASE (Generate Random Extensions And Sustain Extensibility)
    pub fn SSL_CTX_set_grease_enabled(ctx: *mut SSL_CTX, enabled: c_int) -> c_int;
    /// Enable extension order permutation (Chrome 110+ behavior)
    pub fn SSL_CTX_set_permute_extensions(ctx: *mut SSL_CTX, enabled: c_int) -> c_int;
}

/// Hand a decompressed certificate back to BoringSSL.
unsafe fn store_decompressed(out: *mut *mut CRYPTO_BUFFER, data: &[u8]) -> c_int {
    // CRYPTO_BUFFER_new copies the data
    let buffer = boring_sys::CRYPTO_BUFFER_new(data.as_ptr(), data.len(), std::ptr::null_mut());
    if buffer.is_null() {
        return 0;
    }
    *out = buffer;
    1
}

/// Brotli certificate decompression callback for BoringSSL.
unsafe extern "C" fn decompress_brotli_cert(
    _ssl: *mut SSL,
    out: *mut *mut CRYPTO_BUFFER,
    uncompressed_len: usize,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let compressed = std::slice::from_raw_parts(in_, in_len);
    let mut decompressed = Vec::with_capacity(uncompressed_len);
    let mut decoder = brotli::Decompressor::new(compressed, uncompressed_len);
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) if decompressed.len() == uncompressed_len => {
            store_decompressed(out, &decompressed)
        }
        _ => 0,
    }
}

/// Zlib certificate decompression callback for BoringSSL.
unsafe extern "C" fn decompress_zlib_cert(
    _ssl: *mut SSL,
    out: *mut *mut CRYPTO_BUFFER,
    uncompressed_len: usize,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let compressed = std::slice::from_raw_parts(in_, in_len);
    let mut decompressed = Vec::with_capacity(uncompressed_len);
    let mut decoder = flate2::read::ZlibDecoder::new(compressed);
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) if decompressed.len() == uncompressed_len => {
            store_decompressed(out, &decompressed)
        }
        _ => 0,
    }
}

/// BoringSSL name for a named group.
pub fn group_name(id: u16) -> Option<&'static str> {
    match id {
        group::SECP256R1 => Some("P-256"),
        group::SECP384R1 => Some("P-384"),
        group::SECP521R1 => Some("P-521"),
        group::X25519 => Some("X25519"),
        _ => None,
    }
}

/// BoringSSL name for a TLS 1.2 cipher suite. TLS 1.3 suites are fixed by
/// BoringSSL and have no name here.
pub fn cipher_name(id: u16) -> Option<&'static str> {
    match id {
        0xc02b => Some("ECDHE-ECDSA-AES128-GCM-SHA256"),
        0xc02f => Some("ECDHE-RSA-AES128-GCM-SHA256"),
        0xc02c => Some("ECDHE-ECDSA-AES256-GCM-SHA384"),
        0xc030 => Some("ECDHE-RSA-AES256-GCM-SHA384"),
        0xcca9 => Some("ECDHE-ECDSA-CHACHA20-POLY1305"),
        0xcca8 => Some("ECDHE-RSA-CHACHA20-POLY1305"),
        0xc009 => Some("ECDHE-ECDSA-AES128-SHA"),
        0xc00a => Some("ECDHE-ECDSA-AES256-SHA"),
        0xc013 => Some("ECDHE-RSA-AES128-SHA"),
        0xc014 => Some("ECDHE-RSA-AES256-SHA"),
        0xc012 => Some("ECDHE-RSA-DES-CBC3-SHA"),
        0x009c => Some("AES128-GCM-SHA256"),
        0x009d => Some("AES256-GCM-SHA384"),
        0x002f => Some("AES128-SHA"),
        0x0035 => Some("AES256-SHA"),
        0x000a => Some("DES-CBC3-SHA"),
        _ => None,
    }
}

/// BoringSSL name for a signature algorithm. SHA-1 schemes are left out of
/// the preference list.
pub fn sigalg_name(id: u16) -> Option<&'static str> {
    match id {
        0x0401 => Some("rsa_pkcs1_sha256"),
        0x0501 => Some("rsa_pkcs1_sha384"),
        0x0601 => Some("rsa_pkcs1_sha512"),
        0x0403 => Some("ecdsa_secp256r1_sha256"),
        0x0503 => Some("ecdsa_secp384r1_sha384"),
        0x0603 => Some("ecdsa_secp521r1_sha512"),
        0x0804 => Some("rsa_pss_rsae_sha256"),
        0x0805 => Some("rsa_pss_rsae_sha384"),
        0x0806 => Some("rsa_pss_rsae_sha512"),
        0x0807 => Some("ed25519"),
        _ => None,
    }
}

fn ssl_version(code: u16) -> Option<SslVersion> {
    match code {
        tls_version::TLS1_0 => Some(SslVersion::TLS1),
        tls_version::TLS1_1 => Some(SslVersion::TLS1_1),
        tls_version::TLS1_2 => Some(SslVersion::TLS1_2),
        tls_version::TLS1_3 => Some(SslVersion::TLS1_3),
        _ => None,
    }
}

/// Wire-format ALPN list (length-prefixed protocol names).
pub fn alpn_wire(protocols: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    for proto in protocols {
        out.push(proto.len() as u8);
        out.extend_from_slice(proto.as_bytes());
    }
    out
}

fn engine_err(what: &str) -> impl FnOnce(boring::error::ErrorStack) -> HandshakeFailure + '_ {
    move |e| HandshakeFailure::engine(format!("Failed to {}: {}", what, e))
}

/// BoringSSL-backed [`HandshakeEngine`] over any async byte stream.
pub struct BoringEngine<S> {
    root_certs: Vec<Vec<u8>>,
    verify: bool,
    _transport: PhantomData<fn() -> S>,
}

impl<S> BoringEngine<S> {
    /// Create an engine that verifies certificates against system roots.
    pub fn new() -> Self {
        Self {
            root_certs: Vec::new(),
            verify: true,
            _transport: PhantomData,
        }
    }

    /// Add custom root certificates (DER or PEM).
    pub fn with_root_certificates(mut self, certs: Vec<Vec<u8>>) -> Self {
        self.root_certs = certs;
        self
    }

    /// Disable certificate and host name verification.
    pub fn danger_skip_verify(mut self) -> Self {
        self.verify = false;
        self
    }

    fn configure_ssl(&self, spec: &ClientHelloSpec) -> std::result::Result<SslConnector, HandshakeFailure> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())
            .map_err(engine_err("create SSL connector"))?;

        for cert_bytes in &self.root_certs {
            match X509::from_der(cert_bytes).or_else(|_| X509::from_pem(cert_bytes)) {
                Ok(cert) => {
                    if let Err(e) = builder.cert_store_mut().add_cert(cert) {
                        warn!("Failed to add root certificate: {}", e);
                    }
                }
                Err(_) => warn!("Ignoring root certificate that is neither DER nor PEM"),
            }
        }
        if !self.verify {
            builder.set_verify(SslVerifyMode::NONE);
        }

        // BoringSSL derives key shares from the curves list, so an unknown
        // key-share group is as fatal as an unknown curve.
        for ext in &spec.extensions {
            if let Extension::KeyShare(shares) = ext {
                if let Some(bad) = shares
                    .iter()
                    .map(|s| s.group)
                    .find(|g| !is_grease(*g) && group_name(*g).is_none())
                {
                    return Err(HandshakeFailure::UnsupportedGroup(bad));
                }
            }
        }

        if let Some(groups) = spec.supported_groups() {
            let names = groups
                .iter()
                .filter(|g| !is_grease(**g))
                .map(|g| group_name(*g).ok_or(HandshakeFailure::UnsupportedGroup(*g)))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            builder
                .set_curves_list(&names.join(":"))
                .map_err(engine_err("set curves"))?;
        }

        let ciphers: Vec<&str> = spec
            .cipher_suites
            .iter()
            .filter(|c| !is_grease(**c) && (**c >> 8) != 0x13)
            .filter_map(|c| {
                let name = cipher_name(*c);
                if name.is_none() {
                    trace!(cipher = *c, "skipping cipher without BoringSSL name");
                }
                name
            })
            .collect();
        if !ciphers.is_empty() {
            builder
                .set_cipher_list(&ciphers.join(":"))
                .map_err(engine_err("set cipher list"))?;
        }

        if let Some(algs) = spec.signature_algorithms() {
            let names: Vec<&str> = algs.iter().filter_map(|a| sigalg_name(*a)).collect();
            if !names.is_empty() {
                builder
                    .set_sigalgs_list(&names.join(":"))
                    .map_err(engine_err("set signature algorithms"))?;
            }
        }

        let versions: Vec<u16> = spec
            .supported_versions()
            .unwrap_or(&[tls_version::TLS1_3, tls_version::TLS1_2])
            .iter()
            .copied()
            .filter(|v| !is_grease(*v) && ssl_version(*v).is_some())
            .collect();
        let min = versions.iter().min().and_then(|v| ssl_version(*v));
        let max = versions.iter().max().and_then(|v| ssl_version(*v));
        builder
            .set_min_proto_version(min.or(Some(SslVersion::TLS1_2)))
            .map_err(engine_err("set min TLS version"))?;
        builder
            .set_max_proto_version(max.or(Some(SslVersion::TLS1_3)))
            .map_err(engine_err("set max TLS version"))?;

        if let Some(protocols) = spec.alpn_protocols() {
            builder
                .set_alpn_protos(&alpn_wire(protocols))
                .map_err(engine_err("set ALPN"))?;
        }

        unsafe {
            let ctx = builder.as_ptr() as *mut SSL_CTX;
            SSL_CTX_set_grease_enabled(ctx, spec.has_grease() as c_int);
            SSL_CTX_set_permute_extensions(ctx, spec.permute_extensions as c_int);

            // Client only decompresses certificates, so no compression callback.
            let algs = match spec.extension(extension_id::COMPRESS_CERTIFICATE) {
                Some(Extension::CompressCertificate(algs)) => algs.as_slice(),
                _ => &[],
            };
            for alg in algs {
                match *alg {
                    cert_compression::BROTLI => {
                        boring_sys::SSL_CTX_add_cert_compression_alg(
                            ctx,
                            cert_compression::BROTLI,
                            None,
                            Some(decompress_brotli_cert),
                        );
                    }
                    cert_compression::ZLIB => {
                        boring_sys::SSL_CTX_add_cert_compression_alg(
                            ctx,
                            cert_compression::ZLIB,
                            None,
                            Some(decompress_zlib_cert),
                        );
                    }
                    other => trace!(alg = other, "no decompressor for certificate compression"),
                }
            }
        }

        // Browsers resume sessions; so do we.
        builder.set_session_cache_mode(SslSessionCacheMode::CLIENT);

        Ok(builder.build())
    }
}

impl<S> Default for BoringEngine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for BoringEngine<S> {
    fn clone(&self) -> Self {
        Self {
            root_certs: self.root_certs.clone(),
            verify: self.verify,
            _transport: PhantomData,
        }
    }
}

impl<S> fmt::Debug for BoringEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoringEngine")
            .field("root_certs", &self.root_certs.len())
            .field("verify", &self.verify)
            .finish()
    }
}

#[async_trait]
impl<S> HandshakeEngine for BoringEngine<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug + 'static,
{
    type Transport = S;
    type Prepared = ConnectConfiguration;
    type Stream = SslStream<S>;

    fn apply(
        &self,
        spec: &ClientHelloSpec,
        server_name: &str,
    ) -> std::result::Result<ConnectConfiguration, HandshakeFailure> {
        let connector = self.configure_ssl(spec)?;
        let mut config = connector
            .configure()
            .map_err(engine_err("configure SSL"))?;
        config.set_use_server_name_indication(
            spec.extension(extension_id::SERVER_NAME).is_some(),
        );
        config.set_verify_hostname(self.verify);
        trace!(
            server_name,
            session_id = %hex::encode(spec.session_id()),
            ja3 = %spec.ja3(),
            "BoringSSL configured"
        );
        Ok(config)
    }

    async fn handshake(
        &self,
        prepared: ConnectConfiguration,
        server_name: &str,
        transport: S,
    ) -> std::result::Result<SslStream<S>, HandshakeFailure> {
        tokio_boring::connect(prepared, server_name, transport)
            .await
            .map_err(|e| HandshakeFailure::engine(format!("TLS handshake failed: {}", e)))
    }
}

impl AdaptiveConnector<BoringEngine<TcpStream>> {
    /// Dial `host:port` over TCP for every attempt and handshake with the
    /// adaptive loop.
    pub async fn connect_tcp<C>(
        &self,
        spec: ClientHelloSpec,
        host: &str,
        port: u16,
        cancel: C,
    ) -> Result<SslStream<TcpStream>>
    where
        C: std::future::Future<Output = ()>,
    {
        let addr = format!("{}:{}", host, port);
        let addr = addr.as_str();
        self.connect_with(
            spec,
            host,
            move || async move {
                TcpStream::connect(addr)
                    .await
                    .map_err(|e| Error::connection(format!("Failed to connect to {}: {}", addr, e)))
            },
            cancel,
        )
        .await
    }
}
