//! TLS fingerprint: the ClientHello parameters handed to the handshake engine.
//!
//! A [`ClientHelloSpec`] is built once per connection attempt (from a preset or
//! a captured ClientHello) and may be mutated in place between retries. Only
//! the group-bearing extensions are ever pruned; everything else is carried
//! through exactly as captured.

use std::collections::BTreeSet;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::version::{AlpnRewrite, HttpVersion, ALPN_H2, ALPN_H3, ALPN_HTTP1};

/// TLS extension type codes.
pub mod extension_id {
    pub const SERVER_NAME: u16 = 0;
    pub const STATUS_REQUEST: u16 = 5;
    pub const SUPPORTED_GROUPS: u16 = 10;
    pub const EC_POINT_FORMATS: u16 = 11;
    pub const SIGNATURE_ALGORITHMS: u16 = 13;
    pub const ALPN: u16 = 16;
    pub const SIGNED_CERTIFICATE_TIMESTAMP: u16 = 18;
    pub const PADDING: u16 = 21;
    pub const EXTENDED_MASTER_SECRET: u16 = 23;
    pub const COMPRESS_CERTIFICATE: u16 = 27;
    pub const RECORD_SIZE_LIMIT: u16 = 28;
    pub const SESSION_TICKET: u16 = 35;
    pub const SUPPORTED_VERSIONS: u16 = 43;
    pub const PSK_KEY_EXCHANGE_MODES: u16 = 45;
    pub const KEY_SHARE: u16 = 51;
    pub const APPLICATION_SETTINGS: u16 = 17513;
    pub const RENEGOTIATION_INFO: u16 = 65281;
}

/// Named group (curve) codes.
pub mod group {
    pub const SECP256R1: u16 = 23;
    pub const SECP384R1: u16 = 24;
    pub const SECP521R1: u16 = 25;
    pub const X25519: u16 = 29;
    pub const FFDHE2048: u16 = 256;
    pub const FFDHE3072: u16 = 257;
    pub const X25519_MLKEM768: u16 = 4588;
    pub const X25519_KYBER768_DRAFT00: u16 = 25497;
}

/// Protocol version codes.
pub mod tls_version {
    pub const TLS1_0: u16 = 0x0301;
    pub const TLS1_1: u16 = 0x0302;
    pub const TLS1_2: u16 = 0x0303;
    pub const TLS1_3: u16 = 0x0304;
}

/// Certificate compression algorithm codes (RFC 8879).
pub mod cert_compression {
    pub const ZLIB: u16 = 1;
    pub const BROTLI: u16 = 2;
    pub const ZSTD: u16 = 3;
}

/// Whether a 16-bit codepoint is a GREASE value (RFC 8701).
pub fn is_grease(value: u16) -> bool {
    value & 0x0f0f == 0x0a0a && (value >> 8) == (value & 0xff)
}

/// Derives a 32-byte session id from the serialized parameters.
pub type SessionIdFn = fn(&[u8]) -> [u8; 32];

/// Default session id derivation: SHA-256.
pub fn sha256_session_id(data: &[u8]) -> [u8; 32] {
    boring::sha::sha256(data)
}

/// One entry of the key_share extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShare {
    pub group: u16,
    /// Key exchange payload. Empty for templates; the engine generates keys.
    pub data: Bytes,
}

impl KeyShare {
    pub fn new(group: u16) -> Self {
        Self {
            group,
            data: Bytes::new(),
        }
    }
}

/// ClientHello extension.
///
/// Closed over the kinds this crate needs to inspect or rewrite; any other
/// extension is kept verbatim as [`Extension::Opaque`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    /// server_name. The host is filled in by the engine at handshake time.
    ServerName,
    SupportedGroups(Vec<u16>),
    KeyShare(Vec<KeyShare>),
    Alpn(Vec<String>),
    SupportedVersions(Vec<u16>),
    SignatureAlgorithms(Vec<u16>),
    PointFormats(Vec<u8>),
    CompressCertificate(Vec<u16>),
    Opaque { id: u16, data: Bytes },
}

impl Extension {
    /// Extension type code.
    pub fn id(&self) -> u16 {
        match self {
            Self::ServerName => extension_id::SERVER_NAME,
            Self::SupportedGroups(_) => extension_id::SUPPORTED_GROUPS,
            Self::KeyShare(_) => extension_id::KEY_SHARE,
            Self::Alpn(_) => extension_id::ALPN,
            Self::SupportedVersions(_) => extension_id::SUPPORTED_VERSIONS,
            Self::SignatureAlgorithms(_) => extension_id::SIGNATURE_ALGORITHMS,
            Self::PointFormats(_) => extension_id::EC_POINT_FORMATS,
            Self::CompressCertificate(_) => extension_id::COMPRESS_CERTIFICATE,
            Self::Opaque { id, .. } => *id,
        }
    }

    /// Shorthand for an empty-bodied extension such as extended_master_secret.
    pub fn empty(id: u16) -> Self {
        Self::Opaque {
            id,
            data: Bytes::new(),
        }
    }

    /// Decode a client-side extension body.
    pub fn decode(id: u16, data: Bytes) -> Result<Self> {
        let mut buf = data.clone();
        let ext = match id {
            extension_id::SERVER_NAME => Self::ServerName,
            extension_id::SUPPORTED_GROUPS => {
                let mut list = take_u16_prefixed(&mut buf, "supported_groups")?;
                Self::SupportedGroups(take_u16_list(&mut list, "supported_groups")?)
            }
            extension_id::KEY_SHARE => {
                let mut list = take_u16_prefixed(&mut buf, "key_share")?;
                let mut shares = Vec::new();
                while list.has_remaining() {
                    if list.remaining() < 2 {
                        return Err(Error::client_hello("key_share entry truncated"));
                    }
                    let group = list.get_u16();
                    let data = take_u16_prefixed(&mut list, "key_share")?;
                    shares.push(KeyShare { group, data });
                }
                Self::KeyShare(shares)
            }
            extension_id::ALPN => {
                let mut list = take_u16_prefixed(&mut buf, "alpn")?;
                let mut protocols = Vec::new();
                while list.has_remaining() {
                    let proto = take_u8_prefixed(&mut list, "alpn")?;
                    let proto = String::from_utf8(proto.to_vec())
                        .map_err(|_| Error::client_hello("alpn protocol is not UTF-8"))?;
                    protocols.push(proto);
                }
                Self::Alpn(protocols)
            }
            extension_id::SUPPORTED_VERSIONS => {
                let mut list = take_u8_prefixed(&mut buf, "supported_versions")?;
                Self::SupportedVersions(take_u16_list(&mut list, "supported_versions")?)
            }
            extension_id::SIGNATURE_ALGORITHMS => {
                let mut list = take_u16_prefixed(&mut buf, "signature_algorithms")?;
                Self::SignatureAlgorithms(take_u16_list(&mut list, "signature_algorithms")?)
            }
            extension_id::EC_POINT_FORMATS => {
                let list = take_u8_prefixed(&mut buf, "ec_point_formats")?;
                Self::PointFormats(list.to_vec())
            }
            extension_id::COMPRESS_CERTIFICATE => {
                let mut list = take_u8_prefixed(&mut buf, "compress_certificate")?;
                Self::CompressCertificate(take_u16_list(&mut list, "compress_certificate")?)
            }
            _ => return Ok(Self::Opaque { id, data }),
        };
        Ok(ext)
    }

    /// Serialize the extension body (without the type/length header).
    pub fn encode_payload(&self, buf: &mut BytesMut) {
        match self {
            Self::ServerName => {}
            Self::SupportedGroups(groups) => {
                buf.put_u16((groups.len() * 2) as u16);
                groups.iter().for_each(|g| buf.put_u16(*g));
            }
            Self::KeyShare(shares) => {
                let len: usize = shares.iter().map(|s| 4 + s.data.len()).sum();
                buf.put_u16(len as u16);
                for share in shares {
                    buf.put_u16(share.group);
                    buf.put_u16(share.data.len() as u16);
                    buf.put_slice(&share.data);
                }
            }
            Self::Alpn(protocols) => {
                let len: usize = protocols.iter().map(|p| 1 + p.len()).sum();
                buf.put_u16(len as u16);
                for proto in protocols {
                    buf.put_u8(proto.len() as u8);
                    buf.put_slice(proto.as_bytes());
                }
            }
            Self::SupportedVersions(versions) => {
                buf.put_u8((versions.len() * 2) as u8);
                versions.iter().for_each(|v| buf.put_u16(*v));
            }
            Self::SignatureAlgorithms(algs) => {
                buf.put_u16((algs.len() * 2) as u16);
                algs.iter().for_each(|a| buf.put_u16(*a));
            }
            Self::PointFormats(formats) => {
                buf.put_u8(formats.len() as u8);
                buf.put_slice(formats);
            }
            Self::CompressCertificate(algs) => {
                buf.put_u8((algs.len() * 2) as u8);
                algs.iter().for_each(|a| buf.put_u16(*a));
            }
            Self::Opaque { data, .. } => buf.put_slice(data),
        }
    }
}

fn take_u8_prefixed(buf: &mut Bytes, what: &str) -> Result<Bytes> {
    if buf.remaining() < 1 {
        return Err(Error::client_hello(format!("{} length missing", what)));
    }
    let len = buf.get_u8() as usize;
    if buf.remaining() < len {
        return Err(Error::client_hello(format!("{} body truncated", what)));
    }
    Ok(buf.split_to(len))
}

pub(crate) fn take_u16_prefixed(buf: &mut Bytes, what: &str) -> Result<Bytes> {
    if buf.remaining() < 2 {
        return Err(Error::client_hello(format!("{} length missing", what)));
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(Error::client_hello(format!("{} body truncated", what)));
    }
    Ok(buf.split_to(len))
}

fn take_u16_list(buf: &mut Bytes, what: &str) -> Result<Vec<u16>> {
    if buf.remaining() % 2 != 0 {
        return Err(Error::client_hello(format!("{} has odd length", what)));
    }
    let mut out = Vec::with_capacity(buf.remaining() / 2);
    while buf.has_remaining() {
        out.push(buf.get_u16());
    }
    Ok(out)
}

/// Desired ClientHello parameters.
#[derive(Debug, Clone)]
pub struct ClientHelloSpec {
    /// legacy_version field of the ClientHello body.
    pub legacy_version: u16,
    /// Cipher suites in order.
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    /// Extensions in wire order.
    pub extensions: Vec<Extension>,
    /// Session id derivation. Fixed so the same parameters always yield the same id.
    pub session_id_fn: SessionIdFn,
    /// Let the engine shuffle extension order (Chrome 110+ behavior).
    pub permute_extensions: bool,
}

impl ClientHelloSpec {
    /// Empty spec with TLS 1.2 legacy version and null compression.
    pub fn new() -> Self {
        Self {
            legacy_version: tls_version::TLS1_2,
            cipher_suites: Vec::new(),
            compression_methods: vec![0],
            extensions: Vec::new(),
            session_id_fn: sha256_session_id,
            permute_extensions: false,
        }
    }

    /// Extension ids in wire order.
    pub fn extension_ids(&self) -> Vec<u16> {
        self.extensions.iter().map(Extension::id).collect()
    }

    pub fn extension(&self, id: u16) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.id() == id)
    }

    /// ALPN protocol list, if the template carries the extension.
    pub fn alpn_protocols(&self) -> Option<&[String]> {
        self.extensions.iter().find_map(|e| match e {
            Extension::Alpn(protocols) => Some(protocols.as_slice()),
            _ => None,
        })
    }

    pub fn supported_groups(&self) -> Option<&[u16]> {
        self.extensions.iter().find_map(|e| match e {
            Extension::SupportedGroups(groups) => Some(groups.as_slice()),
            _ => None,
        })
    }

    pub fn key_share_groups(&self) -> Option<Vec<u16>> {
        self.extensions.iter().find_map(|e| match e {
            Extension::KeyShare(shares) => Some(shares.iter().map(|s| s.group).collect()),
            _ => None,
        })
    }

    pub fn supported_versions(&self) -> Option<&[u16]> {
        self.extensions.iter().find_map(|e| match e {
            Extension::SupportedVersions(versions) => Some(versions.as_slice()),
            _ => None,
        })
    }

    pub fn signature_algorithms(&self) -> Option<&[u16]> {
        self.extensions.iter().find_map(|e| match e {
            Extension::SignatureAlgorithms(algs) => Some(algs.as_slice()),
            _ => None,
        })
    }

    /// Whether any cipher, extension or group slot holds a GREASE value.
    pub fn has_grease(&self) -> bool {
        self.cipher_suites.iter().any(|c| is_grease(*c))
            || self.extensions.iter().any(|e| is_grease(e.id()))
            || self
                .supported_groups()
                .is_some_and(|groups| groups.iter().any(|g| is_grease(*g)))
    }

    /// Rewrite the ALPN extension for the target protocol. A template without
    /// ALPN is left alone.
    pub fn apply_http_version(&mut self, version: HttpVersion) {
        let rewrite = version.alpn_rewrite();
        if rewrite == AlpnRewrite::Keep {
            return;
        }
        let Some(protocols) = self.extensions.iter_mut().find_map(|e| match e {
            Extension::Alpn(protocols) => Some(protocols),
            _ => None,
        }) else {
            return;
        };
        match rewrite {
            AlpnRewrite::Http3 => *protocols = vec![ALPN_H3.to_string()],
            AlpnRewrite::Http1Only => {
                protocols.retain(|p| p != ALPN_H2 && p != ALPN_HTTP1);
                protocols.insert(0, ALPN_HTTP1.to_string());
            }
            AlpnRewrite::Keep => {}
        }
    }

    /// Remove every key share and supported group whose id is in `rejected`.
    /// Both lists are pruned together so the hello stays self-consistent.
    /// Returns whether anything was removed.
    pub fn prune_groups(&mut self, rejected: &BTreeSet<u16>) -> bool {
        if rejected.is_empty() {
            return false;
        }
        let mut changed = false;
        for ext in &mut self.extensions {
            match ext {
                Extension::KeyShare(shares) => {
                    let before = shares.len();
                    shares.retain(|s| !rejected.contains(&s.group));
                    changed |= shares.len() != before;
                }
                Extension::SupportedGroups(groups) => {
                    let before = groups.len();
                    groups.retain(|g| !rejected.contains(g));
                    changed |= groups.len() != before;
                }
                _ => {}
            }
        }
        changed
    }

    /// Canonical serialization of the parameters (not a wire ClientHello:
    /// random, session id and host name are excluded).
    pub fn to_canonical_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u16(self.legacy_version);
        buf.put_u16((self.cipher_suites.len() * 2) as u16);
        self.cipher_suites.iter().for_each(|c| buf.put_u16(*c));
        buf.put_u8(self.compression_methods.len() as u8);
        buf.put_slice(&self.compression_methods);
        for ext in &self.extensions {
            let mut body = BytesMut::new();
            ext.encode_payload(&mut body);
            buf.put_u16(ext.id());
            buf.put_u16(body.len() as u16);
            buf.put_slice(&body);
        }
        buf.freeze()
    }

    /// Session id derived from the parameters. Stable across attempts.
    pub fn session_id(&self) -> [u8; 32] {
        (self.session_id_fn)(&self.to_canonical_bytes())
    }

    /// JA3 text (`version,ciphers,extensions,groups,point_formats`), GREASE removed.
    pub fn ja3(&self) -> String {
        fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
            items.map(|i| i.to_string()).collect::<Vec<_>>().join("-")
        }
        let ciphers = join(self.cipher_suites.iter().filter(|c| !is_grease(**c)));
        let extensions = join(
            self.extensions
                .iter()
                .map(Extension::id)
                .filter(|id| !is_grease(*id)),
        );
        let groups = join(
            self.supported_groups()
                .unwrap_or_default()
                .iter()
                .filter(|g| !is_grease(**g)),
        );
        let formats = self
            .extensions
            .iter()
            .find_map(|e| match e {
                Extension::PointFormats(f) => Some(join(f.iter())),
                _ => None,
            })
            .unwrap_or_default();
        format!(
            "{},{},{},{},{}",
            self.legacy_version, ciphers, extensions, groups, formats
        )
    }
}

impl Default for ClientHelloSpec {
    /// Chrome auto profile.
    fn default() -> Self {
        super::profiles::FingerprintProfile::default()
            .client_hello()
            .unwrap_or_else(Self::new)
    }
}
