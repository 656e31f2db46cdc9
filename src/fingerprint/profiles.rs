//! Browser fingerprint profiles and the ClientHello builder.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use tracing::debug;

use super::capture::decode_client_hello;
use super::tls::{
    cert_compression, extension_id, group, tls_version, ClientHelloSpec, Extension, KeyShare,
};
use crate::error::{Error, Result};

/// GREASE placeholders. BoringSSL substitutes its own random GREASE values.
const GREASE: u16 = 0x0a0a;
const GREASE_ALT: u16 = 0x1a1a;

/// Browser fingerprint profile for impersonation.
///
/// Chrome and Firefox randomize TLS extension order, so their templates set
/// `permute_extensions`; the listed order is the one used for JA3 reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FingerprintProfile {
    /// Chrome 131 on macOS. Used as the auto profile.
    #[default]
    Chrome131,
    /// Firefox 133 on macOS.
    Firefox133,
    /// Safari 18 on macOS.
    Safari18,
    /// No fingerprinting - use default TLS settings
    None,
}

impl FingerprintProfile {
    /// Get the User-Agent string for this profile.
    pub fn user_agent(&self) -> &'static str {
        match self {
            Self::Chrome131 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
            }
            Self::Firefox133 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0"
            }
            Self::Safari18 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15"
            }
            Self::None => "mimic/0.1",
        }
    }

    /// ClientHello template, or `None` for [`FingerprintProfile::None`].
    pub fn client_hello(&self) -> Option<ClientHelloSpec> {
        match self {
            Self::Chrome131 => Some(chrome_131()),
            Self::Firefox133 => Some(firefox_133()),
            Self::Safari18 => Some(safari_18()),
            Self::None => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome131 => "chrome_131",
            Self::Firefox133 => "firefox_133",
            Self::Safari18 => "safari_18",
            Self::None => "none",
        }
    }
}

impl fmt::Display for FingerprintProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerprintProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chrome_auto" | "chrome131" | "chrome_131" => Ok(Self::Chrome131),
            "firefox" | "firefox_auto" | "firefox133" | "firefox_133" => Ok(Self::Firefox133),
            "safari" | "safari_auto" | "safari18" | "safari_18" => Ok(Self::Safari18),
            "none" => Ok(Self::None),
            other => Err(Error::input_kind(format!(
                "unknown fingerprint profile: {}",
                other
            ))),
        }
    }
}

fn opaque(id: u16, data: &'static [u8]) -> Extension {
    Extension::Opaque {
        id,
        data: Bytes::from_static(data),
    }
}

fn grease_share() -> KeyShare {
    KeyShare {
        group: GREASE,
        data: Bytes::from_static(&[0]),
    }
}

fn h2_alpn() -> Extension {
    Extension::Alpn(vec!["h2".to_string(), "http/1.1".to_string()])
}

const STATUS_REQUEST_OCSP: &[u8] = &[1, 0, 0, 0, 0];
const RENEGOTIATION_EMPTY: &[u8] = &[0];
const PSK_DHE_KE: &[u8] = &[1, 1];

fn chrome_131() -> ClientHelloSpec {
    let mut spec = ClientHelloSpec::new();
    spec.cipher_suites = vec![
        GREASE, 0x1301, 0x1302, 0x1303, 0xc02b, 0xc02f, 0xc02c, 0xc030, 0xcca9, 0xcca8, 0xc013,
        0xc014, 0x009c, 0x009d, 0x002f, 0x0035,
    ];
    spec.extensions = vec![
        Extension::empty(GREASE),
        Extension::ServerName,
        Extension::empty(extension_id::EXTENDED_MASTER_SECRET),
        opaque(extension_id::RENEGOTIATION_INFO, RENEGOTIATION_EMPTY),
        Extension::SupportedGroups(vec![
            GREASE,
            group::X25519,
            group::SECP256R1,
            group::SECP384R1,
        ]),
        Extension::PointFormats(vec![0]),
        Extension::empty(extension_id::SESSION_TICKET),
        h2_alpn(),
        opaque(extension_id::STATUS_REQUEST, STATUS_REQUEST_OCSP),
        Extension::SignatureAlgorithms(vec![
            0x0403, 0x0804, 0x0401, 0x0503, 0x0805, 0x0501, 0x0806, 0x0601,
        ]),
        Extension::empty(extension_id::SIGNED_CERTIFICATE_TIMESTAMP),
        Extension::KeyShare(vec![grease_share(), KeyShare::new(group::X25519)]),
        opaque(extension_id::PSK_KEY_EXCHANGE_MODES, PSK_DHE_KE),
        Extension::SupportedVersions(vec![GREASE, tls_version::TLS1_3, tls_version::TLS1_2]),
        Extension::CompressCertificate(vec![cert_compression::BROTLI]),
        Extension::empty(GREASE_ALT),
        Extension::empty(extension_id::PADDING),
    ];
    spec.permute_extensions = true;
    spec
}

fn firefox_133() -> ClientHelloSpec {
    let mut spec = ClientHelloSpec::new();
    spec.cipher_suites = vec![
        0x1301, 0x1303, 0x1302, 0xc02b, 0xc02f, 0xcca9, 0xcca8, 0xc02c, 0xc030, 0xc00a, 0xc009,
        0xc013, 0xc014, 0x009c, 0x009d, 0x002f, 0x0035,
    ];
    spec.extensions = vec![
        Extension::ServerName,
        Extension::empty(extension_id::EXTENDED_MASTER_SECRET),
        opaque(extension_id::RENEGOTIATION_INFO, RENEGOTIATION_EMPTY),
        Extension::SupportedGroups(vec![
            group::X25519_MLKEM768,
            group::X25519,
            group::SECP256R1,
            group::SECP384R1,
            group::SECP521R1,
            group::FFDHE2048,
            group::FFDHE3072,
        ]),
        Extension::PointFormats(vec![0]),
        Extension::empty(extension_id::SESSION_TICKET),
        h2_alpn(),
        opaque(extension_id::STATUS_REQUEST, STATUS_REQUEST_OCSP),
        Extension::KeyShare(vec![
            KeyShare::new(group::X25519_MLKEM768),
            KeyShare::new(group::X25519),
            KeyShare::new(group::SECP256R1),
        ]),
        Extension::SupportedVersions(vec![tls_version::TLS1_3, tls_version::TLS1_2]),
        Extension::SignatureAlgorithms(vec![
            0x0403, 0x0503, 0x0603, 0x0804, 0x0805, 0x0806, 0x0401, 0x0501, 0x0601, 0x0203,
            0x0201,
        ]),
        opaque(extension_id::PSK_KEY_EXCHANGE_MODES, PSK_DHE_KE),
        opaque(extension_id::RECORD_SIZE_LIMIT, &[0x40, 0x01]),
        Extension::CompressCertificate(vec![
            cert_compression::ZLIB,
            cert_compression::BROTLI,
            cert_compression::ZSTD,
        ]),
    ];
    spec.permute_extensions = true;
    spec
}

fn safari_18() -> ClientHelloSpec {
    let mut spec = ClientHelloSpec::new();
    spec.cipher_suites = vec![
        GREASE, 0x1301, 0x1302, 0x1303, 0xc02c, 0xc02b, 0xcca9, 0xc030, 0xc02f, 0xcca8, 0xc00a,
        0xc009, 0xc014, 0xc013, 0x009d, 0x009c, 0x0035, 0x002f, 0xc008, 0xc012, 0x000a,
    ];
    spec.extensions = vec![
        Extension::empty(GREASE),
        Extension::ServerName,
        Extension::empty(extension_id::EXTENDED_MASTER_SECRET),
        opaque(extension_id::RENEGOTIATION_INFO, RENEGOTIATION_EMPTY),
        Extension::SupportedGroups(vec![
            GREASE,
            group::X25519,
            group::SECP256R1,
            group::SECP384R1,
            group::SECP521R1,
        ]),
        Extension::PointFormats(vec![0]),
        h2_alpn(),
        opaque(extension_id::STATUS_REQUEST, STATUS_REQUEST_OCSP),
        Extension::SignatureAlgorithms(vec![
            0x0403, 0x0804, 0x0401, 0x0503, 0x0203, 0x0805, 0x0501, 0x0806, 0x0601, 0x0201,
        ]),
        Extension::empty(extension_id::SIGNED_CERTIFICATE_TIMESTAMP),
        Extension::KeyShare(vec![grease_share(), KeyShare::new(group::X25519)]),
        opaque(extension_id::PSK_KEY_EXCHANGE_MODES, PSK_DHE_KE),
        Extension::SupportedVersions(vec![
            GREASE,
            tls_version::TLS1_3,
            tls_version::TLS1_2,
            tls_version::TLS1_1,
            tls_version::TLS1_0,
        ]),
        Extension::CompressCertificate(vec![cert_compression::ZLIB]),
        Extension::empty(GREASE_ALT),
        Extension::empty(extension_id::PADDING),
    ];
    spec
}

/// Source of a ClientHello template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelloInput {
    /// Built-in preset.
    Preset(FingerprintProfile),
    /// Captured ClientHello bytes (TLS record or handshake message).
    Raw(Bytes),
    /// Hex encoding of a captured ClientHello.
    Hex(String),
}

impl From<FingerprintProfile> for HelloInput {
    fn from(profile: FingerprintProfile) -> Self {
        Self::Preset(profile)
    }
}

impl From<Bytes> for HelloInput {
    fn from(raw: Bytes) -> Self {
        Self::Raw(raw)
    }
}

impl From<Vec<u8>> for HelloInput {
    fn from(raw: Vec<u8>) -> Self {
        Self::Raw(raw.into())
    }
}

impl From<&[u8]> for HelloInput {
    fn from(raw: &[u8]) -> Self {
        Self::Raw(Bytes::copy_from_slice(raw))
    }
}

impl From<&str> for HelloInput {
    fn from(hex: &str) -> Self {
        Self::Hex(hex.to_string())
    }
}

impl From<String> for HelloInput {
    fn from(hex: String) -> Self {
        Self::Hex(hex)
    }
}

impl ClientHelloSpec {
    /// Build a spec from a preset or a captured ClientHello.
    ///
    /// [`FingerprintProfile::None`] carries no template and is rejected with
    /// [`Error::InputKind`].
    pub fn from_input(input: impl Into<HelloInput>) -> Result<Self> {
        match input.into() {
            HelloInput::Preset(profile) => profile.client_hello().ok_or_else(|| {
                Error::input_kind(format!("profile {} has no ClientHello template", profile))
            }),
            HelloInput::Raw(raw) => Self::from_capture(&raw),
            HelloInput::Hex(text) => {
                let raw = hex::decode(text.trim())?;
                Self::from_capture(&raw)
            }
        }
    }

    fn from_capture(raw: &[u8]) -> Result<Self> {
        let spec = decode_client_hello(raw)?.into_spec()?;
        debug!(
            ciphers = spec.cipher_suites.len(),
            extensions = spec.extensions.len(),
            "built ClientHello spec from capture"
        );
        Ok(spec)
    }
}
