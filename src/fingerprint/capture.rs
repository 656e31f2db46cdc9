//! Captured ClientHello decoding.
//!
//! Accepts a full TLS record (`0x16 ...`), a bare handshake message
//! (`0x01 ...`), and splits it into cipher suites, compression methods and
//! raw extension bodies. Extension bodies are interpreted by
//! [`Extension::decode`].

use bytes::{Buf, Bytes};

use super::tls::{take_u16_prefixed, ClientHelloSpec, Extension};
use crate::error::{Error, Result};

const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;
const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;

/// Structured view of a captured ClientHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedHello {
    pub legacy_version: u16,
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    /// `(type, body)` in wire order.
    pub extensions: Vec<(u16, Bytes)>,
}

impl CapturedHello {
    /// Map the capture 1:1 onto a [`ClientHelloSpec`].
    pub fn into_spec(self) -> Result<ClientHelloSpec> {
        let mut spec = ClientHelloSpec::new();
        spec.legacy_version = self.legacy_version;
        spec.cipher_suites = self.cipher_suites;
        spec.compression_methods = self.compression_methods;
        spec.extensions = self
            .extensions
            .into_iter()
            .map(|(id, body)| Extension::decode(id, body))
            .collect::<Result<Vec<_>>>()?;
        Ok(spec)
    }
}

/// Decode a captured ClientHello.
pub fn decode_client_hello(raw: &[u8]) -> Result<CapturedHello> {
    let mut buf = Bytes::copy_from_slice(raw);

    match buf.first().copied() {
        Some(CONTENT_TYPE_HANDSHAKE) => {
            if buf.remaining() < 5 {
                return Err(Error::client_hello("record header truncated"));
            }
            buf.advance(3);
            let len = buf.get_u16() as usize;
            if buf.remaining() < len {
                return Err(Error::client_hello("record body truncated"));
            }
            buf.truncate(len);
        }
        Some(HANDSHAKE_CLIENT_HELLO) => {}
        Some(other) => {
            return Err(Error::client_hello(format!(
                "expected handshake record or ClientHello, got type {:#04x}",
                other
            )))
        }
        None => return Err(Error::client_hello("empty capture")),
    }

    if buf.remaining() < 4 {
        return Err(Error::client_hello("handshake header truncated"));
    }
    let msg_type = buf.get_u8();
    if msg_type != HANDSHAKE_CLIENT_HELLO {
        return Err(Error::client_hello(format!(
            "handshake type {} is not ClientHello",
            msg_type
        )));
    }
    let len = ((buf.get_u8() as usize) << 16) | (buf.get_u16() as usize);
    if buf.remaining() < len {
        return Err(Error::client_hello("ClientHello body truncated"));
    }
    buf.truncate(len);

    // legacy_version + random
    if buf.remaining() < 2 + 32 + 1 {
        return Err(Error::client_hello("ClientHello too short"));
    }
    let legacy_version = buf.get_u16();
    buf.advance(32);

    let session_len = buf.get_u8() as usize;
    if buf.remaining() < session_len {
        return Err(Error::client_hello("session id truncated"));
    }
    buf.advance(session_len);

    let mut suites = take_u16_prefixed(&mut buf, "cipher_suites")?;
    if suites.remaining() % 2 != 0 {
        return Err(Error::client_hello("cipher_suites has odd length"));
    }
    let mut cipher_suites = Vec::with_capacity(suites.remaining() / 2);
    while suites.has_remaining() {
        cipher_suites.push(suites.get_u16());
    }

    if buf.remaining() < 1 {
        return Err(Error::client_hello("compression methods missing"));
    }
    let comp_len = buf.get_u8() as usize;
    if buf.remaining() < comp_len {
        return Err(Error::client_hello("compression methods truncated"));
    }
    let compression_methods = buf.split_to(comp_len).to_vec();

    let mut extensions = Vec::new();
    if buf.has_remaining() {
        let mut block = take_u16_prefixed(&mut buf, "extensions")?;
        while block.has_remaining() {
            if block.remaining() < 2 {
                return Err(Error::client_hello("extension header truncated"));
            }
            let id = block.get_u16();
            let body = take_u16_prefixed(&mut block, "extension")?;
            extensions.push((id, body));
        }
    }

    Ok(CapturedHello {
        legacy_version,
        cipher_suites,
        compression_methods,
        extensions,
    })
}
