//! HTTP version configuration.

/// ALPN identifier for HTTP/3.
pub const ALPN_H3: &str = "h3";
/// ALPN identifier for HTTP/2.
pub const ALPN_H2: &str = "h2";
/// ALPN identifier for HTTP/1.1.
pub const ALPN_HTTP1: &str = "http/1.1";

/// HTTP version preference. Decides how the ALPN extension of a
/// ClientHello template is rewritten before the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    /// Force HTTP/1.1.
    Http1_1,
    /// HTTP/2 with HTTP/1.1 fallback. ALPN is left as the template has it.
    #[default]
    Http2,
    /// HTTP/3.
    Http3,
    /// HTTP/3 only, no fallback.
    Http3Only,
    /// Let the template decide.
    Auto,
}

/// How a protocol mode rewrites an ALPN list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlpnRewrite {
    /// Leave the list untouched.
    Keep,
    /// Drop `h2`, put `http/1.1` first.
    Http1Only,
    /// Replace the list with `h3`.
    Http3,
}

impl HttpVersion {
    /// Get human-readable version string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http1_1 => "HTTP/1.1",
            Self::Http2 => "HTTP/2",
            Self::Http3 => "HTTP/3",
            Self::Http3Only => "HTTP/3 (no fallback)",
            Self::Auto => "Auto",
        }
    }

    /// ALPN rewrite applied for this version.
    pub fn alpn_rewrite(&self) -> AlpnRewrite {
        match self {
            Self::Http1_1 => AlpnRewrite::Http1Only,
            Self::Http3 | Self::Http3Only => AlpnRewrite::Http3,
            Self::Http2 | Self::Auto => AlpnRewrite::Keep,
        }
    }

    /// Whether this version runs over QUIC.
    pub fn is_quic(&self) -> bool {
        matches!(self, Self::Http3 | Self::Http3Only)
    }
}
