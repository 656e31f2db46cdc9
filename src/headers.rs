//! Default header ordering and pseudo-header helpers.
//!
//! The order list mirrors what a Chrome navigation request emits. Names are
//! canonicalized the same way HTTP/1.1 stacks print them (`Sec-Ch-Ua`,
//! `User-Agent`); pseudo-headers are not tokens and keep their spelling.

/// Raw default header order, before canonicalization.
pub const DEFAULT_ORDER_HEADERS: &[&str] = &[
    ":method",
    ":authority",
    ":scheme",
    ":path",
    "Host",
    "Connection",
    "Content-Length",
    "pragma",
    "cache-control",
    "sec-ch-ua",
    "sec-ch-ua-mobile",
    "sec-ch-ua-platform",
    "upgrade-insecure-requests",
    "accept",
    "user-agent",
    "origin",
    "Referer",
    "sec-fetch-site",
    "sec-fetch-mode",
    "sec-fetch-user",
    "sec-fetch-dest",
    "accept-encoding",
    "accept-language",
    "Cookie",
];

/// HTTP/2 request pseudo-headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoHeader {
    Method,
    Authority,
    Scheme,
    Path,
}

impl PseudoHeader {
    /// Chrome's emission order.
    pub const DEFAULT_ORDER: [PseudoHeader; 4] =
        [Self::Method, Self::Authority, Self::Scheme, Self::Path];

    /// Header name including the leading colon.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Method => ":method",
            Self::Authority => ":authority",
            Self::Scheme => ":scheme",
            Self::Path => ":path",
        }
    }

    /// Single-letter code used in HTTP/2 fingerprint strings.
    pub fn letter(&self) -> char {
        match self {
            Self::Method => 'm',
            Self::Authority => 'a',
            Self::Scheme => 's',
            Self::Path => 'p',
        }
    }

    /// Inverse of [`PseudoHeader::letter`].
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "m" => Some(Self::Method),
            "a" => Some(Self::Authority),
            "s" => Some(Self::Scheme),
            "p" => Some(Self::Path),
            _ => None,
        }
    }

    /// Match a header name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::DEFAULT_ORDER
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Canonical MIME casing: first letter and every letter after `-` upper-case,
/// the rest lower-case. Names containing non-token bytes (pseudo-headers,
/// spaces) are returned unchanged.
pub fn canonical_header_key(key: &str) -> String {
    if key.is_empty() || !key.bytes().all(is_token_byte) {
        return key.to_string();
    }
    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// Default header order with canonical casing.
pub fn default_order_headers() -> Vec<String> {
    DEFAULT_ORDER_HEADERS
        .iter()
        .map(|key| canonical_header_key(key))
        .collect()
}

/// The pseudo-header prefix of the default order.
pub fn default_pseudo_header_order() -> Vec<String> {
    PseudoHeader::DEFAULT_ORDER
        .iter()
        .map(|p| p.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_header_key() {
        assert_eq!(canonical_header_key("sec-ch-ua-mobile"), "Sec-Ch-Ua-Mobile");
        assert_eq!(canonical_header_key("COOKIE"), "Cookie");
        assert_eq!(canonical_header_key(":method"), ":method");
        assert_eq!(canonical_header_key("bad header"), "bad header");
    }

    #[test]
    fn test_default_order_is_canonical() {
        let headers = default_order_headers();
        assert_eq!(headers.len(), DEFAULT_ORDER_HEADERS.len());
        assert_eq!(&headers[..4], &default_pseudo_header_order()[..]);
        assert!(headers.contains(&"Upgrade-Insecure-Requests".to_string()));
        assert_eq!(headers.last().map(String::as_str), Some("Cookie"));
    }

    #[test]
    fn test_pseudo_header_lookup() {
        assert_eq!(PseudoHeader::from_name(":AUTHORITY"), Some(PseudoHeader::Authority));
        assert_eq!(PseudoHeader::from_name("host"), None);
        assert_eq!(PseudoHeader::from_letter("p"), Some(PseudoHeader::Path));
        assert_eq!(PseudoHeader::from_letter("x"), None);
    }
}
