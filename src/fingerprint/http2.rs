//! HTTP/2 fingerprint: SETTINGS, connection window, priority and
//! pseudo-header order, plus the canonical text codec.
//!
//! ## Fingerprint format
//!
//! `settings|conn_flow|0|pseudo_headers`, e.g.
//! `1:65536,2:0,4:6291456,6:262144|15663105|0|m,a,s,p`.
//!
//! Settings are kept in stored order. The third field is reserved and always
//! `0`. Only the first four pseudo-headers of the header order are encoded
//! (`m`, `a`, `s`, `p`); regular headers are not represented, so callers that
//! need the full order must keep their own copy.

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::headers::{default_order_headers, PseudoHeader};

/// HTTP/2 connection preface (client must send this first).
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Initial connection-level flow control window (RFC 9113 Section 6.9.2).
pub const DEFAULT_CONNECTION_WINDOW: u32 = 65_535;

/// Chrome's connection WINDOW_UPDATE increment.
pub const CHROME_CONN_FLOW: u32 = 15_663_105;

/// Largest flow-control window HTTP/2 allows (2^31 - 1).
pub const MAX_WINDOW_SIZE: u32 = 0x7fff_ffff;

const FRAME_HEADER_SIZE: usize = 9;
const FRAME_TYPE_SETTINGS: u8 = 0x4;
const FRAME_TYPE_WINDOW_UPDATE: u8 = 0x8;
const MIN_MAX_FRAME_SIZE: u32 = 16_384;
const MAX_MAX_FRAME_SIZE: u32 = 16_777_215;

/// SETTINGS parameter identifier. Unknown ids are kept as-is so captured
/// fingerprints survive a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingId(pub u16);

impl SettingId {
    pub const HEADER_TABLE_SIZE: Self = Self(0x1);
    pub const ENABLE_PUSH: Self = Self(0x2);
    pub const MAX_CONCURRENT_STREAMS: Self = Self(0x3);
    pub const INITIAL_WINDOW_SIZE: Self = Self(0x4);
    pub const MAX_FRAME_SIZE: Self = Self(0x5);
    pub const MAX_HEADER_LIST_SIZE: Self = Self(0x6);
    pub const ENABLE_CONNECT_PROTOCOL: Self = Self(0x8);
    pub const NO_RFC7540_PRIORITIES: Self = Self(0x9);
}

/// One SETTINGS entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub id: SettingId,
    pub value: u32,
}

impl Setting {
    pub fn new(id: SettingId, value: u32) -> Self {
        Self { id, value }
    }
}

/// Stream priority sent with HEADERS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Priority {
    /// 31-bit stream dependency. Zero means none.
    pub stream_dep: u32,
    pub exclusive: bool,
    /// Zero-indexed weight (add one for the effective 1..=256 weight).
    pub weight: u8,
}

impl Priority {
    /// Whether any field differs from the zero value.
    pub fn is_set(&self) -> bool {
        self.stream_dep != 0 || self.exclusive || self.weight != 0
    }

    /// 5-byte priority block as carried in a HEADERS frame.
    pub fn encode(&self, buf: &mut BytesMut) {
        let mut dep = self.stream_dep & 0x7fff_ffff;
        if self.exclusive {
            dep |= 0x8000_0000;
        }
        buf.put_u32(dep);
        buf.put_u8(self.weight);
    }
}

/// HTTP/2 connection parameters used for fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Http2Spec {
    /// SETTINGS in wire order. Order matters for fingerprinting.
    pub settings: Vec<Setting>,
    /// Connection-level WINDOW_UPDATE increment sent after SETTINGS.
    pub conn_flow: u32,
    /// Full header order, pseudo-headers first.
    pub header_order: Vec<String>,
    pub priority: Priority,
}

impl Default for Http2Spec {
    fn default() -> Self {
        // Chrome defaults
        Self {
            settings: vec![
                Setting::new(SettingId::HEADER_TABLE_SIZE, 65536),
                Setting::new(SettingId::ENABLE_PUSH, 0),
                Setting::new(SettingId::MAX_CONCURRENT_STREAMS, 1000),
                Setting::new(SettingId::INITIAL_WINDOW_SIZE, 6291456),
                Setting::new(SettingId::MAX_HEADER_LIST_SIZE, 262144),
            ],
            conn_flow: CHROME_CONN_FLOW,
            header_order: default_order_headers(),
            priority: Priority {
                stream_dep: 0,
                exclusive: true,
                weight: 255,
            },
        }
    }
}

impl Http2Spec {
    /// Whether any field carries a value.
    pub fn is_set(&self) -> bool {
        !self.settings.is_empty()
            || self.conn_flow != 0
            || !self.header_order.is_empty()
            || self.priority.is_set()
    }

    /// Value of a setting, if present.
    pub fn setting(&self, id: SettingId) -> Option<u32> {
        self.settings.iter().find(|s| s.id == id).map(|s| s.value)
    }

    /// The first four pseudo-headers of the header order, case-insensitive.
    pub fn pseudo_header_order(&self) -> Vec<PseudoHeader> {
        self.header_order
            .iter()
            .filter_map(|name| PseudoHeader::from_name(name))
            .take(4)
            .collect()
    }

    /// Canonical fingerprint string. Same as `to_string()`.
    pub fn fingerprint(&self) -> String {
        self.to_string()
    }

    /// Parse a fingerprint string. Priority is not part of the encoding and
    /// comes back unset.
    pub fn from_fingerprint(s: &str) -> Result<Self> {
        s.parse()
    }

    /// Apply SETTINGS and the connection window to an `h2` client builder.
    /// Settings the `h2` crate cannot emit are skipped.
    pub fn configure(&self, builder: &mut h2::client::Builder) {
        for setting in &self.settings {
            match setting.id {
                SettingId::HEADER_TABLE_SIZE => {
                    builder.header_table_size(setting.value);
                }
                SettingId::ENABLE_PUSH => {
                    builder.enable_push(setting.value != 0);
                }
                SettingId::MAX_CONCURRENT_STREAMS => {
                    builder.max_concurrent_streams(setting.value);
                }
                SettingId::INITIAL_WINDOW_SIZE => {
                    builder.initial_window_size(setting.value);
                }
                SettingId::MAX_FRAME_SIZE => {
                    if (MIN_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&setting.value) {
                        builder.max_frame_size(setting.value);
                    } else {
                        warn!(value = setting.value, "ignoring out-of-range MAX_FRAME_SIZE");
                    }
                }
                SettingId::MAX_HEADER_LIST_SIZE => {
                    builder.max_header_list_size(setting.value);
                }
                other => trace!(id = other.0, "h2 builder has no knob for setting"),
            }
        }
        let increment = self.window_increment();
        if increment > 0 {
            builder.initial_connection_window_size(DEFAULT_CONNECTION_WINDOW + increment);
        }
    }

    /// Connection WINDOW_UPDATE increment actually sent. `conn_flow` is clamped
    /// so the resulting window stays within [`MAX_WINDOW_SIZE`].
    pub fn window_increment(&self) -> u32 {
        let limit = MAX_WINDOW_SIZE - DEFAULT_CONNECTION_WINDOW;
        if self.conn_flow > limit {
            warn!(
                conn_flow = self.conn_flow,
                limit, "connection flow exceeds the maximum HTTP/2 window, clamping"
            );
            return limit;
        }
        self.conn_flow
    }

    /// Client connection preface: magic, SETTINGS, then the connection
    /// WINDOW_UPDATE when the (clamped) `conn_flow` is non-zero.
    pub fn preface(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(
            CONNECTION_PREFACE.len() + 2 * FRAME_HEADER_SIZE + self.settings.len() * 6 + 4,
        );
        buf.put_slice(CONNECTION_PREFACE);

        put_frame_header(&mut buf, self.settings.len() * 6, FRAME_TYPE_SETTINGS, 0);
        for setting in &self.settings {
            buf.put_u16(setting.id.0);
            buf.put_u32(setting.value);
        }

        let increment = self.window_increment();
        if increment > 0 {
            put_frame_header(&mut buf, 4, FRAME_TYPE_WINDOW_UPDATE, 0);
            buf.put_u32(increment);
        }
        buf
    }
}

fn put_frame_header(buf: &mut BytesMut, length: usize, frame_type: u8, stream_id: u32) {
    buf.put_uint(length as u64, 3);
    buf.put_u8(frame_type);
    buf.put_u8(0);
    buf.put_u32(stream_id & 0x7fff_ffff);
}

impl fmt::Display for Http2Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self
            .settings
            .iter()
            .map(|s| format!("{}:{}", s.id.0, s.value))
            .collect::<Vec<_>>()
            .join(",");
        let letters = self
            .pseudo_header_order()
            .iter()
            .map(|p| p.letter().to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}|{}|0|{}", settings, self.conn_flow, letters)
    }
}

impl FromStr for Http2Spec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split('|').collect();
        if fields.len() != 4 {
            return Err(Error::format(format!(
                "h2 fingerprint needs 4 fields, got {}",
                fields.len()
            )));
        }

        let mut settings = Vec::new();
        if !fields[0].is_empty() {
            for token in fields[0].split(',') {
                let (id, value) = token
                    .split_once(':')
                    .filter(|(_, v)| !v.contains(':'))
                    .ok_or_else(|| Error::format(format!("h2 setting {:?} is not id:value", token)))?;
                let id = id
                    .parse::<u16>()
                    .map_err(|_| Error::format(format!("h2 setting id {:?} is not numeric", id)))?;
                let value = value.parse::<u32>().map_err(|_| {
                    Error::format(format!("h2 setting value {:?} is not numeric", value))
                })?;
                settings.push(Setting::new(SettingId(id), value));
            }
        }

        let conn_flow = fields[1].parse::<u32>().map_err(|_| {
            Error::format(format!("h2 connection flow {:?} is not numeric", fields[1]))
        })?;

        let header_order = fields[3]
            .split(',')
            .filter_map(PseudoHeader::from_letter)
            .map(|p| p.name().to_string())
            .collect();

        Ok(Self {
            settings,
            conn_flow,
            header_order,
            priority: Priority::default(),
        })
    }
}
