//! QUIC transport-parameter profiles.
//!
//! Unlike TLS there is no rejection feedback at this layer, so selection is a
//! static table lookup.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// QUIC profile identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuicId {
    Chrome115,
    Firefox116,
}

impl QuicId {
    /// Profile used when impersonation is simply switched on.
    pub const DEFAULT: Self = Self::Firefox116;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome115 => "chrome_115",
            Self::Firefox116 => "firefox_116",
        }
    }

    /// Transport parameter table for this id.
    pub fn parameters(&self) -> QuicParameters {
        match self {
            Self::Chrome115 => QuicParameters {
                max_idle_timeout_ms: 30_000,
                max_udp_payload_size: 1472,
                initial_max_data: 15_728_640,
                initial_max_stream_data_bidi_local: 6_291_456,
                initial_max_stream_data_bidi_remote: 6_291_456,
                initial_max_stream_data_uni: 6_291_456,
                initial_max_streams_bidi: 100,
                initial_max_streams_uni: 103,
                ack_delay_exponent: 3,
                max_ack_delay_ms: 25,
                active_connection_id_limit: 2,
                disable_active_migration: true,
                grease: true,
            },
            Self::Firefox116 => QuicParameters {
                max_idle_timeout_ms: 30_000,
                max_udp_payload_size: 1472,
                initial_max_data: 25_165_824,
                initial_max_stream_data_bidi_local: 12_582_912,
                initial_max_stream_data_bidi_remote: 1_048_576,
                initial_max_stream_data_uni: 1_048_576,
                initial_max_streams_bidi: 16,
                initial_max_streams_uni: 16,
                ack_delay_exponent: 3,
                max_ack_delay_ms: 20,
                active_connection_id_limit: 8,
                disable_active_migration: false,
                grease: false,
            },
        }
    }
}

impl fmt::Display for QuicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuicId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chrome115" | "chrome_115" => Ok(Self::Chrome115),
            "firefox" | "firefox116" | "firefox_116" => Ok(Self::Firefox116),
            other => Err(Error::input_kind(format!("unknown QUIC profile: {}", other))),
        }
    }
}

/// Client transport parameters advertised during the QUIC handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuicParameters {
    pub max_idle_timeout_ms: u64,
    pub max_udp_payload_size: usize,
    pub initial_max_data: u64,
    pub initial_max_stream_data_bidi_local: u64,
    pub initial_max_stream_data_bidi_remote: u64,
    pub initial_max_stream_data_uni: u64,
    pub initial_max_streams_bidi: u64,
    pub initial_max_streams_uni: u64,
    pub ack_delay_exponent: u64,
    pub max_ack_delay_ms: u64,
    pub active_connection_id_limit: u64,
    pub disable_active_migration: bool,
    pub grease: bool,
}

/// Resolved QUIC profile. `Empty` means no impersonation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuicProfile {
    #[default]
    Empty,
    Profile {
        id: QuicId,
        parameters: QuicParameters,
    },
}

/// Accepted selector inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuicSelector {
    /// `true` picks [`QuicId::DEFAULT`], `false` the empty profile.
    Enabled(bool),
    Id(QuicId),
    /// Profile name, resolved through [`QuicId::from_str`].
    Named(String),
    Profile(QuicProfile),
}

impl From<bool> for QuicSelector {
    fn from(enabled: bool) -> Self {
        Self::Enabled(enabled)
    }
}

impl From<QuicId> for QuicSelector {
    fn from(id: QuicId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for QuicSelector {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for QuicSelector {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<QuicProfile> for QuicSelector {
    fn from(profile: QuicProfile) -> Self {
        Self::Profile(profile)
    }
}

impl QuicProfile {
    /// Table lookup for a known id.
    pub fn from_id(id: QuicId) -> Self {
        Self::Profile {
            id,
            parameters: id.parameters(),
        }
    }

    /// Resolve a selector to a concrete profile. Unknown names fail with
    /// [`Error::InputKind`].
    pub fn resolve(selector: impl Into<QuicSelector>) -> Result<Self> {
        match selector.into() {
            QuicSelector::Enabled(true) => Ok(Self::from_id(QuicId::DEFAULT)),
            QuicSelector::Enabled(false) => Ok(Self::Empty),
            QuicSelector::Id(id) => Ok(Self::from_id(id)),
            QuicSelector::Named(name) => Ok(Self::from_id(name.parse()?)),
            QuicSelector::Profile(profile) => Ok(profile),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn id(&self) -> Option<QuicId> {
        match self {
            Self::Empty => None,
            Self::Profile { id, .. } => Some(*id),
        }
    }

    pub fn parameters(&self) -> Option<&QuicParameters> {
        match self {
            Self::Empty => None,
            Self::Profile { parameters, .. } => Some(parameters),
        }
    }

    /// Write the profile's transport parameters into a quiche config.
    /// The empty profile leaves the config untouched.
    pub fn apply(&self, config: &mut quiche::Config) {
        let Some(p) = self.parameters() else {
            return;
        };
        config.set_max_idle_timeout(p.max_idle_timeout_ms);
        config.set_max_recv_udp_payload_size(p.max_udp_payload_size);
        config.set_max_send_udp_payload_size(p.max_udp_payload_size);
        config.set_initial_max_data(p.initial_max_data);
        config.set_initial_max_stream_data_bidi_local(p.initial_max_stream_data_bidi_local);
        config.set_initial_max_stream_data_bidi_remote(p.initial_max_stream_data_bidi_remote);
        config.set_initial_max_stream_data_uni(p.initial_max_stream_data_uni);
        config.set_initial_max_streams_bidi(p.initial_max_streams_bidi);
        config.set_initial_max_streams_uni(p.initial_max_streams_uni);
        config.set_ack_delay_exponent(p.ack_delay_exponent);
        config.set_max_ack_delay(p.max_ack_delay_ms);
        config.set_active_connection_id_limit(p.active_connection_id_limit);
        config.set_disable_active_migration(p.disable_active_migration);
        config.grease(p.grease);
    }

    /// Fresh quiche config with HTTP/3 ALPN and this profile applied.
    pub fn config(&self) -> Result<quiche::Config> {
        let mut config = quiche::Config::new(quiche::PROTOCOL_VERSION)
            .map_err(|e| Error::quic(format!("Failed to create quiche config: {}", e)))?;
        config
            .set_application_protos(quiche::h3::APPLICATION_PROTOCOL)
            .map_err(|e| Error::quic(format!("Failed to set ALPN: {}", e)))?;
        self.apply(&mut config);
        Ok(config)
    }
}
