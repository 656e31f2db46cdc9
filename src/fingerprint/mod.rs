//! TLS, HTTP/2 and QUIC fingerprint configuration.

pub mod capture;
pub mod http2;
pub mod profiles;
pub mod quic;
pub mod tls;

pub use http2::{Http2Spec, Priority, Setting, SettingId};
pub use profiles::{FingerprintProfile, HelloInput};
pub use quic::{QuicId, QuicParameters, QuicProfile, QuicSelector};
pub use tls::{ClientHelloSpec, Extension, KeyShare};
