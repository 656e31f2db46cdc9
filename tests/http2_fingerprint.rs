//! HTTP/2 fingerprint string codec and frame output.

use std::time::Duration;

use bytes::Bytes;
use mimic::fingerprint::http2::{
    Http2Spec, SettingId, CHROME_CONN_FLOW, CONNECTION_PREFACE, DEFAULT_CONNECTION_WINDOW,
    MAX_WINDOW_SIZE,
};
use mimic::headers::{default_order_headers, PseudoHeader};
use mimic::Error;
use tokio::io::AsyncReadExt;
use tokio::time::timeout;

const CHROME_FINGERPRINT: &str = "1:65536,2:0,4:6291456,6:262144|15663105|0|m,a,s,p";

#[test]
fn test_fingerprint_string_round_trip() {
    let spec: Http2Spec = CHROME_FINGERPRINT.parse().unwrap();
    assert_eq!(spec.settings.len(), 4);
    assert_eq!(spec.setting(SettingId::INITIAL_WINDOW_SIZE), Some(6_291_456));
    assert_eq!(spec.conn_flow, CHROME_CONN_FLOW);
    assert_eq!(spec.fingerprint(), CHROME_FINGERPRINT);
}

#[test]
fn test_default_round_trip() {
    let original = Http2Spec::default();
    let decoded = Http2Spec::from_fingerprint(&original.fingerprint()).unwrap();

    assert_eq!(decoded.settings, original.settings);
    assert_eq!(decoded.conn_flow, original.conn_flow);
    assert_eq!(decoded.pseudo_header_order(), original.pseudo_header_order());
}

#[test]
fn test_defaults() {
    let spec = Http2Spec::default();
    assert_eq!(spec.settings.len(), 5);
    assert_eq!(spec.conn_flow, 15_663_105);
    assert!(spec.priority.exclusive);
    assert_eq!(spec.priority.stream_dep, 0);
    assert_eq!(spec.priority.weight, 255);
    assert_eq!(spec.header_order, default_order_headers());
}

#[test]
fn test_letters_follow_header_order_case_insensitively() {
    let spec = Http2Spec {
        header_order: vec![
            ":METHOD".to_string(),
            "user-agent".to_string(),
            ":Path".to_string(),
            ":scheme".to_string(),
            ":authority".to_string(),
        ],
        ..Default::default()
    };
    assert!(spec.fingerprint().ends_with("|0|m,p,s,a"));
}

#[test]
fn test_unknown_letters_are_skipped() {
    let spec: Http2Spec = "1:4096|0|0|m,x,p".parse().unwrap();
    assert_eq!(
        spec.pseudo_header_order(),
        vec![PseudoHeader::Method, PseudoHeader::Path]
    );
}

#[test]
fn test_reserved_field_is_not_interpreted() {
    let spec: Http2Spec = "1:4096|100|anything|m".parse().unwrap();
    assert_eq!(spec.conn_flow, 100);
    assert_eq!(spec.fingerprint(), "1:4096|100|0|m");
}

#[test]
fn test_format_errors() {
    for bad in [
        "",
        "1:65536|15663105|0",
        "1:65536|15663105|0|m,a,s,p|extra",
        "1:x|15663105|0|m",
        "a:1|15663105|0|m",
        "1|15663105|0|m",
        "1:2:3|15663105|0|m",
        "1:65536|flow|0|m",
    ] {
        let err = bad.parse::<Http2Spec>().unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{:?} -> {:?}", bad, err);
    }
}

#[test]
fn test_preface_starts_with_magic() {
    let preface = Http2Spec::default().preface();
    assert!(preface.starts_with(b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n"));
}

/// Read frames from the server side of the pipe until the connection-level
/// WINDOW_UPDATE arrives. Returns (SETTINGS pairs, window increment).
async fn read_client_preface<R>(io: &mut R) -> (Vec<(u16, u32)>, u32)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut magic = [0u8; 24];
    io.read_exact(&mut magic).await.unwrap();
    assert_eq!(&magic[..], CONNECTION_PREFACE);

    let mut settings = Vec::new();
    loop {
        let mut header = [0u8; 9];
        io.read_exact(&mut header).await.unwrap();
        let len = u32::from_be_bytes([0, header[0], header[1], header[2]]) as usize;
        let frame_type = header[3];
        let stream_id = u32::from_be_bytes([header[5], header[6], header[7], header[8]]);
        let mut payload = vec![0u8; len];
        io.read_exact(&mut payload).await.unwrap();

        match frame_type {
            0x4 => settings.extend(payload.chunks(6).map(|c| {
                (
                    u16::from_be_bytes([c[0], c[1]]),
                    u32::from_be_bytes([c[2], c[3], c[4], c[5]]),
                )
            })),
            0x8 if stream_id == 0 => {
                let increment = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])
                    & 0x7fff_ffff;
                return (settings, increment);
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_configured_h2_client_sends_fingerprint() {
    let spec = Http2Spec::default();
    let mut builder = h2::client::Builder::new();
    spec.configure(&mut builder);

    let (client_io, mut server_io) = tokio::io::duplex(64 * 1024);
    let (_send_request, connection) = builder
        .handshake::<_, Bytes>(client_io)
        .await
        .expect("h2 client handshake");
    tokio::spawn(connection);

    let (settings, increment) = timeout(Duration::from_secs(5), read_client_preface(&mut server_io))
        .await
        .expect("client preface should arrive");

    for setting in &spec.settings {
        assert!(
            settings.contains(&(setting.id.0, setting.value)),
            "{:?} missing from {:?}",
            setting,
            settings
        );
    }
    assert_eq!(increment, CHROME_CONN_FLOW);
}

#[tokio::test]
async fn test_oversized_flow_keeps_h2_window_in_range() {
    let spec: Http2Spec = "1:65536|4294967295|0|m,a,s,p".parse().unwrap();
    let mut builder = h2::client::Builder::new();
    spec.configure(&mut builder);

    let (client_io, mut server_io) = tokio::io::duplex(64 * 1024);
    let (_send_request, connection) = builder
        .handshake::<_, Bytes>(client_io)
        .await
        .expect("h2 client handshake");
    tokio::spawn(connection);

    let (_, increment) = timeout(Duration::from_secs(5), read_client_preface(&mut server_io))
        .await
        .expect("client preface should arrive");

    assert_eq!(increment, MAX_WINDOW_SIZE - DEFAULT_CONNECTION_WINDOW);
    assert_eq!(increment, spec.window_increment());
}
