//! End-to-end handshakes through BoringSSL against a local TLS server.
//!
//! Run with: cargo test --test tls_handshake

use std::collections::BTreeSet;
use std::future::pending;

use mimic::fingerprint::tls::group;
use mimic::transport::{AdaptiveConnector, BoringEngine};
use mimic::{ClientHelloSpec, Error, FingerprintProfile, HttpVersion};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

mod helpers;
use helpers::tls::{generate_cert_bundle, MockTlsServer, GREETING};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mimic=trace")
        .try_init();
}

/// Start a server whose ALPN callback picks the first of `protos` the client offers.
async fn start_server(protos: &'static [u8]) -> (String, Vec<u8>) {
    let (mut builder, ca_cert) = generate_cert_bundle();
    builder.set_alpn_select_callback(move |_, client_protos| {
        boring::ssl::select_next_proto(protos, client_protos).ok_or(boring::ssl::AlpnError::NOACK)
    });
    let server = MockTlsServer::new().await.unwrap();
    let addr = server.addr();
    server.start(builder.build());
    (addr, ca_cert)
}

fn connector(ca_cert: Vec<u8>) -> AdaptiveConnector<BoringEngine<TcpStream>> {
    AdaptiveConnector::new(BoringEngine::new().with_root_certificates(vec![ca_cert]))
}

#[tokio::test]
async fn test_chrome_handshake_negotiates_h2() {
    init_tracing();
    let (addr, ca_cert) = start_server(b"\x02h2\x08http/1.1").await;
    let connector = connector(ca_cert);
    let addr = addr.as_str();

    let mut stream = connector
        .connect_with(
            ClientHelloSpec::default(),
            "localhost",
            move || async move { Ok(TcpStream::connect(addr).await?) },
            pending(),
        )
        .await
        .expect("handshake should succeed");

    assert_eq!(stream.ssl().selected_alpn_protocol(), Some(&b"h2"[..]));
    let mut greeting = [0u8; 5];
    stream.read_exact(&mut greeting).await.unwrap();
    assert_eq!(&greeting[..], GREETING);
    assert!(connector.memory().is_empty());
}

#[tokio::test]
async fn test_http1_mode_negotiates_http1() {
    let (addr, ca_cert) = start_server(b"\x02h2\x08http/1.1").await;
    let connector = connector(ca_cert).with_http_version(HttpVersion::Http1_1);

    let tcp = TcpStream::connect(&addr).await.unwrap();
    let stream = connector
        .connect(ClientHelloSpec::default(), "localhost", tcp, pending())
        .await
        .unwrap();
    assert_eq!(stream.ssl().selected_alpn_protocol(), Some(&b"http/1.1"[..]));
}

#[tokio::test]
async fn test_firefox_groups_are_adapted_to_engine() {
    init_tracing();
    let (addr, ca_cert) = start_server(b"\x02h2").await;
    let connector = connector(ca_cert);
    let spec = ClientHelloSpec::from_input(FingerprintProfile::Firefox133).unwrap();

    let tcp = TcpStream::connect(&addr).await.unwrap();
    connector
        .connect(spec, "localhost", tcp, pending())
        .await
        .expect("pruned Firefox hello should complete");

    // Groups BoringSSL cannot offer were learned and remembered.
    assert_eq!(
        connector.memory().rejected_groups("localhost"),
        BTreeSet::from([group::FFDHE2048, group::FFDHE3072, group::X25519_MLKEM768])
    );
}

#[tokio::test]
async fn test_untrusted_certificate_is_unrecognized_failure() {
    let (addr, _ca_cert) = start_server(b"\x02h2").await;
    let connector = AdaptiveConnector::new(BoringEngine::<TcpStream>::new());

    let tcp = TcpStream::connect(&addr).await.unwrap();
    let err = connector
        .connect(ClientHelloSpec::default(), "localhost", tcp, pending())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnrecognizedHandshake(_)), "{:?}", err);
    assert!(connector.memory().is_empty());
}
