use boring::pkey::PKey;
use boring::ssl::{SslAcceptor, SslAcceptorBuilder, SslMethod};
use boring::x509::X509;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Bytes every accepted TLS session receives before the server closes it.
pub const GREETING: &[u8] = b"hello";

/// Generate a self-signed certificate for 127.0.0.1 and return SslAcceptorBuilder + CA cert bytes.
pub fn generate_cert_bundle() -> (SslAcceptorBuilder, Vec<u8>) {
    let subject_alt_names = vec!["127.0.0.1".to_string(), "localhost".to_string()];

    let cert =
        rcgen::generate_simple_self_signed(subject_alt_names).expect("Failed to generate cert");
    let cert_pem = cert.cert.pem();
    let key_pem = cert.signing_key.serialize_pem();

    let pkey = PKey::private_key_from_pem(key_pem.as_bytes()).expect("Failed to parse private key");
    let x509 = X509::from_pem(cert_pem.as_bytes()).expect("Failed to parse certificate");

    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())
        .expect("Failed to create SslAcceptor builder");
    builder
        .set_private_key(&pkey)
        .expect("Failed to set private key");
    builder
        .set_certificate(&x509)
        .expect("Failed to set certificate");

    // Self-signed, so the leaf doubles as the CA
    (builder, cert_pem.into_bytes())
}

/// Local TLS server that greets every client and hangs up.
pub struct MockTlsServer {
    listener: TcpListener,
    port: u16,
}

impl MockTlsServer {
    pub async fn new() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn start(self, acceptor: SslAcceptor) {
        tokio::spawn(async move {
            loop {
                let Ok((tcp, _)) = self.listener.accept().await else {
                    break;
                };
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    match tokio_boring::accept(&acceptor, tcp).await {
                        Ok(mut tls) => {
                            let _ = tls.write_all(GREETING).await;
                            let _ = tls.shutdown().await;
                        }
                        Err(e) => tracing::debug!("mock TLS accept failed: {}", e),
                    }
                });
            }
        });
    }
}
