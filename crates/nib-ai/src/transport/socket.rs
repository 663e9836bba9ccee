//! Raw-socket transport: hand-rolled HTTP/1.1 over TCP with TLS
//!
//! Resolves the host from the URL, connects, negotiates TLS for https,
//! writes the complete request in one buffered write, then reads until
//! the peer closes the connection or the idle timeout elapses. No
//! chunked transfer-encoding, no redirects.

use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::error::{Error, Result};
use crate::transport::{ChunkStream, HttpRequest, Transport, TransportConfig};

/// Transport that speaks HTTP/1.1 directly over a TCP/TLS connection
pub struct SocketTransport {
    config: TransportConfig,
    tls: Arc<rustls::ClientConfig>,
}

impl SocketTransport {
    /// Build the transport, loading the platform's root certificates.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let mut roots = rustls::RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for cert in native.certs {
            roots
                .add(cert)
                .map_err(|e| Error::Transport(format!("bad root certificate: {e}")))?;
        }
        if roots.is_empty() {
            return Err(Error::Transport(
                "no usable root certificates on this system".to_string(),
            ));
        }

        let tls = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            config,
            tls: Arc::new(tls),
        })
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn send(&self, request: &HttpRequest) -> Result<ChunkStream> {
        let url = ParsedUrl::parse(&request.url)?;
        let wire = format_http_request(request, &url);

        tracing::debug!(host = %url.host, port = url.port, "opening raw connection");

        let addr = (url.host.as_str(), url.port);
        let tcp = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::Timeout(self.config.connect_timeout))?
            .map_err(|e| Error::Transport(format!("connect to {}: {e}", url.host)))?;

        if url.tls {
            let server_name = rustls::pki_types::ServerName::try_from(url.host.clone())
                .map_err(|_| Error::Transport(format!("invalid server name: {}", url.host)))?;
            let connector = TlsConnector::from(Arc::clone(&self.tls));
            let stream = connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| Error::Transport(format!("TLS handshake: {e}")))?;
            Ok(read_to_close(stream, wire, self.config.idle_timeout))
        } else {
            Ok(read_to_close(tcp, wire, self.config.idle_timeout))
        }
    }

    fn delivers_http_response(&self) -> bool {
        true
    }
}

/// Write the request, then stream response chunks until EOF.
///
/// The connection is owned by the returned stream and torn down when it
/// is dropped. An idle timeout between reads ends the stream the same
/// way a peer close does, matching read-until-close semantics against
/// servers that hold the connection open.
fn read_to_close<S>(mut stream: S, wire: Vec<u8>, idle: std::time::Duration) -> ChunkStream
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    Box::pin(stream! {
        if let Err(e) = stream.write_all(&wire).await {
            yield Err(Error::transport(e));
            return;
        }
        if let Err(e) = stream.flush().await {
            yield Err(Error::transport(e));
            return;
        }

        let mut buf = [0u8; 8192];
        loop {
            match tokio::time::timeout(idle, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => yield Ok(buf[..n].to_vec()),
                Ok(Err(e)) => {
                    yield Err(Error::transport(e));
                    return;
                }
                Err(_) => {
                    tracing::warn!("idle timeout, treating response as complete");
                    break;
                }
            }
        }
    })
}

/// URL components the transport needs
#[derive(Debug, PartialEq, Eq)]
struct ParsedUrl {
    tls: bool,
    host: String,
    port: u16,
    path: String,
}

impl ParsedUrl {
    fn parse(url: &str) -> Result<Self> {
        let (tls, rest) = if let Some(r) = url.strip_prefix("https://") {
            (true, r)
        } else if let Some(r) = url.strip_prefix("http://") {
            (false, r)
        } else {
            return Err(Error::Config(format!("unsupported URL scheme: {url}")));
        };

        let (host_port, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, "/"),
        };

        let default_port = if tls { 443 } else { 80 };
        let (host, port) = match host_port.rsplit_once(':') {
            Some((h, p)) => {
                let port = p
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("bad port in URL: {url}")))?;
                (h, port)
            }
            None => (host_port, default_port),
        };
        if host.is_empty() {
            return Err(Error::Config(format!("missing host in URL: {url}")));
        }

        Ok(Self {
            tls,
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }
}

/// Serialize the full HTTP/1.1 request: request line, Host, caller
/// headers, computed Content-Length, blank line, body.
fn format_http_request(request: &HttpRequest, url: &ParsedUrl) -> Vec<u8> {
    let mut head = format!("{} {} HTTP/1.1\r\n", request.method, url.path);
    head.push_str(&format!("Host: {}\r\n", url.host));
    for (name, value) in &request.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str(&format!("Content-Length: {}\r\n", request.body.len()));
    head.push_str("Connection: close\r\n\r\n");

    let mut wire = head.into_bytes();
    wire.extend_from_slice(&request.body);
    wire
}
