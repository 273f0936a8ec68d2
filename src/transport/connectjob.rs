//! Connection setup: DNS -> TCP -> TLS, with trust decided by the delegate.

use crate::session::transport::TransportDelegate;
use crate::tls::trust::{ChallengeDisposition, PeerTrust, ServerTrust, TrustChallenge};
use boring::ssl::{SslConnector, SslMethod, SslVerifyMode};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use url::Url;

/// A connected socket (TCP or TLS).
#[derive(Debug)]
pub enum SocketType {
    Tcp(TcpStream),
    Ssl(tokio_boring::SslStream<TcpStream>),
}

impl AsyncRead for SocketType {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            SocketType::Ssl(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketType {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            SocketType::Ssl(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_flush(cx),
            SocketType::Ssl(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            SocketType::Ssl(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Establishes one connection for one request.
pub struct ConnectJob;

impl ConnectJob {
    /// Connect to the origin of `url` within `timeout`.
    ///
    /// For `https` the peer chain is presented to `delegate` as a trust
    /// challenge; the handshake is abandoned unless the answer allows it.
    ///
    /// The handshake itself runs with `SslVerifyMode::NONE`. Trust is decided
    /// here, after the handshake and before any request byte is written, and
    /// a rejected stream is dropped unused.
    pub async fn connect(
        url: &Url,
        timeout: Duration,
        delegate: &dyn TransportDelegate,
    ) -> io::Result<SocketType> {
        let host = url
            .host_str()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "URL has no host"))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "URL has no port"))?;

        let stream = tokio::time::timeout(timeout, connect_tcp(host, port))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;

        if url.scheme() != "https" {
            return Ok(SocketType::Tcp(stream));
        }

        let tls_stream = tokio::time::timeout(timeout, handshake(host, stream))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out"))??;

        let peer = tls_stream
            .ssl()
            .peer_cert_chain()
            .map(|chain| Arc::new(PeerTrust::from_chain(chain)));
        let trust = peer.clone().map(|peer| peer as Arc<dyn ServerTrust>);
        let challenge = TrustChallenge::new(host, trust);

        let accepted = match delegate.on_challenge(&challenge) {
            ChallengeDisposition::UseCredential(_) => true,
            ChallengeDisposition::PerformDefaultHandling => peer
                .map(|peer| peer.evaluate_default(host).is_trusted())
                .unwrap_or(false),
            ChallengeDisposition::CancelAuthenticationChallenge => false,
        };

        if !accepted {
            tracing::debug!(host = %host, "Server trust rejected");
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("server trust evaluation failed for {host}"),
            ));
        }

        Ok(SocketType::Ssl(tls_stream))
    }
}

async fn connect_tcp(host: &str, port: u16) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in tokio::net::lookup_host((host, port)).await? {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("no addresses for {host}"))
    }))
}

/// TLS handshake with certificate verification deferred to the challenge
/// answered in [`ConnectJob::connect`].
async fn handshake(
    host: &str,
    stream: TcpStream,
) -> io::Result<tokio_boring::SslStream<TcpStream>> {
    let mut builder = SslConnector::builder(SslMethod::tls()).map_err(io::Error::other)?;
    builder.set_verify(SslVerifyMode::NONE);
    builder
        .set_alpn_protos(b"\x08http/1.1")
        .map_err(io::Error::other)?;

    let config = builder.build().configure().map_err(io::Error::other)?;
    tokio_boring::connect(config, host, stream)
        .await
        .map_err(|e| io::Error::other(format!("TLS handshake with {host} failed: {e}")))
}
