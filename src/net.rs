//! The polymorphic duplex byte stream behind one SMTP session.
//!
//! A transaction starts on a plain TCP socket and may swap it for a
//! TLS-wrapped one mid-stream after STARTTLS; everything above this module
//! keeps reading and writing through the same `NetworkStream` either way.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_native_tls::{TlsConnector, TlsStream};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::mock::MockStream;
use crate::runtime::io_timeout;

/// Parameters for the TLS handshake of a STARTTLS upgrade.
pub struct TlsParameters {
    /// A connector from `native-tls`
    pub connector: TlsConnector,
    /// The domain to send during the TLS handshake
    pub domain: String,
}

impl fmt::Debug for TlsParameters {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("TlsParameters")
            .field("connector", &"TlsConnector")
            .field("domain", &self.domain)
            .finish()
    }
}

impl TlsParameters {
    /// Parameters validating the certificate chain and hostname against
    /// `domain`.
    pub fn new(domain: String) -> TlsParameters {
        TlsParameters {
            connector: TlsConnector::new(),
            domain,
        }
    }

    /// Parameters that skip certificate chain and hostname verification.
    ///
    /// A caller-controlled weakening meant for lab servers with self-signed
    /// certificates; never point this at a host you do not control.
    pub fn insecure(domain: String) -> TlsParameters {
        TlsParameters {
            connector: TlsConnector::new()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true),
            domain,
        }
    }
}

/// Represents the different types of underlying network streams
#[allow(missing_debug_implementations)]
pub enum NetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    Tls(Box<TlsStream<TcpStream>>),
    /// Mock stream
    Mock(MockStream),
}

impl NetworkStream {
    /// Opens a TCP connection to `host:port` within `timeout`.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<NetworkStream> {
        let stream = io_timeout(timeout, TcpStream::connect((host, port))).await?;
        stream.set_nodelay(true)?;
        Ok(NetworkStream::Tcp(stream))
    }

    /// Performs the TLS client handshake over the existing socket.
    ///
    /// Consumes the stream because the handshake consumes the socket; on
    /// failure the connection is gone. Already-encrypted and mock streams
    /// pass through unchanged.
    pub async fn upgrade_tls(
        self,
        parameters: &TlsParameters,
    ) -> Result<NetworkStream, async_native_tls::Error> {
        match self {
            NetworkStream::Tcp(stream) => {
                let tls_stream = parameters
                    .connector
                    .connect(&parameters.domain, stream)
                    .await?;
                Ok(NetworkStream::Tls(Box::new(tls_stream)))
            }
            other => Ok(other),
        }
    }

    /// Is the stream encrypted
    pub fn is_encrypted(&self) -> bool {
        match self {
            NetworkStream::Tcp(_) => false,
            NetworkStream::Tls(_) => true,
            NetworkStream::Mock(_) => false,
        }
    }
}

impl AsyncRead for NetworkStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetworkStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            NetworkStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
            NetworkStream::Mock(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NetworkStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            NetworkStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            NetworkStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
            NetworkStream::Mock(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetworkStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            NetworkStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
            NetworkStream::Mock(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetworkStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            NetworkStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
            NetworkStream::Mock(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}
