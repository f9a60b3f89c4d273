//! Buffered command/reply exchange over one SMTP session.

use std::fmt::Display;
use std::io;
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::codec::ClientCodec;
use crate::error::Reason;
use crate::net::{NetworkStream, TlsParameters};
use crate::response::{parse_response, Response};
use crate::runtime::io_timeout;

/// SMTP stream.
///
/// Every read and write is bounded by the configured timeout; expiry shows
/// up as a timed-out IO failure on whichever step was in flight.
#[derive(Debug)]
pub struct SmtpStream<S: AsyncRead + AsyncWrite + Unpin> {
    inner: BufReader<S>,
    timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin> SmtpStream<S> {
    /// Creates a new SMTP stream on top of `stream`.
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            inner: BufReader::new(stream),
            timeout,
        }
    }

    /// Returns the inner stream.
    ///
    /// Should only be used when there are no unread replies, because the
    /// buffer of `BufReader` is dropped.
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }

    /// Sends `command` and reads the reply, whatever its code.
    pub async fn command(&mut self, command: impl Display) -> Result<Response, Reason> {
        self.write(command.to_string().as_bytes()).await?;
        self.read_response().await
    }

    /// Sends `command` and requires the reply to carry `expected`.
    pub async fn exchange(
        &mut self,
        command: impl Display,
        expected: u16,
    ) -> Result<Response, Reason> {
        self.command(command).await?.require(expected)
    }

    /// Writes the given data to the server.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), Reason> {
        let timeout = self.timeout;
        let stream = self.inner.get_mut();
        io_timeout(timeout, async {
            stream.write_all(bytes).await?;
            stream.flush().await
        })
        .await?;

        debug!(">> {}", escape_crlf(String::from_utf8_lossy(bytes).as_ref()));
        Ok(())
    }

    /// Reads one SMTP reply from the wire, following continuation lines
    /// until the final one arrives.
    pub async fn read_response(&mut self) -> Result<Response, Reason> {
        let mut buffer = String::with_capacity(100);

        loop {
            let read = io_timeout(self.timeout, self.inner.read_line(&mut buffer)).await?;
            if read == 0 {
                return Err(Reason::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-reply",
                )));
            }
            debug!("<< {}", escape_crlf(&buffer));
            match parse_response(&buffer) {
                Ok((_remaining, response)) => return Ok(response),
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                    return Err(Reason::Parsing(e.code));
                }
            }
        }
    }

    /// Streams the message content through the transparency codec, writes
    /// the end-of-data marker and flushes.
    pub async fn send_message(&mut self, message: &[u8]) -> Result<(), Reason> {
        let timeout = self.timeout;
        let stream = self.inner.get_mut();
        io_timeout(timeout, async {
            let mut codec = ClientCodec::new();
            codec.encode(message, stream).await?;
            codec.finish(stream).await?;
            stream.flush().await
        })
        .await?;

        debug!(">> [{} bytes of message content]", message.len());
        Ok(())
    }

    /// Shuts the transport down, swallowing failures; by this point the
    /// transaction outcome is already decided.
    pub async fn close(&mut self) {
        let timeout = self.timeout;
        let stream = self.inner.get_mut();
        if let Err(e) = io_timeout(timeout, stream.shutdown()).await {
            debug!("shutdown failed: {}", e);
        }
    }
}

impl SmtpStream<NetworkStream> {
    /// Swaps the plaintext transport for its TLS-wrapped self.
    ///
    /// Consumes the stream: the handshake consumes the socket, so on failure
    /// there is nothing left to close gracefully and the caller reports the
    /// handshake error.
    pub async fn upgrade_tls(self, parameters: &TlsParameters) -> Result<Self, Reason> {
        let timeout = self.timeout;
        let plain = self.into_inner();
        let upgraded = match tokio::time::timeout(timeout, plain.upgrade_tls(parameters)).await {
            Ok(handshake) => handshake?,
            Err(elapsed) => {
                return Err(Reason::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    elapsed,
                )))
            }
        };
        debug!("connection encrypted");
        Ok(SmtpStream::new(upgraded, timeout))
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
/// Used for debug displays
fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;

    use crate::commands::{DataCommand, MailCommand};
    use crate::mock::MockStream;

    fn stream_with(script: &[u8]) -> SmtpStream<MockStream> {
        SmtpStream::new(MockStream::with_script(script), Duration::from_secs(5))
    }

    #[test]
    fn test_escape_crlf() {
        assert_eq!(escape_crlf("\r\n"), "<CRLF>");
        assert_eq!(escape_crlf("EHLO my_name\r\n"), "EHLO my_name<CRLF>");
        assert_eq!(
            escape_crlf("EHLO my_name\r\nSIZE 42\r\n"),
            "EHLO my_name<CRLF>SIZE 42<CRLF>"
        );
    }

    #[tokio::test]
    async fn exchange_passes_on_the_expected_code() {
        let mut stream = stream_with(b"250 sender ok\r\n");
        let response = stream
            .exchange(MailCommand::new("user@relay.test"), 250)
            .await
            .unwrap();
        assert_eq!(response.first_line(), Some("sender ok"));
        assert_eq!(
            stream.into_inner().written(),
            b"MAIL FROM:<user@relay.test>\r\n"
        );
    }

    #[tokio::test]
    async fn exchange_surfaces_an_unexpected_code() {
        let mut stream = stream_with(b"451 try again later\r\n");
        match stream.exchange(DataCommand, 354).await {
            Err(Reason::UnexpectedReply(reply)) => assert_eq!(reply.code, 451),
            other => panic!("expected UnexpectedReply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn read_response_reassembles_continuation_lines() {
        let mut stream = stream_with(b"250-one\r\n250-two\r\n250 three\r\n");
        let response = stream.read_response().await.unwrap();
        assert_eq!(response.code, 250);
        assert_eq!(response.message, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn read_response_reports_eof() {
        let mut stream = stream_with(b"");
        match stream.read_response().await {
            Err(Reason::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_message_appends_the_terminator() {
        let mut stream = stream_with(b"");
        stream.send_message(b"Subject: x\r\n\r\nbody").await.unwrap();
        assert_eq!(
            stream.into_inner().written(),
            b"Subject: x\r\n\r\nbody\r\n.\r\n"
        );
    }
}
