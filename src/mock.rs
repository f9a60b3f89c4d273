#![allow(missing_docs)]

//! An in-memory duplex stream for exercising the engine without a network.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Reads come from a pre-loaded script, writes pile up in a buffer the test
/// can inspect afterwards.
#[derive(Default, Clone, Debug)]
pub struct MockStream {
    reader: Cursor<Vec<u8>>,
    writer: Cursor<Vec<u8>>,
}

impl MockStream {
    pub fn new() -> MockStream {
        MockStream::default()
    }

    /// A stream that will serve `script` to the reader side.
    pub fn with_script(script: &[u8]) -> MockStream {
        MockStream {
            reader: Cursor::new(script.to_vec()),
            writer: Cursor::new(Vec::new()),
        }
    }

    /// Everything written to the stream so far.
    pub fn written(&self) -> &[u8] {
        self.writer.get_ref()
    }
}

impl AsyncRead for MockStream {
    /// Serves the script one line per read, the way replies arrive from a
    /// server that writes them individually. A buffered caller therefore
    /// never holds unread script past the line it asked for.
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let reader = &mut self.get_mut().reader;
        let pos = reader.position() as usize;
        let script = reader.get_ref();
        let remaining = &script[pos.min(script.len())..];

        let line_end = match remaining.iter().position(|b| *b == b'\n') {
            Some(i) => i + 1,
            None => remaining.len(),
        };
        let n = line_end.min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        reader.set_position((pos + n) as u64);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().writer).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_shutdown(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn captures_writes() {
        let mut mock = MockStream::new();
        mock.write_all(&[1, 2, 3]).await.unwrap();
        assert_eq!(mock.written(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn serves_one_line_per_read() {
        let mut mock = MockStream::with_script(b"220 first\r\n250 second\r\n");
        let mut buf = [0u8; 64];
        let n = mock.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"220 first\r\n");
        let n = mock.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"250 second\r\n");
        assert_eq!(mock.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn serves_the_script() {
        let mut mock = MockStream::with_script(&[4, 5]);
        let mut vec = Vec::new();
        mock.read_to_end(&mut vec).await.unwrap();
        assert_eq!(vec, vec![4, 5]);
    }
}
