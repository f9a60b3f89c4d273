//! Transparency encoding for the DATA phase (RFC 5321 section 4.5.2).

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Doubles any dot that begins a line, so body content can never be mistaken
/// for the end-of-data marker by the receiving server.
///
/// The codec is stateful across chunks: a dot right after a chunk boundary
/// still counts as line-leading.
#[derive(Default, Clone, Copy, Debug)]
pub struct ClientCodec {
    midline: bool,
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        ClientCodec::default()
    }

    /// Writes `chunk` to `out`, stuffing line-leading dots.
    pub async fn encode<W: AsyncWrite + Unpin>(
        &mut self,
        chunk: &[u8],
        out: &mut W,
    ) -> io::Result<()> {
        let mut start = 0;
        for (idx, &byte) in chunk.iter().enumerate() {
            if !self.midline && byte == b'.' {
                out.write_all(&chunk[start..idx]).await?;
                out.write_all(b"..").await?;
                start = idx + 1;
            }
            self.midline = byte != b'\n';
        }
        out.write_all(&chunk[start..]).await?;
        Ok(())
    }

    /// Writes the end-of-data marker, inserting a line break first when the
    /// message did not end with one.
    pub async fn finish<W: AsyncWrite + Unpin>(&mut self, out: &mut W) -> io::Result<()> {
        if self.midline {
            out.write_all(b"\r\n.\r\n").await
        } else {
            out.write_all(b".\r\n").await
        }
    }
}
