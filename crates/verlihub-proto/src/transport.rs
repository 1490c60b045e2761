//! Async framed transport: `|`-terminated frames over any `AsyncRead` +
//! `AsyncWrite` half.
//!
//! Unlike a zero-copy reader that hands back borrows tied to an
//! internal buffer, [`FramedReader`] returns owned frame buffers. NMDC
//! frames are small (chat lines, protocol control) relative to IRC's
//! per-command traffic, and owning them lets a connection task hold a
//! frame across the `await` points of directory-actor round trips
//! without fighting the borrow checker; the allocation cost is not the
//! hot path this crate optimises for (frame parsing into [`Message`]
//! is the hot path, and that remains zero-copy).

use crate::scanner::{FrameScanner, FrameTooLong, DEFAULT_MAX_FRAME_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads raw frames (terminator stripped) from an async byte stream.
pub struct FramedReader<R> {
    inner: R,
    scanner: FrameScanner,
    read_buf: [u8; 8192],
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_frame_len(inner, DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner,
            scanner: FrameScanner::new(max_frame_len),
            read_buf: [0u8; 8192],
        }
    }

    /// Read and return the next frame, filling the internal buffer
    /// from the socket as needed. Returns `Ok(None)` on clean EOF.
    pub async fn next_frame(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        loop {
            match self.scanner.next_frame() {
                Ok(Some(frame)) => return Ok(Some(frame)),
                Ok(None) => {}
                Err(FrameTooLong { max }) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("frame exceeds {max} bytes"),
                    ));
                }
            }
            let n = self.inner.read(&mut self.read_buf).await?;
            if n == 0 {
                return Ok(if self.scanner.buffered_len() == 0 { None } else { Some(Vec::new()) });
            }
            self.scanner.push(&self.read_buf[..n]);
        }
    }
}

/// Writes raw `|`-terminated frames to an async byte stream.
pub struct FramedWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FramedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write `body` followed by the `|` terminator, flushing the
    /// socket. Callers batching several frames should prefer
    /// [`FramedWriter::write_frame_unflushed`] and a trailing
    /// [`FramedWriter::flush`].
    pub async fn write_frame(&mut self, body: &[u8]) -> std::io::Result<()> {
        self.write_frame_unflushed(body).await?;
        self.inner.flush().await
    }

    pub async fn write_frame_unflushed(&mut self, body: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(body).await?;
        self.inner.write_all(b"|").await
    }

    /// Write `bytes` verbatim, with no `|` terminator appended and
    /// flushed immediately. For the one case NMDC's framing breaks down:
    /// a `$ZOn1|` switch is followed by a raw deflate block that is
    /// itself not `|`-terminated, only sized by the compressed length.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(bytes).await?;
        self.inner.flush().await
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_frames_across_short_reads() {
        let data = b"$Lock abc|$Key def|".to_vec();
        let mut reader = FramedReader::new(std::io::Cursor::new(data));
        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"$Lock abc");
        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"$Key def");
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn writer_appends_terminator() {
        let mut buf = Vec::new();
        {
            let mut writer = FramedWriter::new(&mut buf);
            writer.write_frame(b"$Hello alice").await.unwrap();
        }
        assert_eq!(buf, b"$Hello alice|");
    }
}
