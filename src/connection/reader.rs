//! Line Reader
//!
//! Turns a byte stream into logical lines. TCP gives no guarantee about how
//! bytes are chunked, so a line may arrive split across several reads, or many
//! lines may arrive in a single read. The reader accumulates bytes in a
//! `BytesMut` buffer and splits on `\n`, stripping a single trailing `\r` so
//! both CRLF and bare-LF clients work.
//!
//! ## End of Stream
//!
//! ```text
//! read() == 0 ──> flush unterminated tail as a final line
//!             ──> drain queued lines
//!             ──> Ok(None) forever after
//! ```
//!
//! A connection reset by the peer is treated the same way as a clean EOF.
//! Any other I/O error fails the current call and destroys the reader, after
//! which every call fails with [`ConnectionError::Destroyed`].

use crate::connection::handler::ConnectionError;
use bytes::{Buf, BytesMut};
use std::collections::VecDeque;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Maximum number of buffered bytes without a line terminator (64 KB)
pub const MAX_PARTIAL_LINE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Pull-based line reader over an async byte stream.
///
/// `read_line` takes `&mut self`, so calls are strictly sequential.
#[derive(Debug)]
pub struct LineReader<R> {
    /// The read side of the connection
    stream: R,

    /// Bytes received but not yet split into lines
    buffer: BytesMut,

    /// Complete lines not yet handed out
    lines: VecDeque<String>,

    /// The peer has finished sending
    ended: bool,

    /// A fatal error was observed
    destroyed: bool,

    /// Total bytes received
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Creates a reader over the given stream.
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            lines: VecDeque::new(),
            ended: false,
            destroyed: false,
            bytes_read: 0,
        }
    }

    /// Returns the next line, or `None` once the stream has ended and every
    /// buffered line has been consumed.
    pub async fn read_line(&mut self) -> Result<Option<String>, ConnectionError> {
        loop {
            if self.destroyed {
                return Err(ConnectionError::Destroyed);
            }

            if let Some(line) = self.lines.pop_front() {
                return Ok(Some(line));
            }

            if self.ended {
                return Ok(None);
            }

            self.fill().await?;
        }
    }

    /// Total number of bytes received so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Whether the peer has finished sending.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Performs one read from the stream and splits whatever completed.
    async fn fill(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_PARTIAL_LINE {
            self.destroyed = true;
            return Err(ConnectionError::LineTooLong(self.buffer.len()));
        }

        // Ensure we have some capacity
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        match self.stream.read_buf(&mut self.buffer).await {
            Ok(0) => self.on_end(),
            Ok(n) => {
                self.bytes_read += n as u64;
                trace!(bytes = n, buffered = self.buffer.len(), "Read data");
                self.split_lines();
            }
            Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                trace!("Connection reset by peer, treating as end of stream");
                self.on_end();
            }
            Err(e) => {
                self.destroyed = true;
                return Err(ConnectionError::IoError(e));
            }
        }

        Ok(())
    }

    /// Moves every `\n`-terminated segment of the buffer into the line queue.
    fn split_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line = self.buffer.split_to(pos);
            self.buffer.advance(1);

            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }

            self.lines
                .push_back(String::from_utf8_lossy(&line).into_owned());
        }
    }

    fn on_end(&mut self) {
        self.ended = true;
        self.split_lines();

        // Flush any leftover data as a line
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            self.lines
                .push_back(String::from_utf8_lossy(&rest).into_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_crlf_and_lf_in_one_chunk() {
        let mock = Builder::new().read(b"abc\r\ndef\n").build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("abc"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("def"));
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let mock = Builder::new().read(b"ab").read(b"c\n").build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("abc"));
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_crlf_split_between_chunks() {
        let mock = Builder::new().read(b"QUIT\r").read(b"\nNEXT\r\n").build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("QUIT"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("NEXT"));
    }

    #[tokio::test]
    async fn test_unterminated_tail_flushed_on_end() {
        let mock = Builder::new().read(b"one\ntwo").build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("two"));
        assert_eq!(reader.read_line().await.unwrap(), None);
        assert!(reader.is_ended());
    }

    #[tokio::test]
    async fn test_end_is_sticky() {
        let mock = Builder::new().build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap(), None);
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_lines_are_preserved() {
        let mock = Builder::new().read(b"\r\n\nx\n").build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_connection_reset_is_end_of_stream() {
        let mock = Builder::new()
            .read(b"DEFINE * test\r\nhalf")
            .read_error(io::Error::from(io::ErrorKind::ConnectionReset))
            .build();
        let mut reader = LineReader::new(mock);

        assert_eq!(
            reader.read_line().await.unwrap().as_deref(),
            Some("DEFINE * test")
        );
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("half"));
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_other_errors_destroy_reader() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::Other, "boom"))
            .build();
        let mut reader = LineReader::new(mock);

        assert!(matches!(
            reader.read_line().await,
            Err(ConnectionError::IoError(_))
        ));
        assert!(matches!(
            reader.read_line().await,
            Err(ConnectionError::Destroyed)
        ));
    }

    #[tokio::test]
    async fn test_partial_line_limit() {
        let chunk = vec![b'a'; MAX_PARTIAL_LINE];
        let mock = Builder::new().read(&chunk).build();
        let mut reader = LineReader::new(mock);

        assert!(matches!(
            reader.read_line().await,
            Err(ConnectionError::LineTooLong(_))
        ));
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        let word = "café\n".as_bytes();
        let (head, tail) = word.split_at(4);
        let mock = Builder::new().read(head).read(tail).build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("café"));
        assert_eq!(reader.bytes_read(), word.len() as u64);
    }
}
