//! DICT Response Encoder
//!
//! A `DictResponse` is the write side of one client connection. Handlers use it
//! to compose status lines and text blocks:
//!
//! ```text
//! 110 2 databases present - text follows
//! wn "WordNet"
//! foldoc "Free On-line Dictionary of Computing"
//! .
//! 250 ok
//! ```
//!
//! Composition methods append to an in-memory buffer and return `&mut Self`
//! so calls can be chained. The buffer is written to the socket by
//! [`DictResponse::flush`], which the connection loop calls after every
//! dispatched command. Handlers that stream long answers may flush earlier.
//!
//! Once the response is closed or the socket has failed, further writes are
//! silently dropped and [`DictResponse::write`] reports `false`.

use crate::protocol::status::{
    self, status_text, DefinitionHeader, StatusArgs, DATABASES_FOLLOW, DEFINITION,
    DEFINITIONS_FOLLOW, MATCHES_FOLLOW, STRATEGIES_FOLLOW,
};
use crate::protocol::text::{dot_stuff, lf_to_crlf, sanitize, CRLF, TERMINATOR};
use bytes::BytesMut;
use std::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// Boxed write half of a connection
pub type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Callback invoked once the stream has been closed
pub type CloseCallback = Box<dyn FnOnce() + Send>;

/// A DICT database entry for `SHOW DB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub name: String,
    pub description: String,
}

impl DatabaseInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A matching strategy entry for `SHOW STRAT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
}

impl StrategyInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// One definition returned by `DEFINE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definition {
    pub headword: String,
    pub dictionary: String,
    pub dictionary_description: String,
    pub text: String,
    /// MIME headers written before the definition body, in order
    pub mime_headers: Vec<(String, String)>,
}

/// One entry returned by `MATCH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub dictionary: String,
    pub word: String,
}

impl MatchEntry {
    pub fn new(dictionary: impl Into<String>, word: impl Into<String>) -> Self {
        Self {
            dictionary: dictionary.into(),
            word: word.into(),
        }
    }
}

/// Per-connection response writer.
pub struct DictResponse {
    /// Write half of the socket
    writer: BoxedWriter,

    /// Encoded bytes not yet written to the socket
    buffer: BytesMut,

    /// Client's address (for logging)
    peer: Option<SocketAddr>,

    /// Set by `OPTION MIME`
    option_mime_enabled: bool,

    /// Text sent with `CLIENT`
    client_text: String,

    /// `close()` was requested
    closing: bool,

    /// Stream has been shut down or has failed
    closed: bool,

    on_close: Option<CloseCallback>,

    bytes_written: u64,
}

impl fmt::Debug for DictResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictResponse")
            .field("peer", &self.peer)
            .field("buffered", &self.buffer.len())
            .field("option_mime_enabled", &self.option_mime_enabled)
            .field("client_text", &self.client_text)
            .field("closing", &self.closing)
            .field("closed", &self.closed)
            .finish()
    }
}

impl DictResponse {
    /// Creates a response writer over any async byte sink.
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + 'static,
    {
        Self {
            writer: Box::pin(writer),
            buffer: BytesMut::with_capacity(1024),
            peer: None,
            option_mime_enabled: false,
            client_text: String::new(),
            closing: false,
            closed: false,
            on_close: None,
            bytes_written: 0,
        }
    }

    /// Attaches the peer address used in log records.
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Whether `OPTION MIME` has been sent on this connection.
    pub fn option_mime_enabled(&self) -> bool {
        self.option_mime_enabled
    }

    pub fn set_option_mime_enabled(&mut self, enabled: bool) {
        self.option_mime_enabled = enabled;
    }

    /// The text last sent with `CLIENT`.
    pub fn client_text(&self) -> &str {
        &self.client_text
    }

    pub fn set_client_text(&mut self, text: impl Into<String>) {
        self.client_text = text.into();
    }

    /// Encoded bytes waiting for the next flush.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether `close()` has been requested or the stream is gone.
    pub fn is_closed(&self) -> bool {
        self.closing || self.closed
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    // ========================================================================
    // Low-level writes
    // ========================================================================

    /// Queues raw data for sending.
    ///
    /// Returns `false` if the stream is closed and the data was dropped. This
    /// method is deliberately not chainable.
    pub fn write(&mut self, data: &str) -> bool {
        if self.is_closed() {
            trace!(client = ?self.peer, "Write on closed response dropped");
            return false;
        }
        self.buffer.extend_from_slice(data.as_bytes());
        true
    }

    /// Writes one line, removing any CR/LF inside it and appending CRLF.
    pub fn write_line(&mut self, line: &str) -> &mut Self {
        let mut out = sanitize(line);
        out.push_str(CRLF);
        self.write(&out);
        self
    }

    /// Writes `"<code> <message>"`, taking the catalogue text when `message`
    /// is `None`.
    pub fn status(&mut self, code: u16, args: StatusArgs<'_>, message: Option<&str>) -> &mut Self {
        let message = match message {
            Some(m) => m.to_string(),
            None => status_text(code, args),
        };
        self.write_line(&format!("{code} {message}"))
    }

    /// Writes a text block: optional `Key: Value` headers and a blank line,
    /// then the dot-stuffed body, then the `.` terminator.
    pub fn write_message<K, V>(&mut self, body: &str, headers: &[(K, V)]) -> &mut Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in headers {
            self.write_line(&format!("{}: {}", key.as_ref(), value.as_ref()));
        }
        if !headers.is_empty() {
            self.write_line("");
        }

        let stuffed = dot_stuff(&lf_to_crlf(body));
        for line in stuffed.split(CRLF) {
            self.write_line(line);
        }
        self.write_line(TERMINATOR)
    }

    /// Writes a text block without headers.
    pub fn write_text(&mut self, body: &str) -> &mut Self {
        self.write_message::<&str, &str>(body, &[])
    }

    /// Sends `250`, with "ok" unless another message is given.
    pub fn ok(&mut self, message: Option<&str>) -> &mut Self {
        self.status(status::OK, StatusArgs::None, message)
    }

    /// Sends an error status with its default text unless a message is given.
    pub fn error(&mut self, code: u16, message: Option<&str>) -> &mut Self {
        self.status(code, StatusArgs::None, message)
    }

    /// Sends `500 Syntax error, command not recognized`.
    pub fn syntax_error(&mut self) -> &mut Self {
        self.error(status::SYNTAX_ERROR, None)
    }

    /// Requests that the stream be ended once pending output is flushed.
    ///
    /// The optional callback runs after the stream has been shut down.
    pub fn close(&mut self, on_close: Option<CloseCallback>) -> &mut Self {
        if !self.closing {
            self.closing = true;
            self.on_close = on_close;
        }
        self
    }

    /// Marks the stream as gone without touching the socket.
    ///
    /// Pending output is discarded, later writes are dropped and flushes do
    /// nothing. The close callback does not run.
    pub fn destroy(&mut self) {
        if !self.closed {
            debug!(client = ?self.peer, pending = self.buffer.len(), "Response destroyed");
        }
        self.closed = true;
        self.on_close = None;
        self.buffer.clear();
    }

    // ========================================================================
    // RFC 2229 composites
    // ========================================================================

    /// Sends a database listing (`110 ... 250`), or `554` when empty.
    pub fn write_databases(
        &mut self,
        databases: &[DatabaseInfo],
        message: Option<&str>,
        ok_message: Option<&str>,
    ) -> &mut Self {
        if databases.is_empty() {
            return self.error(status::NO_DATABASES, None);
        }

        let body = databases
            .iter()
            .map(|db| format!("{} \"{}\"", db.name, db.description))
            .collect::<Vec<_>>()
            .join(CRLF);

        self.counted_status(DATABASES_FOLLOW, databases.len(), message)
            .write_text(&body)
            .ok(ok_message)
    }

    /// Sends a strategy listing (`111 ... 250`), or `555` when empty.
    pub fn write_strategies(
        &mut self,
        strategies: &[StrategyInfo],
        message: Option<&str>,
        ok_message: Option<&str>,
    ) -> &mut Self {
        if strategies.is_empty() {
            return self.error(status::NO_STRATEGIES, None);
        }

        let body = strategies
            .iter()
            .map(|s| format!("{} \"{}\"", s.name, s.description))
            .collect::<Vec<_>>()
            .join(CRLF);

        self.counted_status(STRATEGIES_FOLLOW, strategies.len(), message)
            .write_text(&body)
            .ok(ok_message)
    }

    /// Sends definitions (`150`, one block per definition, `250`), or `552`
    /// when empty.
    pub fn write_definitions(
        &mut self,
        definitions: &[Definition],
        message: Option<&str>,
        ok_message: Option<&str>,
    ) -> &mut Self {
        if definitions.is_empty() {
            return self.error(status::NO_MATCH, None);
        }

        self.counted_status(DEFINITIONS_FOLLOW, definitions.len(), message)
            .write_definition_blocks(definitions)
            .ok(ok_message)
    }

    /// Writes one `151` header and text block per definition.
    pub fn write_definition_blocks(&mut self, definitions: &[Definition]) -> &mut Self {
        for def in definitions {
            let header = DefinitionHeader {
                headword: sanitize(&def.headword),
                dictionary: sanitize(&def.dictionary),
                description: sanitize(&def.dictionary_description),
            };
            self.status(DEFINITION, StatusArgs::Definition(&header), None)
                .write_message(&def.text, &def.mime_headers);
        }
        self
    }

    /// Sends a match listing (`152 ... 250`), or `552` when empty.
    pub fn write_matches(
        &mut self,
        matches: &[MatchEntry],
        message: Option<&str>,
        ok_message: Option<&str>,
    ) -> &mut Self {
        if matches.is_empty() {
            return self.error(status::NO_MATCH, None);
        }

        let body = matches
            .iter()
            .map(|m| format!("{} \"{}\"", m.dictionary, m.word))
            .collect::<Vec<_>>()
            .join(CRLF);

        self.counted_status(MATCHES_FOLLOW, matches.len(), message)
            .write_text(&body)
            .ok(ok_message)
    }

    /// `"<code> <n> <message>"`, using the catalogue suffix by default.
    fn counted_status(&mut self, code: u16, count: usize, message: Option<&str>) -> &mut Self {
        match message {
            Some(m) => self.status(code, StatusArgs::None, Some(&format!("{count} {m}"))),
            None => self.status(code, StatusArgs::Count(count), None),
        }
    }

    // ========================================================================
    // Stream I/O
    // ========================================================================

    /// Writes buffered output to the socket.
    ///
    /// A failed write marks the response closed; later writes become no-ops.
    pub async fn flush(&mut self) -> std::io::Result<()> {
        if self.closed {
            self.buffer.clear();
            return Ok(());
        }
        if self.buffer.is_empty() {
            return Ok(());
        }

        let data = self.buffer.split().freeze();

        match write_out(&mut self.writer, &data).await {
            Ok(()) => {
                self.bytes_written += data.len() as u64;
                trace!(client = ?self.peer, bytes = data.len(), "Sent response");
                Ok(())
            }
            Err(e) => {
                debug!(client = ?self.peer, error = %e, "Write failed, closing response");
                self.closed = true;
                Err(e)
            }
        }
    }

    /// Flushes pending output and, if `close()` was requested, shuts the
    /// stream down and runs the close callback.
    pub async fn finish(&mut self) -> std::io::Result<()> {
        let flushed = self.flush().await;

        if self.closing && !self.closed {
            self.closed = true;
            let shutdown = self.writer.shutdown().await;
            if let Some(callback) = self.on_close.take() {
                callback();
            }
            flushed?;
            return shutdown;
        }

        flushed
    }
}

async fn write_out(writer: &mut BoxedWriter, data: &[u8]) -> std::io::Result<()> {
    writer.write_all(data).await?;
    writer.flush().await
}
