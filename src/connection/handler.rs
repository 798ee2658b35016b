//! Connection Handler Module
//!
//! This module drives individual client connections. Each client gets its own
//! task running a read/dispatch loop over the socket.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. Welcome banner (or connect hook) sent
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read one line           │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │ (blank: skip) │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Parse into a Command    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Dispatch, await handler │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Flush the response      │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │   [Loop back unless QUIT]    │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / QUIT / error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Ordering
//!
//! The next line is not read until the previous command's handler has
//! finished and its output has been flushed. Responses therefore leave in
//! exactly the order requests arrived, even when a slow handler is followed
//! by a fast one.
//!
//! ## Shutdown
//!
//! Every connection watches the server's shutdown signal while it waits for
//! input. An idle connection drops its socket as soon as the signal fires. A
//! handler that is already running is never interrupted: it runs to the end,
//! its response is discarded, and the socket is dropped afterwards.

use crate::commands::Dispatcher;
use crate::connection::reader::LineReader;
use crate::connection::response::DictResponse;
use crate::protocol::{parse_command, Command};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Lines longer than this many characters are rejected without parsing
pub const MAX_LINE_LENGTH: usize = 1024;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: u64) {
        self.bytes_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: u64) {
        self.bytes_written.fetch_add(count, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Owns the line reader for the read half and the response encoder for the
/// write half of the socket.
pub struct ConnectionHandler {
    /// Framing for incoming lines
    reader: LineReader<OwnedReadHalf>,

    /// Encoder for outgoing responses
    response: DictResponse,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Command resolution (shared across connections)
    dispatcher: Arc<Dispatcher>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Flips to `true` when the server shuts down
    shutdown: watch::Receiver<bool>,

    /// Byte totals already added to `stats`
    reported_read: u64,
    reported_written: u64,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The TCP stream for this connection
    /// * `addr` - The client's socket address
    /// * `dispatcher` - Resolves and runs commands
    /// * `stats` - Shared connection statistics
    /// * `shutdown` - The server's shutdown signal
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        dispatcher: Arc<Dispatcher>,
        stats: Arc<ConnectionStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        stats.connection_opened();

        let (read_half, write_half) = stream.into_split();

        Self {
            reader: LineReader::new(read_half),
            response: DictResponse::new(write_half).with_peer(addr),
            addr,
            dispatcher,
            stats,
            shutdown,
            reported_read: 0,
            reported_written: 0,
        }
    }

    /// Runs the connection until the client leaves, sends `QUIT`, or the
    /// stream fails.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;
        self.report_bytes();

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(e) if e.is_disconnect() => {
                debug!(client = %self.addr, error = %e, "Client went away")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        result
    }

    /// The read-dispatch-flush loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        self.dispatcher.connect(&mut self.response);
        self.response.finish().await.map_err(ConnectionError::from_write)?;

        loop {
            if self.response.is_closed() {
                return Ok(());
            }

            let line = tokio::select! {
                line = self.reader.read_line() => match line? {
                    Some(line) => line,
                    None => return Ok(()),
                },
                _ = shutdown_signalled(&mut self.shutdown) => {
                    debug!(client = %self.addr, "Server shutting down, dropping connection");
                    self.response.destroy();
                    return Ok(());
                }
            };
            self.report_bytes();

            if line.trim().is_empty() {
                trace!(client = %self.addr, "Skipping blank line");
                continue;
            }

            let command = self.to_command(line);
            trace!(
                client = %self.addr,
                command = command.name(),
                params = command.parameters().len(),
                "Dispatching"
            );

            self.dispatcher.dispatch(&command, &mut self.response).await;
            self.stats.command_processed();

            let stopping = *self.shutdown.borrow();
            if stopping {
                debug!(client = %self.addr, "Server shut down during dispatch, discarding response");
                self.response.destroy();
                return Ok(());
            }

            self.response.finish().await.map_err(ConnectionError::from_write)?;
            self.report_bytes();

            if command.name() == "QUIT" {
                return Ok(());
            }
        }
    }

    /// Parses a line, wrapping oversized or malformed input as an invalid
    /// command.
    fn to_command(&self, line: String) -> Command {
        if line.chars().count() > MAX_LINE_LENGTH {
            debug!(client = %self.addr, "Line too long, rejecting");
            let truncated: String = line.chars().take(MAX_LINE_LENGTH).collect();
            return Command::invalid(truncated);
        }

        match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                debug!(client = %self.addr, error = %e, "Malformed command");
                Command::invalid(line)
            }
        }
    }

    fn report_bytes(&mut self) {
        let read = self.reader.bytes_read();
        let written = self.response.bytes_written();

        self.stats.bytes_read(read - self.reported_read);
        self.stats.bytes_written(written - self.reported_written);

        self.reported_read = read;
        self.reported_written = written;
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.stats.connection_closed();
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The peer closed the socket while we were writing
    #[error("socket closed")]
    Closed,

    /// The reader failed earlier and can no longer be used
    #[error("socket destroyed")]
    Destroyed,

    /// Too much data arrived without a line terminator
    #[error("line exceeds {0} bytes without a terminator")]
    LineTooLong(usize),
}

impl ConnectionError {
    fn from_write(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                ConnectionError::Closed
            }
            _ => ConnectionError::IoError(e),
        }
    }

    /// Whether the error only means the client went away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ConnectionError::Closed => true,
            ConnectionError::IoError(e) => e.kind() == ErrorKind::ConnectionReset,
            _ => false,
        }
    }
}

/// Resolves once `true` is published on the shutdown channel.
///
/// A channel whose sender is gone never signals.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

/// Handles a client connection.
///
/// Creates a [`ConnectionHandler`] and runs it to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ConnectionStats>,
    shutdown: watch::Receiver<bool>,
) {
    let handler = ConnectionHandler::new(stream, addr, dispatcher, stats, shutdown);
    if let Err(e) = handler.run().await {
        if !e.is_disconnect() {
            debug!(client = %addr, error = %e, "Connection ended with error");
        }
    }
}
