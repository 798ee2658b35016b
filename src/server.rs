//! DICT Server
//!
//! [`DictServer`] owns the listening socket, the shared [`Dispatcher`] and the
//! set of active connections.
//!
//! ## Lifecycle
//!
//! ```text
//!  Created ──listen()──> Listening ──shutdown()──> ShuttingDown ──> Stopped
//!                            ▲                                        │
//!                            └────────────────listen()────────────────┘
//! ```
//!
//! The accept loop runs in a background task and stops when the shutdown
//! signal fires (a `watch` channel). Every accepted connection runs in its
//! own task, registered in the active set until it ends. The same signal
//! reaches every connection: idle ones drop their socket at once, while a
//! connection in the middle of a handler lets it finish and discards its
//! output. `shutdown()` stops accepting, waits for the listening socket to be
//! dropped, then forgets the tracked connections without waiting for them.
//!
//! ## Example
//!
//! ```no_run
//! use dictd_engine::commands::handler_fn;
//! use dictd_engine::connection::{DatabaseInfo, Definition};
//! use dictd_engine::DictServer;
//!
//! # async fn run() -> Result<(), dictd_engine::ServerError> {
//! let mut server = DictServer::new();
//! server
//!     .set_welcome_text("dict.example.org")
//!     .set_databases(vec![DatabaseInfo::new("wn", "WordNet")])
//!     .define(handler_fn(|cmd, res| {
//!         let word = cmd.parameter(1).unwrap_or_default();
//!         res.write_definitions(
//!             &[Definition {
//!                 headword: word.to_string(),
//!                 dictionary: "wn".to_string(),
//!                 dictionary_description: "WordNet".to_string(),
//!                 text: format!("{word}\n  n. an example"),
//!                 ..Default::default()
//!             }],
//!             None,
//!             None,
//!         );
//!         Ok(())
//!     }));
//!
//! let addr = server.listen(2628).await?;
//! println!("listening on {addr}");
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use crate::commands::{CommandHandler, Dispatcher};
use crate::connection::response::{DatabaseInfo, StrategyInfo};
use crate::connection::{handle_connection, ConnectionStats, DictResponse};
use crate::protocol::Command;
use crate::settings::ServerSettings;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Errors raised by server setup and lifecycle calls.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server is already listening")]
    AlreadyListening,

    #[error("server is not listening")]
    NotListening,

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the server is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Listening,
    ShuttingDown,
    Stopped,
}

/// Connections that are still open, by id.
///
/// Ids are never reused across `listen()` calls, so a connection outliving a
/// shutdown cannot remove a newer entry.
#[derive(Debug, Default)]
struct ConnectionSet {
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, SocketAddr>>,
}

impl ConnectionSet {
    fn track(self: &Arc<Self>, addr: SocketAddr) -> Tracked {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, addr);
        Tracked {
            id,
            connections: Arc::clone(self),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, SocketAddr>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forgets every tracked connection, returning how many there were.
    fn clear(&self) -> usize {
        let mut open = self.lock();
        let count = open.len();
        open.clear();
        count
    }
}

/// Removes a connection from the active set when its task ends.
struct Tracked {
    id: u64,
    connections: Arc<ConnectionSet>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.connections.lock().remove(&self.id);
    }
}

/// An RFC 2229 server.
pub struct DictServer {
    settings: Arc<RwLock<ServerSettings>>,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ConnectionStats>,
    connections: Arc<ConnectionSet>,
    state: ServerState,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<watch::Sender<bool>>,
    accept_task: Option<JoinHandle<()>>,
}

impl Default for DictServer {
    fn default() -> Self {
        Self::new()
    }
}

impl DictServer {
    /// Creates a server with default settings and the built-in handlers.
    pub fn new() -> Self {
        Self::with_settings(ServerSettings::default())
    }

    pub fn with_settings(settings: ServerSettings) -> Self {
        let settings = Arc::new(RwLock::new(settings));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&settings)));

        Self {
            settings,
            dispatcher,
            stats: Arc::new(ConnectionStats::new()),
            connections: Arc::new(ConnectionSet::default()),
            state: ServerState::Created,
            local_addr: None,
            shutdown_tx: None,
            accept_task: None,
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Shared settings handle. Changes are visible to live connections.
    pub fn settings(&self) -> &Arc<RwLock<ServerSettings>> {
        &self.settings
    }

    fn settings_mut(&self) -> RwLockWriteGuard<'_, ServerSettings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Host used by the next `listen`.
    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.settings_mut().host = host.into();
        self
    }

    pub fn set_welcome_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.settings_mut().welcome_text = text.into();
        self
    }

    /// Capabilities advertised in the banner, joined with `.`.
    pub fn set_capabilities<I, S>(&mut self, capabilities: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings_mut().capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_message_id(&mut self, message_id: impl Into<String>) -> &mut Self {
        self.settings_mut().message_id = message_id.into();
        self
    }

    pub fn set_databases(&mut self, databases: Vec<DatabaseInfo>) -> &mut Self {
        self.settings_mut().databases = databases;
        self
    }

    pub fn set_strategies(&mut self, strategies: Vec<StrategyInfo>) -> &mut Self {
        self.settings_mut().strategies = strategies;
        self
    }

    pub fn set_server_info(&mut self, info: impl Into<String>) -> &mut Self {
        self.settings_mut().server_info = info.into();
        self
    }

    /// Text returned by `SHOW INFO <database>`.
    pub fn set_database_info(
        &mut self,
        database: impl Into<String>,
        info: impl Into<String>,
    ) -> &mut Self {
        self.settings_mut()
            .database_info
            .insert(database.into(), info.into());
        self
    }

    pub fn set_help_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.settings_mut().help_text = text.into();
        self
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    /// Registers a handler under `name`, replacing any existing one.
    ///
    /// The name is uppercased so it matches parser output; sub-commands use
    /// their canonical form, e.g. `"SHOW DATABASES"`.
    pub fn command<H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: CommandHandler + 'static,
    {
        self.dispatcher.handlers_mut().register(name, handler);
        self
    }

    pub fn define<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("DEFINE", handler)
    }

    pub fn match_<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("MATCH", handler)
    }

    pub fn show_databases<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("SHOW DATABASES", handler)
    }

    pub fn show_strategies<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("SHOW STRATEGIES", handler)
    }

    pub fn show_info<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("SHOW INFO", handler)
    }

    pub fn show_server<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("SHOW SERVER", handler)
    }

    pub fn option_mime<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("OPTION MIME", handler)
    }

    /// Handler for `SHOW` with an unrecognized sub-command.
    pub fn show<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("SHOW", handler)
    }

    /// Handler for `OPTION` with an unrecognized sub-command.
    pub fn option<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("OPTION", handler)
    }

    pub fn client<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("CLIENT", handler)
    }

    pub fn status<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("STATUS", handler)
    }

    pub fn help<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("HELP", handler)
    }

    /// Replaces the `QUIT` handler. The connection still closes after it runs.
    pub fn quit<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.command("QUIT", handler)
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Observer called for every command before it is resolved.
    pub fn on_command<F>(&mut self, observer: F) -> &mut Self
    where
        F: Fn(&Command, &mut DictResponse) + Send + Sync + 'static,
    {
        self.dispatcher.set_on_command(observer);
        self
    }

    pub fn on_unknown_command<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.dispatcher.set_on_unknown_command(handler);
        self
    }

    pub fn on_syntax_error<H: CommandHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.dispatcher.set_on_syntax_error(handler);
        self
    }

    /// Replaces the `220` welcome banner.
    pub fn on_connect<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut DictResponse) + Send + Sync + 'static,
    {
        self.dispatcher.set_on_connect(hook);
        self
    }

    pub fn on_handler_error<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&anyhow::Error, &mut DictResponse) + Send + Sync + 'static,
    {
        self.dispatcher.set_on_handler_error(hook);
        self
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Address actually bound, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    /// Number of connections currently tracked.
    pub fn active_connections(&self) -> usize {
        self.connections.lock().len()
    }

    /// Binds `host:port` and starts accepting connections in the background.
    ///
    /// Port `0` picks an ephemeral port; the bound address is returned.
    pub async fn listen(&mut self, port: u16) -> Result<SocketAddr, ServerError> {
        if matches!(self.state, ServerState::Listening | ServerState::ShuttingDown) {
            return Err(ServerError::AlreadyListening);
        }

        let host = self
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .host
            .clone();

        let listener = TcpListener::bind((host.as_str(), port)).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.stats),
            Arc::clone(&self.connections),
            shutdown_rx,
        ));

        self.shutdown_tx = Some(shutdown_tx);
        self.accept_task = Some(task);
        self.local_addr = Some(addr);
        self.state = ServerState::Listening;

        info!(addr = %addr, "Listening");
        Ok(addr)
    }

    /// Stops accepting, closes the listening socket and signals every active
    /// connection to close.
    ///
    /// Idle connections drop their socket right away. A handler that is
    /// running keeps running; its response is discarded and its connection
    /// closes once it returns. This call does not wait for such handlers.
    pub async fn shutdown(&mut self) -> Result<(), ServerError> {
        if self.state != ServerState::Listening {
            return Err(ServerError::NotListening);
        }
        self.state = ServerState::ShuttingDown;

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Accept loop ended abnormally");
            }
        }

        let destroyed = self.connections.clear();

        self.local_addr = None;
        self.state = ServerState::Stopped;

        info!(connections = destroyed, "Server stopped");
        Ok(())
    }
}

impl Drop for DictServer {
    fn drop(&mut self) {
        // Connections treat a dropped sender as "never", so signal explicitly
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.connections.clear();
    }
}

/// Accepts connections until the shutdown signal fires. The listener is
/// dropped, and so closed, when this returns.
async fn accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ConnectionStats>,
    connections: Arc<ConnectionSet>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, addr)) => {
                    let tracked = connections.track(addr);
                    let dispatcher = Arc::clone(&dispatcher);
                    let stats = Arc::clone(&stats);
                    let shutdown = shutdown_rx.clone();

                    tokio::spawn(async move {
                        let _tracked = tracked;
                        handle_connection(stream, addr, dispatcher, stats, shutdown).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
            _ = shutdown_rx.changed() => {
                debug!("Accept loop stopping");
                break;
            }
        }
    }
}
