//! # dictd-engine - An RFC 2229 DICT Protocol Server Engine
//!
//! dictd-engine implements the protocol side of a DICT server: line framing,
//! command tokenizing, dispatch to application handlers, the default command
//! surface and RFC 2229 response encoding. Looking words up is left to the
//! application, which registers handlers for `DEFINE`, `MATCH` and friends.
//!
//! ## Features
//!
//! - **RFC 2229 framing**: CRLF or bare-LF lines, dot-stuffed text blocks
//! - **Ordered pipelining**: responses leave in request order even when
//!   handlers are async and finish out of order
//! - **Pluggable handlers**: async `CommandHandler` trait or plain closures
//! - **Sensible defaults**: banner, `SHOW`, `OPTION MIME`, `CLIENT`, `STATUS`,
//!   `HELP` and `QUIT` work out of the box
//! - **Async I/O**: Built on Tokio, one task per connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              DictServer                                 │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│ Dispatcher  │                  │
//! │  │ (Listener)  │    │  Handler    │    │  + hooks    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────────┐ │
//! │                     │ LineReader  │    │        HandlerTable          │ │
//! │                     │ + tokenizer │    │  built-ins │ app handlers    │ │
//! │                     └─────────────┘    └──────────────┬───────────────┘ │
//! │                                                       │                 │
//! │                                                       ▼                 │
//! │                                        ┌──────────────────────────────┐ │
//! │                                        │  DictResponse (encoder)      │ │
//! │                                        └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use dictd_engine::commands::handler_fn;
//! use dictd_engine::connection::MatchEntry;
//! use dictd_engine::DictServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = DictServer::new();
//!     server.match_(handler_fn(|cmd, res| {
//!         let word = cmd.parameter(2).unwrap_or_default();
//!         res.write_matches(&[MatchEntry::new("wn", word)], None, None);
//!         Ok(())
//!     }));
//!
//!     server.listen(dictd_engine::DEFAULT_PORT).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: tokenizer, command parser, status catalogue, text helpers
//! - [`connection`]: line reader, response encoder, per-connection loop
//! - [`commands`]: handler trait, dispatcher with hooks, built-in commands
//! - [`settings`]: server-wide content and defaults
//! - [`server`]: listening socket and lifecycle
//!
//! ## Design Highlights
//!
//! ### One Loop Per Connection
//!
//! Each connection reads a line, awaits its handler, flushes the response and
//! only then reads the next line. Ordering falls out of the loop; nothing
//! needs to be re-sequenced.
//!
//! ### Shared Configuration
//!
//! Settings and the handler table are shared by all connections behind
//! `RwLock`s, so they may be changed while the server is running.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod settings;

// Re-export commonly used types for convenience
pub use commands::{handler_fn, CommandHandler, Dispatcher, HandlerResult};
pub use connection::{ConnectionStats, DictResponse};
pub use protocol::{parse_command, Command};
pub use server::{DictServer, ServerError, ServerState};
pub use settings::{parse_port, ServerSettings};

/// The default port a DICT server listens on (IANA)
pub const DEFAULT_PORT: u16 = 2628;

/// The default host the server binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of dictd-engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
