//! Connection Module
//!
//! This module manages individual client connections. Each connection runs
//! in its own async task, so one server can serve many clients at once
//! while each client sees strictly ordered request/response exchanges.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ LineReader  │───>│ Parse line  │───>│ Dispatcher  │      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌──────────────┐       │
//! │                                      │ DictResponse │       │
//! │                                      └──────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`reader`]: splits the incoming byte stream into lines
//! - [`response`]: encodes status lines and text blocks
//! - [`handler`]: the per-connection read/dispatch loop and statistics

pub mod handler;
pub mod reader;
pub mod response;

// Re-export commonly used types
pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, MAX_LINE_LENGTH,
};
pub use reader::LineReader;
pub use response::{CloseCallback, DatabaseInfo, Definition, DictResponse, MatchEntry, StrategyInfo};
