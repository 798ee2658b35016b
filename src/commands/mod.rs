//! Command Handling Module
//!
//! This module turns parsed commands into responses.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line parser    │  (protocol module)
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │   Dispatcher    │  hooks, handler lookup,
//! │                 │  default error paths
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  built-in default or
//! │                 │  application handler
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  DictResponse   │  (connection module)
//! └─────────────────┘
//! ```
//!
//! ## Built-in Commands
//!
//! - `DEFINE`, `MATCH` (refused until the application registers handlers)
//! - `SHOW DB`, `SHOW STRAT`, `SHOW INFO`, `SHOW SERVER`
//! - `OPTION MIME`, `CLIENT`, `STATUS`, `HELP`, `QUIT`
//! - `AUTH`, `SASLAUTH` (refused)

pub mod builtin;
pub mod dispatcher;
pub mod handler;

pub use builtin::{install_defaults, Builtin, BuiltinHandler};
pub use dispatcher::{Dispatcher, Hooks};
pub use handler::{handler_fn, CommandHandler, FnHandler, HandlerResult, HandlerTable};
