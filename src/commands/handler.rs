//! Command Handlers
//!
//! A command handler receives a parsed [`Command`] and writes its answer to the
//! connection's [`DictResponse`]. Handlers are async so they can consult
//! databases, caches or remote services; the connection waits for a handler to
//! finish before reading the next command.
//!
//! ## Registering Handlers
//!
//! Synchronous closures are wrapped with [`handler_fn`]:
//!
//! ```
//! use dictd_engine::commands::{handler_fn, HandlerTable};
//!
//! let mut table = HandlerTable::new();
//! table.register("status", handler_fn(|_cmd, res| {
//!     res.ok(Some("up and running"));
//!     Ok(())
//! }));
//! assert!(table.contains("STATUS"));
//! ```
//!
//! Async handlers implement [`CommandHandler`] directly with `#[async_trait]`.

use crate::connection::DictResponse;
use crate::protocol::Command;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Result of running a handler. Errors are routed to the handler-error hook.
pub type HandlerResult = anyhow::Result<()>;

/// Handles one command name.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handles `command`, writing output to `response`.
    async fn handle(&self, command: &Command, response: &mut DictResponse) -> HandlerResult;
}

/// Adapter turning a synchronous closure into a [`CommandHandler`].
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&Command, &mut DictResponse) -> HandlerResult + Send + Sync,
{
    async fn handle(&self, command: &Command, response: &mut DictResponse) -> HandlerResult {
        (self.f)(command, response)
    }
}

/// Wraps a closure as a command handler.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Command, &mut DictResponse) -> HandlerResult + Send + Sync,
{
    FnHandler { f }
}

/// Mapping from command name to handler.
///
/// Registering a name replaces the previous handler for that exact name.
#[derive(Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerTable").field("names", &names).finish()
    }
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name` (uppercased), replacing any previous one.
    pub fn register<H>(&mut self, name: &str, handler: H)
    where
        H: CommandHandler + 'static,
    {
        self.register_arc(name, Arc::new(handler));
    }

    /// Registers an already shared handler.
    pub fn register_arc(&mut self, name: &str, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(name.trim().to_uppercase(), handler);
    }

    /// Removes the handler for `name`, returning whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.handlers.remove(&name.trim().to_uppercase()).is_some()
    }

    /// Looks up the handler for an exact (already normalized) name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
