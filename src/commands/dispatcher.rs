//! Command Dispatch
//!
//! The dispatcher resolves a [`Command`] to the code that answers it:
//!
//! ```text
//!                 ┌──────────────┐
//!  Command ──────>│  on_command  │  (observer, always runs)
//!                 └──────┬───────┘
//!                        │
//!        syntax invalid? ├──yes──> on_syntax_error      (default: 501)
//!                        │
//!     handler registered?├──no───> on_unknown_command   (default: 500)
//!                        │
//!                        ▼
//!                     handler ──Err──> on_handler_error (default: 420)
//! ```
//!
//! Handler errors never tear down the connection. The handler table and hooks
//! sit behind `RwLock`s; locks are only held long enough to clone the `Arc`
//! being invoked, never across an `.await`.

use crate::commands::builtin::install_defaults;
use crate::commands::handler::{CommandHandler, HandlerResult, HandlerTable};
use crate::connection::DictResponse;
use crate::protocol::status::{self, StatusArgs};
use crate::protocol::Command;
use crate::settings::ServerSettings;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{trace, warn};

/// Observer run for every command before resolution
pub type CommandObserver = Arc<dyn Fn(&Command, &mut DictResponse) + Send + Sync>;

/// Replacement for the welcome banner
pub type ConnectHook = Arc<dyn Fn(&mut DictResponse) + Send + Sync>;

/// Called with the error returned by a handler
pub type HandlerErrorHook = Arc<dyn Fn(&anyhow::Error, &mut DictResponse) + Send + Sync>;

/// Default for commands that were not understood.
struct SyntaxErrorDefault;

#[async_trait]
impl CommandHandler for SyntaxErrorDefault {
    async fn handle(&self, _command: &Command, response: &mut DictResponse) -> HandlerResult {
        response.error(status::ILLEGAL_PARAMETERS, None);
        Ok(())
    }
}

/// Default for commands without a handler.
struct UnknownCommandDefault;

#[async_trait]
impl CommandHandler for UnknownCommandDefault {
    async fn handle(&self, _command: &Command, response: &mut DictResponse) -> HandlerResult {
        response.error(status::SYNTAX_ERROR, None);
        Ok(())
    }
}

fn default_handler_error(error: &anyhow::Error, response: &mut DictResponse) {
    warn!(client = ?response.peer(), error = %error, "Handler error");
    response.error(status::TEMPORARILY_UNAVAILABLE, None);
}

/// Protocol event hooks. Each setter replaces the previous hook.
#[derive(Clone)]
pub struct Hooks {
    on_command: Option<CommandObserver>,
    on_syntax_error: Arc<dyn CommandHandler>,
    on_unknown_command: Arc<dyn CommandHandler>,
    on_connect: Option<ConnectHook>,
    on_handler_error: HandlerErrorHook,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            on_command: None,
            on_syntax_error: Arc::new(SyntaxErrorDefault),
            on_unknown_command: Arc::new(UnknownCommandDefault),
            on_connect: None,
            on_handler_error: Arc::new(default_handler_error),
        }
    }
}

/// Resolves and runs commands. Shared by every connection of a server.
pub struct Dispatcher {
    handlers: RwLock<HandlerTable>,
    hooks: RwLock<Hooks>,
    settings: Arc<RwLock<ServerSettings>>,
}

impl Dispatcher {
    /// Creates a dispatcher with the built-in handlers installed.
    pub fn new(settings: Arc<RwLock<ServerSettings>>) -> Self {
        let mut table = HandlerTable::new();
        install_defaults(&mut table, &settings);

        Self {
            handlers: RwLock::new(table),
            hooks: RwLock::new(Hooks::default()),
            settings,
        }
    }

    pub fn settings(&self) -> &Arc<RwLock<ServerSettings>> {
        &self.settings
    }

    /// Read access to the handler table.
    pub fn handlers(&self) -> RwLockReadGuard<'_, HandlerTable> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the handler table.
    pub fn handlers_mut(&self) -> RwLockWriteGuard<'_, HandlerTable> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn hooks(&self) -> Hooks {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn hooks_mut(&self) -> RwLockWriteGuard<'_, Hooks> {
        self.hooks.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_on_command<F>(&self, observer: F)
    where
        F: Fn(&Command, &mut DictResponse) + Send + Sync + 'static,
    {
        self.hooks_mut().on_command = Some(Arc::new(observer));
    }

    pub fn set_on_syntax_error<H>(&self, handler: H)
    where
        H: CommandHandler + 'static,
    {
        self.hooks_mut().on_syntax_error = Arc::new(handler);
    }

    pub fn set_on_unknown_command<H>(&self, handler: H)
    where
        H: CommandHandler + 'static,
    {
        self.hooks_mut().on_unknown_command = Arc::new(handler);
    }

    pub fn set_on_connect<F>(&self, hook: F)
    where
        F: Fn(&mut DictResponse) + Send + Sync + 'static,
    {
        self.hooks_mut().on_connect = Some(Arc::new(hook));
    }

    pub fn set_on_handler_error<F>(&self, hook: F)
    where
        F: Fn(&anyhow::Error, &mut DictResponse) + Send + Sync + 'static,
    {
        self.hooks_mut().on_handler_error = Arc::new(hook);
    }

    /// Greets a new connection: the connect hook if set, otherwise the `220`
    /// banner built from the settings.
    pub fn connect(&self, response: &mut DictResponse) {
        match self.hooks().on_connect {
            Some(hook) => hook(response),
            None => {
                let banner = self
                    .settings
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .banner();
                response.status(status::WELCOME, StatusArgs::Banner(&banner), None);
            }
        }
    }

    /// Runs one command to completion.
    pub async fn dispatch(&self, command: &Command, response: &mut DictResponse) {
        let hooks = self.hooks();

        if let Some(observer) = &hooks.on_command {
            observer(command, response);
        }

        let handler = if !command.is_syntax_valid() {
            trace!(client = ?response.peer(), raw_len = command.raw().len(), "Syntax error");
            Arc::clone(&hooks.on_syntax_error)
        } else {
            let registered = self.handlers().get(command.name());
            match registered {
                Some(handler) => handler,
                None => {
                    trace!(client = ?response.peer(), command = command.name(), "Unknown command");
                    Arc::clone(&hooks.on_unknown_command)
                }
            }
        };

        if let Err(error) = handler.handle(command, response).await {
            (hooks.on_handler_error)(&error, response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler::handler_fn;
    use crate::protocol::parse_command;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(RwLock::new(ServerSettings::default())))
    }

    fn output(res: &DictResponse) -> String {
        String::from_utf8(res.buffered().to_vec()).unwrap()
    }

    async fn run(d: &Dispatcher, command: Command) -> String {
        let mut res = DictResponse::new(tokio::io::sink());
        d.dispatch(&command, &mut res).await;
        output(&res)
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let d = dispatcher();
        let out = run(&d, parse_command("FOO").unwrap()).await;
        assert_eq!(out, "500 Syntax error, command not recognized\r\n");
    }

    #[tokio::test]
    async fn test_syntax_error() {
        let d = dispatcher();
        let out = run(&d, Command::invalid("TEST 'bad\"")).await;
        assert_eq!(out, "501 Syntax error, illegal parameters\r\n");
    }

    #[tokio::test]
    async fn test_custom_unknown_and_syntax_hooks() {
        let d = dispatcher();
        d.set_on_unknown_command(handler_fn(|_, res| {
            res.write_line("999 Custom unknown error");
            Ok(())
        }));
        d.set_on_syntax_error(handler_fn(|_, res| {
            res.write_line("501 Custom syntax error");
            Ok(())
        }));

        assert_eq!(
            run(&d, parse_command("UNKNOWN").unwrap()).await,
            "999 Custom unknown error\r\n"
        );
        assert_eq!(
            run(&d, Command::invalid("x")).await,
            "501 Custom syntax error\r\n"
        );
    }

    #[tokio::test]
    async fn test_registered_handler_overrides_builtin() {
        let d = dispatcher();
        d.handlers_mut().register(
            "DEFINE",
            handler_fn(|cmd, res| {
                res.ok(Some(&cmd.parameters().join(",")));
                Ok(())
            }),
        );
        let out = run(&d, parse_command("DEFINE wn apple").unwrap()).await;
        assert_eq!(out, "250 wn,apple\r\n");
    }

    #[tokio::test]
    async fn test_handler_error_default() {
        let d = dispatcher();
        d.handlers_mut()
            .register("DEFINE", handler_fn(|_, _| Err(anyhow::anyhow!("Test error"))));
        let out = run(&d, parse_command("DEFINE * test").unwrap()).await;
        assert_eq!(out, "420 Server temporarily unavailable\r\n");
    }

    #[tokio::test]
    async fn test_handler_error_custom() {
        let d = dispatcher();
        d.handlers_mut()
            .register("DEFINE", handler_fn(|_, _| Err(anyhow::anyhow!("Test error"))));
        d.set_on_handler_error(|error, res| {
            res.write_line(&format!("555 Custom error handler: {error}"));
        });
        let out = run(&d, parse_command("DEFINE * test").unwrap()).await;
        assert_eq!(out, "555 Custom error handler: Test error\r\n");
    }

    #[tokio::test]
    async fn test_observer_runs_for_every_command() {
        let d = dispatcher();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        d.set_on_command(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        run(&d, parse_command("STATUS").unwrap()).await;
        run(&d, parse_command("NOPE").unwrap()).await;
        run(&d, Command::invalid("'")).await;

        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_connect_banner() {
        let d = dispatcher();
        let mut res = DictResponse::new(tokio::io::sink());
        d.connect(&mut res);
        assert_eq!(
            output(&res),
            "220 welcome <mime> <12345.1234.1234567890@host.org>\r\n"
        );
    }

    #[test]
    fn test_connect_hook() {
        let d = dispatcher();
        d.set_on_connect(|res| {
            res.write_line("220 Custom welcome");
        });
        let mut res = DictResponse::new(tokio::io::sink());
        d.connect(&mut res);
        assert_eq!(output(&res), "220 Custom welcome\r\n");
    }
}
