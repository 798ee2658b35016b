//! Built-in Command Behavior
//!
//! Every server starts with a handler for each command RFC 2229 defines. The
//! defaults answer from [`ServerSettings`] and refuse what the engine cannot
//! do by itself:
//!
//! | Command | Default answer |
//! |---|---|
//! | `DEFINE`, `MATCH` | `502` |
//! | `SHOW DATABASES` | `110` listing, or `554` |
//! | `SHOW STRATEGIES` | `111` listing, or `555` |
//! | `SHOW INFO <db>` | `112` text, or `550` |
//! | `SHOW SERVER` | `114` text |
//! | `OPTION MIME` | `250`, enables MIME for the connection |
//! | `CLIENT <text>` | `250`, records the client text |
//! | `AUTH`, `SASLAUTH` | `502` |
//! | `STATUS` | `250` |
//! | `HELP` | `113` text |
//! | `QUIT` | `221`, then close |
//! | `SHOW`, `OPTION` (unrecognized sub-command) | `501` |
//!
//! Registering a handler under any of these names replaces the default.

use crate::commands::handler::{CommandHandler, HandlerResult, HandlerTable};
use crate::connection::DictResponse;
use crate::protocol::status::{self, StatusArgs};
use crate::protocol::Command;
use crate::settings::ServerSettings;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// The commands with default behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Define,
    Match,
    ShowDatabases,
    ShowStrategies,
    ShowInfo,
    ShowServer,
    OptionMime,
    Client,
    Auth,
    SaslAuth,
    Status,
    Help,
    Quit,
    Show,
    Option,
}

impl Builtin {
    pub const ALL: [Builtin; 15] = [
        Builtin::Define,
        Builtin::Match,
        Builtin::ShowDatabases,
        Builtin::ShowStrategies,
        Builtin::ShowInfo,
        Builtin::ShowServer,
        Builtin::OptionMime,
        Builtin::Client,
        Builtin::Auth,
        Builtin::SaslAuth,
        Builtin::Status,
        Builtin::Help,
        Builtin::Quit,
        Builtin::Show,
        Builtin::Option,
    ];

    /// The normalized command name this built-in answers.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Define => "DEFINE",
            Builtin::Match => "MATCH",
            Builtin::ShowDatabases => "SHOW DATABASES",
            Builtin::ShowStrategies => "SHOW STRATEGIES",
            Builtin::ShowInfo => "SHOW INFO",
            Builtin::ShowServer => "SHOW SERVER",
            Builtin::OptionMime => "OPTION MIME",
            Builtin::Client => "CLIENT",
            Builtin::Auth => "AUTH",
            Builtin::SaslAuth => "SASLAUTH",
            Builtin::Status => "STATUS",
            Builtin::Help => "HELP",
            Builtin::Quit => "QUIT",
            Builtin::Show => "SHOW",
            Builtin::Option => "OPTION",
        }
    }
}

/// Default handler for one built-in command.
pub struct BuiltinHandler {
    kind: Builtin,
    settings: Arc<RwLock<ServerSettings>>,
}

impl BuiltinHandler {
    pub fn new(kind: Builtin, settings: Arc<RwLock<ServerSettings>>) -> Self {
        Self { kind, settings }
    }

    fn respond(&self, command: &Command, res: &mut DictResponse) {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);

        match self.kind {
            Builtin::Define | Builtin::Match | Builtin::Auth | Builtin::SaslAuth => {
                res.error(status::NOT_IMPLEMENTED, None);
            }
            Builtin::ShowDatabases => {
                res.write_databases(&settings.databases, None, None);
            }
            Builtin::ShowStrategies => {
                res.write_strategies(&settings.strategies, None, None);
            }
            Builtin::ShowInfo => {
                match command
                    .parameter(0)
                    .and_then(|db| settings.database_info.get(db))
                {
                    Some(info) => {
                        res.status(status::DATABASE_INFO_FOLLOWS, StatusArgs::None, None)
                            .write_text(info)
                            .ok(None);
                    }
                    None => {
                        res.error(status::INVALID_DATABASE, None);
                    }
                }
            }
            Builtin::ShowServer => {
                res.status(status::SERVER_INFO_FOLLOWS, StatusArgs::None, None)
                    .write_text(&settings.server_info)
                    .ok(None);
            }
            Builtin::OptionMime => {
                res.set_option_mime_enabled(true);
                res.ok(None);
            }
            Builtin::Client => {
                let text = command.parameters().join(" ");
                debug!(client = ?res.peer(), client_text = %text, "Client identified");
                res.set_client_text(text);
                res.ok(None);
            }
            Builtin::Status => {
                res.ok(None);
            }
            Builtin::Help => {
                res.status(status::HELP_FOLLOWS, StatusArgs::None, None)
                    .write_text(&settings.help_text)
                    .ok(None);
            }
            Builtin::Quit => {
                res.status(status::CLOSING, StatusArgs::None, None).close(None);
            }
            Builtin::Show | Builtin::Option => {
                res.error(status::ILLEGAL_PARAMETERS, None);
            }
        }
    }
}

#[async_trait]
impl CommandHandler for BuiltinHandler {
    async fn handle(&self, command: &Command, response: &mut DictResponse) -> HandlerResult {
        self.respond(command, response);
        Ok(())
    }
}

/// Registers the default handler for every built-in command.
pub fn install_defaults(table: &mut HandlerTable, settings: &Arc<RwLock<ServerSettings>>) {
    for kind in Builtin::ALL {
        table.register(kind.name(), BuiltinHandler::new(kind, Arc::clone(settings)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::response::{DatabaseInfo, StrategyInfo};
    use crate::protocol::parse_command;

    fn settings() -> Arc<RwLock<ServerSettings>> {
        Arc::new(RwLock::new(ServerSettings::default()))
    }

    async fn run(kind: Builtin, settings: &Arc<RwLock<ServerSettings>>, line: &str) -> (String, DictResponse) {
        let handler = BuiltinHandler::new(kind, Arc::clone(settings));
        let mut res = DictResponse::new(tokio::io::sink());
        let cmd = parse_command(line).unwrap();
        handler.handle(&cmd, &mut res).await.unwrap();
        let out = String::from_utf8(res.buffered().to_vec()).unwrap();
        (out, res)
    }

    #[tokio::test]
    async fn test_unimplemented_commands() {
        let s = settings();
        for (kind, line) in [
            (Builtin::Define, "DEFINE * test"),
            (Builtin::Match, "MATCH * exact test"),
            (Builtin::Auth, "AUTH user secret"),
            (Builtin::SaslAuth, "SASLAUTH PLAIN"),
        ] {
            let (out, _) = run(kind, &s, line).await;
            assert_eq!(out, "502 Command not implemented\r\n");
        }
    }

    #[tokio::test]
    async fn test_show_databases() {
        let s = settings();
        let (out, _) = run(Builtin::ShowDatabases, &s, "SHOW DB").await;
        assert_eq!(out, "554 No databases present\r\n");

        s.write().unwrap().databases = vec![DatabaseInfo::new("wn", "WordNet")];
        let (out, _) = run(Builtin::ShowDatabases, &s, "SHOW DB").await;
        assert!(out.starts_with("110 1 databases present - text follows\r\n"));
        assert!(out.contains("wn \"WordNet\"\r\n"));
        assert!(out.ends_with(".\r\n250 ok\r\n"));
    }

    #[tokio::test]
    async fn test_show_strategies() {
        let s = settings();
        let (out, _) = run(Builtin::ShowStrategies, &s, "SHOW STRAT").await;
        assert_eq!(out, "555 No strategies available\r\n");

        s.write().unwrap().strategies = vec![
            StrategyInfo::new("exact", "Match headwords exactly"),
            StrategyInfo::new("prefix", "Match prefixes"),
        ];
        let (out, _) = run(Builtin::ShowStrategies, &s, "SHOW STRAT").await;
        assert!(out.starts_with("111 2 strategies available - text follows\r\n"));
    }

    #[tokio::test]
    async fn test_show_info() {
        let s = settings();
        s.write()
            .unwrap()
            .database_info
            .insert("wn".to_string(), "WordNet information".to_string());

        let (out, _) = run(Builtin::ShowInfo, &s, "SHOW INFO wn").await;
        assert_eq!(
            out,
            "112 database information follows\r\nWordNet information\r\n.\r\n250 ok\r\n"
        );

        let (out, _) = run(Builtin::ShowInfo, &s, "SHOW INFO nope").await;
        assert!(out.starts_with("550 "));

        let (out, _) = run(Builtin::ShowInfo, &s, "SHOW INFO").await;
        assert!(out.starts_with("550 "));
    }

    #[tokio::test]
    async fn test_show_server() {
        let s = settings();
        s.write().unwrap().server_info = "dictd-engine test".to_string();
        let (out, _) = run(Builtin::ShowServer, &s, "SHOW SERVER").await;
        assert_eq!(
            out,
            "114 server information follows\r\ndictd-engine test\r\n.\r\n250 ok\r\n"
        );
    }

    #[tokio::test]
    async fn test_option_mime_and_client() {
        let s = settings();
        let (out, res) = run(Builtin::OptionMime, &s, "OPTION MIME").await;
        assert_eq!(out, "250 ok\r\n");
        assert!(res.option_mime_enabled());

        let (out, res) = run(Builtin::Client, &s, "CLIENT test client").await;
        assert_eq!(out, "250 ok\r\n");
        assert_eq!(res.client_text(), "test client");
    }

    #[tokio::test]
    async fn test_help_and_status() {
        let s = settings();
        let (out, _) = run(Builtin::Help, &s, "HELP").await;
        assert!(out.starts_with("113 help text follows\r\n"));
        assert!(out.contains("DEFINE"));

        let (out, _) = run(Builtin::Status, &s, "STATUS").await;
        assert_eq!(out, "250 ok\r\n");
    }

    #[tokio::test]
    async fn test_quit_closes() {
        let s = settings();
        let (out, res) = run(Builtin::Quit, &s, "QUIT").await;
        assert_eq!(out, "221 Closing Connection\r\n");
        assert!(res.is_closed());
    }

    #[tokio::test]
    async fn test_bare_show_and_option() {
        let s = settings();
        let (out, _) = run(Builtin::Show, &s, "SHOW").await;
        assert_eq!(out, "501 Syntax error, illegal parameters\r\n");
        let (out, _) = run(Builtin::Option, &s, "OPTION FOO").await;
        assert_eq!(out, "501 Syntax error, illegal parameters\r\n");
    }

    #[test]
    fn test_install_defaults() {
        let mut table = HandlerTable::new();
        install_defaults(&mut table, &settings());
        assert_eq!(table.len(), Builtin::ALL.len());
        for kind in Builtin::ALL {
            assert!(table.contains(kind.name()));
        }
    }
}
