//! Server-Wide Settings
//!
//! Content shared by every connection: the welcome banner, the database and
//! strategy listings, informational texts and the bind host. Settings are
//! stored behind an `RwLock` so they may be changed while the server is
//! listening; each dispatch reads a consistent snapshot of what it needs.

use crate::connection::response::{DatabaseInfo, StrategyInfo};
use crate::protocol::WelcomeBanner;
use crate::server::ServerError;
use std::collections::HashMap;

/// Default greeting text
pub const DEFAULT_WELCOME_TEXT: &str = "welcome";

/// Default message id sent in the greeting
pub const DEFAULT_MESSAGE_ID: &str = "12345.1234.1234567890@host.org";

/// Default text for `HELP`
pub const DEFAULT_HELP_TEXT: &str = "\
DEFINE <database> <word>            -- look up word in database
MATCH <database> <strategy> <word>  -- match word in database using strategy
SHOW DB or SHOW DATABASES           -- list all accessible databases
SHOW STRAT or SHOW STRATEGIES       -- list available matching strategies
SHOW INFO <database>                -- provide information about the database
SHOW SERVER                         -- provide site-specific information
OPTION MIME                         -- use MIME headers
CLIENT [info]                       -- identify client to server
AUTH <user> <string>                -- provide authentication information
STATUS                              -- display status information
HELP                                -- display this help information
QUIT                                -- terminate connection";

/// Server configuration and published content.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Host to bind to
    pub host: String,
    /// First part of the `220` banner
    pub welcome_text: String,
    /// Capabilities advertised in the banner
    pub capabilities: Vec<String>,
    /// Message id advertised in the banner
    pub message_id: String,
    /// Listing for `SHOW DB`
    pub databases: Vec<DatabaseInfo>,
    /// Listing for `SHOW STRAT`
    pub strategies: Vec<StrategyInfo>,
    /// Text for `SHOW SERVER`
    pub server_info: String,
    /// Texts for `SHOW INFO <db>`, keyed by database name
    pub database_info: HashMap<String, String>,
    /// Text for `HELP`
    pub help_text: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            welcome_text: DEFAULT_WELCOME_TEXT.to_string(),
            capabilities: vec!["mime".to_string()],
            message_id: DEFAULT_MESSAGE_ID.to_string(),
            databases: Vec::new(),
            strategies: Vec::new(),
            server_info: String::new(),
            database_info: HashMap::new(),
            help_text: DEFAULT_HELP_TEXT.to_string(),
        }
    }
}

impl ServerSettings {
    /// Builds the `220` banner from the current settings.
    pub fn banner(&self) -> WelcomeBanner {
        WelcomeBanner {
            text: self.welcome_text.clone(),
            capabilities: self.capabilities.join("."),
            message_id: self.message_id.clone(),
        }
    }
}

/// Parses and validates a textual port number in `[0, 65535]`.
pub fn parse_port(input: &str) -> Result<u16, ServerError> {
    let value: i64 = input
        .trim()
        .parse()
        .map_err(|_| ServerError::InvalidPort(input.to_string()))?;

    u16::try_from(value).map_err(|_| ServerError::InvalidPort(input.to_string()))
}
