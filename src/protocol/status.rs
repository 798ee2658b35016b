//! DICT Status Code Catalogue
//!
//! RFC 2229 section 7 assigns a three-digit code to every response status line.
//! This module maps each code to its default human-readable text. Some texts are
//! parameterized:
//!
//! - `110`, `111`, `150`, `152` take a count
//! - `151` takes a [`DefinitionHeader`]
//! - `220` takes a [`WelcomeBanner`]
//!
//! Codes outside the catalogue render as `"Unknown"`.

/// Header of a single definition block (`151` status line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionHeader {
    pub headword: String,
    pub dictionary: String,
    pub description: String,
}

/// Parts of the `220` greeting sent on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeBanner {
    pub text: String,
    /// Capabilities already joined with `.`
    pub capabilities: String,
    pub message_id: String,
}

/// Parameters for formatting a status text.
#[derive(Debug, Clone, Copy, Default)]
pub enum StatusArgs<'a> {
    #[default]
    None,
    Count(usize),
    Definition(&'a DefinitionHeader),
    Banner(&'a WelcomeBanner),
}

pub const DATABASES_FOLLOW: u16 = 110;
pub const STRATEGIES_FOLLOW: u16 = 111;
pub const DATABASE_INFO_FOLLOWS: u16 = 112;
pub const HELP_FOLLOWS: u16 = 113;
pub const SERVER_INFO_FOLLOWS: u16 = 114;
pub const DEFINITIONS_FOLLOW: u16 = 150;
pub const DEFINITION: u16 = 151;
pub const MATCHES_FOLLOW: u16 = 152;
pub const WELCOME: u16 = 220;
pub const CLOSING: u16 = 221;
pub const OK: u16 = 250;
pub const TEMPORARILY_UNAVAILABLE: u16 = 420;
pub const SYNTAX_ERROR: u16 = 500;
pub const ILLEGAL_PARAMETERS: u16 = 501;
pub const NOT_IMPLEMENTED: u16 = 502;
pub const INVALID_DATABASE: u16 = 550;
pub const NO_MATCH: u16 = 552;
pub const NO_DATABASES: u16 = 554;
pub const NO_STRATEGIES: u16 = 555;

/// Formats a count-prefixed text. Without a count only the suffix is returned.
fn counted(args: StatusArgs<'_>, suffix: &str) -> String {
    match args {
        StatusArgs::Count(n) => format!("{n} {suffix}"),
        _ => suffix.to_string(),
    }
}

/// Returns the default text for a status code.
pub fn status_text(code: u16, args: StatusArgs<'_>) -> String {
    match code {
        // 1yz: text follows
        110 => counted(args, "databases present - text follows"),
        111 => counted(args, "strategies available - text follows"),
        112 => "database information follows".to_string(),
        113 => "help text follows".to_string(),
        114 => "server information follows".to_string(),
        130 => "challenge follows".to_string(),
        150 => counted(args, "definitions retrieved - definitions follow"),
        151 => match args {
            StatusArgs::Definition(h) => {
                format!("\"{}\" {} \"{}\"", h.headword, h.dictionary, h.description)
            }
            _ => "definition follows".to_string(),
        },
        152 => counted(args, "matches found - text follows"),

        // 2yz: completed
        210 => "status".to_string(),
        220 => match args {
            StatusArgs::Banner(b) => {
                format!("{} <{}> <{}>", b.text, b.capabilities, b.message_id)
            }
            _ => "dictd-engine ready".to_string(),
        },
        221 => "Closing Connection".to_string(),
        230 => "Authentication successful".to_string(),
        250 => "ok".to_string(),

        // 3yz: continuation
        330 => "send response".to_string(),

        // 4yz: temporary failure
        420 => "Server temporarily unavailable".to_string(),
        421 => "Server shutting down at operator request".to_string(),

        // 5yz: permanent failure
        500 => "Syntax error, command not recognized".to_string(),
        501 => "Syntax error, illegal parameters".to_string(),
        502 => "Command not implemented".to_string(),
        503 => "Command parameter not implemented".to_string(),
        530 => "Access denied".to_string(),
        531 => "Access denied, use \"SHOW INFO\" for server information".to_string(),
        532 => "Access denied, unknown mechanism".to_string(),
        550 => "Invalid database, use \"SHOW DB\" for list of databases".to_string(),
        551 => "Invalid strategy, use \"SHOW STRAT\" for a list of strategies".to_string(),
        552 => "No match".to_string(),
        554 => "No databases present".to_string(),
        555 => "No strategies available".to_string(),

        _ => "Unknown".to_string(),
    }
}
