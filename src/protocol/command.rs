//! Command Parsing and Normalization
//!
//! Every received line is turned into a [`Command`]. The first token names the
//! command and is uppercased; the remaining tokens are its parameters.
//!
//! Two-word commands are folded into a single canonical name so that handlers
//! can be looked up by exact name:
//!
//! ```text
//! SHOW DB          ->  "SHOW DATABASES"
//! show strat       ->  "SHOW STRATEGIES"
//! SHOW INFO wn     ->  "SHOW INFO"      parameters: ["wn"]
//! OPTION MIME      ->  "OPTION MIME"
//! SHOW FOO         ->  "SHOW"           parameters: ["FOO"]
//! ```

use crate::protocol::tokenizer::{tokenize, TokenizeError};
use thiserror::Error;

/// Errors that prevent a line from becoming a valid [`Command`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    /// The line was not blank but produced no tokens (`''`, `""`).
    #[error("missing command name")]
    MissingName,
}

/// A single DICT command received from a client.
///
/// Commands produced by [`parse_command`] are always syntactically valid.
/// Invalid commands (oversized lines, unparsable lines) are built by the
/// connection loop with [`Command::invalid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    raw: String,
    name: String,
    parameters: Vec<String>,
    syntax_valid: bool,
}

impl Command {
    /// Creates a valid command from its parts.
    pub fn new(raw: impl Into<String>, name: impl Into<String>, parameters: Vec<String>) -> Self {
        Self {
            raw: raw.into(),
            name: name.into(),
            parameters,
            syntax_valid: true,
        }
    }

    /// Creates a syntax-invalid command carrying only the raw line.
    pub fn invalid(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            name: String::new(),
            parameters: Vec::new(),
            syntax_valid: false,
        }
    }

    /// The line as received (without its terminator).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The uppercased, possibly compound, command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Returns the parameter at `index`, if present.
    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters.get(index).map(String::as_str)
    }

    pub fn is_syntax_valid(&self) -> bool {
        self.syntax_valid
    }
}

/// Maps a `SHOW` sub-command (already uppercased) to its canonical name.
fn canonical_show(sub: &str) -> Option<&'static str> {
    match sub {
        "DB" | "DATABASES" => Some("DATABASES"),
        "STRAT" | "STRATEGIES" => Some("STRATEGIES"),
        "SERVER" => Some("SERVER"),
        "INFO" => Some("INFO"),
        _ => None,
    }
}

/// Parses a received line into a [`Command`].
///
/// The caller is expected to have discarded blank lines already.
///
/// # Errors
///
/// Propagates [`TokenizeError`] from the tokenizer, and fails with
/// [`ParseError::MissingName`] when the line holds only empty quoted strings.
/// The connection loop turns either into an invalid command.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut tokens = tokenize(line.trim())?.into_iter();

    let name = tokens.next().ok_or(ParseError::MissingName)?.to_uppercase();
    let mut parameters: Vec<String> = tokens.collect();

    let sub = parameters.first().map(|p| p.to_uppercase());

    match (name.as_str(), sub.as_deref()) {
        ("SHOW", Some(sub)) => {
            if let Some(canonical) = canonical_show(sub) {
                parameters.remove(0);
                return Ok(Command::new(line, format!("SHOW {canonical}"), parameters));
            }
        }
        ("OPTION", Some("MIME")) => {
            parameters.remove(0);
            return Ok(Command::new(line, "OPTION MIME", parameters));
        }
        _ => {}
    }

    Ok(Command::new(line, name, parameters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_command() {
        let cmd = parse_command("define wn apple").unwrap();
        assert_eq!(cmd.name(), "DEFINE");
        assert_eq!(cmd.parameters(), ["wn", "apple"]);
        assert_eq!(cmd.raw(), "define wn apple");
        assert!(cmd.is_syntax_valid());
    }

    #[test]
    fn test_show_aliases() {
        for (line, name) in [
            ("SHOW DB", "SHOW DATABASES"),
            ("show databases", "SHOW DATABASES"),
            ("SHOW strat", "SHOW STRATEGIES"),
            ("SHOW STRATEGIES", "SHOW STRATEGIES"),
            ("Show Server", "SHOW SERVER"),
        ] {
            let cmd = parse_command(line).unwrap();
            assert_eq!(cmd.name(), name, "line {line:?}");
            assert!(cmd.parameters().is_empty());
        }
    }

    #[test]
    fn test_show_info_keeps_database() {
        let cmd = parse_command("SHOW INFO wn").unwrap();
        assert_eq!(cmd.name(), "SHOW INFO");
        assert_eq!(cmd.parameter(0), Some("wn"));
    }

    #[test]
    fn test_unknown_show_subcommand() {
        let cmd = parse_command("SHOW FOO").unwrap();
        assert_eq!(cmd.name(), "SHOW");
        assert_eq!(cmd.parameters(), ["FOO"]);

        let bare = parse_command("SHOW").unwrap();
        assert_eq!(bare.name(), "SHOW");
        assert!(bare.parameters().is_empty());
    }

    #[test]
    fn test_option_mime() {
        let cmd = parse_command("OPTION MIME").unwrap();
        assert_eq!(cmd.name(), "OPTION MIME");
        assert!(cmd.parameters().is_empty());

        let lower = parse_command("option mime").unwrap();
        assert_eq!(lower.name(), "OPTION MIME");
    }

    #[test]
    fn test_bare_option() {
        let cmd = parse_command("OPTION").unwrap();
        assert_eq!(cmd.name(), "OPTION");
        assert!(cmd.parameters().is_empty());
    }

    #[test]
    fn test_normalized_parse_is_stable() {
        let first = parse_command("SHOW DATABASES").unwrap();
        let second = parse_command("SHOW DATABASES").unwrap();
        assert_eq!(first.name(), second.name());
        assert_eq!(first.parameters(), second.parameters());
    }

    #[test]
    fn test_quoted_parameters() {
        let cmd = parse_command("DEFINE * \"hot dog\"").unwrap();
        assert_eq!(cmd.parameters(), ["*", "hot dog"]);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let cmd = parse_command("   STATUS  \t").unwrap();
        assert_eq!(cmd.name(), "STATUS");
        assert_eq!(cmd.raw(), "   STATUS  \t");
    }

    #[test]
    fn test_unterminated_quote_propagates() {
        assert_eq!(
            parse_command("DEFINE wn \"apple"),
            Err(ParseError::Tokenize(TokenizeError::UnterminatedQuote))
        );
    }

    #[test]
    fn test_line_without_tokens_has_no_name() {
        assert_eq!(parse_command("''"), Err(ParseError::MissingName));
        assert_eq!(parse_command("\"\""), Err(ParseError::MissingName));
        assert_eq!(parse_command("  '' \"\"  "), Err(ParseError::MissingName));
    }

    #[test]
    fn test_invalid_command() {
        let cmd = Command::invalid("x".repeat(10));
        assert!(!cmd.is_syntax_valid());
        assert_eq!(cmd.name(), "");
        assert!(cmd.parameters().is_empty());
        assert_eq!(cmd.raw().len(), 10);
    }
}
