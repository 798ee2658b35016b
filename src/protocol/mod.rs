//! DICT Protocol Implementation
//!
//! This module holds the pure, I/O-free parts of the RFC 2229 protocol.
//!
//! ## Overview
//!
//! DICT is a line-oriented request/response protocol. Clients send one command
//! per CRLF-terminated line; the server answers with status lines of the form
//! `<3-digit code> <text>`, optionally followed by text blocks terminated by a
//! line containing only `.`.
//!
//! ## Modules
//!
//! - `tokenizer`: Quote-aware splitting of command lines
//! - `command`: The `Command` type and name normalization
//! - `status`: Default status texts for every response code
//! - `text`: Sanitizing, CRLF normalization and dot-stuffing of bodies
//!
//! ## Example
//!
//! ```
//! use dictd_engine::protocol::{parse_command, status_text, StatusArgs};
//!
//! let command = parse_command("SHOW DB").unwrap();
//! assert_eq!(command.name(), "SHOW DATABASES");
//!
//! let text = status_text(110, StatusArgs::Count(2));
//! assert_eq!(text, "2 databases present - text follows");
//! ```

pub mod command;
pub mod status;
pub mod text;
pub mod tokenizer;

// Re-export commonly used types for convenience
pub use command::{parse_command, Command, ParseError};
pub use status::{status_text, DefinitionHeader, StatusArgs, WelcomeBanner};
pub use tokenizer::{tokenize, TokenizeError};
