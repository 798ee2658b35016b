//! Quote-Aware Command Line Tokenizer
//!
//! DICT command lines are whitespace separated, but a parameter may be wrapped
//! in single or double quotes so that it can contain spaces:
//!
//! ```text
//! DEFINE wn "ice cream"     ->  ["DEFINE", "wn", "ice cream"]
//! MATCH * prefix 'new yo'   ->  ["MATCH", "*", "prefix", "new yo"]
//! ```
//!
//! Quote characters are stripped from the output. A quote is only closed by the
//! same character that opened it, so `"it's"` yields `it's`.

use thiserror::Error;

/// Errors produced while tokenizing a command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// The line ended while a quoted span was still open
    #[error("unterminated quoted string")]
    UnterminatedQuote,
}

/// Splits a command line into tokens.
///
/// Characters accumulate into the current token until unquoted whitespace is
/// seen. Only non-empty accumulations become tokens, so `""` on its own
/// produces nothing.
///
/// # Errors
///
/// Returns [`TokenizeError::UnterminatedQuote`] when a quoted span is never closed.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            } else {
                current.push(ch);
            }
            continue;
        }

        match ch {
            '"' | '\'' => quote = Some(ch),
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(TokenizeError::UnterminatedQuote);
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}
