//! Tokenizer for free-form extra-argument strings.
//!
//! Settings store gallery-dl pass-through arguments as a single string
//! (`extra_args`). Before handing them to the child process they are split
//! into an ordered token list using a small shell-like grammar:
//!
//! - tokens are separated by unquoted whitespace
//! - `'...'` groups literally, no escapes inside
//! - `"..."` groups, with `\"` and `\\` recognized inside
//! - a backslash outside quotes escapes the next character
//!
//! This is deliberately not a full shell: no expansion, no substitution, no
//! globbing. The grammar is isolated here so it can be tested on its own.

use thiserror::Error;

/// Errors produced while splitting an argument string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    /// A single or double quote was opened but never closed.
    #[error("unclosed {kind} quote in argument string")]
    UnclosedQuote {
        /// Which quote character was left open ("single" or "double").
        kind: &'static str,
    },
}

/// Splits a free-form argument string into tokens.
///
/// Empty and whitespace-only input yields an empty list. Quoted empty
/// strings (`""` or `''`) yield an empty token.
///
/// # Errors
///
/// Returns [`SplitError::UnclosedQuote`] when a quote is left open.
///
/// # Examples
///
/// ```
/// use gdl_manager_core::argsplit::split;
///
/// let tokens = split("--sleep 2 --filter \"date >= '2024'\"").unwrap();
/// assert_eq!(tokens, vec!["--sleep", "2", "--filter", "date >= '2024'"]);
/// ```
pub fn split(input: &str) -> Result<Vec<String>, SplitError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // `has_token` distinguishes an empty quoted token ("") from no token at all.
    let mut has_token = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            '\'' => {
                has_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(SplitError::UnclosedQuote { kind: "single" }),
                    }
                }
            }
            '"' => {
                has_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => {
                                return Err(SplitError::UnclosedQuote { kind: "double" });
                            }
                        },
                        Some(c) => current.push(c),
                        None => return Err(SplitError::UnclosedQuote { kind: "double" }),
                    }
                }
            }
            '\\' => {
                has_token = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    // Trailing lone backslash is kept literally.
                    None => current.push('\\'),
                }
            }
            c => {
                has_token = true;
                current.push(c);
            }
        }
    }

    if has_token {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Joins tokens back into a single space-separated string.
///
/// Used when a sanitized token list is persisted again. Tokens containing
/// whitespace are re-quoted with double quotes.
#[must_use]
pub fn join(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| {
            if t.is_empty() || t.chars().any(char::is_whitespace) {
                format!("\"{}\"", t.replace('\\', "\\\\").replace('"', "\\\""))
            } else {
                t.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_empty_string_returns_no_tokens() {
        assert!(split("").unwrap().is_empty());
        assert!(split("   \t ").unwrap().is_empty());
    }

    #[test]
    fn test_split_plain_tokens() {
        assert_eq!(
            split("--sleep 2 --no-mtime").unwrap(),
            vec!["--sleep", "2", "--no-mtime"]
        );
    }

    #[test]
    fn test_split_collapses_repeated_whitespace() {
        assert_eq!(split("  a   b\tc ").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_double_quotes_group_whitespace() {
        assert_eq!(
            split("--filter \"date >= 2024\"").unwrap(),
            vec!["--filter", "date >= 2024"]
        );
    }

    #[test]
    fn test_split_single_quotes_are_literal() {
        assert_eq!(split("'a \"b\" c'").unwrap(), vec!["a \"b\" c"]);
    }

    #[test]
    fn test_split_escaped_quote_inside_double_quotes() {
        assert_eq!(split(r#""say \"hi\"""#).unwrap(), vec![r#"say "hi""#]);
    }

    #[test]
    fn test_split_backslash_escapes_space_outside_quotes() {
        assert_eq!(split(r"a\ b").unwrap(), vec!["a b"]);
    }

    #[test]
    fn test_split_adjacent_quoted_parts_concatenate() {
        assert_eq!(split(r#"ab"cd"'ef'"#).unwrap(), vec!["abcdef"]);
    }

    #[test]
    fn test_split_empty_quoted_token_is_kept() {
        assert_eq!(split(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
    }

    #[test]
    fn test_split_unclosed_single_quote_errors() {
        assert_eq!(
            split("'oops").unwrap_err(),
            SplitError::UnclosedQuote { kind: "single" }
        );
    }

    #[test]
    fn test_split_unclosed_double_quote_errors() {
        assert_eq!(
            split("\"oops").unwrap_err(),
            SplitError::UnclosedQuote { kind: "double" }
        );
    }

    #[test]
    fn test_join_requotes_tokens_with_whitespace() {
        let tokens = vec!["--filter".to_string(), "date >= 2024".to_string()];
        assert_eq!(join(&tokens), "--filter \"date >= 2024\"");
    }

    #[test]
    fn test_join_split_round_trip() {
        let original = vec!["--sleep".to_string(), "2".to_string(), "a b".to_string()];
        assert_eq!(split(&join(&original)).unwrap(), original);
    }
}
