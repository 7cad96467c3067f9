//! Slash-command input parsing.
//!
//! A check-in is an emoji token optionally followed by free text:
//! `:smile: had a great day`. The token grammar is deliberately narrow so
//! the rest of the pipeline never sees a malformed emoji.

use thiserror::Error;

/// Parsed slash-command input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckinInput {
    pub emoji: String,
    pub description: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Input was empty or contained only whitespace.
    #[error("input is empty")]
    Empty,

    /// First token does not satisfy the emoji grammar.
    #[error("not a valid emoji token: {token:?}")]
    InvalidEmoji { token: String },
}

/// Splits raw command text into an emoji token and a verbatim description.
///
/// The split happens at the first whitespace run; the run itself is consumed
/// and everything after it is kept untouched, internal and trailing
/// whitespace included. No other trimming happens, so input that starts with
/// whitespace fails the emoji grammar rather than being silently repaired.
pub fn parse_checkin(raw: &str) -> Result<CheckinInput, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let (token, description) = match raw.find(char::is_whitespace) {
        Some(split) => {
            let (token, rest) = raw.split_at(split);
            (token, rest.trim_start())
        }
        None => (raw, ""),
    };

    if !is_emoji_token(token) {
        return Err(ParseError::InvalidEmoji {
            token: token.to_string(),
        });
    }

    Ok(CheckinInput {
        emoji: token.to_string(),
        description: description.to_string(),
    })
}

/// Grammar: at least three bytes, leading and trailing `:`, and an interior
/// of ASCII letters, digits, `-` or `_`. Multi-byte characters fail the
/// interior check byte-wise, so the byte length test is sufficient.
fn is_emoji_token(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() >= 3
        && bytes[0] == b':'
        && bytes[bytes.len() - 1] == b':'
        && bytes[1..bytes.len() - 1]
            .iter()
            .all(|byte| byte.is_ascii_alphanumeric() || *byte == b'-' || *byte == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_emoji_with_description() {
        let input = parse_checkin(":smile: had a great day").unwrap();
        assert_eq!(input.emoji, ":smile:");
        assert_eq!(input.description, "had a great day");
    }

    #[test]
    fn parses_bare_emoji_without_description() {
        let input = parse_checkin(":thumbsup:").unwrap();
        assert_eq!(input.emoji, ":thumbsup:");
        assert_eq!(input.description, "");
    }

    #[test]
    fn split_consumes_entire_whitespace_run() {
        let input = parse_checkin(":smile: \t  spaced  out ").unwrap();
        assert_eq!(input.emoji, ":smile:");
        assert_eq!(input.description, "spaced  out ");
    }

    #[test]
    fn empty_and_whitespace_only_input_is_distinct_from_malformed() {
        assert_eq!(parse_checkin(""), Err(ParseError::Empty));
        assert_eq!(parse_checkin("   "), Err(ParseError::Empty));
        assert_eq!(parse_checkin("\t\n"), Err(ParseError::Empty));
    }

    #[test]
    fn leading_whitespace_invalidates_the_token() {
        let result = parse_checkin(" :smile: fine");
        assert_eq!(
            result,
            Err(ParseError::InvalidEmoji {
                token: String::new()
            })
        );
    }

    #[test]
    fn rejects_tokens_outside_the_grammar() {
        for raw in [
            "smile",       // no colons
            ":smile",      // missing trailing colon
            "smile:",      // missing leading colon
            "::",          // too short
            ":a b:",       // splits at interior whitespace, token is `:a`
            ":sm!le:",     // interior punctuation
            ":smi:le: hi", // interior colon after the split
        ] {
            assert!(
                matches!(parse_checkin(raw), Err(ParseError::InvalidEmoji { .. })),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn accepts_interior_dashes_underscores_and_digits() {
        for raw in [":thumbs_up:", ":cat-2:", ":100:", ":a_b-c3:"] {
            let input = parse_checkin(raw).unwrap();
            assert_eq!(input.emoji, raw);
        }
    }

    #[test]
    fn shortest_valid_token_is_three_bytes() {
        assert!(parse_checkin(":a:").is_ok());
        assert_eq!(
            parse_checkin("::"),
            Err(ParseError::InvalidEmoji {
                token: "::".to_string()
            })
        );
        assert_eq!(
            parse_checkin(":::"),
            Err(ParseError::InvalidEmoji {
                token: ":::".to_string()
            })
        );
    }

    #[test]
    fn rejects_non_ascii_interior() {
        assert!(matches!(
            parse_checkin(":smilé:"),
            Err(ParseError::InvalidEmoji { .. })
        ));
    }
}
