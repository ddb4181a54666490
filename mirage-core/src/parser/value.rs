//! Value-token disambiguation.

use crate::model::ValueToken;
use once_cell::sync::Lazy;
use regex::Regex;

static MEMORY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^memory\s+([A-Za-z_][A-Za-z0-9_]*)$").unwrap());
static BARE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// How a raw operand should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueMode {
    /// A bare identifier is an implicit memory reference.
    #[default]
    Default,
    /// A bare identifier stays literal text.
    Inline,
}

/// Resolve a raw operand into a literal or a memory reference.
///
/// Rules, in order:
/// 1. `memory <identifier>` is always a reference.
/// 2. A token wrapped in double quotes is a literal with the quotes removed.
/// 3. In [`ValueMode::Default`], a single bare identifier is a reference.
/// 4. Anything else is literal text.
pub fn parse_value(raw: &str, mode: ValueMode) -> ValueToken {
    let token = raw.trim();

    if let Some(caps) = MEMORY_VALUE.captures(token) {
        return ValueToken::Reference(caps[1].to_string());
    }

    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        return ValueToken::Literal(token[1..token.len() - 1].to_string());
    }

    if mode == ValueMode::Default && BARE_IDENTIFIER.is_match(token) {
        return ValueToken::Reference(token.to_string());
    }

    ValueToken::Literal(token.to_string())
}
