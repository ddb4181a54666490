//! Parse failures.

use thiserror::Error;

/// Error raised when story source cannot be turned into a [`crate::Program`].
///
/// Every variant carries the 1-based line number and the raw line that
/// triggered it, so callers can point at the offending source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unrecognised line: {text:?}")]
    UnexpectedLine { line: usize, text: String },

    #[error("line {line}: expected `has <name>(<type>)` inside object {object}, got {text:?}")]
    InvalidField {
        line: usize,
        text: String,
        object: String,
    },

    #[error("line {line}: malformed input declaration: {text:?}")]
    InvalidInput { line: usize, text: String },

    #[error("line {line}: input description must be wrapped in quotes: {text:?}")]
    UnquotedDescription { line: usize, text: String },

    #[error("line {line}: unexpected line in helper {helper}: {text:?}")]
    InvalidHelperLine {
        line: usize,
        text: String,
        helper: String,
    },

    #[error("line {line}: helper {helper} is missing `prompt:`")]
    MissingPrompt {
        line: usize,
        text: String,
        helper: String,
    },

    #[error("line {line}: expected `<<<` to open the prompt of helper {helper}, got {text:?}")]
    MissingPromptOpen {
        line: usize,
        text: String,
        helper: String,
    },

    #[error("line {line}: prompt of helper {helper} is not closed with `>>>`")]
    UnclosedPrompt {
        line: usize,
        text: String,
        helper: String,
    },

    #[error("line {line}: malformed {keyword} statement: {text:?}")]
    MalformedStatement {
        line: usize,
        text: String,
        keyword: &'static str,
    },

    #[error("line {line}: unknown statement: {text:?}")]
    UnknownStatement { line: usize, text: String },

    #[error("line {line}: malformed argument in ask {function}: {text:?}")]
    InvalidArgument {
        line: usize,
        text: String,
        function: String,
    },

    #[error("line {line}: ask {function} must end with `keep answer as <name>`, got {text:?}")]
    MissingKeepAnswer {
        line: usize,
        text: String,
        function: String,
    },

    #[error("line {line}: object {name} is declared more than once")]
    DuplicateObject {
        line: usize,
        text: String,
        name: String,
    },

    #[error("line {line}: helper {name} is declared more than once")]
    DuplicateHelper {
        line: usize,
        text: String,
        name: String,
    },
}

impl ParseError {
    /// The 1-based source line the error points at.
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedLine { line, .. }
            | ParseError::InvalidField { line, .. }
            | ParseError::InvalidInput { line, .. }
            | ParseError::UnquotedDescription { line, .. }
            | ParseError::InvalidHelperLine { line, .. }
            | ParseError::MissingPrompt { line, .. }
            | ParseError::MissingPromptOpen { line, .. }
            | ParseError::UnclosedPrompt { line, .. }
            | ParseError::MalformedStatement { line, .. }
            | ParseError::UnknownStatement { line, .. }
            | ParseError::InvalidArgument { line, .. }
            | ParseError::MissingKeepAnswer { line, .. }
            | ParseError::DuplicateObject { line, .. }
            | ParseError::DuplicateHelper { line, .. } => *line,
        }
    }

    /// The raw source line the error points at.
    pub fn text(&self) -> &str {
        match self {
            ParseError::UnexpectedLine { text, .. }
            | ParseError::InvalidField { text, .. }
            | ParseError::InvalidInput { text, .. }
            | ParseError::UnquotedDescription { text, .. }
            | ParseError::InvalidHelperLine { text, .. }
            | ParseError::MissingPrompt { text, .. }
            | ParseError::MissingPromptOpen { text, .. }
            | ParseError::UnclosedPrompt { text, .. }
            | ParseError::MalformedStatement { text, .. }
            | ParseError::UnknownStatement { text, .. }
            | ParseError::InvalidArgument { text, .. }
            | ParseError::MissingKeepAnswer { text, .. }
            | ParseError::DuplicateObject { text, .. }
            | ParseError::DuplicateHelper { text, .. } => text,
        }
    }
}
