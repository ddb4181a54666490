//! The `begin:` block.

use super::value::{parse_value, ValueMode};
use super::{ParseError, Parser, SourceLine};
use crate::model::{CallArgument, Statement};
use once_cell::sync::Lazy;
use regex::Regex;

static REMEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^remember\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s+as\s+(?P<type>[A-Za-z0-9_<>,\s]+)\s+with\s+"(?P<desc>.+)"\s*$"#,
    )
    .unwrap()
});
static ASK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ask\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s+for:\s*$").unwrap());
static ARGUMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s+is\s+(?P<value>.+)$").unwrap());
static KEEP_ANSWER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^keep\s+answer\s+as\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*$").unwrap()
});
static NOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^note\s+"(?P<text>.+)"\s*$"#).unwrap());
static SHOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^show(?:\s+memory)?\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*$").unwrap()
});

impl<'a> Parser<'a> {
    /// Parse every remaining line as a statement.
    pub(super) fn parse_statements(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();

        while let Some(line) = self.next_significant() {
            let text = line.text();
            let statement = if text.starts_with("remember ") {
                parse_remember(&line)?
            } else if text.starts_with("ask ") {
                self.parse_ask(&line)?
            } else if text.starts_with("show ") {
                let caps = SHOW
                    .captures(text)
                    .ok_or_else(|| malformed(&line, "show"))?;
                Statement::Show {
                    value: parse_value(&caps["name"], ValueMode::Default),
                }
            } else if text.starts_with("note ") {
                let caps = NOTE
                    .captures(text)
                    .ok_or_else(|| malformed(&line, "note"))?;
                Statement::Note {
                    text: caps["text"].to_string(),
                }
            } else {
                return Err(ParseError::UnknownStatement {
                    line: line.number,
                    text: line.raw.to_string(),
                });
            };
            statements.push(statement);
        }

        Ok(statements)
    }

    /// Parse an `ask` block; `header` is the `ask <name> for:` line.
    fn parse_ask(&mut self, header: &SourceLine<'_>) -> Result<Statement, ParseError> {
        let caps = ASK
            .captures(header.text())
            .ok_or_else(|| malformed(header, "ask"))?;
        let function = caps["name"].to_string();
        let mut arguments = Vec::new();

        while let Some(line) = self.next_significant() {
            if line.indent() <= header.indent() {
                let keep = KEEP_ANSWER.captures(line.text()).ok_or_else(|| {
                    ParseError::MissingKeepAnswer {
                        line: line.number,
                        text: line.raw.to_string(),
                        function: function.clone(),
                    }
                })?;
                return Ok(Statement::Call {
                    function,
                    arguments,
                    target: keep["name"].to_string(),
                });
            }

            let argument = ARGUMENT
                .captures(line.text())
                .ok_or_else(|| ParseError::InvalidArgument {
                    line: line.number,
                    text: line.raw.to_string(),
                    function: function.clone(),
                })?;
            arguments.push(CallArgument {
                name: argument["name"].to_string(),
                value: parse_value(&argument["value"], ValueMode::Default),
            });
        }

        Err(ParseError::MissingKeepAnswer {
            line: header.number,
            text: header.raw.to_string(),
            function,
        })
    }
}

fn parse_remember(line: &SourceLine<'_>) -> Result<Statement, ParseError> {
    let caps = REMEMBER
        .captures(line.text())
        .ok_or_else(|| malformed(line, "remember"))?;
    Ok(Statement::Remember {
        name: caps["name"].to_string(),
        type_hint: caps["type"].trim().to_string(),
        description: caps["desc"].to_string(),
    })
}

fn malformed(line: &SourceLine<'_>, keyword: &'static str) -> ParseError {
    ParseError::MalformedStatement {
        line: line.number,
        text: line.raw.to_string(),
        keyword,
    }
}
