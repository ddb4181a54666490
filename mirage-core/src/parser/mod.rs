//! Story source parser.
//!
//! Turns source text into a [`Program`]. The grammar is line oriented:
//! top-level clauses are recognised by their shape, and each clause owns the
//! following lines that are indented deeper than its header. Blank lines and
//! `#` comments are skipped everywhere except inside a helper prompt body,
//! which is captured verbatim between `<<<` and `>>>`.

mod error;
mod statements;
mod value;

pub use error::ParseError;
pub use value::{parse_value, ValueMode};

use crate::model::{FieldDef, FunctionArg, FunctionDef, InputDecl, InputKind, ObjectDef, Program};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^story\s+"(?P<title>.+?)"\s*$"#).unwrap());
static OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^object\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*:\s*$").unwrap());
static HELPER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^helper\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s+returns\s+(?P<returns>[A-Za-z0-9_<>,\s]+)\s*:\s*$",
    )
    .unwrap()
});

/// Opening and closing markers of a helper prompt body.
pub const PROMPT_OPEN: &str = "<<<";
pub const PROMPT_CLOSE: &str = ">>>";

/// Parse story source text into a program.
///
/// Parsing is pure: the same text always yields the same [`Program`].
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    Parser::new(source).parse()
}

/// One physical source line.
#[derive(Debug, Clone, Copy)]
struct SourceLine<'a> {
    /// 1-based line number.
    number: usize,
    raw: &'a str,
}

impl<'a> SourceLine<'a> {
    fn text(&self) -> &'a str {
        self.raw.trim()
    }

    fn indent(&self) -> usize {
        self.raw.len() - self.raw.trim_start().len()
    }

    fn is_skippable(&self) -> bool {
        let text = self.text();
        text.is_empty() || text.starts_with('#')
    }
}

struct Parser<'a> {
    lines: Vec<SourceLine<'a>>,
    index: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let lines = source
            .lines()
            .enumerate()
            .map(|(i, raw)| SourceLine { number: i + 1, raw })
            .collect();
        Self { lines, index: 0 }
    }

    /// Next line without skipping anything.
    fn next_raw(&mut self) -> Option<SourceLine<'a>> {
        let line = self.lines.get(self.index).copied()?;
        self.index += 1;
        Some(line)
    }

    /// Skip blank and comment lines, then peek the next one.
    fn peek_significant(&mut self) -> Option<SourceLine<'a>> {
        while let Some(line) = self.lines.get(self.index).copied() {
            if !line.is_skippable() {
                return Some(line);
            }
            self.index += 1;
        }
        None
    }

    fn next_significant(&mut self) -> Option<SourceLine<'a>> {
        let line = self.peek_significant()?;
        self.index += 1;
        Some(line)
    }

    /// Next significant line that is indented deeper than `header`.
    fn next_in_block(&mut self, header: &SourceLine<'_>) -> Option<SourceLine<'a>> {
        let line = self.peek_significant()?;
        if line.indent() <= header.indent() {
            return None;
        }
        self.index += 1;
        Some(line)
    }

    fn parse(mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();

        while let Some(line) = self.next_significant() {
            let text = line.text();

            if let Some(caps) = TITLE.captures(text) {
                program.title = caps["title"].to_string();
                debug!(title = %program.title, "parsed title");
            } else if let Some(caps) = OBJECT.captures(text) {
                let name = caps["name"].to_string();
                if program.objects.contains_key(&name) {
                    return Err(ParseError::DuplicateObject {
                        line: line.number,
                        text: line.raw.to_string(),
                        name,
                    });
                }
                let object = self.parse_object(&line, name)?;
                debug!(object = %object.name, fields = object.fields.len(), "parsed object");
                program.objects.insert(object.name.clone(), object);
            } else if text.eq_ignore_ascii_case("inputs:") {
                let inputs = self.parse_inputs(&line)?;
                debug!(count = inputs.len(), "parsed inputs");
                program.inputs.extend(inputs);
            } else if let Some(caps) = HELPER.captures(text) {
                let name = caps["name"].to_string();
                if program.functions.contains_key(&name) {
                    return Err(ParseError::DuplicateHelper {
                        line: line.number,
                        text: line.raw.to_string(),
                        name,
                    });
                }
                let return_type = caps["returns"].trim().to_string();
                let function = self.parse_helper(&line, name, return_type)?;
                debug!(
                    helper = %function.name,
                    arguments = function.arguments.len(),
                    "parsed helper"
                );
                program.functions.insert(function.name.clone(), function);
            } else if text.eq_ignore_ascii_case("begin:") {
                program.statements = self.parse_statements()?;
                debug!(count = program.statements.len(), "parsed statements");
                break;
            } else {
                return Err(ParseError::UnexpectedLine {
                    line: line.number,
                    text: line.raw.to_string(),
                });
            }
        }

        Ok(program)
    }

    fn parse_object(
        &mut self,
        header: &SourceLine<'_>,
        name: String,
    ) -> Result<ObjectDef, ParseError> {
        let mut fields = Vec::new();

        while let Some(line) = self.next_in_block(header) {
            let invalid = || ParseError::InvalidField {
                line: line.number,
                text: line.raw.to_string(),
                object: name.clone(),
            };

            let rest = line.text().strip_prefix("has ").ok_or_else(invalid)?;
            let (typed, description) = match rest.split_once(" meaning ") {
                Some((typed, meaning)) => (typed, Some(strip_quotes(meaning.trim()))),
                None => (rest, None),
            };
            let (field_name, type_hint) = split_typed(typed).ok_or_else(invalid)?;

            fields.push(FieldDef {
                name: field_name,
                type_hint,
                description,
            });
        }

        Ok(ObjectDef { name, fields })
    }

    fn parse_inputs(&mut self, header: &SourceLine<'_>) -> Result<Vec<InputDecl>, ParseError> {
        let mut inputs = Vec::new();

        while let Some(line) = self.next_in_block(header) {
            let text = line.text();
            let (kind, rest) = if let Some(rest) = text.strip_prefix("argument ") {
                (InputKind::Argument, rest)
            } else if let Some(rest) = text.strip_prefix("file ") {
                (InputKind::File, rest)
            } else {
                return Err(ParseError::InvalidInput {
                    line: line.number,
                    text: line.raw.to_string(),
                });
            };
            inputs.push(parse_input_line(&line, kind, rest)?);
        }

        Ok(inputs)
    }

    fn parse_helper(
        &mut self,
        header: &SourceLine<'_>,
        name: String,
        return_type: String,
    ) -> Result<FunctionDef, ParseError> {
        let mut arguments = Vec::new();
        let mut has_prompt = false;

        while let Some(line) = self.next_in_block(header) {
            let text = line.text();
            if text.eq_ignore_ascii_case("prompt:") {
                has_prompt = true;
                break;
            }

            let argument = text
                .strip_prefix("needs ")
                .and_then(split_typed)
                .ok_or_else(|| ParseError::InvalidHelperLine {
                    line: line.number,
                    text: line.raw.to_string(),
                    helper: name.clone(),
                })?;
            arguments.push(FunctionArg {
                name: argument.0,
                type_hint: argument.1,
            });
        }

        if !has_prompt {
            return Err(ParseError::MissingPrompt {
                line: header.number,
                text: header.raw.to_string(),
                helper: name,
            });
        }

        let open = match self.next_significant() {
            Some(line) if line.text() == PROMPT_OPEN => line,
            Some(line) => {
                return Err(ParseError::MissingPromptOpen {
                    line: line.number,
                    text: line.raw.to_string(),
                    helper: name,
                })
            }
            None => {
                return Err(ParseError::MissingPromptOpen {
                    line: header.number,
                    text: header.raw.to_string(),
                    helper: name,
                })
            }
        };

        let mut body = Vec::new();
        loop {
            match self.next_raw() {
                Some(line) if line.text() == PROMPT_CLOSE => break,
                Some(line) => body.push(line.raw.trim_end()),
                None => {
                    return Err(ParseError::UnclosedPrompt {
                        line: open.number,
                        text: open.raw.to_string(),
                        helper: name,
                    })
                }
            }
        }

        Ok(FunctionDef {
            name,
            arguments,
            return_type,
            prompt: body.join("\n").trim().to_string(),
        })
    }
}

fn parse_input_line(
    line: &SourceLine<'_>,
    kind: InputKind,
    rest: &str,
) -> Result<InputDecl, ParseError> {
    let malformed = || ParseError::InvalidInput {
        line: line.number,
        text: line.raw.to_string(),
    };

    let (name, declared) = rest.trim().split_once(" as ").ok_or_else(malformed)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed());
    }

    let (type_hint, description) = match declared.split_once(" with ") {
        Some((type_hint, description)) => {
            let description = description.trim();
            if description.len() < 2 || !description.starts_with('"') || !description.ends_with('"')
            {
                return Err(ParseError::UnquotedDescription {
                    line: line.number,
                    text: line.raw.to_string(),
                });
            }
            (type_hint, Some(description[1..description.len() - 1].to_string()))
        }
        None => (declared, None),
    };

    let type_hint = type_hint.trim();
    if type_hint.is_empty() {
        return Err(malformed());
    }

    Ok(InputDecl {
        kind,
        name: name.to_string(),
        type_hint: type_hint.to_string(),
        description,
    })
}

/// Split `name(Type)` or `name (Type)` into its parts.
fn split_typed(text: &str) -> Option<(String, String)> {
    let (name, rest) = text.split_once('(')?;
    if !rest.contains(')') {
        return None;
    }
    let name = name.trim();
    let type_hint = rest.trim().trim_end_matches(')').trim();
    if name.is_empty() || type_hint.is_empty() {
        return None;
    }
    Some((name.to_string(), type_hint.to_string()))
}

fn strip_quotes(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Statement, ValueToken, DEFAULT_TITLE};

    const FRIEND_STORY: &str = r#"story "Test"

object Friend:
  has name (Text) meaning "a friendly name"
  has mood(Text)

helper greet returns Text:
  needs friend (Friend)
  prompt:
<<<
Say hello.

  Be brief.
>>>

begin:
  remember buddy as Friend with "name: Jamie"
  ask greet for:
    friend is memory buddy
  keep answer as wave
  show wave
"#;

    #[test]
    fn test_parse_basic_program() {
        let program = parse_program(FRIEND_STORY).unwrap();
        assert_eq!(program.title, "Test");
        assert_eq!(program.statements.len(), 3);
        assert!(program.inputs.is_empty());

        let friend = &program.objects["Friend"];
        assert_eq!(friend.fields.len(), 2);
        assert_eq!(friend.fields[0].name, "name");
        assert_eq!(friend.fields[0].type_hint, "Text");
        assert_eq!(
            friend.fields[0].description.as_deref(),
            Some("a friendly name")
        );
        assert_eq!(friend.fields[1].description, None);

        let greet = &program.functions["greet"];
        assert_eq!(greet.return_type, "Text");
        assert_eq!(greet.arguments[0].name, "friend");
        assert_eq!(greet.arguments[0].type_hint, "Friend");
        assert_eq!(greet.prompt, "Say hello.\n\n  Be brief.");

        match &program.statements[1] {
            Statement::Call {
                function,
                arguments,
                target,
            } => {
                assert_eq!(function, "greet");
                assert_eq!(target, "wave");
                assert_eq!(arguments[0].value, ValueToken::Reference("buddy".into()));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(
            parse_program(FRIEND_STORY).unwrap(),
            parse_program(FRIEND_STORY).unwrap()
        );
    }

    #[test]
    fn test_default_title() {
        let program = parse_program("begin:\n  note \"hi\"\n").unwrap();
        assert_eq!(program.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_parse_inputs_section() {
        let source = r#"inputs:
  argument numbers as List<Int>
  file dataset as Text with "raw content"

begin:
  show numbers
"#;
        let program = parse_program(source).unwrap();
        assert_eq!(program.inputs.len(), 2);
        assert_eq!(program.inputs[0].kind, InputKind::Argument);
        assert_eq!(program.inputs[0].type_hint, "List<Int>");
        assert_eq!(program.inputs[1].kind, InputKind::File);
        assert_eq!(program.inputs[1].description.as_deref(), Some("raw content"));
    }

    #[test]
    fn test_unquoted_input_description() {
        let err = parse_program("inputs:\n  argument n as Int with count\n").unwrap_err();
        assert!(matches!(err, ParseError::UnquotedDescription { line: 2, .. }));
    }

    #[test]
    fn test_comments_skipped() {
        let source = "# heading\nobject Thing:\n  # a comment\n  has size(Int)\n";
        let program = parse_program(source).unwrap();
        assert_eq!(program.objects["Thing"].fields.len(), 1);
    }

    #[test]
    fn test_unrecognised_top_level_line() {
        let err = parse_program("story \"x\"\nwhatever\n").unwrap_err();
        assert_eq!(err.line(), 2);
        assert_eq!(err.text(), "whatever");
    }

    #[test]
    fn test_invalid_field_names_object() {
        let err = parse_program("object Thing:\n  owns size\n").unwrap_err();
        match err {
            ParseError::InvalidField { object, line, .. } => {
                assert_eq!(object, "Thing");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_helper() {
        let source = "helper a returns Text:\n  prompt:\n<<<\nx\n>>>\nhelper a returns Text:\n  prompt:\n<<<\ny\n>>>\n";
        let err = parse_program(source).unwrap_err();
        assert!(matches!(err, ParseError::DuplicateHelper { line: 6, .. }));
    }

    #[test]
    fn test_duplicate_object() {
        let err = parse_program("object A:\n  has x(Int)\nobject A:\n").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateObject { line: 3, .. }));
    }

    #[test]
    fn test_helper_missing_prompt() {
        let err = parse_program("helper a returns Text:\n  needs x(Int)\nbegin:\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingPrompt { line: 1, .. }));
    }

    #[test]
    fn test_helper_bad_line() {
        let err = parse_program("helper a returns Text:\n  wants x\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHelperLine { line: 2, .. }));
    }

    #[test]
    fn test_prompt_missing_open_marker() {
        let err = parse_program("helper a returns Text:\n  prompt:\nhello\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingPromptOpen { line: 3, .. }));
    }

    #[test]
    fn test_prompt_not_closed() {
        let err = parse_program("helper a returns Text:\n  prompt:\n<<<\nhello\n").unwrap_err();
        assert!(matches!(err, ParseError::UnclosedPrompt { line: 3, .. }));
    }

    #[test]
    fn test_prompt_keeps_comment_lines() {
        let source = "helper a returns Text:\n  prompt:\n<<<\n# not a comment\n>>>\n";
        let program = parse_program(source).unwrap();
        assert_eq!(program.functions["a"].prompt, "# not a comment");
    }

    #[test]
    fn test_split_typed() {
        assert_eq!(
            split_typed("friend (Friend)"),
            Some(("friend".to_string(), "Friend".to_string()))
        );
        assert_eq!(
            split_typed("items(List<Text>)"),
            Some(("items".to_string(), "List<Text>".to_string()))
        );
        assert_eq!(split_typed("friend Friend"), None);
        assert_eq!(split_typed("(Friend)"), None);
    }
}
