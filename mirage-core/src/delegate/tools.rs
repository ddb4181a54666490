//! Tools offered to the service in delegating mode.

use crate::interpreter::RuntimeError;
use crate::model::InputKind;
use claude::Tool as ToolDefinition;
use mirage_macros::Tool;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Append a human-visible line to the terminal output.
#[derive(Debug, Clone, Deserialize, Tool)]
pub struct EmitOutput {
    /// Line to print back to the programmer
    pub text: String,
}

/// List the available argument and file input names.
#[derive(Debug, Clone, Deserialize, Tool)]
pub struct ListInputs {}

/// Fetch the value for a declared argument or file input. File inputs return their full text content.
#[derive(Debug, Clone, Deserialize, Tool)]
pub struct GetInput {
    /// Name of the input
    pub name: String,

    /// Optional explicit input kind
    #[tool(values = "argument,file")]
    pub kind: Option<String>,
}

/// Retrieve the entire program source again.
#[derive(Debug, Clone, Deserialize, Tool)]
pub struct ReadSource {}

/// Read a UTF-8 text file. Relative paths are resolved against the program's directory.
#[derive(Debug, Clone, Deserialize, Tool)]
pub struct ReadFile {
    /// Path of the file to read
    pub path: String,
}

/// Write UTF-8 content to a file. Relative paths are resolved against the program's directory.
#[derive(Debug, Clone, Deserialize, Tool)]
pub struct SaveFile {
    /// Path of the file to write
    pub path: String,
    /// Full content of the file
    pub content: String,
}

/// Abort execution and surface a message to the programmer.
#[derive(Debug, Clone, Deserialize, Tool)]
pub struct RaiseError {
    /// Why the program cannot continue
    #[serde(default)]
    pub message: String,
}

/// Every tool definition, in the order they are offered.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        EmitOutput::as_tool(),
        ListInputs::as_tool(),
        GetInput::as_tool(),
        ReadSource::as_tool(),
        ReadFile::as_tool(),
        SaveFile::as_tool(),
        RaiseError::as_tool(),
    ]
}

/// A decoded tool call.
#[derive(Debug, Clone)]
pub enum ToolCall {
    EmitOutput(EmitOutput),
    ListInputs,
    GetInput {
        name: String,
        kind: Option<InputKind>,
    },
    ReadSource,
    ReadFile(ReadFile),
    SaveFile(SaveFile),
    RaiseError(RaiseError),
}

impl ToolCall {
    /// Decode a tool call by name, validating its input.
    pub fn parse(name: &str, input: serde_json::Value) -> Result<Self, RuntimeError> {
        let call = match name {
            "emit_output" => ToolCall::EmitOutput(decode(name, input)?),
            "list_inputs" => ToolCall::ListInputs,
            "get_input" => {
                let GetInput { name: input_name, kind } = decode(name, input)?;
                if input_name.trim().is_empty() {
                    return Err(invalid(name, "'name' must not be empty"));
                }
                let kind = match kind.as_deref() {
                    None => None,
                    Some("argument") => Some(InputKind::Argument),
                    Some("file") => Some(InputKind::File),
                    Some(other) => {
                        return Err(invalid(
                            name,
                            format!("kind must be 'argument' or 'file', got '{other}'"),
                        ))
                    }
                };
                ToolCall::GetInput {
                    name: input_name,
                    kind,
                }
            }
            "read_source" => ToolCall::ReadSource,
            "read_file" => {
                let read: ReadFile = decode(name, input)?;
                if read.path.trim().is_empty() {
                    return Err(invalid(name, "'path' must not be empty"));
                }
                ToolCall::ReadFile(read)
            }
            "save_file" => {
                let save: SaveFile = decode(name, input)?;
                if save.path.trim().is_empty() {
                    return Err(invalid(name, "'path' must not be empty"));
                }
                ToolCall::SaveFile(save)
            }
            "raise_error" => ToolCall::RaiseError(decode(name, input)?),
            other => return Err(RuntimeError::UnknownTool(other.to_string())),
        };
        Ok(call)
    }
}

fn decode<T: DeserializeOwned>(tool: &str, input: serde_json::Value) -> Result<T, RuntimeError> {
    serde_json::from_value(input).map_err(|e| invalid(tool, e.to_string()))
}

fn invalid(tool: &str, reason: impl Into<String>) -> RuntimeError {
    RuntimeError::InvalidToolInput {
        tool: tool.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definitions() {
        let names: Vec<_> = definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "emit_output",
                "list_inputs",
                "get_input",
                "read_source",
                "read_file",
                "save_file",
                "raise_error"
            ]
        );
    }

    #[test]
    fn test_get_input_schema() {
        let schema = GetInput::input_schema();
        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(schema["properties"]["kind"]["enum"], json!(["argument", "file"]));
    }

    #[test]
    fn test_parse_get_input() {
        let call = ToolCall::parse("get_input", json!({"name": "data", "kind": "file"})).unwrap();
        assert!(matches!(
            call,
            ToolCall::GetInput { ref name, kind: Some(InputKind::File) } if name == "data"
        ));
    }

    #[test]
    fn test_parse_rejects_bad_kind() {
        let err = ToolCall::parse("get_input", json!({"name": "data", "kind": "env"})).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidToolInput { .. }));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let err = ToolCall::parse("emit_output", json!({})).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InvalidToolInput { ref tool, .. } if tool == "emit_output"
        ));
    }

    #[test]
    fn test_parse_unknown_tool() {
        let err = ToolCall::parse("launch_rockets", json!({})).unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownTool(ref name) if name == "launch_rockets"));
    }

    #[test]
    fn test_raise_error_message_optional() {
        let call = ToolCall::parse("raise_error", json!({})).unwrap();
        assert!(matches!(
            call,
            ToolCall::RaiseError(RaiseError { ref message }) if message.is_empty()
        ));
    }
}
