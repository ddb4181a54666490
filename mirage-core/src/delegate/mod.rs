//! Delegating interpreter.
//!
//! Instead of executing statements itself, this mode hands the whole program
//! to the reasoning service and lets it act as the interpreter. The service
//! works through a small set of tools (see [`tools`]); the loop ends when it
//! replies without calling any.

pub mod tools;

use crate::config::InterpreterConfig;
use crate::interpreter::{RunFailure, RuntimeError};
use crate::model::InputKind;
use crate::service::ReasoningService;
use claude::{Message, Request, ToolChoice, ToolResult, ToolUse};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tools::{ReadFile, SaveFile, ToolCall};
use tracing::{debug, info, warn};

/// Message used when `raise_error` is called without one.
pub const DEFAULT_HALT_MESSAGE: &str = "Interpreter halted as requested by the program.";

/// Result of a delegated run.
#[derive(Debug, Clone)]
pub struct DelegateReport {
    /// Lines emitted through `emit_output`, in order.
    pub outputs: Vec<String>,
    /// Closing text of the service, if any.
    pub final_message: Option<String>,
    /// Full conversation, starting with the initial user message.
    pub transcript: Vec<Message>,
}

/// Runs a program by letting the service interpret it through tools.
pub struct DelegatingInterpreter<S> {
    service: S,
    config: InterpreterConfig,
    source_path: PathBuf,
    source_text: String,
    arguments: BTreeMap<String, String>,
    files: BTreeMap<String, PathBuf>,
    outputs: Vec<String>,
}

impl<S: ReasoningService> DelegatingInterpreter<S> {
    pub fn new(
        service: S,
        source_path: impl Into<PathBuf>,
        source_text: impl Into<String>,
    ) -> Self {
        Self {
            service,
            config: InterpreterConfig::default(),
            source_path: source_path.into(),
            source_text: source_text.into(),
            arguments: BTreeMap::new(),
            files: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Argument inputs, by name.
    pub fn with_arguments(mut self, arguments: HashMap<String, String>) -> Self {
        self.arguments.extend(arguments);
        self
    }

    /// File inputs, by name. Files are read when the service asks for them.
    pub fn with_files(mut self, files: HashMap<String, PathBuf>) -> Self {
        self.files.extend(files);
        self
    }

    /// Run the conversation until the service stops calling tools.
    pub async fn run(mut self) -> Result<DelegateReport, RunFailure> {
        let mut transcript = vec![Message::user(self.initial_message())];

        info!(
            source = %self.source_path.display(),
            service = self.service.name(),
            "starting delegated run"
        );

        match self.converse(&mut transcript).await {
            Ok(final_message) => {
                info!(
                    outputs = self.outputs.len(),
                    messages = transcript.len(),
                    "delegated run finished"
                );
                Ok(DelegateReport {
                    outputs: self.outputs,
                    final_message,
                    transcript,
                })
            }
            Err(error) => {
                warn!(%error, "delegated run failed");
                Err(RunFailure {
                    error,
                    outputs: self.outputs,
                    memory: Vec::new(),
                })
            }
        }
    }

    async fn converse(
        &mut self,
        transcript: &mut Vec<Message>,
    ) -> Result<Option<String>, RuntimeError> {
        let tools = tools::definitions();

        for turn in 0..self.config.max_turns {
            let request = self.config.apply(
                Request::new(transcript.clone())
                    .with_system(self.config.delegate_instructions.clone())
                    .with_tools(tools.clone())
                    .with_tool_choice(ToolChoice::Auto),
            );

            debug!(turn, "sending delegated turn");
            let response = self.service.complete(request).await?;
            transcript.push(response.to_message());

            let tool_uses = response.tool_uses();
            if tool_uses.is_empty() {
                let text = response.text();
                return Ok((!text.trim().is_empty()).then_some(text));
            }

            let mut results = Vec::with_capacity(tool_uses.len());
            for tool_use in tool_uses {
                let result = self.execute_tool(&tool_use).await?;
                results.push(ToolResult::success(result.to_string()).into_block(tool_use.id));
            }
            transcript.push(Message::tool_results(results));
        }

        Err(RuntimeError::TurnLimitExceeded(self.config.max_turns))
    }

    async fn execute_tool(&mut self, tool_use: &ToolUse) -> Result<Value, RuntimeError> {
        debug!(tool = %tool_use.name, "executing tool");

        match ToolCall::parse(&tool_use.name, tool_use.input.clone())? {
            ToolCall::EmitOutput(emit) => {
                self.outputs.push(emit.text);
                Ok(json!({"status": "ok"}))
            }
            ToolCall::ListInputs => Ok(json!({
                "arguments": self.arguments.keys().collect::<Vec<_>>(),
                "files": self.files.keys().collect::<Vec<_>>(),
            })),
            ToolCall::GetInput { name, kind } => self.get_input(&name, kind).await,
            ToolCall::ReadSource => Ok(json!({
                "path": self.source_path.display().to_string(),
                "content": self.source_text,
            })),
            ToolCall::ReadFile(read) => Ok(self.read_file(read).await),
            ToolCall::SaveFile(save) => self.save_file(save).await,
            ToolCall::RaiseError(raise) => {
                let message = if raise.message.trim().is_empty() {
                    DEFAULT_HALT_MESSAGE.to_string()
                } else {
                    raise.message
                };
                Err(RuntimeError::Halted(message))
            }
        }
    }

    async fn get_input(&self, name: &str, kind: Option<InputKind>) -> Result<Value, RuntimeError> {
        if kind != Some(InputKind::File) {
            if let Some(value) = self.arguments.get(name) {
                return Ok(json!({
                    "kind": "argument",
                    "name": name,
                    "value": value,
                    "available": true,
                }));
            }
        }

        if kind != Some(InputKind::Argument) {
            if let Some(path) = self.files.get(name) {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| RuntimeError::Io {
                        path: path.clone(),
                        source,
                    })?;
                return Ok(json!({
                    "kind": "file",
                    "name": name,
                    "path": path.display().to_string(),
                    "value": content,
                    "available": true,
                }));
            }
        }

        Ok(json!({
            "kind": kind.map_or("unknown", InputKind::as_str),
            "name": name,
            "available": false,
        }))
    }

    async fn read_file(&self, read: ReadFile) -> Value {
        let target = self.resolve_path(&read.path);
        match tokio::fs::read_to_string(&target).await {
            Ok(content) => json!({
                "path": target.display().to_string(),
                "available": true,
                "content": content,
            }),
            Err(e) => json!({
                "path": target.display().to_string(),
                "available": false,
                "error": e.to_string(),
            }),
        }
    }

    async fn save_file(&self, save: SaveFile) -> Result<Value, RuntimeError> {
        let target = self.resolve_path(&save.path);
        let io_error = |source| RuntimeError::Io {
            path: target.clone(),
            source,
        };

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&target, save.content.as_bytes())
            .await
            .map_err(io_error)?;

        info!(path = %target.display(), bytes = save.content.len(), "saved file");
        Ok(json!({
            "path": target.display().to_string(),
            "bytes_written": save.content.len(),
        }))
    }

    /// Resolve a tool path. Relative paths land next to the program.
    fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = expand_home(raw);
        if path.is_absolute() {
            return path;
        }
        self.source_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(path)
    }

    fn initial_message(&self) -> String {
        let names = |keys: Vec<&String>| {
            if keys.is_empty() {
                "(none provided)".to_string()
            } else {
                keys.into_iter().cloned().collect::<Vec<_>>().join(", ")
            }
        };

        format!(
            "Program path: {}\n\
             Program source between <<< and >>> markers.\n\
             <<<\n{}\n>>>\n\n\
             Inputs supplied on the command line:\n\
             - arguments: {}\n\
             - files: {}\n\
             Use list_inputs and get_input to inspect their values when needed.",
            self.source_path.display(),
            self.source_text,
            names(self.arguments.keys().collect()),
            names(self.files.keys().collect()),
        )
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}
