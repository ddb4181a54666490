//! The statement interpreter.
//!
//! Runs a [`Program`] one statement at a time against a [`MemoryStore`].
//! `ask` statements are the only ones that leave the process: each one
//! becomes exactly one [`ReasoningService::complete`] call whose reply must
//! use the `record_result` tool.

mod error;
mod reply;
mod request;
mod template;

pub use error::{RunFailure, RuntimeError};
pub use reply::{CallReply, MemoryUpdate, ReturnBlock};
pub use request::{ArgumentPayload, Exchange};
pub use template::interpolate;

use crate::config::InterpreterConfig;
use crate::memory::{MemoryStore, MemoryValue};
use crate::model::{CallArgument, FunctionDef, Program, Statement, ValueToken};
use crate::service::ReasoningService;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Type given to memories created by an update that names no type.
pub const FALLBACK_TYPE: &str = "Unknown";

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outputs: Vec<String>,
    pub memory: Vec<MemoryValue>,
}

/// Executes programs statement by statement.
pub struct Interpreter<S> {
    service: S,
    config: InterpreterConfig,
    memory: MemoryStore,
    outputs: Vec<String>,
    /// Per-helper request/reply history for this run.
    exchanges: HashMap<String, Vec<Exchange>>,
}

impl<S: ReasoningService> Interpreter<S> {
    /// Create an interpreter with the default configuration.
    pub fn new(service: S) -> Self {
        Self::with_config(service, InterpreterConfig::default())
    }

    pub fn with_config(service: S, config: InterpreterConfig) -> Self {
        Self {
            service,
            config,
            memory: MemoryStore::new(),
            outputs: Vec::new(),
            exchanges: HashMap::new(),
        }
    }

    /// Run `program` with the caller-supplied input values.
    ///
    /// File inputs must already be resolved to their text. On failure the
    /// outputs and memory produced so far come back inside [`RunFailure`].
    pub async fn run(
        mut self,
        program: &Program,
        inputs: &HashMap<String, String>,
    ) -> Result<RunReport, RunFailure> {
        info!(
            title = %program.title,
            statements = program.statements.len(),
            service = self.service.name(),
            "starting run"
        );

        match self.execute(program, inputs).await {
            Ok(()) => {
                info!(outputs = self.outputs.len(), memories = self.memory.len(), "run finished");
                Ok(RunReport {
                    outputs: self.outputs,
                    memory: self.memory.snapshot(),
                })
            }
            Err(error) => {
                warn!(%error, "run failed");
                Err(RunFailure {
                    error,
                    outputs: self.outputs,
                    memory: self.memory.snapshot(),
                })
            }
        }
    }

    async fn execute(
        &mut self,
        program: &Program,
        inputs: &HashMap<String, String>,
    ) -> Result<(), RuntimeError> {
        self.seed_inputs(program, inputs)?;

        for (index, statement) in program.statements.iter().enumerate() {
            debug!(index, kind = statement.keyword(), "executing statement");
            match statement {
                Statement::Remember {
                    name,
                    type_hint,
                    description,
                } => self.remember(name, type_hint, description),
                Statement::Call {
                    function,
                    arguments,
                    target,
                } => self.call(program, function, arguments, target).await?,
                Statement::Show { value } => self.show(value)?,
                Statement::Note { text } => self.emit(format!("[note] {text}")),
            }
        }

        Ok(())
    }

    /// Check every declared input is supplied, then seed them into memory.
    fn seed_inputs(
        &mut self,
        program: &Program,
        inputs: &HashMap<String, String>,
    ) -> Result<(), RuntimeError> {
        if let Some(missing) = program
            .inputs
            .iter()
            .find(|decl| !inputs.contains_key(&decl.name))
        {
            return Err(RuntimeError::MissingInput {
                name: missing.name.clone(),
                kind: missing.kind,
            });
        }

        for name in inputs.keys() {
            if !program.inputs.iter().any(|decl| &decl.name == name) {
                warn!(input = %name, "supplied input is not declared by the program");
            }
        }

        for decl in &program.inputs {
            let Some(value) = inputs.get(&decl.name) else {
                continue;
            };
            let line = self
                .memory
                .remember(&decl.name, &decl.type_hint, value, None)
                .render();
            self.emit(format!("[input] {line}"));
        }

        Ok(())
    }

    fn remember(&mut self, name: &str, type_hint: &str, description: &str) {
        let description = interpolate(description, &self.memory);
        let line = self
            .memory
            .remember(name, type_hint, description, None)
            .render();
        self.emit(format!("[remember] {line}"));
    }

    fn show(&mut self, value: &ValueToken) -> Result<(), RuntimeError> {
        let line = match value {
            ValueToken::Reference(name) => self
                .memory
                .recall(name)
                .map(MemoryValue::render)
                .ok_or_else(|| RuntimeError::UnknownMemory { name: name.clone() })?,
            ValueToken::Literal(text) => text.clone(),
        };
        self.emit(line);
        Ok(())
    }

    async fn call(
        &mut self,
        program: &Program,
        function_name: &str,
        arguments: &[CallArgument],
        target: &str,
    ) -> Result<(), RuntimeError> {
        let function =
            program
                .function(function_name)
                .ok_or_else(|| RuntimeError::UnknownFunction {
                    name: function_name.to_string(),
                })?;

        let resolved = self.resolve_arguments(function, arguments)?;
        let payload =
            request::render_payload(program, function, &resolved, &self.memory.summary())?;
        let history = self
            .exchanges
            .get(function_name)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let request = request::build_request(&self.config, history, &payload);

        info!(
            helper = function_name,
            prior_exchanges = history.len(),
            "asking reasoning service"
        );
        let response = self.service.complete(request).await?;

        let tool_use = response
            .tool_uses()
            .into_iter()
            .find(|t| t.name == CallReply::tool_name())
            .ok_or_else(|| RuntimeError::MissingReply {
                function: function_name.to_string(),
            })?;
        let reply: CallReply = serde_json::from_value(tool_use.input.clone()).map_err(|e| {
            RuntimeError::MalformedReply {
                function: function_name.to_string(),
                reason: e.to_string(),
            }
        })?;

        self.apply_reply(function, target, &reply)?;

        self.exchanges
            .entry(function_name.to_string())
            .or_default()
            .push(Exchange {
                request: payload,
                reply: serde_json::to_string_pretty(&tool_use.input)?,
            });
        Ok(())
    }

    /// Match supplied arguments against the helper's parameters.
    ///
    /// The result is in declaration order. References are read from memory
    /// now, so later changes to that memory do not affect this call.
    fn resolve_arguments(
        &self,
        function: &FunctionDef,
        arguments: &[CallArgument],
    ) -> Result<Vec<ArgumentPayload>, RuntimeError> {
        let mut seen = HashSet::new();
        for argument in arguments {
            if !function.declares(&argument.name) || !seen.insert(argument.name.as_str()) {
                return Err(RuntimeError::UnexpectedArgument {
                    function: function.name.clone(),
                    argument: argument.name.clone(),
                });
            }
        }

        function
            .arguments
            .iter()
            .map(|param| {
                let supplied = arguments
                    .iter()
                    .find(|a| a.name == param.name)
                    .ok_or_else(|| RuntimeError::MissingArgument {
                        function: function.name.clone(),
                        argument: param.name.clone(),
                    })?;

                let (value, source) = match &supplied.value {
                    ValueToken::Literal(text) => (text.clone(), "literal".to_string()),
                    ValueToken::Reference(name) => {
                        let memory = self
                            .memory
                            .recall(name)
                            .ok_or_else(|| RuntimeError::UnknownMemory { name: name.clone() })?;
                        (memory.description.clone(), format!("memory {name}"))
                    }
                };

                Ok(ArgumentPayload {
                    name: param.name.clone(),
                    type_hint: param.type_hint.clone(),
                    value,
                    source,
                })
            })
            .collect()
    }

    fn apply_reply(
        &mut self,
        function: &FunctionDef,
        target: &str,
        reply: &CallReply,
    ) -> Result<(), RuntimeError> {
        let result = &reply.result;
        let return_type = result
            .type_hint
            .as_deref()
            .unwrap_or(&function.return_type);
        let line = self
            .memory
            .remember(target, return_type, &result.value, result.note.as_deref())
            .render();
        self.emit(format!("[ask {}] {line}", function.name));

        for update in &reply.updates {
            let value = match &update.type_hint {
                Some(type_hint) => self.memory.remember(
                    &update.target,
                    type_hint,
                    &update.value,
                    update.note.as_deref(),
                ),
                None if !self.memory.contains(&update.target) => {
                    warn!(
                        helper = %function.name,
                        target = %update.target,
                        "update names an unknown memory without a type; creating it"
                    );
                    self.memory.remember(
                        &update.target,
                        FALLBACK_TYPE,
                        &update.value,
                        update.note.as_deref(),
                    )
                }
                None => {
                    self.memory
                        .update(&update.target, &update.value, update.note.as_deref())?
                }
            };
            let line = value.render();
            self.emit(format!("[update] {line}"));
        }

        for note in &reply.notes {
            self.emit(format!("[{}] {note}", function.name));
        }

        Ok(())
    }

    fn emit(&mut self, line: String) {
        debug!(output = %line, "output");
        self.outputs.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::testing::{assert_output_contains, ScriptedService};

    fn inputs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const GREET: &str = r#"helper greet returns Text:
  needs name(Text)
  prompt:
<<<
Greet them.
>>>
"#;

    #[tokio::test]
    async fn test_remember_interpolates_and_shows() {
        let mut program = parse_program(
            "begin:\n  remember x as Text with \"cat\"\n  remember pair as Text with \"{x} and {y}\"\n  show pair\n",
        )
        .unwrap();
        // The grammar only produces references for show; literals come from the model.
        program.statements.push(Statement::Show {
            value: ValueToken::Literal("done".into()),
        });
        let service = ScriptedService::new(vec![]);
        let report = Interpreter::new(&service)
            .run(&program, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(
            report.outputs,
            vec![
                "[remember] x [Text] = cat",
                "[remember] pair [Text] = cat and {y}",
                "pair [Text] = cat and {y}",
                "done",
            ]
        );
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_statements() {
        let program =
            parse_program("inputs:\n  argument count as Int\nbegin:\n  note \"never\"\n").unwrap();
        let failure = Interpreter::new(ScriptedService::new(vec![]))
            .run(&program, &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            RuntimeError::MissingInput { ref name, .. } if name == "count"
        ));
        assert!(failure.outputs.is_empty());
    }

    #[tokio::test]
    async fn test_show_unknown_memory_keeps_prior_output() {
        let program =
            parse_program("begin:\n  note \"first\"\n  show ghost\n  note \"never\"\n").unwrap();
        let failure = Interpreter::new(ScriptedService::new(vec![]))
            .run(&program, &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, RuntimeError::UnknownMemory { .. }));
        assert_eq!(failure.outputs, vec!["[note] first"]);
    }

    #[tokio::test]
    async fn test_unexpected_argument_fails_before_service() {
        let source = format!(
            "{GREET}begin:\n  ask greet for:\n    name is \"Milo\"\n    mood is \"happy\"\n  keep answer as hello\n"
        );
        let program = parse_program(&source).unwrap();
        let service = ScriptedService::new(vec![]);
        let failure = Interpreter::new(&service)
            .run(&program, &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            RuntimeError::UnexpectedArgument { ref argument, .. } if argument == "mood"
        ));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_argument_fails_before_service() {
        let source = format!("{GREET}begin:\n  ask greet for:\n  keep answer as hello\n");
        let program = parse_program(&source).unwrap();
        let service = ScriptedService::new(vec![]);
        let failure = Interpreter::new(&service)
            .run(&program, &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            RuntimeError::MissingArgument { ref argument, .. } if argument == "name"
        ));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reference_to_unknown_memory_fails_before_service() {
        let source =
            format!("{GREET}begin:\n  ask greet for:\n    name is ghost\n  keep answer as hello\n");
        let program = parse_program(&source).unwrap();
        let service = ScriptedService::new(vec![]);
        let failure = Interpreter::new(&service)
            .run(&program, &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            RuntimeError::UnknownMemory { ref name } if name == "ghost"
        ));
        assert!(failure.outputs.is_empty());
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reference_argument_snapshots_description() {
        let source = format!(
            "{GREET}begin:\n  remember who as Text with \"Milo\"\n  ask greet for:\n    name is who\n  keep answer as hello\n"
        );
        let program = parse_program(&source).unwrap();
        let service = ScriptedService::new(vec![ScriptedService::reply(
            CallReply::returning("hi Milo").with_update("who", "Milo the Great"),
        )]);
        let report = Interpreter::new(&service)
            .run(&program, &HashMap::new())
            .await
            .unwrap();

        let payload = service.payload(0);
        assert_eq!(payload["arguments"][0]["value"], "Milo");
        assert_eq!(payload["arguments"][0]["source"], "memory who");
        assert_output_contains(&report.outputs, "[update] who [Text] = Milo the Great");
    }

    #[tokio::test]
    async fn test_typed_update_and_return_type_override() {
        let source = format!(
            "{GREET}begin:\n  ask greet for:\n    name is \"Milo\"\n  keep answer as hello\n"
        );
        let program = parse_program(&source).unwrap();
        let service = ScriptedService::new(vec![ScriptedService::reply(
            CallReply::returning("hi")
                .with_return_type("Greeting")
                .with_typed_update("pet", "Animal", "dog")
                .with_note("greeted warmly"),
        )]);
        let report = Interpreter::new(&service)
            .run(&program, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(
            report.outputs,
            vec![
                "[ask greet] hello [Greeting] = hi",
                "[update] pet [Animal] = dog",
                "[greet] greeted warmly",
            ]
        );
    }

    #[tokio::test]
    async fn test_untyped_update_of_unknown_memory_uses_fallback_type() {
        let source = format!(
            "{GREET}begin:\n  ask greet for:\n    name is \"Milo\"\n  keep answer as hello\n"
        );
        let program = parse_program(&source).unwrap();
        let service = ScriptedService::new(vec![ScriptedService::reply(
            CallReply::returning("hi").with_update("mood", "cheerful"),
        )]);
        let report = Interpreter::new(&service)
            .run(&program, &HashMap::new())
            .await
            .unwrap();

        let mood = report.memory.iter().find(|m| m.name == "mood").unwrap();
        assert_eq!(mood.type_hint, FALLBACK_TYPE);
        assert_eq!(mood.description, "cheerful");
    }

    #[tokio::test]
    async fn test_reply_without_tool_call() {
        let source = format!(
            "{GREET}begin:\n  ask greet for:\n    name is \"Milo\"\n  keep answer as hello\n"
        );
        let program = parse_program(&source).unwrap();
        let service = ScriptedService::new(vec![ScriptedService::text("hello there")]);
        let failure = Interpreter::new(&service)
            .run(&program, &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, RuntimeError::MissingReply { .. }));
        assert!(failure.memory.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let source = format!(
            "{GREET}begin:\n  ask greet for:\n    name is \"Milo\"\n  keep answer as hello\n"
        );
        let program = parse_program(&source).unwrap();
        let service = ScriptedService::new(vec![ScriptedService::tool_call(
            "record_result",
            serde_json::json!({"updates": []}),
        )]);
        let failure = Interpreter::new(&service)
            .run(&program, &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, RuntimeError::MalformedReply { .. }));
    }

    #[tokio::test]
    async fn test_inputs_are_seeded_in_declaration_order() {
        let program = parse_program(
            "inputs:\n  argument b as Int\n  argument a as Text\nbegin:\n  show a\n",
        )
        .unwrap();
        let report = Interpreter::new(ScriptedService::new(vec![]))
            .run(&program, &inputs(&[("a", "x"), ("b", "2"), ("extra", "?")]))
            .await
            .unwrap();

        assert_eq!(
            report.outputs,
            vec!["[input] b [Int] = 2", "[input] a [Text] = x", "a [Text] = x"]
        );
        assert_eq!(report.memory.len(), 2);
    }
}
