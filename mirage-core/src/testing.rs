//! Testing utilities for story programs.
//!
//! This module provides tools for integration testing:
//! - `ScriptedService` for deterministic runs without API calls
//! - `TestHarness` for scripted program runs
//! - Assertion helpers for outputs and memory

use crate::interpreter::{CallReply, Interpreter, RunFailure, RunReport};
use crate::memory::MemoryValue;
use crate::parser::parse_program;
use crate::service::{ReasoningService, ServiceError};
use async_trait::async_trait;
use claude::{ContentBlock, Request, Response, StopReason, Usage};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// A reasoning service that returns scripted responses in order.
///
/// Every request is recorded so tests can inspect what was sent.
#[derive(Debug, Default)]
pub struct ScriptedService {
    /// Responses still to be returned.
    responses: Mutex<VecDeque<Response>>,
    /// Requests received so far.
    requests: Mutex<Vec<Request>>,
}

impl ScriptedService {
    /// Create a service with scripted responses.
    pub fn new(responses: Vec<Response>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Add a response to the queue.
    pub fn queue(&self, response: Response) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    /// Number of requests received.
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Copy of every request received, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The JSON payload of the last user message of request `index`.
    ///
    /// Panics if there is no such request or the message is not JSON.
    #[track_caller]
    pub fn payload(&self, index: usize) -> serde_json::Value {
        let requests = self.requests();
        let request = requests
            .get(index)
            .unwrap_or_else(|| panic!("Expected request #{index}, only {} sent", requests.len()));
        let text = request.last_user_text().unwrap_or_default();
        serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("Request #{index} payload is not JSON ({e}): {text}"))
    }

    /// A response that calls `record_result` with `reply`.
    pub fn reply(reply: CallReply) -> Response {
        Self::tool_call(CallReply::tool_name(), serde_json::json!(reply))
    }

    /// A response with a single tool call.
    pub fn tool_call(name: &str, input: serde_json::Value) -> Response {
        Self::tool_calls(vec![(name, input)])
    }

    /// A response with several tool calls, in order.
    pub fn tool_calls(calls: Vec<(&str, serde_json::Value)>) -> Response {
        let content = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, input))| ContentBlock::ToolUse {
                id: format!("toolu_scripted_{i}"),
                name: name.to_string(),
                input,
            })
            .collect();
        scripted_response(content, StopReason::ToolUse)
    }

    /// A plain text response.
    pub fn text(text: impl Into<String>) -> Response {
        scripted_response(vec![ContentBlock::Text { text: text.into() }], StopReason::EndTurn)
    }
}

fn scripted_response(content: Vec<ContentBlock>, stop_reason: StopReason) -> Response {
    Response {
        id: "msg_scripted".to_string(),
        model: "scripted".to_string(),
        content,
        stop_reason,
        usage: Usage::default(),
    }
}

#[async_trait]
impl ReasoningService for ScriptedService {
    async fn complete(&self, request: Request) -> Result<Response, ServiceError> {
        let call = {
            let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
            requests.push(request);
            requests.len()
        };
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or(ServiceError::Exhausted { call })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Test harness for running a story program against scripted replies.
pub struct TestHarness {
    /// Program source.
    pub source: String,
    /// Input values supplied to the run.
    pub inputs: HashMap<String, String>,
    /// The scripted service.
    pub service: ScriptedService,
}

impl TestHarness {
    /// Create a harness for `source` with no inputs and no replies.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            inputs: HashMap::new(),
            service: ScriptedService::default(),
        }
    }

    /// Supply an input value.
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Queue a `record_result` reply.
    pub fn expect_reply(self, reply: CallReply) -> Self {
        self.service.queue(ScriptedService::reply(reply));
        self
    }

    /// Parse and run the program.
    ///
    /// Panics if the source does not parse.
    pub async fn run(&self) -> Result<RunReport, RunFailure> {
        let program = match parse_program(&self.source) {
            Ok(program) => program,
            Err(e) => panic!("Test program failed to parse: {e}"),
        };
        Interpreter::new(&self.service)
            .run(&program, &self.inputs)
            .await
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that one output line equals `expected`.
#[track_caller]
pub fn assert_output_contains(outputs: &[String], expected: &str) {
    assert!(
        outputs.iter().any(|line| line == expected),
        "Expected output line '{expected}', got {outputs:#?}"
    );
}

/// Assert that a memory exists with the given type and description.
#[track_caller]
pub fn assert_memory(memory: &[MemoryValue], name: &str, type_hint: &str, description: &str) {
    let Some(value) = memory.iter().find(|v| v.name == name) else {
        panic!("Expected memory '{name}' to exist, got {memory:#?}");
    };
    assert_eq!(
        (value.type_hint.as_str(), value.description.as_str()),
        (type_hint, description),
        "Expected memory '{name}' to be [{type_hint}] = {description}"
    );
}

/// Assert that no memory has the given name.
#[track_caller]
pub fn assert_no_memory(memory: &[MemoryValue], name: &str) {
    assert!(
        memory.iter().all(|v| v.name != name),
        "Expected memory '{name}' to NOT exist"
    );
}

/// Assert how many requests the service received.
#[track_caller]
pub fn assert_calls(service: &ScriptedService, expected: usize) {
    let actual = service.call_count();
    assert_eq!(
        actual, expected,
        "Expected {expected} service calls, got {actual}"
    );
}
