//! Run-time failures.

use crate::memory::{MemoryError, MemoryValue};
use crate::model::InputKind;
use crate::service::ServiceError;
use std::path::PathBuf;
use thiserror::Error;

/// Error that aborts a program run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("missing value for {kind} input '{name}'")]
    MissingInput { name: String, kind: InputKind },

    #[error("helper '{name}' is not declared")]
    UnknownFunction { name: String },

    #[error("ask {function} is missing argument '{argument}'")]
    MissingArgument { function: String, argument: String },

    #[error("ask {function} got unexpected argument '{argument}'")]
    UnexpectedArgument { function: String, argument: String },

    #[error("memory '{name}' does not exist")]
    UnknownMemory { name: String },

    #[error("reply for helper '{function}' did not call record_result")]
    MissingReply { function: String },

    #[error("reply for helper '{function}' is malformed: {reason}")]
    MalformedReply { function: String, reason: String },

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("reasoning service failed: {0}")]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid input for tool '{tool}': {reason}")]
    InvalidToolInput { tool: String, reason: String },

    #[error("{0}")]
    Halted(String),

    #[error("no final answer after {0} turns")]
    TurnLimitExceeded(usize),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A failed run together with everything it produced before failing.
///
/// Nothing is rolled back: `outputs` and `memory` reflect the state at the
/// moment the error occurred.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: RuntimeError,
    pub outputs: Vec<String>,
    pub memory: Vec<MemoryValue>,
}
