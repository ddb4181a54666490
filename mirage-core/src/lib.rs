//! Mirage: story programs executed with an AI reasoning service.
//!
//! A story program declares objects, inputs and helpers, then runs a
//! `begin:` block of statements. Every statement runs locally except `ask`,
//! which hands one helper call to a [`ReasoningService`].
//!
//! # Architecture
//!
//! - [`parser`]: source text to [`Program`]
//! - [`memory`]: the insertion-ordered [`MemoryStore`]
//! - [`interpreter`]: statement-by-statement execution
//! - [`delegate`]: the service interprets the whole program through tools
//! - [`service`]: the seam between the core and the transport
//!
//! # Example
//!
//! ```ignore
//! use mirage_core::{run_source, InterpreterConfig};
//! use std::collections::HashMap;
//!
//! let client = claude::Claude::from_env()?;
//! let report = run_source(source, &HashMap::new(), client, InterpreterConfig::default()).await?;
//! for line in report.outputs {
//!     println!("{line}");
//! }
//! ```

pub mod config;
pub mod delegate;
pub mod interpreter;
pub mod memory;
pub mod model;
pub mod parser;
pub mod service;
pub mod testing;

pub use config::InterpreterConfig;
pub use delegate::{DelegateReport, DelegatingInterpreter};
pub use interpreter::{CallReply, Interpreter, RunFailure, RunReport, RuntimeError};
pub use memory::{MemoryError, MemoryStore, MemoryValue};
pub use model::{Program, Statement, ValueToken};
pub use parser::{parse_program, ParseError};
pub use service::{ReasoningService, ServiceError};

use std::collections::HashMap;
use thiserror::Error;

/// Any failure of [`run_source`].
#[derive(Debug, Error)]
pub enum MirageError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Run(#[from] RunFailure),
}

/// Parse `source` and run it with the statement interpreter.
///
/// `inputs` maps each declared input to its value; file inputs must already
/// be read to text.
pub async fn run_source<S: ReasoningService>(
    source: &str,
    inputs: &HashMap<String, String>,
    service: S,
    config: InterpreterConfig,
) -> Result<RunReport, MirageError> {
    let program = parse_program(source)?;
    Ok(Interpreter::with_config(service, config)
        .run(&program, inputs)
        .await?)
}
