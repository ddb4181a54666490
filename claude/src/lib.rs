//! Thin async client for Anthropic's Messages endpoint.
//!
//! Only what story programs need is covered: one-shot completions, tool
//! definitions with a forced or free tool choice, and the tool-use /
//! tool-result blocks that multi-turn tool loops exchange.

mod client;
mod error;
mod types;
mod wire;

pub use client::{Claude, DEFAULT_MODEL};
pub use error::Error;
pub use types::{
    ContentBlock, Message, Request, Response, Role, StopReason, Tool, ToolChoice, ToolResult,
    ToolUse, Usage,
};
