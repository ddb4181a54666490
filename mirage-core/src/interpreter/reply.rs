//! Response schema for ask calls.
//!
//! The service must answer every ask by calling the `record_result` tool;
//! the tool's input is deserialized into [`CallReply`].

use mirage_macros::Tool;
use serde::{Deserialize, Serialize};

/// Record the result of the helper call. Call this exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tool)]
#[tool(name = "record_result")]
pub struct CallReply {
    /// The value the helper returns
    pub result: ReturnBlock,

    /// Changes to other memories
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[tool(optional)]
    pub updates: Vec<MemoryUpdate>,

    /// Short messages for the person running the program
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[tool(optional)]
    pub notes: Vec<String>,
}

/// The returned value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tool)]
pub struct ReturnBlock {
    /// The answer as plain text
    pub value: String,

    /// Type of the answer, only when it differs from the declared return type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    #[tool(rename = "type")]
    pub type_hint: Option<String>,

    /// Optional remark kept in the memory's history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A change to a memory other than the call target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tool)]
pub struct MemoryUpdate {
    /// Name of the memory to change or create
    pub target: String,

    /// Type for the memory; required when creating a new one
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    #[tool(rename = "type")]
    pub type_hint: Option<String>,

    /// New description of the memory
    pub value: String,

    /// Optional remark kept in the memory's history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CallReply {
    /// A reply that only returns `value`.
    pub fn returning(value: impl Into<String>) -> Self {
        Self {
            result: ReturnBlock {
                value: value.into(),
                type_hint: None,
                note: None,
            },
            updates: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_update(mut self, target: impl Into<String>, value: impl Into<String>) -> Self {
        self.updates.push(MemoryUpdate {
            target: target.into(),
            type_hint: None,
            value: value.into(),
            note: None,
        });
        self
    }

    pub fn with_typed_update(
        mut self,
        target: impl Into<String>,
        type_hint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.updates.push(MemoryUpdate {
            target: target.into(),
            type_hint: Some(type_hint.into()),
            value: value.into(),
            note: None,
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_return_type(mut self, type_hint: impl Into<String>) -> Self {
        self.result.type_hint = Some(type_hint.into());
        self
    }
}
