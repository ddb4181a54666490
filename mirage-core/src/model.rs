//! Program model produced by the parser.
//!
//! A [`Program`] is plain data: it is built once by [`crate::parser`] and
//! never mutated afterwards. Object and helper tables keep their source
//! order, since that order is visible to the reasoning service.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title used when a program has no `story "..."` line.
pub const DEFAULT_TITLE: &str = "Untitled Mirage";

/// A parsed story program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub title: String,
    pub objects: IndexMap<String, ObjectDef>,
    pub functions: IndexMap<String, FunctionDef>,
    pub inputs: Vec<InputDecl>,
    pub statements: Vec<Statement>,
}

impl Program {
    /// Look up a helper by name.
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            objects: IndexMap::new(),
            functions: IndexMap::new(),
            inputs: Vec::new(),
            statements: Vec::new(),
        }
    }
}

/// A descriptive object schema. Never executed; shown to the service as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// One `has <name>(<type>)` line of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A helper declaration: parameters, return type and an opaque prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub arguments: Vec<FunctionArg>,
    pub return_type: String,
    pub prompt: String,
}

impl FunctionDef {
    /// Is `name` one of this helper's declared parameters?
    pub fn declares(&self, name: &str) -> bool {
        self.arguments.iter().any(|a| a.name == name)
    }
}

/// A declared helper parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionArg {
    pub name: String,
    pub type_hint: String,
}

/// Where a runtime input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Argument,
    File,
}

impl InputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InputKind::Argument => "argument",
            InputKind::File => "file",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value the caller must supply before the program runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDecl {
    pub kind: InputKind,
    pub name: String,
    pub type_hint: String,
    pub description: Option<String>,
}

/// A statement in the `begin:` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    /// `remember <name> as <type> with "<description>"`
    Remember {
        name: String,
        type_hint: String,
        description: String,
    },
    /// `ask <function> for:` ... `keep answer as <target>`
    Call {
        function: String,
        arguments: Vec<CallArgument>,
        target: String,
    },
    /// `show <name>` / `show memory <name>`
    Show { value: ValueToken },
    /// `note "<text>"`
    Note { text: String },
}

impl Statement {
    /// Short keyword for logging.
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Remember { .. } => "remember",
            Statement::Call { .. } => "ask",
            Statement::Show { .. } => "show",
            Statement::Note { .. } => "note",
        }
    }
}

/// `<param> is <value>` inside an ask block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallArgument {
    pub name: String,
    pub value: ValueToken,
}

/// A statement operand: literal text or a memory reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ValueToken {
    Literal(String),
    Reference(String),
}

#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn test_default_program() {
        let program = Program::default();
        assert_eq!(program.title, DEFAULT_TITLE);
        assert!(program.statements.is_empty());
    }
}
