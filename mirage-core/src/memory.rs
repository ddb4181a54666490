//! Named, insertion-ordered memory for a single program run.
//!
//! Each [`MemoryValue`] carries a type hint and a description that are
//! overwritten in place, plus an append-only history of notes. The store
//! keeps records in the order they were first created; [`MemoryStore::summary`]
//! renders them in that order for the reasoning service.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker rendered by [`MemoryStore::summary`] when nothing is remembered.
pub const EMPTY_MEMORY: &str = "(memory is empty)";

/// Errors from memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory '{name}' does not exist")]
    NotFound { name: String },
}

/// A single remembered value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryValue {
    pub name: String,
    #[serde(rename = "type")]
    pub type_hint: String,
    pub description: String,
    /// Notes attached over the run, oldest first.
    pub history: Vec<String>,
}

impl MemoryValue {
    /// `<name> [<type>] = <description>`
    pub fn render(&self) -> String {
        format!("{} [{}] = {}", self.name, self.type_hint, self.description)
    }

    fn annotate(&mut self, note: Option<&str>) {
        if let Some(note) = note.filter(|n| !n.is_empty()) {
            self.history.push(note.to_string());
        }
    }
}

/// The memory store owned by one interpreter run.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: IndexMap<String, MemoryValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a memory.
    ///
    /// An existing record keeps its position and history; its type and
    /// description are replaced. The note, if any, is always appended.
    pub fn remember(
        &mut self,
        name: impl Into<String>,
        type_hint: impl Into<String>,
        description: impl Into<String>,
        note: Option<&str>,
    ) -> &MemoryValue {
        let name = name.into();
        let type_hint = type_hint.into();
        let description = description.into();

        let value = self
            .values
            .entry(name.clone())
            .and_modify(|existing| {
                existing.type_hint.clone_from(&type_hint);
                existing.description.clone_from(&description);
            })
            .or_insert_with(|| MemoryValue {
                name,
                type_hint,
                description,
                history: Vec::new(),
            });
        value.annotate(note);
        value
    }

    /// Look up a memory by name.
    pub fn recall(&self, name: &str) -> Option<&MemoryValue> {
        self.values.get(name)
    }

    /// Replace the description of an existing memory.
    pub fn update(
        &mut self,
        name: &str,
        description: impl Into<String>,
        note: Option<&str>,
    ) -> Result<&MemoryValue, MemoryError> {
        let value = self
            .values
            .get_mut(name)
            .ok_or_else(|| MemoryError::NotFound {
                name: name.to_string(),
            })?;
        value.description = description.into();
        value.annotate(note);
        Ok(value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of every memory in insertion order.
    pub fn snapshot(&self) -> Vec<MemoryValue> {
        self.values.values().cloned().collect()
    }

    /// One `- <name> [<type>]: <description>` line per memory.
    pub fn summary(&self) -> String {
        if self.values.is_empty() {
            return EMPTY_MEMORY.to_string();
        }
        self.values
            .values()
            .map(|v| format!("- {} [{}]: {}", v.name, v.type_hint, v.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_then_recall() {
        let mut store = MemoryStore::new();
        store.remember("pet", "Animal", "a dog", None);
        store.remember("pet", "Creature", "a wolf", None);

        let pet = store.recall("pet").unwrap();
        assert_eq!(pet.type_hint, "Creature");
        assert_eq!(pet.description, "a wolf");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remember_appends_note_on_create_and_overwrite() {
        let mut store = MemoryStore::new();
        store.remember("pet", "Animal", "a dog", Some("adopted"));
        store.remember("pet", "Animal", "a big dog", Some("grew"));
        store.remember("pet", "Animal", "a big dog", None);

        assert_eq!(store.recall("pet").unwrap().history, vec!["adopted", "grew"]);
    }

    #[test]
    fn test_update_unknown_fails() {
        let mut store = MemoryStore::new();
        let err = store.update("ghost", "boo", None).unwrap_err();
        assert_eq!(
            err,
            MemoryError::NotFound {
                name: "ghost".into()
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_keeps_type() {
        let mut store = MemoryStore::new();
        store.remember("mood", "Text", "calm", None);
        let updated = store.update("mood", "cheerful", Some("after the joke")).unwrap();
        assert_eq!(updated.type_hint, "Text");
        assert_eq!(updated.description, "cheerful");
        assert_eq!(updated.history, vec!["after the joke"]);
    }

    #[test]
    fn test_snapshot_and_summary_keep_insertion_order() {
        let mut store = MemoryStore::new();
        store.remember("b", "Text", "second letter", None);
        store.remember("a", "Text", "first letter", None);
        store.remember("b", "Char", "bee", None);

        let names: Vec<_> = store.snapshot().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(
            store.summary(),
            "- b [Char]: bee\n- a [Text]: first letter"
        );
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(MemoryStore::new().summary(), EMPTY_MEMORY);
    }

    #[test]
    fn test_render() {
        let mut store = MemoryStore::new();
        let value = store.remember("count", "Int", "3", None);
        assert_eq!(value.render(), "count [Int] = 3");
    }
}
