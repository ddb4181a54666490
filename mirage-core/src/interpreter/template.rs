//! `{name}` placeholder interpolation.

use crate::memory::MemoryStore;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Replace each `{name}` with the current description of memory `name`.
///
/// Placeholders naming an unknown memory are left as written.
pub fn interpolate(text: &str, memory: &MemoryStore) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| match memory.recall(&caps[1]) {
            Some(value) => value.description.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
