//! Command-line arguments.

use anyhow::{bail, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

/// Run story programs with an AI reasoning service.
#[derive(Parser, Debug)]
#[command(name = "mirage", version, about)]
pub struct Args {
    /// Path to the story program
    pub source: PathBuf,

    /// Environment file with ANTHROPIC_API_KEY
    #[arg(long = "env", value_name = "PATH", default_value = ".env")]
    pub env_path: PathBuf,

    /// Value for an argument input declared by the program
    #[arg(long = "arg", value_name = "NAME=VALUE")]
    pub args: Vec<String>,

    /// Path for a file input declared by the program
    #[arg(long = "file", value_name = "NAME=PATH")]
    pub files: Vec<String>,

    /// Let the model interpret the whole program through tools
    #[arg(long)]
    pub delegate: bool,

    /// Model to use instead of the default
    #[arg(long)]
    pub model: Option<String>,

    /// Print the final memory as JSON after the output
    #[arg(long)]
    pub snapshot: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Split `NAME=VALUE` pairs at the first `=`.
///
/// Later pairs win when a name repeats.
pub fn parse_assignments(pairs: &[String], flag: &str) -> Result<HashMap<String, String>> {
    let mut assignments = HashMap::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("Malformed --{flag} value '{pair}'. Use NAME=VALUE format.");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("Missing name in --{flag} assignment '{pair}'.");
        }
        assignments.insert(name.to_string(), value.to_string());
    }
    Ok(assignments)
}
