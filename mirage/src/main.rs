//! Mirage command-line runner.
//!
//! Runs a story program and prints its output lines to stdout. Logs go to
//! stderr so the output stays clean.
//!
//! ```bash
//! cargo run -p mirage -- story.mirage --arg count=3 --file notes=notes.txt
//! ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use claude::Claude;
use cli::{parse_assignments, Args};
use mirage_core::{DelegatingInterpreter, Interpreter, InterpreterConfig, Program, RunFailure};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Existing variables win over the env file
    let env_loaded = args.env_path.exists();
    if env_loaded {
        dotenvy::from_path(&args.env_path)
            .with_context(|| format!("Failed to load {}", args.env_path.display()))?;
    }

    init_logging(args.verbose);
    debug!(path = %args.env_path.display(), loaded = env_loaded, "environment file");

    let source = tokio::fs::read_to_string(&args.source)
        .await
        .with_context(|| format!("Failed to read program file {}", args.source.display()))?;
    let arguments = parse_assignments(&args.args, "arg")?;
    let files: HashMap<String, PathBuf> = parse_assignments(&args.files, "file")?
        .into_iter()
        .map(|(name, path)| (name, PathBuf::from(path)))
        .collect();

    let config = InterpreterConfig::default();

    if args.delegate {
        if args.snapshot {
            warn!("--snapshot has no effect with --delegate");
        }
        let client = connect(args.model.as_deref())?;
        let result = DelegatingInterpreter::new(client, &args.source, source)
            .with_config(config)
            .with_arguments(arguments)
            .with_files(files)
            .run()
            .await;
        return match result {
            Ok(report) => {
                print_lines(&report.outputs);
                if let Some(message) = report.final_message {
                    info!(%message, "final message");
                }
                Ok(())
            }
            Err(failure) => fail(failure, false),
        };
    }

    let program = parse_source(&source, &args.source)?;

    let mut inputs = arguments;
    for (name, path) in files {
        let text = tokio::fs::read_to_string(&path).await.with_context(|| {
            format!("Failed to read file input '{name}' from {}", path.display())
        })?;
        inputs.insert(name, text);
    }

    let client = connect(args.model.as_deref())?;
    match Interpreter::with_config(client, config)
        .run(&program, &inputs)
        .await
    {
        Ok(report) => {
            print_lines(&report.outputs);
            if args.snapshot {
                println!("{}", serde_json::to_string_pretty(&report.memory)?);
            }
            Ok(())
        }
        Err(failure) => fail(failure, args.snapshot),
    }
}

fn parse_source(source: &str, path: &Path) -> Result<Program> {
    mirage_core::parse_program(source)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn connect(model: Option<&str>) -> Result<Claude> {
    let client = Claude::from_env()?;
    Ok(match model {
        Some(model) => client.with_model(model),
        None => client,
    })
}

const VERBOSE_DIRECTIVES: [&str; 2] = ["mirage=debug", "mirage_core=debug"];

fn init_logging(verbose: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(env.as_deref(), verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// `RUST_LOG` (or `warn`) as the base, with `--verbose` layered on top.
fn log_filter(env: Option<&str>, verbose: bool) -> EnvFilter {
    let mut filter = env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    if verbose {
        for directive in VERBOSE_DIRECTIVES {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

/// Print what the run produced before failing, then return the error.
fn fail(failure: RunFailure, snapshot: bool) -> Result<()> {
    print_lines(&failure.outputs);
    if snapshot {
        println!("{}", serde_json::to_string_pretty(&failure.memory)?);
    }
    Err(failure.error.into())
}
