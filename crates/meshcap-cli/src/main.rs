//! Command-line tooling for meshcap rule documents.
//!
//! Thin wrappers over the rule engine: `validate` loads and compiles rule
//! documents so authors get compile-time diagnostics without a gateway, and
//! `eval` additionally runs the compiled rules against a device snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meshcap_core::DeviceSnapshot;
use meshcap_rules::Engine;

/// meshcap rule document tooling.
#[derive(Parser, Debug)]
#[command(name = "meshcap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Load and compile rule documents, reporting any error.
    Validate {
        /// Rule document files (JSON), loaded after the built-in baseline.
        paths: Vec<PathBuf>,
        /// Skip loading the built-in baseline documents.
        #[arg(long)]
        no_builtin: bool,
    },
    /// Evaluate compiled rules against a device snapshot.
    Eval {
        /// Device snapshot file (JSON).
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Rule document files (JSON), loaded after the built-in baseline.
        paths: Vec<PathBuf>,
        /// Skip loading the built-in baseline documents.
        #[arg(long)]
        no_builtin: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Validate { paths, no_builtin } => {
            let engine = build_engine(&paths, no_builtin)?;
            println!(
                "ok: {} ruleset(s), {} top-level rule(s)",
                engine.rule_sets().len(),
                engine.rules().len()
            );
        }
        Command::Eval {
            snapshot,
            paths,
            no_builtin,
        } => {
            let engine = build_engine(&paths, no_builtin)?;
            let snapshot = read_snapshot(&snapshot)?;
            let output = engine.execute(&snapshot)?;
            println!("{}", serde_json::to_string_pretty(&output.capabilities)?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the baseline (unless suppressed) plus the given documents, then
/// compile.
fn build_engine(paths: &[PathBuf], no_builtin: bool) -> Result<Engine> {
    let mut engine = Engine::new();
    if !no_builtin {
        engine.load_builtin().context("loading built-in documents")?;
    }
    for path in paths {
        let document = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let name = engine
            .load_str(&document)
            .with_context(|| format!("loading {}", path.display()))?;
        tracing::debug!(ruleset = %name, path = %path.display(), "loaded document");
    }
    engine.compile_rules().context("compiling rules")?;
    Ok(engine)
}

fn read_snapshot(path: &Path) -> Result<DeviceSnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}
