//! # polybridge
//!
//! Interactive polyglot repl: loads a repl script and a cli script into the
//! rhai backend, discovers their typed functions, and runs the command loop
//! until the repl rejects or the operator runs `exit`.
//!
//! ## Running
//!
//! ```bash
//! cargo run --bin polybridge -- scripts/repl.rhai scripts/cli.rhai
//!
//! # With debug logging
//! cargo run --bin polybridge -- -v scripts/repl.rhai scripts/cli.rhai
//! ```

use anyhow::Result;
use clap::Parser;
use polybridge_cli::CommandLoop;
use polybridge_core::LoaderRegistry;
use polybridge_rhai::RhaiLoader;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "polybridge", version, about = "Polyglot function-bridging repl")]
struct Args {
    /// Script providing `initialize`, `evaluate` and `close`
    repl_script: PathBuf,

    /// Script providing the command implementations
    cli_script: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .init();

    info!("Starting polybridge v{}", env!("CARGO_PKG_VERSION"));

    let mut registry = LoaderRegistry::new();
    registry.register(Box::new(RhaiLoader::new()));

    let loader = registry
        .get_mut("rhai")
        .ok_or_else(|| anyhow::anyhow!("rhai backend is not registered"))?;
    loader.initialize()?;

    let mut repl_unit = loader.load_from_file(&args.repl_script)?;
    repl_unit.discover()?;

    let mut cli_unit = loader.load_from_file(&args.cli_script)?;
    cli_unit.discover()?;

    let mut command_loop = CommandLoop::new(repl_unit, cli_unit)?;
    command_loop.run()?;

    registry.destroy_all()?;
    info!("polybridge stopped");
    Ok(())
}
