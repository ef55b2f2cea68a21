//! `relayd` — the background coordinator binary.
//!
//! Wires the in-memory host doubles together and runs a single demo
//! replay (see `wiring::run_demo`). A real deployment swaps
//! `relay_host::mock` for the `chrome` feature's wasm bindings without
//! touching this entry point.

mod wiring;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relayd", version, about = "Background coordination core for the replay extension")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wire up the coordinator and orchestrator and replay the demo project once.
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run => wiring::run_demo().await,
    }
}
