//! Merlin CLI - top-k retrieval and synthetic data from the command line.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use merlin_cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("merlin=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Topk(cmd) => cmd.run()?,
        Commands::Synthetic(cmd) => cmd.run()?,
    }

    info!("Merlin CLI completed successfully");
    Ok(())
}
