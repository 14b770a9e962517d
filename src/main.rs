#![recursion_limit = "256"]

mod application;
mod cli;
mod data;
mod domain;
mod error;
mod infra;

use anyhow::Result;
use cli::Cli;
use clap::Parser;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mmfeat=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
