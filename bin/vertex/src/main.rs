//! Vertex file command line.

mod cli;
mod logging;

use clap::Parser;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    cli::run(cli::Cli::parse()).await
}
