//! # runbox — job server CLI
//!
//! Single binary for serving the job API, talking to a server as a
//! client, and the internal isolation stage the server re-invokes
//! itself with.

mod commands;

use clap::Parser;

use crate::commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr: the isolation stage shares stdout with the job
    // command it execs, and job output must stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::execute(cli).await
}
