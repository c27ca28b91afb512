//! CLI command definitions and dispatch.

pub mod client;
pub mod isolate;
pub mod serve;

use clap::{Parser, Subcommand};

/// runbox — multi-tenant job execution service.
#[derive(Parser, Debug)]
#[command(name = "runbox", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the job server.
    Serve(serve::ServeArgs),
    /// Internal isolation stage; the server re-invokes itself with this.
    #[command(hide = true)]
    Isolate(isolate::IsolateArgs),
    /// Start a job on a server.
    Start(client::StartArgs),
    /// Stop a job and wait for it to terminate.
    Stop(client::StopArgs),
    /// Show a job's status and exit code.
    Status(client::StatusArgs),
    /// Stream a job's output until it is terminal and drained.
    Monitor(client::MonitorArgs),
    /// List your jobs.
    List(client::ListArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve::execute(args).await,
        Command::Isolate(args) => isolate::execute(args),
        Command::Start(args) => client::start(args).await,
        Command::Stop(args) => client::stop(args).await,
        Command::Status(args) => client::status(args).await,
        Command::Monitor(args) => client::monitor(args).await,
        Command::List(args) => client::list(args).await,
    }
}
