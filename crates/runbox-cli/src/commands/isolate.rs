//! The hidden `isolate` subcommand.
//!
//! This is the second stage of every job launch: the server re-invokes
//! its own binary with these arguments, and this process confines itself
//! before exec'ing the job command.

use std::path::PathBuf;

use clap::Args;

/// Arguments for the internal isolation stage.
#[derive(Args, Debug)]
pub struct IsolateArgs {
    /// Mount point of the cgroup hierarchy.
    #[arg(long)]
    pub cgroup_root: PathBuf,

    /// Name of the cgroup to join before anything else.
    pub cgroup: String,

    /// Command to exec once isolated.
    pub command: String,

    /// Arguments for the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Joins the cgroup, unshares namespaces, and execs the job command.
///
/// Does not return on success; the process image is replaced.
///
/// # Errors
///
/// Returns an error if any isolation step or the exec fails.
pub fn execute(args: IsolateArgs) -> anyhow::Result<()> {
    runbox_runtime::isolate::run(&args.cgroup_root, &args.cgroup, &args.command, &args.args)?;
    Ok(())
}
