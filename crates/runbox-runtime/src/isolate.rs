//! The isolation stage executed by the re-invoked server binary.
//!
//! Ordering is the whole point: cgroup membership is established first,
//! so the process cannot escape its limits through any later namespace
//! manipulation; the namespaces come second; the job command is exec'd
//! last and never runs unconfined.

use std::os::unix::process::CommandExt;
use std::path::Path;

use runbox_common::error::{Result, RunboxError};
use runbox_core::cgroup::Cgroup;
use runbox_core::namespace::{self, NamespaceConfig};

/// Joins the target cgroup, creates fresh PID, mount, and network
/// namespaces, and replaces the current process with the job command.
///
/// On success this function does not return.
///
/// # Errors
///
/// Returns [`RunboxError::Isolation`] if cgroup membership, namespace
/// creation, or the final `exec(2)` fails.
pub fn run(cgroup_root: &Path, cgroup_name: &str, command: &str, args: &[String]) -> Result<()> {
    let cgroup = Cgroup::open(cgroup_root, cgroup_name);
    cgroup.add_current_process()?;
    namespace::create_namespaces(&NamespaceConfig::default())?;

    tracing::debug!(cgroup = cgroup_name, command, "exec'ing job command");
    let err = std::process::Command::new(command).args(args).exec();
    Err(RunboxError::Isolation {
        message: format!("cannot exec {command}: {err}"),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn missing_cgroup_aborts_before_namespaces_and_exec() {
        let root = tempfile::tempdir().expect("tempdir");
        let err = run(root.path(), "absent", "true", &[]).expect_err("must fail");
        assert!(matches!(err, RunboxError::Isolation { .. }));
    }
}
