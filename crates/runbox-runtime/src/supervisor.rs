//! Isolated job launch.
//!
//! A job is never exec'd directly. The supervisor creates the job's
//! cgroup, then re-invokes the server's own binary with the internal
//! isolation subcommand; that stage moves itself into the cgroup,
//! unshares its namespaces, and only then execs the real command. The
//! indirection guarantees the job process is confined before it runs.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use runbox_common::constants::{CGROUP_ROOT_FLAG, ISOLATE_COMMAND, START_GRACE};
use runbox_common::error::{Result, RunboxError};
use runbox_common::types::{JobId, ResourceLimits};
use runbox_core::cgroup::Cgroup;
use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;

use crate::job::Job;
use crate::output::OutputLog;

/// Launches a command as an isolated job.
///
/// Creates the cgroup, spawns the wrapped process, starts the output
/// pump, and returns once the process has had a short grace period to
/// move into its cgroup and exec. The returned job is `RUNNING`.
///
/// # Errors
///
/// Returns [`RunboxError::Config`] for invalid limits and
/// [`RunboxError::Isolation`] if the cgroup cannot be created or the
/// process cannot be spawned. A spawn failure destroys the cgroup that
/// was created for the job before surfacing.
pub async fn start(
    command: &str,
    args: &[String],
    limits: ResourceLimits,
    owner: &str,
    cgroup_root: &Path,
) -> Result<Arc<Job>> {
    let id = JobId::generate();
    let cgroup = Cgroup::new(cgroup_root, id.as_str(), limits);
    cgroup.create()?;

    let exe = match std::env::current_exe() {
        Ok(path) => path,
        Err(e) => {
            rollback(&cgroup);
            return Err(RunboxError::Isolation {
                message: format!("cannot determine own executable path: {e}"),
            });
        }
    };

    let mut cmd = tokio::process::Command::new(&exe);
    let _ = cmd
        .arg(ISOLATE_COMMAND)
        .arg(CGROUP_ROOT_FLAG)
        .arg(cgroup_root)
        .arg(id.as_str())
        .arg(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    tracing::debug!(job_id = %id, command, exe = %exe.display(), "wrapping command for isolated launch");

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            rollback(&cgroup);
            return Err(RunboxError::Isolation {
                message: format!("cannot launch job process: {e}"),
            });
        }
    };
    let stdout = child.stdout.take();

    let job = Arc::new(Job::new(
        id,
        owner.to_string(),
        command.to_string(),
        args.to_vec(),
        cgroup,
        OutputLog::new(),
        Some(child),
    ));

    if let Some(stdout) = stdout {
        spawn_output_pump(Arc::clone(&job), stdout);
    }

    // Give the wrapped process a moment to join its cgroup and exec.
    tokio::time::sleep(START_GRACE).await;

    tracing::info!(job_id = %job.id(), owner, command, "job started");
    Ok(job)
}

fn rollback(cgroup: &Cgroup) {
    if let Err(e) = cgroup.destroy() {
        tracing::warn!(cgroup = cgroup.name(), error = %e, "rollback of created cgroup failed");
    }
}

/// Starts the task that drains the job's stdout into its output log.
///
/// Runs until the stream closes, then performs a final status check so
/// short-lived jobs are reaped promptly even if no client ever polls.
pub(crate) fn spawn_output_pump(job: Arc<Job>, mut stdout: ChildStdout) {
    job.mark_output_open();
    let _ = tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        loop {
            match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => job.output().append(&buf[..n]),
                Err(e) => {
                    tracing::warn!(job_id = %job.id(), error = %e, "output read failed");
                    break;
                }
            }
        }
        job.mark_output_closed();
        let _ = job.update_status();
        tracing::info!(job_id = %job.id(), "job output stream closed");
    });
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::time::Duration;

    use runbox_common::types::JobStatus;

    use super::*;

    fn limits(cpu: i32, mem: i64, io: i32) -> ResourceLimits {
        ResourceLimits {
            cpu_percent: cpu,
            memory_kb: mem,
            io_weight: io,
        }
    }

    #[tokio::test]
    async fn invalid_limits_are_rejected_without_side_effects() {
        let root = tempfile::tempdir().expect("tempdir");
        let err = start("true", &[], limits(0, 0, 50), "alice", root.path())
            .await
            .expect_err("cpu 0 must be rejected");

        assert!(matches!(err, RunboxError::Config { .. }));
        assert_eq!(
            std::fs::read_dir(root.path()).expect("read_dir").count(),
            0
        );
    }

    #[tokio::test]
    async fn start_creates_the_job_cgroup_and_launches() {
        let root = tempfile::tempdir().expect("tempdir");
        // The re-exec'd copy of this test binary exits immediately; the
        // job still goes through the full spawn and reap cycle.
        let job = start("true", &[], limits(50, 0, 50), "alice", root.path())
            .await
            .expect("start");

        for _ in 0..100 {
            if !job.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let (status, code) = job.snapshot();
        assert_eq!(status, JobStatus::Stopped);
        assert!(code.is_some());
    }

    #[tokio::test]
    async fn output_pump_captures_stdout() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut child = tokio::process::Command::new("echo")
            .arg("pumped")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn");
        let stdout = child.stdout.take().expect("stdout");

        let cgroup = Cgroup::new(root.path(), "pump", ResourceLimits::default());
        std::fs::create_dir(cgroup.path()).expect("mkdir");
        let job = Arc::new(Job::new(
            JobId::generate(),
            "alice".into(),
            "echo".into(),
            vec!["pumped".into()],
            cgroup,
            OutputLog::new(),
            Some(child),
        ));
        spawn_output_pump(Arc::clone(&job), stdout);

        for _ in 0..100 {
            if job.output().has_new(0) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let (bytes, _) = job.output().read_from(0);
        assert_eq!(bytes, b"pumped\n");
    }
}
