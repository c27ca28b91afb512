//! Per-job state tracking.
//!
//! A [`Job`] owns its process handle, its cgroup, and its output log.
//! Status and exit code are only ever mutated under the job's own mutex,
//! so concurrent observers (status checks, stop loops, monitor loops)
//! always see a consistent status/exit-code pair.

use std::os::unix::process::ExitStatusExt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use runbox_common::error::{Result, RunboxError};
use runbox_common::types::{JobId, JobStatus};
use runbox_core::cgroup::Cgroup;
use tokio::process::Child;

use crate::output::OutputLog;

/// A job accepted by the server.
///
/// Held behind an `Arc` in the registry; the output pump, RPC handlers,
/// and poll loops all share the same instance.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    owner: String,
    command: String,
    args: Vec<String>,
    started_at: String,
    cgroup: Cgroup,
    output: OutputLog,
    state: Mutex<JobState>,
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    exit_code: Option<i32>,
    kill_requested: bool,
    child: Option<Child>,
    // False while an output pump still drains the process's stdout.
    // Observers must not treat the log as complete before this is set,
    // even when the exit itself has already been observed.
    output_closed: bool,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        owner: String,
        command: String,
        args: Vec<String>,
        cgroup: Cgroup,
        output: OutputLog,
        child: Option<Child>,
    ) -> Self {
        Self {
            id,
            owner,
            command,
            args,
            started_at: chrono::Utc::now().to_rfc3339(),
            cgroup,
            output,
            state: Mutex::new(JobState {
                status: JobStatus::Running,
                exit_code: None,
                kill_requested: false,
                child,
                output_closed: true,
            }),
        }
    }

    /// Returns the job's identifier.
    #[must_use]
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Returns the identity that started the job.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the job's command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the job's arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the RFC 3339 timestamp the job was accepted at.
    #[must_use]
    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    /// Returns a handle to the job's output log.
    #[must_use]
    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    /// Sends a kill signal to the job's process.
    ///
    /// Best-effort: the signal is dispatched without waiting for the exit.
    /// Callers poll [`Job::update_status`] until a terminal state is
    /// observed. The exit, whenever observed, will be attributed to this
    /// request and recorded as `KILLED`.
    ///
    /// # Errors
    ///
    /// Returns [`RunboxError::NotRunning`] if the process handle is gone
    /// or the signal cannot be delivered.
    pub fn kill(&self) -> Result<()> {
        let mut state = self.lock_state();
        let Some(child) = state.child.as_mut() else {
            return Err(RunboxError::NotRunning {
                id: self.id.to_string(),
            });
        };
        if let Err(e) = child.start_kill() {
            tracing::warn!(job_id = %self.id, error = %e, "kill signal failed");
            return Err(RunboxError::NotRunning {
                id: self.id.to_string(),
            });
        }
        state.kill_requested = true;
        tracing::info!(job_id = %self.id, "kill signal sent");
        Ok(())
    }

    /// Non-blocking check of whether the process has exited.
    ///
    /// On the first observation of the exit this records the exit code,
    /// moves the job to its terminal status (`KILLED` if a kill was
    /// requested, otherwise `STOPPED`), reaps the child, and removes the
    /// job's cgroup. Safe to call from any number of observers; already
    /// terminal jobs are returned unchanged.
    pub fn update_status(&self) -> (JobStatus, Option<i32>) {
        let mut state = self.lock_state();
        if state.status.is_terminal() {
            return (state.status, state.exit_code);
        }
        let Some(child) = state.child.as_mut() else {
            return (state.status, state.exit_code);
        };
        match child.try_wait() {
            Ok(Some(exit)) => {
                let code = exit
                    .code()
                    .or_else(|| exit.signal().map(|s| 128 + s))
                    .unwrap_or(-1);
                state.exit_code = Some(code);
                state.status = if state.kill_requested {
                    JobStatus::Killed
                } else {
                    JobStatus::Stopped
                };
                state.child = None;
                tracing::info!(job_id = %self.id, status = %state.status, code, "job finished");
                // The child is reaped, so the cgroup has no members left.
                if let Err(e) = self.cgroup.destroy() {
                    tracing::warn!(job_id = %self.id, error = %e, "cgroup removal failed");
                }
                (state.status, state.exit_code)
            }
            Ok(None) => (state.status, state.exit_code),
            Err(e) => {
                tracing::warn!(job_id = %self.id, error = %e, "status check failed");
                (state.status, state.exit_code)
            }
        }
    }

    /// Returns true until the process has been observed to exit.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.update_status().0.is_terminal()
    }

    /// Waits up to `timeout_secs` for the job to reach a terminal state,
    /// checking the process at a fixed interval.
    ///
    /// Returns the terminal status/exit-code pair, or `None` if the job
    /// is still running when the timeout elapses.
    pub async fn wait_terminal(&self, timeout_secs: u64) -> Option<(JobStatus, Option<i32>)> {
        for _ in 0..timeout_secs {
            tokio::time::sleep(runbox_common::constants::POLL_INTERVAL).await;
            let (status, exit_code) = self.update_status();
            if status.is_terminal() {
                return Some((status, exit_code));
            }
        }
        None
    }

    /// Returns the current status/exit-code pair without re-checking the
    /// process.
    #[must_use]
    pub fn snapshot(&self) -> (JobStatus, Option<i32>) {
        let state = self.lock_state();
        (state.status, state.exit_code)
    }

    /// Marks the output log as still being fed by a pump task.
    pub(crate) fn mark_output_open(&self) {
        self.lock_state().output_closed = false;
    }

    /// Marks the output log as complete; no further bytes will arrive.
    pub(crate) fn mark_output_closed(&self) {
        self.lock_state().output_closed = true;
    }

    /// Returns true once no pump task is still feeding the output log.
    pub(crate) fn output_closed(&self) -> bool {
        self.lock_state().output_closed
    }

    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
