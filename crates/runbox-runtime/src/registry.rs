//! Owner-scoped job registry.
//!
//! The registry owns every job for the lifetime of the server and gates
//! each operation on the caller's identity. A job owned by someone else
//! is indistinguishable from a job that does not exist.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use runbox_common::constants::POLL_INTERVAL;
use runbox_common::error::{Result, RunboxError};
use runbox_common::types::{JobId, JobStatus, ResourceLimits};
use tokio::sync::{RwLock, mpsc};

use crate::job::Job;
use crate::supervisor;

/// Point-in-time view of a job for listings.
#[derive(Debug, Clone)]
pub struct JobSummary {
    /// Job identifier.
    pub id: JobId,
    /// Current status.
    pub status: JobStatus,
    /// Exit code, present once the job is terminal.
    pub exit_code: Option<i32>,
    /// RFC 3339 timestamp the job was accepted at.
    pub started_at: String,
}

/// All jobs known to the server, keyed by identifier.
///
/// Shared across every RPC handler; inserts happen only on start, all
/// other access is lookups.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
    cgroup_root: PathBuf,
}

impl JobRegistry {
    /// Creates an empty registry whose jobs get cgroups under
    /// `cgroup_root`.
    #[must_use]
    pub fn new(cgroup_root: PathBuf) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            cgroup_root,
        }
    }

    /// Starts a new job owned by `identity` and stores it.
    ///
    /// # Errors
    ///
    /// Propagates [`RunboxError::Config`] and [`RunboxError::Isolation`]
    /// from the launch path.
    pub async fn start_job(
        &self,
        command: &str,
        args: &[String],
        limits: ResourceLimits,
        identity: &str,
    ) -> Result<JobId> {
        let job = supervisor::start(command, args, limits, identity, &self.cgroup_root).await?;
        let id = job.id().clone();
        let _ = self.jobs.write().await.insert(id.clone(), job);
        tracing::debug!(identity, job_id = %id, "job registered");
        Ok(id)
    }

    /// Looks up a job and checks that `identity` owns it.
    ///
    /// # Errors
    ///
    /// Returns [`RunboxError::NotFound`] both when no such job exists and
    /// when it is owned by a different identity, with identical error
    /// content in either case.
    pub async fn authorized(&self, job_id: &str, identity: &str) -> Result<Arc<Job>> {
        let jobs = self.jobs.read().await;
        match jobs.get(&JobId::new(job_id)) {
            Some(job) if job.owner() == identity => Ok(Arc::clone(job)),
            _ => {
                tracing::info!(identity, job_id, "job lookup denied or missing");
                Err(RunboxError::NotFound {
                    kind: "job",
                    id: job_id.to_string(),
                })
            }
        }
    }

    /// Returns summaries of all jobs owned by `identity`, oldest first.
    pub async fn list(&self, identity: &str) -> Vec<JobSummary> {
        let jobs = self.jobs.read().await;
        let mut summaries: Vec<JobSummary> = jobs
            .values()
            .filter(|job| job.owner() == identity)
            .map(|job| {
                let (status, exit_code) = job.update_status();
                JobSummary {
                    id: job.id().clone(),
                    status,
                    exit_code,
                    started_at: job.started_at().to_string(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        summaries
    }

    /// Returns the current status and exit code of an owned job.
    ///
    /// # Errors
    ///
    /// Returns [`RunboxError::NotFound`] if the job is missing or owned by
    /// someone else.
    pub async fn job_status(
        &self,
        job_id: &str,
        identity: &str,
    ) -> Result<(JobStatus, Option<i32>)> {
        let job = self.authorized(job_id, identity).await?;
        Ok(job.update_status())
    }

    /// Stops an owned job and waits up to `timeout_secs` for it to reach
    /// a terminal state.
    ///
    /// A job that is already terminal returns its recorded exit code
    /// without a kill attempt.
    ///
    /// # Errors
    ///
    /// Returns [`RunboxError::NotFound`] for missing/foreign jobs,
    /// [`RunboxError::NotRunning`] if the signal cannot be delivered, and
    /// [`RunboxError::StillRunning`] if the job outlives the timeout.
    pub async fn stop_job(&self, job_id: &str, identity: &str, timeout_secs: u64) -> Result<i32> {
        let job = self.authorized(job_id, identity).await?;
        tracing::info!(job_id, identity, "stopping job");

        let (status, exit_code) = job.update_status();
        if status.is_terminal() {
            return Ok(exit_code.unwrap_or(-1));
        }

        job.kill()?;
        match job.wait_terminal(timeout_secs).await {
            Some((_, exit_code)) => Ok(exit_code.unwrap_or(-1)),
            None => Err(RunboxError::StillRunning {
                id: job_id.to_string(),
            }),
        }
    }

    /// Streams the output of an owned job from the beginning.
    ///
    /// The returned channel yields chunks as they appear and closes once
    /// the job is terminal and the log is drained. Dropping the receiver
    /// stops the underlying poll task promptly.
    ///
    /// # Errors
    ///
    /// Returns [`RunboxError::NotFound`] if the job is missing or owned by
    /// someone else.
    pub async fn monitor(&self, job_id: &str, identity: &str) -> Result<mpsc::Receiver<Vec<u8>>> {
        let job = self.authorized(job_id, identity).await?;
        tracing::info!(job_id, identity, "monitoring job");

        let (tx, rx) = mpsc::channel(16);
        let _ = tokio::spawn(async move {
            let mut offset = 0;
            loop {
                if tx.is_closed() {
                    tracing::debug!(job_id = %job.id(), "monitor cancelled by client");
                    return;
                }
                if job.output().has_new(offset) {
                    let (chunk, next) = job.output().read_from(offset);
                    offset = next;
                    if tx.send(chunk).await.is_err() {
                        tracing::debug!(job_id = %job.id(), "monitor cancelled by client");
                        return;
                    }
                }
                let (status, _) = job.update_status();
                if status.is_terminal() && job.output_closed() && !job.output().has_new(offset) {
                    break;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            tracing::debug!(job_id = %job.id(), "monitor stream drained");
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::process::Stdio;
    use std::time::Duration;

    use runbox_core::cgroup::Cgroup;

    use super::*;
    use crate::output::OutputLog;

    fn registry(root: &std::path::Path) -> JobRegistry {
        JobRegistry::new(root.to_path_buf())
    }

    fn insert_job(
        reg: &JobRegistry,
        root: &std::path::Path,
        owner: &str,
        command: &str,
        args: &[&str],
        piped: bool,
    ) -> JobId {
        let id = JobId::generate();
        let cgroup = Cgroup::new(root, id.as_str(), ResourceLimits::default());
        std::fs::create_dir(cgroup.path()).expect("mkdir");

        let mut cmd = tokio::process::Command::new(command);
        let _ = cmd
            .args(args)
            .stdin(Stdio::null())
            .stdout(if piped { Stdio::piped() } else { Stdio::null() })
            .stderr(Stdio::null());
        let mut child = cmd.spawn().expect("spawn");
        let stdout = child.stdout.take();

        let job = std::sync::Arc::new(Job::new(
            id.clone(),
            owner.into(),
            command.into(),
            args.iter().map(ToString::to_string).collect(),
            cgroup,
            OutputLog::new(),
            Some(child),
        ));
        if let Some(stdout) = stdout {
            supervisor::spawn_output_pump(std::sync::Arc::clone(&job), stdout);
        }
        let _ = reg
            .jobs
            .try_write()
            .expect("uncontended")
            .insert(id.clone(), job);
        id
    }

    #[tokio::test]
    async fn owner_is_authorized_and_stranger_is_not() {
        let root = tempfile::tempdir().expect("tempdir");
        let reg = registry(root.path());
        let id = insert_job(&reg, root.path(), "alice", "sleep", &["30"], false);

        assert!(reg.authorized(id.as_str(), "alice").await.is_ok());

        let denied = reg
            .authorized(id.as_str(), "bob")
            .await
            .expect_err("foreign job must be denied");
        let missing = reg
            .authorized("no-such-job", "bob")
            .await
            .expect_err("missing job");

        // A foreign job and a missing job must be indistinguishable.
        let strip_id = |s: String| s.replace(id.as_str(), "").replace("no-such-job", "");
        assert_eq!(strip_id(denied.to_string()), strip_id(missing.to_string()));

        let _ = reg.stop_job(id.as_str(), "alice", 5).await;
    }

    #[tokio::test]
    async fn list_returns_only_the_callers_jobs() {
        let root = tempfile::tempdir().expect("tempdir");
        let reg = registry(root.path());
        let alice_id = insert_job(&reg, root.path(), "alice", "sleep", &["30"], false);
        let bob_id = insert_job(&reg, root.path(), "bob", "sleep", &["30"], false);

        let listed = reg.list("alice").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, alice_id);
        assert_eq!(listed[0].status, JobStatus::Running);

        assert!(reg.list("carol").await.is_empty());

        let _ = reg.stop_job(alice_id.as_str(), "alice", 5).await;
        let _ = reg.stop_job(bob_id.as_str(), "bob", 5).await;
    }

    #[tokio::test]
    async fn stop_kills_a_running_job_and_returns_its_exit_code() {
        let root = tempfile::tempdir().expect("tempdir");
        let reg = registry(root.path());
        let id = insert_job(&reg, root.path(), "alice", "sleep", &["30"], false);

        let code = reg.stop_job(id.as_str(), "alice", 5).await.expect("stop");
        assert_eq!(code, 137);

        let (status, _) = reg.job_status(id.as_str(), "alice").await.expect("status");
        assert_eq!(status, JobStatus::Killed);
    }

    #[tokio::test]
    async fn stop_with_zero_timeout_reports_still_running() {
        let root = tempfile::tempdir().expect("tempdir");
        let reg = registry(root.path());
        let id = insert_job(&reg, root.path(), "alice", "sleep", &["30"], false);

        let err = reg
            .stop_job(id.as_str(), "alice", 0)
            .await
            .expect_err("no time to observe the exit");
        assert!(matches!(err, RunboxError::StillRunning { .. }));

        let _ = reg.stop_job(id.as_str(), "alice", 5).await;
    }

    #[tokio::test]
    async fn stop_on_a_finished_job_returns_the_recorded_exit_code() {
        let root = tempfile::tempdir().expect("tempdir");
        let reg = registry(root.path());
        let id = insert_job(&reg, root.path(), "alice", "true", &[], false);

        for _ in 0..100 {
            let (status, _) = reg.job_status(id.as_str(), "alice").await.expect("status");
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let code = reg.stop_job(id.as_str(), "alice", 1).await.expect("stop");
        assert_eq!(code, 0);
        let (status, _) = reg.job_status(id.as_str(), "alice").await.expect("status");
        assert_eq!(status, JobStatus::Stopped);
    }

    #[tokio::test]
    async fn stop_is_denied_for_a_different_identity() {
        let root = tempfile::tempdir().expect("tempdir");
        let reg = registry(root.path());
        let id = insert_job(&reg, root.path(), "alice", "sleep", &["30"], false);

        let err = reg
            .stop_job(id.as_str(), "bob", 5)
            .await
            .expect_err("must be denied");
        assert!(matches!(err, RunboxError::NotFound { .. }));

        let _ = reg.stop_job(id.as_str(), "alice", 5).await;
    }

    #[tokio::test]
    async fn monitor_streams_all_output_and_terminates() {
        let root = tempfile::tempdir().expect("tempdir");
        let reg = registry(root.path());
        let id = insert_job(&reg, root.path(), "alice", "echo", &["streamed"], true);

        let mut rx = reg.monitor(id.as_str(), "alice").await.expect("monitor");
        let collected = tokio::time::timeout(Duration::from_secs(30), async {
            let mut all = Vec::new();
            while let Some(chunk) = rx.recv().await {
                all.extend_from_slice(&chunk);
            }
            all
        })
        .await
        .expect("stream must end");

        assert_eq!(collected, b"streamed\n");
    }

    #[tokio::test]
    async fn monitor_is_denied_for_a_different_identity() {
        let root = tempfile::tempdir().expect("tempdir");
        let reg = registry(root.path());
        let id = insert_job(&reg, root.path(), "alice", "sleep", &["30"], false);

        assert!(reg.monitor(id.as_str(), "bob").await.is_err());
        let _ = reg.stop_job(id.as_str(), "alice", 5).await;
    }
}
