//! # runbox-runtime
//!
//! Job lifecycle management for the runbox server.
//!
//! A job is a shell command launched inside fresh PID, mount, and network
//! namespaces and a dedicated cgroup. This crate owns:
//! - the append-only [`output::OutputLog`] that one pump task writes and
//!   any number of observers read at independent offsets,
//! - the per-job state machine in [`job::Job`],
//! - the launch path in [`supervisor`], which re-invokes the server's own
//!   binary so isolation is established before the job command runs,
//! - the [`isolate`] stage executed by that re-invocation, and
//! - the owner-scoped [`registry::JobRegistry`] that every RPC goes
//!   through.

pub mod isolate;
pub mod job;
pub mod output;
pub mod registry;
pub mod supervisor;
