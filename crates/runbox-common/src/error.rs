//! Unified error types for the runbox workspace.
//!
//! Every fallible operation in the workspace returns [`RunboxError`]; the
//! service layer maps these onto transport status codes at the boundary.

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum RunboxError {
    /// A resource-limit or configuration value is invalid.
    ///
    /// Always caller-fixable; never produces side effects.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid input.
        message: String,
    },

    /// Cgroup, namespace, or process-launch failure at the OS level.
    ///
    /// Fatal to the attempt it occurred in; any partially-created
    /// resources have been rolled back before this surfaces.
    #[error("isolation failure: {message}")]
    Isolation {
        /// Description of the failed isolation step.
        message: String,
    },

    /// A required resource was not found.
    ///
    /// Also covers authorization failures: a job owned by someone else is
    /// reported exactly like a job that does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The operation requires a live process that no longer exists.
    #[error("job {id} has no running process")]
    NotRunning {
        /// Identifier of the job.
        id: String,
    },

    /// A stop request timed out without confirmed termination.
    #[error("job {id} is still running")]
    StillRunning {
        /// Identifier of the job.
        id: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RunboxError>;
