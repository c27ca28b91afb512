//! Domain primitive types used across the runbox workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a job ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random job ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job.
///
/// `Running` is the only non-terminal state. A job that exits on its own
/// ends `Stopped`; a job whose termination was explicitly requested ends
/// `Killed`, even if the exit is observed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// The job's process has been launched and has not been observed to exit.
    Running,
    /// The process exited without an explicit termination request.
    Stopped,
    /// The process exited after an explicit termination request.
    Killed,
}

impl JobStatus {
    /// Returns true for the two terminal states.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Killed => write!(f, "KILLED"),
        }
    }
}

/// Resource limits requested for a job.
///
/// Values mirror the wire types; validation happens when the limits are
/// translated into cgroup controller settings, where out-of-range values
/// are rejected rather than clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU bandwidth as a percentage of one core, 1..=100. 100 is unlimited.
    pub cpu_percent: i32,
    /// Memory limit in kilobytes. 0 is unlimited.
    pub memory_kb: i64,
    /// Block I/O weight, 10..=100.
    pub io_weight: i32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_percent: 100,
            memory_kb: 0,
            io_weight: 100,
        }
    }
}
