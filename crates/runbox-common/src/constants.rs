//! System-wide constants and default paths.

use std::time::Duration;

/// Default mount point for the cgroup v2 hierarchy owned by the server.
pub const DEFAULT_CGROUP_ROOT: &str = "/run/runbox/cgroup";

/// Fixed CPU bandwidth period in microseconds for `cpu.max`.
pub const CPU_PERIOD_US: u64 = 100_000;

/// Sentinel written to a controller file for an unlimited setting.
pub const UNLIMITED: &str = "max";

/// CPU bandwidth controller file.
pub const CPU_MAX_FILE: &str = "cpu.max";
/// Hard memory limit controller file.
pub const MEMORY_MAX_FILE: &str = "memory.max";
/// Block I/O weight controller file.
pub const IO_WEIGHT_FILE: &str = "io.weight";
/// Process membership file.
pub const CGROUP_PROCS_FILE: &str = "cgroup.procs";

/// Default listen address for the job server.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1";
/// Default listen port for the job server.
pub const DEFAULT_LISTEN_PORT: u16 = 9898;

/// Interval between status/output polls in stop and monitor loops.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Grace period after a successful spawn before `start` returns.
pub const START_GRACE: Duration = Duration::from_secs(1);

/// Internal subcommand the server re-invokes itself with to set up
/// isolation before exec'ing a job command.
pub const ISOLATE_COMMAND: &str = "isolate";

/// Flag carrying the cgroup hierarchy root to the isolation subcommand.
pub const CGROUP_ROOT_FLAG: &str = "--cgroup-root";

/// Application name used in logs and state paths.
pub const APP_NAME: &str = "runbox";

/// Binary name, re-invoked with the internal isolation subcommand.
pub const BIN_NAME: &str = "runbox";
