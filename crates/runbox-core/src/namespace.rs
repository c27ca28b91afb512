//! Linux namespace creation for job isolation.
//!
//! The re-exec'd isolation stage detaches itself from the host's process,
//! mount, and network views with a single `unshare(2)` call before
//! exec'ing the job command.

use runbox_common::error::{Result, RunboxError};

/// Configuration for which namespaces to create.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceConfig {
    /// Isolate the PID namespace.
    pub pid: bool,
    /// Isolate the mount namespace.
    pub mount: bool,
    /// Isolate the network namespace.
    pub network: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            pid: true,
            mount: true,
            network: true,
        }
    }
}

/// Creates all configured namespaces for the calling process.
///
/// # Errors
///
/// Returns [`RunboxError::Isolation`] if the `unshare(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn create_namespaces(config: &NamespaceConfig) -> Result<()> {
    use nix::sched::{CloneFlags, unshare};

    let mut flags = CloneFlags::empty();
    if config.pid {
        flags |= CloneFlags::CLONE_NEWPID;
    }
    if config.mount {
        flags |= CloneFlags::CLONE_NEWNS;
    }
    if config.network {
        flags |= CloneFlags::CLONE_NEWNET;
    }
    if flags.is_empty() {
        return Ok(());
    }

    unshare(flags).map_err(|e| RunboxError::Isolation {
        message: format!("namespace creation failed: {e}"),
    })?;
    tracing::debug!(config = ?config, "namespaces created");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — namespace creation requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn create_namespaces(_config: &NamespaceConfig) -> Result<()> {
    Err(RunboxError::Isolation {
        message: "Linux required for namespace operations".into(),
    })
}
