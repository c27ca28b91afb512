//! Cgroups v2 resource management.
//!
//! Provides interfaces for mounting the unified hierarchy, creating one
//! cgroup per job, setting CPU, memory, and block I/O limits, and moving
//! processes into a cgroup via its membership file.

pub mod cpu;
pub mod io;
pub mod memory;

use std::io::Write;
use std::path::{Path, PathBuf};

use runbox_common::constants::CGROUP_PROCS_FILE;
use runbox_common::error::{Result, RunboxError};
use runbox_common::types::ResourceLimits;

/// Handle to the cgroup owned by a single job.
///
/// Construction does not touch the filesystem; [`Cgroup::create`] and
/// [`Cgroup::destroy`] bracket the job's lifetime.
#[derive(Debug, Clone)]
pub struct Cgroup {
    name: String,
    path: PathBuf,
    limits: ResourceLimits,
}

impl Cgroup {
    /// Builds a handle for the cgroup `name` under the hierarchy at `root`.
    #[must_use]
    pub fn new(root: &Path, name: impl Into<String>, limits: ResourceLimits) -> Self {
        let name = name.into();
        let path = root.join(&name);
        Self { name, path, limits }
    }

    /// Builds a handle to an existing cgroup for membership operations.
    ///
    /// The handle carries default limits; only [`Cgroup::create`] consults
    /// them.
    #[must_use]
    pub fn open(root: &Path, name: impl Into<String>) -> Self {
        Self::new(root, name, ResourceLimits::default())
    }

    /// Returns the cgroup's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cgroup's directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the limits this cgroup was built from.
    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Creates the cgroup directory and applies the three controller limits.
    ///
    /// All limit values are validated before the directory is made, so an
    /// invalid request leaves no trace on the filesystem. A controller
    /// write failure removes the just-created directory before returning.
    ///
    /// # Errors
    ///
    /// Returns [`RunboxError::Config`] for out-of-range limits and
    /// [`RunboxError::Isolation`] if the directory already exists or any
    /// filesystem operation fails.
    pub fn create(&self) -> Result<()> {
        let cpu_max = cpu::compute_cpu_max(self.limits.cpu_percent)?;
        let memory_max = memory::compute_memory_max(self.limits.memory_kb)?;
        let io_weight = io::compute_io_weight(self.limits.io_weight)?;

        std::fs::create_dir(&self.path).map_err(|e| RunboxError::Isolation {
            message: format!("cannot create cgroup directory {}: {e}", self.path.display()),
        })?;

        let result = cpu::set_cpu_max(&self.path, &cpu_max)
            .and_then(|()| memory::set_memory_max(&self.path, &memory_max))
            .and_then(|()| io::set_io_weight(&self.path, &io_weight));
        if let Err(e) = result {
            if let Err(rm) = std::fs::remove_dir(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %rm, "cleanup of half-created cgroup failed");
            }
            return Err(e);
        }

        tracing::info!(name = %self.name, path = %self.path.display(), "cgroup created");
        Ok(())
    }

    /// Removes the cgroup directory.
    ///
    /// The kernel refuses to remove a cgroup that still has member
    /// processes; the caller must ensure the job's process has exited and
    /// been reaped first.
    ///
    /// # Errors
    ///
    /// Returns [`RunboxError::Isolation`] if the directory cannot be
    /// removed, including while any process remains a member.
    pub fn destroy(&self) -> Result<()> {
        std::fs::remove_dir(&self.path).map_err(|e| RunboxError::Isolation {
            message: format!("cannot remove cgroup {}: {e}", self.path.display()),
        })?;
        tracing::info!(name = %self.name, "cgroup destroyed");
        Ok(())
    }

    /// Moves the calling process into this cgroup.
    ///
    /// Appends the current PID to `cgroup.procs`. Called from the re-exec'd
    /// isolation stage before any namespace is created, so the job process
    /// is confined from its first instruction onward.
    ///
    /// # Errors
    ///
    /// Returns [`RunboxError::Isolation`] if the membership file cannot be
    /// opened or written.
    pub fn add_current_process(&self) -> Result<()> {
        let procs_path = self.path.join(CGROUP_PROCS_FILE);
        let pid = std::process::id();
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&procs_path)
            .map_err(|e| RunboxError::Isolation {
                message: format!("cannot open {}: {e}", procs_path.display()),
            })?;
        write!(file, "{pid}").map_err(|e| RunboxError::Isolation {
            message: format!("cannot write PID to {}: {e}", procs_path.display()),
        })?;
        tracing::debug!(pid, name = %self.name, "process moved into cgroup");
        Ok(())
    }
}

/// Mounts a cgroup v2 hierarchy at `root` and enables the cpu, memory,
/// and io controllers for the job cgroups created beneath it.
///
/// Creates the mount directory if needed. A failed mount removes the
/// directory again so repeated attempts start clean.
///
/// # Errors
///
/// Returns [`RunboxError::Isolation`] if the directory cannot be
/// created, the `mount(2)` syscall fails, or the controllers cannot be
/// enabled.
#[cfg(target_os = "linux")]
pub fn mount_hierarchy(root: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    std::fs::create_dir_all(root).map_err(|e| RunboxError::Isolation {
        message: format!("cannot create cgroup mount directory {}: {e}", root.display()),
    })?;

    if let Err(e) = mount(
        Some("none"),
        root,
        Some("cgroup2"),
        MsFlags::empty(),
        None::<&str>,
    ) {
        if let Err(rm) = std::fs::remove_dir(root) {
            tracing::warn!(path = %root.display(), error = %rm, "cleanup of mount directory failed");
        }
        return Err(RunboxError::Isolation {
            message: format!("cannot mount cgroup2 at {}: {e}", root.display()),
        });
    }

    // Child cgroups only expose the controller files once the controllers
    // are delegated from the hierarchy root.
    let subtree = root.join("cgroup.subtree_control");
    std::fs::write(&subtree, "+cpu +memory +io").map_err(|e| RunboxError::Isolation {
        message: format!("cannot enable controllers via {}: {e}", subtree.display()),
    })?;

    tracing::info!(path = %root.display(), "cgroup hierarchy mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — cgroup management requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_hierarchy(_root: &Path) -> Result<()> {
    Err(RunboxError::Isolation {
        message: "Linux required for cgroup operations".into(),
    })
}

/// Unmounts the cgroup v2 hierarchy at `root`.
///
/// # Errors
///
/// Returns [`RunboxError::Isolation`] if the `umount(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn unmount_hierarchy(root: &Path) -> Result<()> {
    nix::mount::umount(root).map_err(|e| RunboxError::Isolation {
        message: format!("cannot unmount cgroup hierarchy at {}: {e}", root.display()),
    })?;
    tracing::info!(path = %root.display(), "cgroup hierarchy unmounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — cgroup management requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn unmount_hierarchy(_root: &Path) -> Result<()> {
    Err(RunboxError::Isolation {
        message: "Linux required for cgroup operations".into(),
    })
}
