//! Memory limit control via cgroups v2.
//!
//! Translates a kilobyte count into the `memory.max` byte value.

use std::path::Path;

use runbox_common::constants::{MEMORY_MAX_FILE, UNLIMITED};
use runbox_common::error::{Result, RunboxError};

/// Computes the `memory.max` value for a limit in kilobytes.
///
/// Zero means no limit and maps to the unlimited sentinel.
///
/// # Errors
///
/// Returns [`RunboxError::Config`] if `kilobytes` is negative.
pub fn compute_memory_max(kilobytes: i64) -> Result<String> {
    match kilobytes {
        kb if kb < 0 => Err(RunboxError::Config {
            message: format!("minimum memory setting is 0 (no limit), got {kb}"),
        }),
        0 => Ok(UNLIMITED.to_string()),
        kb => Ok((kb * 1024).to_string()),
    }
}

/// Writes a computed `memory.max` value into a cgroup directory.
///
/// # Errors
///
/// Returns [`RunboxError::Isolation`] if writing to `memory.max` fails.
pub fn set_memory_max(cgroup_path: &Path, value: &str) -> Result<()> {
    let file = cgroup_path.join(MEMORY_MAX_FILE);
    std::fs::write(&file, value).map_err(|e| RunboxError::Isolation {
        message: format!("cannot write {}: {e}", file.display()),
    })?;
    tracing::debug!(value, "memory max set");
    Ok(())
}
