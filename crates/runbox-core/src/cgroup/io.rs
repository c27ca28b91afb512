//! Block I/O weight control via cgroups v2.
//!
//! Validates and writes the `io.weight` proportional weight value.

use std::path::Path;

use runbox_common::constants::IO_WEIGHT_FILE;
use runbox_common::error::{Result, RunboxError};

/// Computes the `io.weight` value for a weight request.
///
/// # Errors
///
/// Returns [`RunboxError::Config`] if `weight` is outside `10..=100`.
pub fn compute_io_weight(weight: i32) -> Result<String> {
    match weight {
        w if w < 10 => Err(RunboxError::Config {
            message: format!("minimum I/O weight is 10, got {w}"),
        }),
        w if w > 100 => Err(RunboxError::Config {
            message: format!("maximum I/O weight is 100, got {w}"),
        }),
        w => Ok(w.to_string()),
    }
}

/// Writes a computed `io.weight` value into a cgroup directory.
///
/// # Errors
///
/// Returns [`RunboxError::Isolation`] if writing to `io.weight` fails.
pub fn set_io_weight(cgroup_path: &Path, value: &str) -> Result<()> {
    let file = cgroup_path.join(IO_WEIGHT_FILE);
    std::fs::write(&file, value).map_err(|e| RunboxError::Isolation {
        message: format!("cannot write {}: {e}", file.display()),
    })?;
    tracing::debug!(value, "I/O weight set");
    Ok(())
}
