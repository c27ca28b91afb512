//! CPU bandwidth control via cgroups v2.
//!
//! Translates a percentage of one core into the `cpu.max` quota/period
//! pair and writes it to the controller file.

use std::path::Path;

use runbox_common::constants::{CPU_MAX_FILE, CPU_PERIOD_US, UNLIMITED};
use runbox_common::error::{Result, RunboxError};

/// Computes the `cpu.max` value for a CPU percentage.
///
/// 100 maps to the unlimited quota; any other valid percentage maps to
/// `floor(period * percent / 100)` microseconds of quota per period.
///
/// # Errors
///
/// Returns [`RunboxError::Config`] if `percent` is outside `1..=100`.
pub fn compute_cpu_max(percent: i32) -> Result<String> {
    match percent {
        p if p < 1 => Err(RunboxError::Config {
            message: format!("minimum CPU setting is 1, got {p}"),
        }),
        p if p > 100 => Err(RunboxError::Config {
            message: format!("maximum CPU setting is 100, got {p}"),
        }),
        100 => Ok(format!("{UNLIMITED} {CPU_PERIOD_US}")),
        p => {
            #[allow(clippy::cast_sign_loss)]
            let quota = CPU_PERIOD_US * p as u64 / 100;
            Ok(format!("{quota} {CPU_PERIOD_US}"))
        }
    }
}

/// Writes a computed `cpu.max` value into a cgroup directory.
///
/// # Errors
///
/// Returns [`RunboxError::Isolation`] if writing to `cpu.max` fails.
pub fn set_cpu_max(cgroup_path: &Path, value: &str) -> Result<()> {
    let file = cgroup_path.join(CPU_MAX_FILE);
    std::fs::write(&file, value).map_err(|e| RunboxError::Isolation {
        message: format!("cannot write {}: {e}", file.display()),
    })?;
    tracing::debug!(value, "CPU max quota set");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn half_a_core() {
        assert_eq!(compute_cpu_max(50).expect("valid"), "50000 100000");
    }

    #[test]
    fn one_percent_floor() {
        assert_eq!(compute_cpu_max(1).expect("valid"), "1000 100000");
    }

    #[test]
    fn ninety_nine_percent() {
        assert_eq!(compute_cpu_max(99).expect("valid"), "99000 100000");
    }

    #[test]
    fn full_core_is_unlimited() {
        assert_eq!(compute_cpu_max(100).expect("valid"), "max 100000");
    }

    #[test]
    fn zero_is_rejected() {
        assert!(matches!(
            compute_cpu_max(0),
            Err(RunboxError::Config { .. })
        ));
    }

    #[test]
    fn negative_is_rejected() {
        assert!(matches!(
            compute_cpu_max(-5),
            Err(RunboxError::Config { .. })
        ));
    }

    #[test]
    fn over_hundred_is_rejected() {
        assert!(matches!(
            compute_cpu_max(110),
            Err(RunboxError::Config { .. })
        ));
    }
}
