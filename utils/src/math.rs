//! This module provides small integer math helpers.

/// Rounds `value` down to a multiple of `step`.
pub fn round_down(value: u64, step: u64) -> u64 {
    value - value % step
}
