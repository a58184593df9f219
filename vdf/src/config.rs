//! Runtime configuration of the squaring loop and of the provers.
//!
//! Every field has a default matching the production constants, so a JSON
//! file only needs to list the values it overrides.

use crate::{Result, VdfError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VdfConfig {
    /// Largest number of squarings requested from the fast path at once.
    /// Progress is published after every batch.
    pub batch_size: u64,
    /// How long a waiter tolerates a progress counter that does not move.
    pub stall_timeout_ms: u64,
    /// How often waiters wake up to look at the stop flag.
    pub poll_interval_ms: u64,
    /// Number of segments of each level kept in the rolling checkpoint window.
    pub segment_window: u64,
    /// Number of segment levels proven by the segment manager.
    pub segment_levels: usize,
    /// Level `i` segments are `2^(segment_base_bits + 2i)` iterations long.
    pub segment_base_bits: u32,
    /// Number of coarse checkpoints (one every `2^segment_base_bits`
    /// iterations) that can be stored.
    pub max_checkpoints: usize,
    /// Iteration at which the two-level index switches from stride 10 to
    /// stride 100.
    pub switch_iterations: u64,
    /// Capacity of the two-level index, in iterations.
    pub max_iterations: u64,
    /// The two-level run halts this many iterations before its capacity.
    pub halt_margin: u64,
    /// Threads of the segment prover pool. Zero lets rayon decide.
    pub prover_threads: usize,
}

impl Default for VdfConfig {
    fn default() -> Self {
        VdfConfig {
            batch_size: 10_000,
            stall_timeout_ms: 60_000,
            poll_interval_ms: 100,
            segment_window: 20,
            segment_levels: 8,
            segment_base_bits: 16,
            max_checkpoints: 1 << 18,
            switch_iterations: 91_000_000,
            max_iterations: 800_000_000,
            halt_margin: 500_000,
            prover_threads: 0,
        }
    }
}

impl VdfConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Length of the shortest segment, also the distance between two coarse
    /// checkpoints.
    pub fn base_segment_length(&self) -> u64 {
        1 << self.segment_base_bits
    }

    /// Checks the relations the checkpoint layouts rely on.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(VdfError::InvalidConfig("batch_size must be positive"));
        }
        if !(6..=40).contains(&self.segment_base_bits) {
            return Err(VdfError::InvalidConfig(
                "segment_base_bits must lie in 6..=40",
            ));
        }
        if self.segment_levels == 0 || self.segment_levels > 12 {
            return Err(VdfError::InvalidConfig("segment_levels must lie in 1..=12"));
        }
        if self.segment_window < 2 {
            return Err(VdfError::InvalidConfig("segment_window must be at least 2"));
        }
        if self.batch_size >= self.segment_window * self.base_segment_length() {
            return Err(VdfError::InvalidConfig(
                "a batch must be shorter than the checkpoint window",
            ));
        }
        if self.switch_iterations % 100 != 0 || self.switch_iterations >= self.max_iterations {
            return Err(VdfError::InvalidConfig(
                "switch_iterations must be a multiple of 100 below max_iterations",
            ));
        }
        if self.halt_margin >= self.max_iterations - self.switch_iterations {
            return Err(VdfError::InvalidConfig(
                "halt_margin must leave room after the switch",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(VdfError::InvalidConfig("poll_interval_ms must be positive"));
        }
        Ok(())
    }
}
