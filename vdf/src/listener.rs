//! Iteration listeners storing the checkpoints of each proving mode.

use crate::{
    checkpoint::{CheckpointIndex, CheckpointStore, MultiSegmentLayout, TwoLevelLayout},
    config::VdfConfig,
    driver::{BoundaryAction, IterationListener},
    params::{approximate_parameters, ProofParameters},
    Result, VdfError,
};
use classgroup::QuadraticForm;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    PoisonError, RwLock,
};
use tracing::{info, warn};

/// Below this many iterations a single proof always uses `k = 10, l = 1`.
const SMALL_RUN: u64 = 1 << 16;

/// Parameters of a single-segment proof of `iterations` squarings.
pub fn one_wesolowski_parameters(iterations: u64) -> ProofParameters {
    if iterations >= SMALL_RUN {
        approximate_parameters(iterations)
    } else {
        ProofParameters::new(10, 1)
    }
}

fn store_at(
    index: &CheckpointIndex,
    store: &CheckpointStore,
    overflow: &AtomicBool,
    form: &QuadraticForm,
    iteration: u64,
    level: usize,
) {
    let stored: Result<()> = index
        .get_position(iteration, level)
        .and_then(|position| store.set(position, form));
    if let Err(e) = stored {
        if !overflow.swap(true, Ordering::AcqRel) {
            warn!(iteration, error = %e, "checkpoint storage exhausted");
        }
    }
}

/// Stores the forms of a run of known length: one every `kl` iterations and
/// the final one.
pub struct OneWesolowskiCallback {
    pub params: ProofParameters,
    pub wanted: u64,
    pub index: CheckpointIndex,
    pub store: CheckpointStore,
    result: RwLock<Option<QuadraticForm>>,
    overflow: AtomicBool,
}

impl OneWesolowskiCallback {
    pub fn new(x: &QuadraticForm, wanted: u64) -> Self {
        let params = one_wesolowski_parameters(wanted);
        let index = CheckpointIndex::single_segment(params.kl(), wanted);
        let store = CheckpointStore::new(index.capacity());
        let result = (wanted == 0).then(|| x.clone());
        let callback = OneWesolowskiCallback {
            params,
            wanted,
            index,
            store,
            result: RwLock::new(result),
            overflow: AtomicBool::new(false),
        };
        store_at(&callback.index, &callback.store, &callback.overflow, x, 0, 0);
        callback
    }

    /// The form after `wanted` squarings, once reached.
    pub fn result(&self) -> Option<QuadraticForm> {
        self.result
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IterationListener for OneWesolowskiCallback {
    fn on_iteration(&self, form: &QuadraticForm, iteration: u64) {
        if iteration > self.wanted {
            return;
        }
        if iteration % self.params.kl() == 0 {
            store_at(&self.index, &self.store, &self.overflow, form, iteration, 0);
        }
        if iteration == self.wanted {
            *self.result.write().unwrap_or_else(PoisonError::into_inner) = Some(form.clone());
        }
    }

    fn on_batch(&self, done: u64) -> BoundaryAction {
        if done >= self.wanted || self.overflow.load(Ordering::Acquire) {
            BoundaryAction::Halt
        } else {
            BoundaryAction::Continue
        }
    }
}

/// Stores a form every 10 iterations, then every 100 once the switch point
/// is passed, for an unbounded run.
pub struct TwoWesolowskiCallback {
    pub index: CheckpointIndex,
    pub store: CheckpointStore,
    switch_iterations: u64,
    halt_at: u64,
    overflow: AtomicBool,
}

impl TwoWesolowskiCallback {
    /// Fails with [`VdfError::InvalidConfig`] unless `config` validates.
    pub fn new(x: &QuadraticForm, config: &VdfConfig) -> Result<Self> {
        config.validate()?;
        let layout = TwoLevelLayout::new(config.switch_iterations, config.max_iterations);
        let store = CheckpointStore::new(layout.capacity());
        let callback = TwoWesolowskiCallback {
            index: CheckpointIndex::TwoLevel(layout),
            store,
            switch_iterations: config.switch_iterations,
            halt_at: config.max_iterations - config.halt_margin,
            overflow: AtomicBool::new(false),
        };
        store_at(&callback.index, &callback.store, &callback.overflow, x, 0, 0);
        Ok(callback)
    }

    /// Stride in effect at `iteration`.
    pub fn stride_at(&self, iteration: u64) -> u64 {
        self.index
            .two_level()
            .map_or(10, |layout| layout.stride_at(iteration))
    }

    /// The iteration from which stride 100 applies, once switched.
    pub fn switch_point(&self) -> Option<u64> {
        self.index.two_level().and_then(TwoLevelLayout::switch_point)
    }

    /// The iteration at which switching is requested.
    pub fn switch_iterations(&self) -> u64 {
        self.switch_iterations
    }

    pub fn form_at(&self, iteration: u64) -> Result<Option<QuadraticForm>> {
        let position = self.index.get_position(iteration, 0)?;
        Ok(self.store.get(position))
    }
}

impl IterationListener for TwoWesolowskiCallback {
    fn on_iteration(&self, form: &QuadraticForm, iteration: u64) {
        if iteration % self.stride_at(iteration) == 0 {
            store_at(&self.index, &self.store, &self.overflow, form, iteration, 0);
        }
    }

    fn on_batch(&self, done: u64) -> BoundaryAction {
        if self.overflow.load(Ordering::Acquire) || done >= self.halt_at {
            info!(done, "maximum number of iterations reached");
            return BoundaryAction::Halt;
        }
        if done >= self.switch_iterations && self.switch_point().is_none() {
            return BoundaryAction::AlignTo(100);
        }
        BoundaryAction::Continue
    }

    fn on_aligned(&self, done: u64) {
        if let Some(layout) = self.index.two_level() {
            if layout.switch_point().is_none() {
                info!(done, "switching to stride 100");
                layout.increase_constants(done);
            }
        }
    }
}

/// Stores, for every segment level, the forms of the segments inside the
/// rolling window, and a coarse checkpoint every `2^base_bits` iterations.
pub struct MultiSegmentCallback {
    pub index: CheckpointIndex,
    pub store: CheckpointStore,
    pub checkpoints: CheckpointStore,
    overflow: AtomicBool,
}

impl MultiSegmentCallback {
    /// Fails with [`VdfError::InvalidConfig`] unless `config` validates.
    pub fn new(x: &QuadraticForm, config: &VdfConfig) -> Result<Self> {
        config.validate()?;
        let layout = MultiSegmentLayout::from_config(config);
        let store = CheckpointStore::new(layout.total_slots());
        let callback = MultiSegmentCallback {
            index: CheckpointIndex::MultiSegment(layout),
            store,
            checkpoints: CheckpointStore::new(config.max_checkpoints),
            overflow: AtomicBool::new(false),
        };
        callback.on_iteration_inner(x, 0);
        Ok(callback)
    }

    pub fn layout(&self) -> Option<&MultiSegmentLayout> {
        self.index.multi_segment()
    }

    /// The form after `n * 2^base_bits` squarings.
    pub fn checkpoint(&self, n: u64) -> Option<QuadraticForm> {
        self.checkpoints.get(usize::try_from(n).ok()?)
    }

    fn on_iteration_inner(&self, form: &QuadraticForm, iteration: u64) {
        let Some(layout) = self.index.multi_segment() else {
            return;
        };
        for level in 0..layout.levels() {
            if layout.is_stored(iteration, level) {
                store_at(&self.index, &self.store, &self.overflow, form, iteration, level);
            }
        }
        let base_bits = layout.base_bits();
        if iteration % (1 << base_bits) == 0 {
            let stored = usize::try_from(iteration >> base_bits)
                .ok()
                .and_then(|n| self.checkpoints.set(n, form).ok());
            if stored.is_none() && !self.overflow.swap(true, Ordering::AcqRel) {
                warn!(iteration, "coarse checkpoint storage exhausted");
            }
        }
    }
}

impl IterationListener for MultiSegmentCallback {
    fn on_iteration(&self, form: &QuadraticForm, iteration: u64) {
        self.on_iteration_inner(form, iteration);
    }

    fn on_batch(&self, _done: u64) -> BoundaryAction {
        if self.overflow.load(Ordering::Acquire) {
            BoundaryAction::Halt
        } else {
            BoundaryAction::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classgroup::Discriminant;
    use num_bigint::BigInt;

    fn discriminant() -> Discriminant {
        Discriminant::new(BigInt::from(-10007)).unwrap()
    }

    #[test]
    fn test_one_weso_stores_every_kl() {
        let d = discriminant();
        let g = QuadraticForm::generator(&d);
        let callback = OneWesolowskiCallback::new(&g, 35);
        assert_eq!(callback.params, ProofParameters::new(10, 1));
        let mut f = g.clone();
        for i in 1..=40 {
            f = f.square(&d);
            callback.on_iteration(&f, i);
        }
        assert_eq!(callback.result(), Some(g.repeated_square(35, &d)));
        assert_eq!(callback.store.get(0), Some(g.clone()));
        assert_eq!(callback.store.get(3), Some(g.repeated_square(30, &d)));
        // nothing past the wanted iteration
        assert_eq!(callback.store.get(4), None);
        assert_eq!(callback.on_batch(35), BoundaryAction::Halt);
        assert_eq!(callback.on_batch(20), BoundaryAction::Continue);
    }

    #[test]
    fn test_two_weso_requests_alignment_then_switches() {
        let d = discriminant();
        let g = QuadraticForm::generator(&d);
        let config = VdfConfig {
            switch_iterations: 1000,
            max_iterations: 10_000,
            halt_margin: 500,
            ..VdfConfig::default()
        };
        let callback = TwoWesolowskiCallback::new(&g, &config).unwrap();
        assert_eq!(callback.on_batch(999), BoundaryAction::Continue);
        assert_eq!(callback.on_batch(1003), BoundaryAction::AlignTo(100));
        callback.on_aligned(1100);
        assert_eq!(callback.switch_point(), Some(1100));
        assert_eq!(callback.stride_at(1150), 100);
        assert_eq!(callback.on_batch(1200), BoundaryAction::Continue);
        assert_eq!(callback.on_batch(9500), BoundaryAction::Halt);
    }

    #[test]
    fn test_multi_segment_keeps_coarse_checkpoints() {
        let d = discriminant();
        let g = QuadraticForm::generator(&d);
        let config = VdfConfig {
            batch_size: 8,
            segment_base_bits: 6,
            segment_levels: 2,
            segment_window: 3,
            ..VdfConfig::default()
        };
        let callback = MultiSegmentCallback::new(&g, &config).unwrap();
        let mut f = g.clone();
        for i in 1..=300 {
            f = f.square(&d);
            callback.on_iteration(&f, i);
        }
        assert_eq!(callback.checkpoint(0), Some(g.clone()));
        assert_eq!(callback.checkpoint(4), Some(g.repeated_square(256, &d)));
        assert_eq!(callback.checkpoint(5), None);
        let layout = callback.layout().unwrap();
        // 266 = 4 * 64 + 10 lands in the slots segment 1 used before
        let position = layout.position(266, 0).unwrap();
        assert_eq!(position, layout.position(74, 0).unwrap());
        assert_eq!(callback.store.get(position), Some(g.repeated_square(266, &d)));
        assert_eq!(callback.on_batch(300), BoundaryAction::Continue);
    }

    #[test]
    fn test_constructors_reject_invalid_configs() {
        let d = discriminant();
        let g = QuadraticForm::generator(&d);
        let margin_too_large = VdfConfig {
            switch_iterations: 1000,
            max_iterations: 2000,
            halt_margin: 5000,
            ..VdfConfig::default()
        };
        assert!(matches!(
            TwoWesolowskiCallback::new(&g, &margin_too_large),
            Err(VdfError::InvalidConfig(_))
        ));
        let switch_past_max = VdfConfig {
            switch_iterations: 3000,
            max_iterations: 2000,
            ..VdfConfig::default()
        };
        assert!(matches!(
            TwoWesolowskiCallback::new(&g, &switch_past_max),
            Err(VdfError::InvalidConfig(_))
        ));
        let huge_segments = VdfConfig {
            segment_base_bits: 64,
            ..VdfConfig::default()
        };
        assert!(matches!(
            MultiSegmentCallback::new(&g, &huge_segments),
            Err(VdfError::InvalidConfig(_))
        ));
    }
}
