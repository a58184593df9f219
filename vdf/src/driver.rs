//! The repeated squaring loop.
//!
//! Squarings are first requested in batches from a [`FastBatchSquare`]
//! implementation. Whatever it returns is checked; a corrupted or unavailable
//! fast path costs exactly one reference squaring (NUDUPL followed by a
//! reduction) before the next attempt. The listener sees every form exactly
//! once, in order, whichever path produced it.

use crate::{fence::ProgressFence, Result};
use classgroup::{Discriminant, QuadraticForm};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, warn};

/// Result of a fast path attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The forms `f^2, f^4, ...` of the first squarings, at most as many as
    /// requested.
    Completed(Vec<QuadraticForm>),
    /// The fast path detected an inconsistency. Nothing was produced.
    Corrupted,
    /// The fast path cannot handle this form.
    Unavailable,
}

/// An accelerated implementation of repeated squaring.
pub trait FastBatchSquare: Send {
    /// Squares `form` up to `batch_size` times. `done` is the number of
    /// squarings that produced `form`.
    fn attempt(
        &mut self,
        form: &QuadraticForm,
        discriminant: &Discriminant,
        done: u64,
        batch_size: u64,
    ) -> BatchOutcome;
}

/// Used when no accelerated kernel is available: every squaring takes the
/// reference path.
pub struct NoAccelerator;

impl FastBatchSquare for NoAccelerator {
    fn attempt(&mut self, _: &QuadraticForm, _: &Discriminant, _: u64, _: u64) -> BatchOutcome {
        BatchOutcome::Unavailable
    }
}

/// What the driver does at a batch boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryAction {
    Continue,
    /// Run reference squarings until the count is a multiple of the given
    /// value, then call [`IterationListener::on_aligned`].
    AlignTo(u64),
    /// End the run.
    Halt,
}

/// Receives every form produced by the driver.
pub trait IterationListener: Send + Sync {
    /// `form` is the input raised to `2^iteration`. Called once per
    /// iteration, in increasing order, starting at 1.
    fn on_iteration(&self, form: &QuadraticForm, iteration: u64);

    /// Called after every batch, before progress is published.
    fn on_batch(&self, _done: u64) -> BoundaryAction {
        BoundaryAction::Continue
    }

    /// Called once an alignment requested by [`IterationListener::on_batch`]
    /// is reached.
    fn on_aligned(&self, _done: u64) {}
}

/// Counters of a finished run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverReport {
    pub iterations: u64,
    pub fast_batches: u64,
    pub fast_iterations: u64,
    pub slow_iterations: u64,
    pub corrupted_batches: u64,
    pub halted: bool,
    pub stopped: bool,
    /// The last form produced.
    pub y: QuadraticForm,
}

pub struct SquaringDriver<L: IterationListener + ?Sized> {
    pub discriminant: Discriminant,
    pub listener: Arc<L>,
    pub fence: Arc<ProgressFence>,
    pub stop: Arc<AtomicBool>,
    pub accelerator: Box<dyn FastBatchSquare>,
    pub batch_size: u64,
    /// Number of squarings to perform, or `None` to run until stopped or
    /// halted.
    pub bound: Option<u64>,
}

struct Progress {
    form: QuadraticForm,
    done: u64,
    report: DriverReport,
}

impl<L: IterationListener + ?Sized> SquaringDriver<L> {
    fn remaining(&self, done: u64) -> u64 {
        match self.bound {
            Some(bound) => bound.saturating_sub(done),
            None => u64::MAX,
        }
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn slow_step(&self, state: &mut Progress) {
        state.form = state.form.square(&self.discriminant);
        state.done += 1;
        state.report.slow_iterations += 1;
        self.listener.on_iteration(&state.form, state.done);
    }

    fn validate(&self, forms: &[QuadraticForm], requested: u64) -> bool {
        !forms.is_empty()
            && forms.len() as u64 <= requested
            && forms
                .iter()
                .all(|f| f.is_reduced() && &f.discriminant() == self.discriminant.value())
    }

    /// Squares `start` until the bound is reached, the stop flag is raised or
    /// the listener halts the run. The fence is closed on return.
    pub fn run(mut self, start: QuadraticForm) -> Result<DriverReport> {
        let start = start.reduced();
        let mut state = Progress {
            form: start.clone(),
            done: 0,
            report: DriverReport {
                iterations: 0,
                fast_batches: 0,
                fast_iterations: 0,
                slow_iterations: 0,
                corrupted_batches: 0,
                halted: false,
                stopped: false,
                y: start,
            },
        };

        loop {
            if self.is_stopped() {
                state.report.stopped = true;
                break;
            }
            let remaining = self.remaining(state.done);
            if remaining == 0 {
                break;
            }
            let requested = remaining.min(self.batch_size);
            let outcome =
                self.accelerator
                    .attempt(&state.form, &self.discriminant, state.done, requested);
            match outcome {
                BatchOutcome::Completed(forms) if self.validate(&forms, requested) => {
                    state.report.fast_batches += 1;
                    let produced = forms.len() as u64;
                    for form in forms {
                        if self.is_stopped() {
                            break;
                        }
                        state.done += 1;
                        state.report.fast_iterations += 1;
                        self.listener.on_iteration(&form, state.done);
                        state.form = form;
                    }
                    if produced < requested && self.remaining(state.done) > 0 && !self.is_stopped()
                    {
                        self.slow_step(&mut state);
                    }
                }
                BatchOutcome::Completed(_) | BatchOutcome::Corrupted => {
                    warn!(done = state.done, "fast path returned a corrupted batch");
                    state.report.corrupted_batches += 1;
                    self.slow_step(&mut state);
                }
                BatchOutcome::Unavailable => self.slow_step(&mut state),
            }

            match self.listener.on_batch(state.done) {
                BoundaryAction::Continue => {}
                BoundaryAction::Halt => {
                    debug!(done = state.done, "listener halted the squaring loop");
                    state.report.halted = true;
                    self.fence.publish(state.done);
                    break;
                }
                BoundaryAction::AlignTo(step) => {
                    while step > 0
                        && state.done % step != 0
                        && self.remaining(state.done) > 0
                        && !self.is_stopped()
                    {
                        self.slow_step(&mut state);
                    }
                    if step > 0 && state.done % step == 0 {
                        self.listener.on_aligned(state.done);
                    }
                }
            }
            self.fence.publish(state.done);
        }

        self.fence.publish(state.done);
        self.fence.close();
        state.report.iterations = state.done;
        state.report.y = state.form;
        debug!(
            iterations = state.report.iterations,
            fast_iterations = state.report.fast_iterations,
            slow_iterations = state.report.slow_iterations,
            corrupted_batches = state.report.corrupted_batches,
            "squaring loop finished"
        );
        Ok(state.report)
    }
}
