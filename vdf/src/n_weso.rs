//! Proofs of any iteration of a running computation.
//!
//! The [`SegmentManager`] proves every segment of every level as soon as the
//! driver completes it. Level `i` segments cover `2^(base_bits + 2i)`
//! iterations and start at a multiple of their length, so a prefix of the
//! computation is covered by a few segments of decreasing level. A request
//! for iteration `N` chains those segments and a final partial segment,
//! recomputed from the closest coarse checkpoint.

use crate::{
    checkpoint::{CheckpointView, MultiSegmentLayout, OverrunGuard},
    fence::ProgressFence,
    listener::MultiSegmentCallback,
    params::ProofParameters,
    proof::{encode_segments, Proof, Segment, MAX_DEPTH},
    prover::{generate_wesolowski, square_with_checkpoints},
    run::VdfRun,
    Result, VdfError,
};
use classgroup::{Discriminant, QuadraticForm};
use rayon::ThreadPool;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};
use vdf_utils::math::round_down;

/// Parameters of the segments of `level`. `k * l` is the stride at which
/// the level keeps checkpoints.
pub fn level_parameters(level: usize) -> ProofParameters {
    match level {
        0 => ProofParameters::new(10, 1),
        1 => ProofParameters::new(12, 1),
        _ => ProofParameters::new(12, 4u32.pow(level as u32 - 1)),
    }
}

#[derive(Default)]
struct ManagerState {
    /// `done[level][i]` is the outcome of segment `i` of `level`, `None`
    /// while it is being proven. The length of `done[level]` is the number
    /// of segments scheduled.
    done: Vec<Vec<Option<Result<Segment>>>>,
    finished: u64,
}

struct Shared {
    discriminant: Discriminant,
    callback: Arc<MultiSegmentCallback>,
    layout: MultiSegmentLayout,
    fence: Arc<ProgressFence>,
    run_stop: Arc<AtomicBool>,
    shutdown: AtomicBool,
    state: Mutex<ManagerState>,
    proven: Condvar,
    batch_size: u64,
    stall_timeout: Duration,
    poll_interval: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::Acquire) || self.run_stop.load(Ordering::Acquire)
    }

    fn coarse_checkpoint(&self, iteration: u64) -> Result<QuadraticForm> {
        self.callback
            .checkpoint(iteration >> self.layout.base_bits())
            .ok_or(VdfError::MissingCheckpoint(iteration))
    }

    fn prove_segment(&self, level: usize, index: u64) -> Result<Segment> {
        let length = self.layout.segment_length(level);
        let start = index * length;
        let x = self.coarse_checkpoint(start)?;
        let y = self.coarse_checkpoint(start + length)?;
        let params = level_parameters(level);

        // the driver reuses the slots of this segment once it reaches
        // segment `index + window`
        let limit = ((index + self.layout.window()) * length).saturating_sub(self.batch_size);
        if self.fence.current() >= limit {
            return Err(VdfError::WindowOverrun(start));
        }
        let view = CheckpointView {
            store: &self.callback.store,
            index: &self.callback.index,
            start,
            kl: params.kl(),
            level,
            guard: Some(OverrunGuard {
                fence: &self.fence,
                limit,
            }),
        };
        let proof = generate_wesolowski(
            &self.discriminant,
            &x,
            &y,
            &view,
            length,
            params,
            &self.shutdown,
        )?;
        Ok(Segment {
            start,
            length,
            x,
            y,
            proof,
        })
    }

    fn record(&self, level: usize, index: u64, outcome: Result<Segment>) {
        let mut state = self.lock();
        if let Some(slot) = state
            .done
            .get_mut(level)
            .and_then(|segments| segments.get_mut(index as usize))
        {
            *slot = Some(outcome);
        }
        state.finished += 1;
        drop(state);
        self.proven.notify_all();
    }

    /// Schedules every segment completed by `progress` squarings.
    fn schedule(self: &Arc<Self>, progress: u64, pool: &ThreadPool) {
        let mut state = self.lock();
        for level in 0..self.layout.levels() {
            let length = self.layout.segment_length(level);
            loop {
                let index = state.done[level].len() as u64;
                if (index + 1) * length > progress {
                    break;
                }
                state.done[level].push(None);
                let shared = self.clone();
                pool.spawn_fifo(move || {
                    let outcome = shared.prove_segment(level, index);
                    match &outcome {
                        Ok(_) => debug!(level, index, "segment proven"),
                        Err(e) => warn!(level, index, error = %e, "segment proof failed"),
                    }
                    shared.record(level, index, outcome);
                });
            }
        }
    }

    fn event_loop(self: Arc<Self>, pool: ThreadPool) {
        let base = self.layout.segment_length(0);
        loop {
            let next = (self.lock().done[0].len() as u64 + 1) * base;
            match self
                .fence
                .wait_until(next, &self.shutdown, self.stall_timeout)
            {
                Ok(progress) => self.schedule(progress, &pool),
                Err(VdfError::Desynchronized { .. }) => {}
                Err(VdfError::IterationsExhausted(progress)) => {
                    self.schedule(progress, &pool);
                    break;
                }
                Err(_) => break,
            }
        }
        debug!("segment event loop finished");
    }

    /// Blocks until segment `index` of `level` has an outcome.
    fn wait_segment(&self, level: usize, index: u64, target: u64) -> Result<Segment> {
        let mut state = self.lock();
        let mut finished = state.finished;
        let mut last_change = Instant::now();
        loop {
            if let Some(Some(outcome)) = state
                .done
                .get(level)
                .and_then(|segments| segments.get(index as usize))
            {
                return outcome.clone();
            }
            if self.is_stopped() {
                return Err(VdfError::Stopped);
            }
            if state.finished != finished {
                finished = state.finished;
                last_change = Instant::now();
            } else if last_change.elapsed() >= self.stall_timeout {
                return Err(VdfError::Desynchronized {
                    progress: self.fence.current(),
                    target,
                });
            }
            state = self
                .proven
                .wait_timeout(state, self.poll_interval)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }
}

/// Proves the segments of a [`MultiSegmentCallback`] run in the background
/// and answers proof requests for arbitrary iterations.
pub struct SegmentManager {
    shared: Arc<Shared>,
    event_loop: Option<JoinHandle<()>>,
}

impl SegmentManager {
    /// Starts the event loop and the prover pool of `run`.
    pub fn new(run: &VdfRun<MultiSegmentCallback>) -> Result<Self> {
        let config = run.config();
        let layout = run
            .listener()
            .layout()
            .cloned()
            .ok_or(VdfError::InvalidConfig("the listener has no segment layout"))?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.prover_threads)
            .thread_name(|i| format!("vdf-prover-{i}"))
            .build()
            .map_err(|e| VdfError::DriverFailed(e.to_string()))?;
        let state = ManagerState {
            done: vec![Vec::new(); layout.levels()],
            finished: 0,
        };
        let shared = Arc::new(Shared {
            discriminant: run.discriminant().clone(),
            callback: run.listener().clone(),
            layout,
            fence: run.fence().clone(),
            run_stop: run.stop_flag().clone(),
            shutdown: AtomicBool::new(false),
            state: Mutex::new(state),
            proven: Condvar::new(),
            batch_size: config.batch_size,
            stall_timeout: config.stall_timeout(),
            poll_interval: config.poll_interval(),
        });
        let event_loop = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("vdf-segments".into())
                .spawn(move || shared.event_loop(pool))
                .map_err(|e| VdfError::DriverFailed(e.to_string()))?
        };
        info!(
            levels = shared.layout.levels(),
            base_bits = shared.layout.base_bits(),
            window = shared.layout.window(),
            "segment manager started"
        );
        Ok(SegmentManager {
            shared,
            event_loop: Some(event_loop),
        })
    }

    /// Number of segments of `level` proven so far.
    pub fn proven(&self, level: usize) -> usize {
        self.shared.lock().done.get(level).map_or(0, |segments| {
            segments
                .iter()
                .filter(|outcome| matches!(outcome, Some(Ok(_))))
                .count()
        })
    }

    /// The segments covering `[0, aligned)`, largest level first.
    fn plan(&self, aligned: u64) -> Vec<(usize, u64)> {
        let layout = &self.shared.layout;
        let mut plan = Vec::new();
        let mut position = 0;
        for level in (0..layout.levels()).rev() {
            let length = layout.segment_length(level);
            while position + length <= aligned {
                plan.push((level, position / length));
                position += length;
            }
        }
        plan
    }

    fn prove_partial(&self, start: u64, length: u64) -> Result<Segment> {
        let shared = &self.shared;
        let x = shared.coarse_checkpoint(start)?;
        let params = ProofParameters::new(10, 1);
        let (intermediates, y) =
            square_with_checkpoints(&shared.discriminant, &x, length, params.kl());
        let proof = generate_wesolowski(
            &shared.discriminant,
            &x,
            &y,
            intermediates.as_slice(),
            length,
            params,
            &shared.shutdown,
        )?;
        Ok(Segment {
            start,
            length,
            x,
            y,
            proof,
        })
    }

    /// Proves the first `iteration` squarings of the run.
    ///
    /// Blocks until the driver and the segment provers got far enough. A
    /// segment lost to the rolling window is replaced by the four segments of
    /// the level below; a lost base segment fails the request.
    pub fn prove(&self, iteration: u64) -> Result<Proof> {
        let shared = &self.shared;
        let base = shared.layout.segment_length(0);
        let aligned = round_down(iteration, base);
        let plan = self.plan(aligned);
        let partial = iteration - aligned;
        let count = plan.len() + usize::from(partial > 0 || plan.is_empty());
        if count > MAX_DEPTH + 1 {
            return Err(VdfError::TooManySegments(count));
        }
        shared
            .fence
            .wait_until(aligned, &shared.run_stop, shared.stall_timeout)?;

        let mut pending: VecDeque<(usize, u64)> = plan.into();
        let mut segments = Vec::with_capacity(count);
        while let Some((level, index)) = pending.pop_front() {
            match shared.wait_segment(level, index, iteration) {
                Ok(segment) => segments.push(segment),
                Err(VdfError::WindowOverrun(start)) if level > 0 => {
                    debug!(level, start, "falling back to smaller segments");
                    for child in (0..4).rev() {
                        pending.push_front((level - 1, 4 * index + child));
                    }
                }
                Err(e) => return Err(e),
            }
        }
        if partial > 0 || segments.is_empty() {
            segments.push(self.prove_partial(aligned, partial)?);
        }
        let proof = encode_segments(&shared.discriminant, &segments)?;
        info!(
            iteration,
            segments = segments.len(),
            "got n-wesolowski proof"
        );
        Ok(proof)
    }
}

impl Drop for SegmentManager {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.fence.notify();
        self.shared.proven.notify_all();
        if let Some(handle) = self.event_loop.take() {
            if handle.join().is_err() {
                warn!("segment event loop panicked");
            }
        }
    }
}
