//! Storage of the intermediate forms a prover needs, and the mapping from
//! iteration numbers to storage slots.
//!
//! Three layouts are supported:
//! - [`CheckpointIndex::SingleSegment`]: one form every `kl` iterations for a
//!   run with a known length.
//! - [`CheckpointIndex::MultiSegment`]: a rolling window of segments for each
//!   level of the segment manager, plus a coarse checkpoint every
//!   `2^base_bits` iterations.
//! - [`CheckpointIndex::TwoLevel`]: stride 10 up to a switch point and stride
//!   100 after it, for unbounded runs proven with two segments.

use crate::{config::VdfConfig, fence::ProgressFence, Result, VdfError};
use classgroup::QuadraticForm;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    OnceLock, PoisonError, RwLock,
};

const CHUNK_SIZE: usize = 4096;

type Slot = RwLock<Option<QuadraticForm>>;

/// Fixed-capacity array of forms, allocated chunk by chunk on first write.
///
/// Each slot has a single writer (the driver thread); readers never observe a
/// partially written form.
pub struct CheckpointStore {
    chunks: Vec<OnceLock<Box<[Slot]>>>,
    capacity: usize,
}

impl CheckpointStore {
    pub fn new(capacity: usize) -> Self {
        let chunks = (0..capacity.div_ceil(CHUNK_SIZE))
            .map(|_| OnceLock::new())
            .collect();
        CheckpointStore { chunks, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot(&self, position: usize) -> Option<&Slot> {
        if position >= self.capacity {
            return None;
        }
        let chunk = self.chunks[position / CHUNK_SIZE]
            .get_or_init(|| (0..CHUNK_SIZE).map(|_| RwLock::new(None)).collect());
        Some(&chunk[position % CHUNK_SIZE])
    }

    pub fn set(&self, position: usize, form: &QuadraticForm) -> Result<()> {
        let slot = self
            .slot(position)
            .ok_or(VdfError::IndexOutOfRange(position as u64))?;
        *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(form.clone());
        Ok(())
    }

    pub fn get(&self, position: usize) -> Option<QuadraticForm> {
        if position >= self.capacity {
            return None;
        }
        let chunk = self.chunks[position / CHUNK_SIZE].get()?;
        chunk[position % CHUNK_SIZE]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Slot layout of the segment manager.
///
/// Level `i` segments cover `2^(base_bits + 2i)` iterations and keep a form
/// every `10` (level 0) or `12 * 4^(i-1)` iterations. The slots of the last
/// `window` segments of each level are kept, so segment `s` of a level
/// reuses the slots of segment `s - window`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiSegmentLayout {
    base_bits: u32,
    window: u64,
    begins: Vec<usize>,
    total: usize,
}

impl MultiSegmentLayout {
    pub fn new(base_bits: u32, window: u64, levels: usize) -> Self {
        let mut begins = Vec::with_capacity(levels);
        let mut total = 0usize;
        for level in 0..levels {
            begins.push(total);
            let slots = Self::level_slots(base_bits, level);
            total += slots * window as usize;
        }
        MultiSegmentLayout {
            base_bits,
            window,
            begins,
            total,
        }
    }

    pub fn from_config(config: &VdfConfig) -> Self {
        Self::new(
            config.segment_base_bits,
            config.segment_window,
            config.segment_levels,
        )
    }

    fn level_slots(base_bits: u32, level: usize) -> usize {
        let size = 1u64 << (base_bits + 2 * level as u32);
        (size / Self::level_stride(level) + 1) as usize
    }

    /// Distance between two stored forms of a level, also the `k * l` of its
    /// proofs.
    pub fn level_stride(level: usize) -> u64 {
        if level == 0 {
            10
        } else {
            12 * 4u64.pow(level as u32 - 1)
        }
    }

    pub fn segment_length(&self, level: usize) -> u64 {
        1 << (self.base_bits + 2 * level as u32)
    }

    pub fn slots(&self, level: usize) -> usize {
        Self::level_slots(self.base_bits, level)
    }

    pub fn levels(&self) -> usize {
        self.begins.len()
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn base_bits(&self) -> u32 {
        self.base_bits
    }

    /// Total number of slots over every level.
    pub fn total_slots(&self) -> usize {
        self.total
    }

    /// Whether `iteration` is stored for `level`.
    pub fn is_stored(&self, iteration: u64, level: usize) -> bool {
        (iteration % self.segment_length(level)) % Self::level_stride(level) == 0
    }

    pub fn position(&self, iteration: u64, level: usize) -> Result<usize> {
        if level >= self.levels() || !self.is_stored(iteration, level) {
            return Err(VdfError::IndexOutOfRange(iteration));
        }
        let size = self.segment_length(level);
        let slots = self.slots(level) as u64;
        let offset = ((iteration / size) % self.window) * slots
            + (iteration % size) / Self::level_stride(level);
        Ok(self.begins[level] + offset as usize)
    }
}

/// Slot layout of the two-segment prover: stride 10 before the switch point,
/// stride 100 after it.
#[derive(Debug)]
pub struct TwoLevelLayout {
    switch_iters: AtomicU64,
    switch_index: AtomicU64,
    capacity: usize,
}

const NOT_SWITCHED: u64 = u64::MAX;

impl TwoLevelLayout {
    /// Room for stride 10 up to `switch_iterations` and stride 100 up to
    /// `max_iterations`.
    pub fn new(switch_iterations: u64, max_iterations: u64) -> Self {
        let capacity =
            switch_iterations / 10 + max_iterations.saturating_sub(switch_iterations) / 100;
        TwoLevelLayout {
            switch_iters: AtomicU64::new(NOT_SWITCHED),
            switch_index: AtomicU64::new(0),
            capacity: capacity as usize,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Switches to stride 100 from iteration `n` on. `n` must be a multiple
    /// of 100.
    pub fn increase_constants(&self, n: u64) {
        self.switch_index.store(n / 10, Ordering::Relaxed);
        self.switch_iters.store(n, Ordering::Release);
    }

    /// The switch iteration, if the switch happened.
    pub fn switch_point(&self) -> Option<u64> {
        match self.switch_iters.load(Ordering::Acquire) {
            NOT_SWITCHED => None,
            n => Some(n),
        }
    }

    /// Stride in effect at `iteration`.
    pub fn stride_at(&self, iteration: u64) -> u64 {
        match self.switch_point() {
            Some(switch) if iteration >= switch => 100,
            _ => 10,
        }
    }

    pub fn position(&self, iteration: u64) -> Result<usize> {
        let position = match self.switch_point() {
            Some(switch) if iteration >= switch => {
                if (iteration - switch) % 100 != 0 {
                    return Err(VdfError::IndexOutOfRange(iteration));
                }
                self.switch_index.load(Ordering::Relaxed) + (iteration - switch) / 100
            }
            _ => {
                if iteration % 10 != 0 {
                    return Err(VdfError::IndexOutOfRange(iteration));
                }
                iteration / 10
            }
        };
        if position >= self.capacity as u64 {
            return Err(VdfError::IndexOutOfRange(iteration));
        }
        Ok(position as usize)
    }
}

/// Mapping from iteration numbers to [`CheckpointStore`] slots.
#[derive(Debug)]
pub enum CheckpointIndex {
    SingleSegment { kl: u64, capacity: usize },
    MultiSegment(MultiSegmentLayout),
    TwoLevel(TwoLevelLayout),
}

impl CheckpointIndex {
    /// Single segment index for a run of `iterations` squarings.
    pub fn single_segment(kl: u64, iterations: u64) -> Self {
        CheckpointIndex::SingleSegment {
            kl,
            capacity: (iterations / kl + 100) as usize,
        }
    }

    /// Number of slots the backing store needs.
    pub fn capacity(&self) -> usize {
        match self {
            CheckpointIndex::SingleSegment { capacity, .. } => *capacity,
            CheckpointIndex::MultiSegment(layout) => layout.total_slots(),
            CheckpointIndex::TwoLevel(layout) => layout.capacity(),
        }
    }

    pub fn two_level(&self) -> Option<&TwoLevelLayout> {
        match self {
            CheckpointIndex::TwoLevel(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn multi_segment(&self) -> Option<&MultiSegmentLayout> {
        match self {
            CheckpointIndex::MultiSegment(layout) => Some(layout),
            _ => None,
        }
    }

    /// Slot of the form reached after `iteration` squarings. `level` selects
    /// the segment level and must be 0 for the other layouts.
    pub fn get_position(&self, iteration: u64, level: usize) -> Result<usize> {
        match self {
            CheckpointIndex::SingleSegment { kl, capacity } => {
                if level != 0 || iteration % kl != 0 || iteration / kl >= *capacity as u64 {
                    return Err(VdfError::IndexOutOfRange(iteration));
                }
                Ok((iteration / kl) as usize)
            }
            CheckpointIndex::MultiSegment(layout) => layout.position(iteration, level),
            CheckpointIndex::TwoLevel(layout) => {
                if level != 0 {
                    return Err(VdfError::IndexOutOfRange(iteration));
                }
                layout.position(iteration)
            }
        }
    }
}

/// Guards reads from a rolling window: the slot of `iteration` is only
/// trusted while the published progress stays below `limit`.
pub struct OverrunGuard<'a> {
    pub fence: &'a ProgressFence,
    pub limit: u64,
}

/// The checkpoints of one segment, as seen by a prover: intermediate `i` is
/// the form reached after `start + i * kl` squarings.
pub struct CheckpointView<'a> {
    pub store: &'a CheckpointStore,
    pub index: &'a CheckpointIndex,
    pub start: u64,
    pub kl: u64,
    pub level: usize,
    pub guard: Option<OverrunGuard<'a>>,
}

impl CheckpointView<'_> {
    pub fn read(&self, i: u64) -> Result<QuadraticForm> {
        let iteration = self.start + i * self.kl;
        let position = self.index.get_position(iteration, self.level)?;
        let form = self
            .store
            .get(position)
            .ok_or(VdfError::MissingCheckpoint(iteration))?;
        if let Some(guard) = &self.guard {
            if guard.fence.current() >= guard.limit {
                return Err(VdfError::WindowOverrun(iteration));
            }
        }
        Ok(form)
    }
}
