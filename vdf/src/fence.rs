//! Progress counter shared between the squaring loop and the provers.
//!
//! The driver publishes the number of finished squarings after the listener
//! stored every form of the batch, so a reader that observes `n` through
//! [`ProgressFence::current`] also observes every checkpoint up to `n`.

use crate::{Result, VdfError};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Condvar, Mutex, PoisonError,
    },
    time::{Duration, Instant},
};

pub struct ProgressFence {
    progress: AtomicU64,
    closed: AtomicBool,
    lock: Mutex<()>,
    advanced: Condvar,
    poll_interval: Duration,
}

impl ProgressFence {
    pub fn new(poll_interval: Duration) -> Self {
        ProgressFence {
            progress: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            lock: Mutex::new(()),
            advanced: Condvar::new(),
            poll_interval,
        }
    }

    pub fn publish(&self, iterations: u64) {
        self.progress.store(iterations, Ordering::Release);
        self.notify();
    }

    pub fn current(&self) -> u64 {
        self.progress.load(Ordering::Acquire)
    }

    /// Marks the end of the squaring loop. Waiters asking for more than the
    /// final count fail with [`VdfError::IterationsExhausted`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wakes every waiter, e.g. after raising a stop flag.
    pub fn notify(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.advanced.notify_all();
    }

    /// Blocks until at least `target` squarings are published.
    ///
    /// Returns the observed progress, [`VdfError::Stopped`] once `stop` is
    /// raised, and [`VdfError::Desynchronized`] if the counter does not move
    /// for `stall_timeout`.
    pub fn wait_until(
        &self,
        target: u64,
        stop: &AtomicBool,
        stall_timeout: Duration,
    ) -> Result<u64> {
        let mut last = self.current();
        let mut last_change = Instant::now();
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let progress = self.current();
            if progress >= target {
                return Ok(progress);
            }
            if stop.load(Ordering::Acquire) {
                return Err(VdfError::Stopped);
            }
            if self.is_closed() && self.current() < target {
                return Err(VdfError::IterationsExhausted(self.current()));
            }
            if progress != last {
                last = progress;
                last_change = Instant::now();
            } else if last_change.elapsed() >= stall_timeout {
                return Err(VdfError::Desynchronized { progress, target });
            }
            guard = self
                .advanced
                .wait_timeout(guard, self.poll_interval)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn test_wait_returns_once_published() {
        let fence = Arc::new(ProgressFence::new(Duration::from_millis(5)));
        let stop = AtomicBool::new(false);
        let writer = {
            let fence = fence.clone();
            thread::spawn(move || {
                for i in 1..=50 {
                    fence.publish(i * 10);
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };
        let seen = fence
            .wait_until(300, &stop, Duration::from_secs(10))
            .unwrap();
        assert!(seen >= 300);
        writer.join().unwrap();
        assert_eq!(fence.current(), 500);
    }

    #[test]
    fn test_stalled_progress_is_desynchronized() {
        let fence = ProgressFence::new(Duration::from_millis(5));
        fence.publish(7);
        let stop = AtomicBool::new(false);
        assert_eq!(
            fence.wait_until(8, &stop, Duration::from_millis(50)),
            Err(VdfError::Desynchronized {
                progress: 7,
                target: 8
            })
        );
    }

    #[test]
    fn test_stop_wakes_waiters() {
        let fence = Arc::new(ProgressFence::new(Duration::from_secs(60)));
        let stop = Arc::new(AtomicBool::new(false));
        let waiter = {
            let (fence, stop) = (fence.clone(), stop.clone());
            thread::spawn(move || fence.wait_until(1, &stop, Duration::from_secs(60)))
        };
        thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::Release);
        fence.notify();
        assert_eq!(waiter.join().unwrap(), Err(VdfError::Stopped));
    }

    #[test]
    fn test_closed_fence_reports_exhaustion() {
        let fence = ProgressFence::new(Duration::from_millis(5));
        fence.publish(3);
        fence.close();
        let stop = AtomicBool::new(false);
        assert_eq!(fence.wait_until(3, &stop, Duration::from_secs(1)), Ok(3));
        assert_eq!(
            fence.wait_until(4, &stop, Duration::from_secs(1)),
            Err(VdfError::IterationsExhausted(3))
        );
    }
}
