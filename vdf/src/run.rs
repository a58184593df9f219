//! A squaring loop running on its own thread.

use crate::{
    config::VdfConfig,
    driver::{DriverReport, FastBatchSquare, IterationListener, SquaringDriver},
    fence::ProgressFence,
    Result, VdfError,
};
use classgroup::{Discriminant, QuadraticForm};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};
use tracing::{debug, warn};

/// Owns the driver thread of one computation, together with the listener
/// storing its checkpoints, the progress fence and the stop flag.
///
/// Dropping a run stops the driver and waits for it.
pub struct VdfRun<L: IterationListener + 'static> {
    discriminant: Discriminant,
    x: QuadraticForm,
    listener: Arc<L>,
    fence: Arc<ProgressFence>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<DriverReport>>>,
    config: VdfConfig,
}

impl<L: IterationListener + 'static> VdfRun<L> {
    /// Starts squaring `x`, for `bound` squarings or until stopped.
    pub fn start(
        discriminant: Discriminant,
        x: QuadraticForm,
        listener: Arc<L>,
        config: &VdfConfig,
        accelerator: Box<dyn FastBatchSquare>,
        bound: Option<u64>,
    ) -> Result<Self> {
        config.validate()?;
        let x = x.reduced();
        let fence = Arc::new(ProgressFence::new(config.poll_interval()));
        let stop = Arc::new(AtomicBool::new(false));
        let driver = SquaringDriver {
            discriminant: discriminant.clone(),
            listener: listener.clone(),
            fence: fence.clone(),
            stop: stop.clone(),
            accelerator,
            batch_size: config.batch_size,
            bound,
        };
        let start = x.clone();
        let handle = thread::Builder::new()
            .name("vdf-driver".into())
            .spawn(move || driver.run(start))
            .map_err(|e| VdfError::DriverFailed(e.to_string()))?;
        debug!(bound, batch_size = config.batch_size, "squaring loop started");
        Ok(VdfRun {
            discriminant,
            x,
            listener,
            fence,
            stop,
            handle: Some(handle),
            config: config.clone(),
        })
    }

    pub fn discriminant(&self) -> &Discriminant {
        &self.discriminant
    }

    /// The (reduced) input of the computation.
    pub fn x(&self) -> &QuadraticForm {
        &self.x
    }

    pub fn listener(&self) -> &Arc<L> {
        &self.listener
    }

    pub fn fence(&self) -> &Arc<ProgressFence> {
        &self.fence
    }

    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stop
    }

    pub fn config(&self) -> &VdfConfig {
        &self.config
    }

    /// Number of squarings published so far.
    pub fn progress(&self) -> u64 {
        self.fence.current()
    }

    /// Blocks until `iteration` squarings are published.
    pub fn wait_for(&self, iteration: u64) -> Result<u64> {
        self.fence
            .wait_until(iteration, &self.stop, self.config.stall_timeout())
    }

    /// Asks the driver to stop and wakes every waiter.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.fence.notify();
    }

    fn join_driver(&mut self) -> Result<DriverReport> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| VdfError::DriverFailed("driver already joined".into()))?;
        handle
            .join()
            .map_err(|_| VdfError::DriverFailed("driver thread panicked".into()))?
    }

    /// Waits for the driver to finish and returns its report. Does not stop
    /// an unbounded run: call [`VdfRun::stop`] first.
    pub fn join(mut self) -> Result<DriverReport> {
        self.join_driver()
    }
}

impl<L: IterationListener + 'static> Drop for VdfRun<L> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            if let Err(e) = self.join_driver() {
                warn!(error = %e, "squaring loop ended with an error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        driver::NoAccelerator,
        listener::{OneWesolowskiCallback, TwoWesolowskiCallback},
    };
    use num_bigint::BigInt;
    use num_traits::One;

    fn discriminant() -> Discriminant {
        let p: BigInt = (BigInt::one() << 127u32) - 1;
        Discriminant::new(-p).unwrap()
    }

    #[test]
    fn test_bounded_run_reaches_its_bound() {
        let d = discriminant();
        let x = QuadraticForm::generator(&d);
        let callback = Arc::new(OneWesolowskiCallback::new(&x, 200));
        let config = VdfConfig {
            batch_size: 16,
            ..VdfConfig::default()
        };
        let run = VdfRun::start(
            d.clone(),
            x.clone(),
            callback.clone(),
            &config,
            Box::new(NoAccelerator),
            Some(200),
        )
        .unwrap();
        assert!(run.wait_for(200).unwrap() >= 200);
        let report = run.join().unwrap();
        assert_eq!(report.iterations, 200);
        assert_eq!(callback.result(), Some(x.repeated_square(200, &d)));
    }

    #[test]
    fn test_drop_stops_an_unbounded_run() {
        let d = discriminant();
        let x = QuadraticForm::generator(&d);
        let config = VdfConfig::default();
        let callback = Arc::new(TwoWesolowskiCallback::new(&x, &config).unwrap());
        let run = VdfRun::start(d, x, callback, &config, Box::new(NoAccelerator), None).unwrap();
        let fence = run.fence().clone();
        run.wait_for(50).unwrap();
        drop(run);
        assert!(fence.is_closed());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let d = discriminant();
        let x = QuadraticForm::generator(&d);
        let config = VdfConfig {
            batch_size: 0,
            ..VdfConfig::default()
        };
        let callback = Arc::new(OneWesolowskiCallback::new(&x, 10));
        assert!(matches!(
            VdfRun::start(d, x, callback, &config, Box::new(NoAccelerator), Some(10)),
            Err(VdfError::InvalidConfig(_))
        ));
    }
}
