//! Single-segment proofs of a run of known length.

use crate::{
    checkpoint::CheckpointView,
    config::VdfConfig,
    driver::FastBatchSquare,
    listener::OneWesolowskiCallback,
    proof::{encode_segments, Proof, Segment},
    prover::generate_wesolowski,
    run::VdfRun,
    Result, VdfError,
};
use classgroup::{Discriminant, QuadraticForm};
use std::sync::Arc;
use tracing::info;

/// Squares `x` `iterations` times on a driver thread, then proves the
/// result from the checkpoints the driver stored.
pub fn prove_one_wesolowski(
    discriminant: &Discriminant,
    x: &QuadraticForm,
    iterations: u64,
    config: &VdfConfig,
    accelerator: Box<dyn FastBatchSquare>,
) -> Result<Proof> {
    let x = x.clone().reduced();
    let callback = Arc::new(OneWesolowskiCallback::new(&x, iterations));
    let run = VdfRun::start(
        discriminant.clone(),
        x.clone(),
        callback.clone(),
        config,
        accelerator,
        Some(iterations),
    )?;
    run.wait_for(iterations)?;
    let y = callback
        .result()
        .ok_or(VdfError::MissingCheckpoint(iterations))?;

    let view = CheckpointView {
        store: &callback.store,
        index: &callback.index,
        start: 0,
        kl: callback.params.kl(),
        level: 0,
        guard: None,
    };
    let proof = generate_wesolowski(
        discriminant,
        &x,
        &y,
        &view,
        iterations,
        callback.params,
        run.stop_flag(),
    )?;
    let report = run.join()?;
    info!(
        iterations,
        fast_iterations = report.fast_iterations,
        k = callback.params.k,
        l = callback.params.l,
        "got simple wesolowski proof"
    );
    encode_segments(
        discriminant,
        &[Segment {
            start: 0,
            length: iterations,
            x,
            y,
            proof,
        }],
    )
}
