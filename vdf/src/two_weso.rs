//! Proofs of an unbounded run split into three segments.
//!
//! The first two thirds (rounded down to a multiple of 100) are proven as
//! soon as the driver passes them, while the rest is split again the same
//! way. The last segment ends at the requested iteration, which may not be
//! stored: its output is rebuilt from the closest stride-100 checkpoint.

use crate::{
    checkpoint::CheckpointView,
    listener::TwoWesolowskiCallback,
    params::ProofParameters,
    proof::{encode_segments, Proof, Segment},
    prover::generate_wesolowski,
    run::VdfRun,
    Result, VdfError,
};
use classgroup::QuadraticForm;
use tracing::{debug, info};
use vdf_utils::math::round_down;

/// From this length on, segments store a checkpoint every 100 iterations.
const LONG_SEGMENT: u64 = 10_000_000;

const MAX_DEPTH: u32 = 2;

/// Proves the first `iterations` squarings of `run`, waiting for the driver
/// where needed.
pub fn prove_two_wesolowski(
    run: &VdfRun<TwoWesolowskiCallback>,
    iterations: u64,
) -> Result<Proof> {
    let segments = prove_from(run, run.x().clone(), iterations, 0, 0)?;
    let proof = encode_segments(run.discriminant(), &segments)?;
    info!(iterations, "got 2-wesolowski proof");
    Ok(proof)
}

/// Parameters of the segment `[start, start + length)`. Segments reaching
/// past the switch point only find checkpoints at multiples of 100.
fn segment_parameters(callback: &TwoWesolowskiCallback, start: u64, length: u64) -> ProofParameters {
    if length >= LONG_SEGMENT || start + length > callback.switch_iterations() {
        ProofParameters::new(10, 10)
    } else {
        ProofParameters::new(10, 1)
    }
}

/// Two thirds of `iterations`, rounded down to a multiple of 100.
fn split_point(iterations: u64) -> u64 {
    round_down(iterations / 3 * 2 + iterations % 3 * 2 / 3, 100)
}

fn form_at(run: &VdfRun<TwoWesolowskiCallback>, iteration: u64) -> Result<QuadraticForm> {
    run.listener()
        .form_at(iteration)?
        .ok_or(VdfError::MissingCheckpoint(iteration))
}

fn prove_segment(
    run: &VdfRun<TwoWesolowskiCallback>,
    x: QuadraticForm,
    y: QuadraticForm,
    start: u64,
    length: u64,
) -> Result<Segment> {
    let callback = run.listener();
    let params = segment_parameters(callback, start, length);
    debug!(start, length, k = params.k, l = params.l, "proving segment");
    let view = CheckpointView {
        store: &callback.store,
        index: &callback.index,
        start,
        kl: params.kl(),
        level: 0,
        guard: None,
    };
    let proof = generate_wesolowski(
        run.discriminant(),
        &x,
        &y,
        &view,
        length,
        params,
        run.stop_flag(),
    )?;
    Ok(Segment {
        start,
        length,
        x,
        y,
        proof,
    })
}

fn prove_from(
    run: &VdfRun<TwoWesolowskiCallback>,
    x: QuadraticForm,
    iterations: u64,
    done: u64,
    depth: u32,
) -> Result<Vec<Segment>> {
    if depth == MAX_DEPTH {
        let end = done + iterations;
        run.wait_for(end)?;
        let checkpoint = round_down(end, 100);
        let y = form_at(run, checkpoint)?.repeated_square(end - checkpoint, run.discriminant());
        return Ok(vec![prove_segment(run, x, y, done, iterations)?]);
    }

    let first = split_point(iterations);
    run.wait_for(done + first)?;
    let y1 = form_at(run, done + first)?;
    let (head, tail) = rayon::join(
        || prove_segment(run, x, y1.clone(), done, first),
        || prove_from(run, y1.clone(), iterations - first, done + first, depth + 1),
    );
    let mut segments = vec![head?];
    segments.extend(tail?);
    Ok(segments)
}
