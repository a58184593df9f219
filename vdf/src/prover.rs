//! Wesolowski proof generation.
//!
//! For a statement `y = x^(2^T)` with challenge prime `B`, the proof is
//! `π = x^floor(2^T / B)`. Writing the quotient in base `2^k`, the proof is a
//! product of checkpoints `x^(2^(i*kl))` raised to `k`-bit digits: each
//! checkpoint is multiplied into the bucket of its digit, and the buckets are
//! combined with two sweeps over the halves of the digit bits. With `l > 1`
//! only every `l`-th checkpoint is stored and the `l` interleaved digit
//! columns are processed one after the other.

use crate::{
    challenge::get_b,
    checkpoint::CheckpointView,
    params::{approximate_parameters, BlockMapper, ProofParameters},
    Result, VdfError,
};
use classgroup::{
    bqfc::FORM_SIZE,
    nucomp::{nucomp, pow},
    Discriminant, QuadraticForm,
};
use num_bigint::BigUint;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Source of the checkpoints of a segment: intermediate `i` is the segment
/// input raised to `2^(i * kl)`.
pub trait FormSource {
    fn intermediate(&self, i: u64) -> Result<QuadraticForm>;
}

impl FormSource for [QuadraticForm] {
    fn intermediate(&self, i: u64) -> Result<QuadraticForm> {
        usize::try_from(i)
            .ok()
            .and_then(|i| self.get(i))
            .cloned()
            .ok_or(VdfError::IndexOutOfRange(i))
    }
}

impl FormSource for CheckpointView<'_> {
    fn intermediate(&self, i: u64) -> Result<QuadraticForm> {
        self.read(i)
    }
}

/// Proves `y = x^(2^iterations)` from the checkpoints in `intermediates`.
///
/// `stop` is checked before every block; a raised flag ends the computation
/// with [`VdfError::Stopped`].
pub fn generate_wesolowski<S: FormSource + ?Sized>(
    discriminant: &Discriminant,
    x: &QuadraticForm,
    y: &QuadraticForm,
    intermediates: &S,
    iterations: u64,
    params: ProofParameters,
    stop: &AtomicBool,
) -> Result<QuadraticForm> {
    let identity = QuadraticForm::identity(discriminant);
    if iterations == 0 {
        return Ok(identity);
    }
    let b = get_b(discriminant, x, y)?;
    let ProofParameters { k, l } = params;
    let (k, l) = (k as u64, l as u64);
    let k1 = k / 2;
    let k0 = k - k1;
    let limit = iterations.div_ceil(k * l);
    let two_k = BigUint::from(1u32) << k;
    let mut mapper = BlockMapper::new(&b, params, iterations);

    let mut acc = identity.clone();
    for j in (0..l).rev() {
        acc = pow(&acc, &two_k, discriminant);

        let mut buckets: Vec<Option<QuadraticForm>> = vec![None; 1 << k];
        mapper.start_column(j);
        for i in 0..limit {
            let p = i * l + j;
            if k as u128 * (p as u128 + 1) > iterations as u128 {
                break;
            }
            if stop.load(Ordering::Relaxed) {
                return Err(VdfError::Stopped);
            }
            let digit = mapper.next_block(p)? as usize;
            let form = intermediates.intermediate(i)?;
            buckets[digit] = Some(match buckets[digit].take() {
                Some(bucket) => nucomp(&bucket, &form, discriminant),
                None => form,
            });
        }

        let bucket = |hi: u64, lo: u64| buckets[((hi << k0) | lo) as usize].as_ref();
        for b1 in 0..1u64 << k1 {
            let mut z = identity.clone();
            for b0 in 0..1u64 << k0 {
                if let Some(f) = bucket(b1, b0) {
                    z = nucomp(&z, f, discriminant);
                }
            }
            let z = pow(&z, &BigUint::from(b1 << k0), discriminant);
            acc = nucomp(&acc, &z, discriminant);
        }
        for b0 in 0..1u64 << k0 {
            if stop.load(Ordering::Relaxed) {
                return Err(VdfError::Stopped);
            }
            let mut z = identity.clone();
            for b1 in 0..1u64 << k1 {
                if let Some(f) = bucket(b1, b0) {
                    z = nucomp(&z, f, discriminant);
                }
            }
            let z = pow(&z, &BigUint::from(b0), discriminant);
            acc = nucomp(&acc, &z, discriminant);
        }
    }
    Ok(acc.reduced())
}

/// Squares `x` `iterations` times on the calling thread. Returns the forms
/// reached every `kl` squarings, starting with `x`, and the last form.
pub fn square_with_checkpoints(
    discriminant: &Discriminant,
    x: &QuadraticForm,
    iterations: u64,
    kl: u64,
) -> (Vec<QuadraticForm>, QuadraticForm) {
    let mut y = x.clone().reduced();
    let mut intermediates = Vec::with_capacity(iterations.div_ceil(kl) as usize);
    for i in 0..iterations {
        if i % kl == 0 {
            intermediates.push(y.clone());
        }
        y = y.square(discriminant);
    }
    (intermediates, y)
}

/// Squares `x` `iterations` times on the calling thread and proves the
/// result. Returns `y ‖ π`, both serialized.
pub fn prove_slow(
    discriminant: &Discriminant,
    x: &QuadraticForm,
    iterations: u64,
) -> Result<Vec<u8>> {
    let params = approximate_parameters(iterations);
    let kl = params.kl();
    debug!(iterations, k = params.k, l = params.l, "proving on a single thread");

    let (intermediates, y) = square_with_checkpoints(discriminant, x, iterations, kl);
    let proof = generate_wesolowski(
        discriminant,
        x,
        &y,
        intermediates.as_slice(),
        iterations,
        params,
        &AtomicBool::new(false),
    )?;
    let mut out = Vec::with_capacity(2 * FORM_SIZE);
    out.extend_from_slice(&y.serialize(discriminant)?);
    out.extend_from_slice(&proof.serialize(discriminant)?);
    Ok(out)
}
