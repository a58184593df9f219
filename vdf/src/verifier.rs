//! Verification of Wesolowski and chained proofs.

use crate::{
    challenge::{get_b, B_BITS},
    proof::{decode_compact_proof, decode_proof, Tuple, MAX_DEPTH},
    Result, VdfError,
};
use classgroup::{bqfc::FORM_SIZE, Discriminant, QuadraticForm};
use num_bigint::BigUint;
use tracing::debug;

/// Checks `π^B * x^(2^T mod B) == y`.
pub fn verify_wesolowski(
    discriminant: &Discriminant,
    x: &QuadraticForm,
    y: &QuadraticForm,
    proof: &QuadraticForm,
    iterations: u64,
) -> Result<bool> {
    let b = get_b(discriminant, x, y)?;
    let r = BigUint::from(2u32).modpow(&BigUint::from(iterations), &b);
    let lhs = proof.pow(&b, discriminant);
    let rhs = x.pow(&r, discriminant);
    Ok(lhs.compose(&rhs, discriminant) == y.clone().reduced())
}

/// Recovers `y = π^B * x^(2^T mod B)` from a proof and its challenge prime.
/// Returns `y` if `B` is the challenge of `x -> y`, `None` otherwise.
pub fn verify_segment_with_b(
    discriminant: &Discriminant,
    x: &QuadraticForm,
    proof: &QuadraticForm,
    b: &BigUint,
    iterations: u64,
) -> Result<Option<QuadraticForm>> {
    if b.bits() != B_BITS as u64 {
        return Ok(None);
    }
    let r = BigUint::from(2u32).modpow(&BigUint::from(iterations), b);
    let y = proof
        .pow(b, discriminant)
        .compose(&x.pow(&r, discriminant), discriminant);
    if get_b(discriminant, x, &y)? == *b {
        Ok(Some(y))
    } else {
        Ok(None)
    }
}

/// Checks the inner segments of a chained proof. Returns the input of the
/// last segment and the iterations left for it.
fn verify_tuples(
    discriminant: &Discriminant,
    mut x: QuadraticForm,
    tuples: &[Tuple],
    iterations: u64,
) -> Result<Option<(QuadraticForm, u64)>> {
    let mut remaining = iterations;
    for (i, tuple) in tuples.iter().enumerate() {
        if tuple.length > remaining {
            debug!(segment = i, "segment longer than the claimed iterations");
            return Ok(None);
        }
        if !verify_wesolowski(discriminant, &x, &tuple.y, &tuple.proof, tuple.length)? {
            debug!(segment = i, "segment proof rejected");
            return Ok(None);
        }
        x = tuple.y.clone();
        remaining -= tuple.length;
    }
    Ok(Some((x, remaining)))
}

/// Verifies a chained proof of `iterations` squarings of the serialized form
/// `x`.
///
/// Malformed bytes are reported as errors; a well-formed but wrong proof
/// gives `Ok(false)`.
pub fn verify_n_wesolowski(
    discriminant: &Discriminant,
    x: &[u8],
    blob: &[u8],
    iterations: u64,
    depth: usize,
) -> Result<bool> {
    let x = QuadraticForm::deserialize(discriminant, x)?;
    let decoded = decode_proof(discriminant, blob, depth.min(MAX_DEPTH + 1))?;
    match verify_tuples(discriminant, x, &decoded.tuples, iterations)? {
        Some((x, remaining)) => {
            verify_wesolowski(discriminant, &x, &decoded.y, &decoded.proof, remaining)
        }
        None => Ok(false),
    }
}

/// Verifies a compact chained proof `π ‖ tuples` given the challenge prime
/// `b` of its last segment. Returns the serialized output on success.
pub fn verify_n_wesolowski_with_b(
    discriminant: &Discriminant,
    b: &BigUint,
    x: &[u8],
    blob: &[u8],
    iterations: u64,
    depth: usize,
) -> Result<Option<[u8; FORM_SIZE]>> {
    let x = QuadraticForm::deserialize(discriminant, x)?;
    let decoded = decode_compact_proof(discriminant, blob, depth.min(MAX_DEPTH + 1))?;
    let Some((x, remaining)) = verify_tuples(discriminant, x, &decoded.tuples, iterations)? else {
        return Ok(None);
    };
    match verify_segment_with_b(discriminant, &x, &decoded.proof, b, remaining)? {
        Some(y) => Ok(Some(y.serialize(discriminant)?)),
        None => Ok(None),
    }
}

/// The challenge prime of the last segment of a chained proof, which turns
/// it into a compact proof.
///
/// Inner segments are not verified here; their lengths must fit in
/// `iterations`.
pub fn get_b_from_proof(
    discriminant: &Discriminant,
    x: &[u8],
    blob: &[u8],
    iterations: u64,
    depth: usize,
) -> Result<BigUint> {
    let mut x = QuadraticForm::deserialize(discriminant, x)?;
    let decoded = decode_proof(discriminant, blob, depth.min(MAX_DEPTH + 1))?;
    let mut remaining = iterations;
    for tuple in &decoded.tuples {
        remaining = remaining
            .checked_sub(tuple.length)
            .ok_or(VdfError::InvalidProof("segments exceed the claimed iterations"))?;
        x = tuple.y.clone();
    }
    get_b(discriminant, &x, &decoded.y)
}

/// Verifies `y ‖ π` for `iterations` squarings of the serialized form `x`.
pub fn verify_proof_bytes(
    discriminant: &Discriminant,
    x: &[u8],
    proof: &[u8],
    iterations: u64,
) -> Result<bool> {
    verify_n_wesolowski(discriminant, x, proof, iterations, 0)
}
