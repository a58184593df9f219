//! Fixed-width byte encodings of big integers.
//!
//! Two layouts are used across the workspace: little-endian magnitudes padded
//! with zeros (the compressed form codec) and big-endian two's complement of a
//! fixed width (the Fiat-Shamir transcript of a proof).
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::One;

/// Returns the little-endian bytes of `input` padded with zeros to `width`
/// bytes, or `None` if `input` does not fit.
pub fn to_padded_bytes_le(input: &BigUint, width: usize) -> Option<Vec<u8>> {
    let mut bytes = input.to_bytes_le();
    // `to_bytes_le` returns [0] for zero
    if bytes == [0u8] {
        bytes.clear();
    }
    if bytes.len() > width {
        return None;
    }
    bytes.resize(width, 0u8);
    Some(bytes)
}

/// Writes `input` as a `width`-byte big-endian two's complement integer.
/// Bits above `8 * width` are dropped.
pub fn to_twos_complement_be(input: &BigInt, width: usize) -> Vec<u8> {
    let negative = input.sign() == Sign::Minus;
    let magnitude = if negative {
        input.magnitude() - BigUint::one()
    } else {
        input.magnitude().clone()
    };
    let le = magnitude.to_bytes_le();
    let mut out = vec![0u8; width];
    for (i, byte) in out.iter_mut().rev().enumerate() {
        let b = le.get(i).copied().unwrap_or(0);
        *byte = if negative { !b } else { b };
    }
    out
}

/// Reads a big-endian two's complement integer.
pub fn from_twos_complement_be(bytes: &[u8]) -> BigInt {
    BigInt::from_signed_bytes_be(bytes)
}

/// Increments `counter` as a big-endian unsigned integer, wrapping around on
/// overflow.
pub fn increment_be(counter: &mut [u8]) {
    for byte in counter.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}

/// Adds one to every byte of `counter`, from the last one backwards, and
/// stops after the first byte that wraps to zero.
///
/// This is the nonce step of the deployed challenge hash. It is not an
/// integer increment: `[0, 0, 5]` becomes `[1, 1, 6]`.
pub fn ripple_increment_be(counter: &mut [u8]) {
    for byte in counter.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte == 0 {
            break;
        }
    }
}
