//! Deterministic hash-to-prime.
//!
//! A seed is stepped before every SHA-256 call and the digests are
//! concatenated until the requested length is reached. The forced bits are
//! then set and the candidate is kept if it is a Baillie-PSW probable prime;
//! otherwise the expansion continues from the current seed.
//!
//! Discriminants step the seed as a big-endian counter. Challenge primes use
//! [`ripple_increment_be`], which deployed verifiers depend on.

use crate::{primality::is_probable_prime, ClassGroupError, Result};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use tracing::trace;
use vdf_utils::bytes::{increment_be, ripple_increment_be};

/// Returns the first probable prime of `length` bits produced by expanding
/// `seed`, with every bit listed in `bitmask` forced to 1.
///
/// This is the challenge prime expansion; the seed is stepped with
/// [`ripple_increment_be`].
pub fn hash_prime(seed: &[u8], length: usize, bitmask: &[usize]) -> Result<BigUint> {
    expand_to_prime(seed, length, bitmask, ripple_increment_be)
}

/// Same expansion as [`hash_prime`] with the seed stepped as a big-endian
/// counter. Used to derive discriminants.
pub fn hash_prime_counter(seed: &[u8], length: usize, bitmask: &[usize]) -> Result<BigUint> {
    expand_to_prime(seed, length, bitmask, increment_be)
}

fn expand_to_prime(
    seed: &[u8],
    length: usize,
    bitmask: &[usize],
    step: fn(&mut [u8]),
) -> Result<BigUint> {
    if length == 0 || length % 8 != 0 {
        return Err(ClassGroupError::InvalidPrimeParameters(
            "the length must be a positive multiple of 8",
        ));
    }
    if seed.is_empty() {
        return Err(ClassGroupError::InvalidPrimeParameters(
            "the seed must not be empty",
        ));
    }
    if bitmask.iter().any(|bit| *bit >= length) {
        return Err(ClassGroupError::InvalidPrimeParameters(
            "a forced bit lies outside of the requested length",
        ));
    }

    let byte_len = length / 8;
    let mut sprout = seed.to_vec();
    let mut candidates = 0u64;
    loop {
        let mut blob = Vec::with_capacity(byte_len);
        while blob.len() < byte_len {
            step(&mut sprout);
            let digest = Sha256::digest(&sprout);
            let take = (byte_len - blob.len()).min(digest.len());
            blob.extend_from_slice(&digest[..take]);
        }

        let mut p = BigUint::from_bytes_be(&blob);
        for bit in bitmask {
            p.set_bit(*bit as u64, true);
        }
        candidates += 1;
        if is_probable_prime(&p) {
            trace!(length, candidates, "hash_prime found a probable prime");
            return Ok(p);
        }
    }
}
