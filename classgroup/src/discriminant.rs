//! This module implements the [`Discriminant`] of a class group.

use crate::{hash_prime::hash_prime_counter, ClassGroupError, Result};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Signed;
use vdf_utils::BigIntHelpers;

/// Largest discriminant size, in bits, supported by the compressed form
/// encoding.
pub const MAX_DISCRIMINANT_BITS: usize = 1024;

/// A negative discriminant `D = 1 (mod 8)` together with the NUCOMP bound
/// `L = floor(|D|^(1/4))`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discriminant {
    value: BigInt,
    bound: BigInt,
    bits: usize,
}

impl Discriminant {
    /// Wraps `value`, checking it is negative and congruent to 1 mod 8.
    pub fn new(value: BigInt) -> Result<Self> {
        if !value.is_negative() {
            return Err(ClassGroupError::InvalidDiscriminant("must be negative"));
        }
        if value.mod_floor(&BigInt::from(8)) != BigInt::from(1) {
            return Err(ClassGroupError::InvalidDiscriminant("must be 1 mod 8"));
        }
        let bound = value.abs().nth_root(4);
        let bits = value.bitlen();
        Ok(Discriminant { value, bound, bits })
    }

    /// Derives the discriminant `-p` where `p` is the probable prime obtained
    /// by hashing `seed` to `bits` bits with the three low bits and the top bit
    /// forced. `bits` must be a positive multiple of 256.
    pub fn from_seed(seed: &[u8], bits: usize) -> Result<Self> {
        if bits == 0 || bits % 256 != 0 {
            return Err(ClassGroupError::InvalidDiscriminant(
                "the size must be a positive multiple of 256 bits",
            ));
        }
        let p = hash_prime_counter(seed, bits, &[0, 1, 2, bits - 1])?;
        Discriminant::new(-BigInt::from(p))
    }

    pub fn value(&self) -> &BigInt {
        &self.value
    }

    /// `floor(|D|^(1/4))`
    pub fn bound(&self) -> &BigInt {
        &self.bound
    }

    /// Bit length of `|D|`.
    pub fn bits(&self) -> usize {
        self.bits
    }
}
