//! Wesolowski proof parameters and the block digits of `2^T / B`.
//!
//! The proof `π = x^floor(2^T / B)` is computed from checkpoints stored
//! every `k * l` iterations. The quotient is cut into `k`-bit digits; digit
//! `p`, counted from the least significant end, is
//! `floor(2^k * (2^(T - k(p+1)) mod B) / B)`.

use crate::{Result, VdfError};
use classgroup::xgcd::gcdext;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};

const LOG_MEMORY: f64 = 23.25349666;

/// Digit width `k` and interleaving `l` of a proof. Checkpoints are needed
/// every `k * l` iterations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofParameters {
    pub k: u32,
    pub l: u32,
}

impl ProofParameters {
    pub fn new(k: u32, l: u32) -> Self {
        ProofParameters {
            k: k.max(1),
            l: l.max(1),
        }
    }

    pub fn kl(&self) -> u64 {
        self.k as u64 * self.l as u64
    }
}

/// Picks `(k, l)` for `iterations` squarings, trading the prover work against
/// the checkpoint memory.
pub fn approximate_parameters(iterations: u64) -> ProofParameters {
    let log_t = (iterations as f64).log2();
    let mut l = 1u32;
    if log_t - LOG_MEMORY > 0.000001 {
        l = 2f64.powf(LOG_MEMORY - 20.0).ceil() as u32;
    }
    let intermediate = iterations as f64 * 0.6931471 / (2.0 * l as f64);
    // NaN for tiny inputs, which `max` maps to 1
    let k = (intermediate.ln() - intermediate.ln().ln() + 0.25)
        .round()
        .max(1.0);
    ProofParameters::new(k as u32, l)
}

/// Digit `p` of the quotient, computed from scratch.
pub fn get_block(p: u64, k: u32, iterations: u64, b: &BigUint) -> Result<u64> {
    let used = (p as u128 + 1) * k as u128;
    if used > iterations as u128 {
        return Err(VdfError::BlockIndexOutOfRange(p));
    }
    let exponent = BigUint::from(iterations - used as u64);
    let r = BigUint::from(2u32).modpow(&exponent, b);
    let digit = (r << k) / b;
    digit
        .to_u64()
        .filter(|d| k >= 64 || *d < (1u64 << k))
        .ok_or(VdfError::BlockIndexOutOfRange(p))
}

/// Walks the digits `j, j + l, j + 2l, ...` of one column of the proof.
///
/// Moving from digit `p` to `p + l` lowers the exponent by `k * l`, so the
/// running remainder is multiplied by the inverse of `2^(kl)` modulo `B`
/// instead of being recomputed. Digits that come out of range are recomputed
/// with [`get_block`].
pub struct BlockMapper<'a> {
    b: &'a BigUint,
    params: ProofParameters,
    iterations: u64,
    inverse: Option<BigUint>,
    remainder: BigUint,
}

impl<'a> BlockMapper<'a> {
    pub fn new(b: &'a BigUint, params: ProofParameters, iterations: u64) -> Self {
        let inverse = if iterations >= params.k as u64 {
            let two_kl = BigUint::from(2u32).modpow(&BigUint::from(params.kl()), b);
            let modulus = BigInt::from(b.clone());
            let (g, s, _) = gcdext(&BigInt::from(two_kl), &modulus);
            if g == BigInt::from(1) {
                s.mod_floor(&modulus).to_biguint()
            } else {
                None
            }
        } else {
            None
        };
        BlockMapper {
            b,
            params,
            iterations,
            inverse,
            remainder: BigUint::zero(),
        }
    }

    /// Positions the mapper on digit `j`.
    pub fn start_column(&mut self, j: u64) {
        let used = (j as u128 + 1) * self.params.k as u128;
        self.remainder = if self.inverse.is_some() && used <= self.iterations as u128 {
            let exponent = BigUint::from(self.iterations - used as u64);
            BigUint::from(2u32).modpow(&exponent, self.b)
        } else {
            BigUint::zero()
        };
    }

    /// Returns digit `p` and advances to digit `p + l`. `p` must follow the
    /// column started with [`BlockMapper::start_column`].
    pub fn next_block(&mut self, p: u64) -> Result<u64> {
        let k = self.params.k;
        let Some(inverse) = &self.inverse else {
            return get_block(p, k, self.iterations, self.b);
        };
        let digit = (&self.remainder << k) / self.b;
        self.remainder = (&self.remainder * inverse) % self.b;
        match digit.to_u64() {
            Some(d) if k >= 64 || d < (1u64 << k) => Ok(d),
            _ => get_block(p, k, self.iterations, self.b),
        }
    }
}
