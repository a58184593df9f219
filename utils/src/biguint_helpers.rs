//! This module provides a set of size helpers for big integers.
//! In particular, it gives bit and byte lengths with the convention used by
//! the wire formats of this workspace (zero still occupies one bit).
use num_bigint::{BigInt, BigUint};

/// Helpers for BigUint
pub trait BigUintHelpers<Rhs = Self> {
    /// Returns the minimum number of bits required to represent a BigUint
    /// As opposed to BigUint::bits, this function returns 1 for the input zero
    fn bitlen(&self) -> usize;

    /// Returns the minimum number of bytes required to represent a BigUint,
    /// which is 1 for the input zero
    fn bytelen(&self) -> usize {
        (self.bitlen() + 7) / 8
    }
}

impl BigUintHelpers for BigUint {
    fn bitlen(&self) -> usize {
        if self.bits() == 0 {
            1
        } else {
            self.bits() as usize
        }
    }
}

/// Helpers for signed big integers, measured on the magnitude.
pub trait BigIntHelpers {
    /// Bit length of `|self|`, 1 for zero.
    fn bitlen(&self) -> usize;

    /// Byte length of `|self|`, 1 for zero.
    fn bytelen(&self) -> usize {
        (self.bitlen() + 7) / 8
    }
}

impl BigIntHelpers for BigInt {
    fn bitlen(&self) -> usize {
        self.magnitude().bitlen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitlen_of_zero_and_powers() {
        assert_eq!(BigUint::from(0u8).bitlen(), 1);
        assert_eq!(BigUint::from(1u8).bitlen(), 1);
        assert_eq!(BigUint::from(255u8).bitlen(), 8);
        assert_eq!(BigUint::from(256u16).bitlen(), 9);
        assert_eq!(BigUint::from(256u16).bytelen(), 2);
        assert_eq!(BigInt::from(-256).bitlen(), 9);
        assert_eq!(BigInt::from(0).bytelen(), 1);
    }
}
