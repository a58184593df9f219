//! Compressed serialization of reduced binary quadratic forms (bqfc).
//!
//! A reduced form `(a, b, c)` is determined by `(a, b)` and the discriminant.
//! `b` is in turn determined, up to a few bits, by `a` and a cofactor `t` of
//! half the size of `a`: running the partial extended GCD of `(a, |b|)` down to
//! `sqrt(a)` gives `t` with `b * t = r (mod a)` for a small remainder `r`, and
//! since `r^2 = (b*t)^2 = D * t^2 (mod a)`, `r` can be recovered as a square
//! root. This brings a form of a `d_bits`-bit discriminant down to about
//! `3 * d_bits / 4` bits.
//!
//! Layout (`d_bits` rounded up to a multiple of 32, integers little-endian):
//!
//! | size (bytes)         | field                                          |
//! |----------------------|------------------------------------------------|
//! | 1                    | flags: b sign, t sign, identity, generator     |
//! | 1                    | `g_size`, the byte length of `g` minus one     |
//! | `d_bits/16 - g_size` | `a' = a / g`                                   |
//! | `d_bits/32 - g_size` | `|t'| = |t| / g`                               |
//! | `g_size + 1`         | `g = gcd(a, t)`                                |
//! | `g_size + 1`         | `b0 = b / a'` (truncated, sign stripped)       |
//!
//! The identity `(1, 1)` and the generator `(2, 1)` only use the flag byte.
//! Buffers are always [`FORM_SIZE`] bytes, zero padded. Decoding only accepts
//! the canonical encoding of a reduced form.

use crate::{
    discriminant::MAX_DISCRIMINANT_BITS,
    xgcd::{gcdext, xgcd_partial},
    ClassGroupError, Discriminant, QuadraticForm, Result,
};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use vdf_utils::{bytes::to_padded_bytes_le, BigIntHelpers};

/// Size of a serialized form.
pub const FORM_SIZE: usize = (MAX_DISCRIMINANT_BITS + 31) / 32 * 3 + 4;

const B_SIGN: u8 = 1 << 0;
const T_SIGN: u8 = 1 << 1;
const IS_IDENTITY: u8 = 1 << 2;
const IS_GENERATOR: u8 = 1 << 3;

/// Number of meaningful bytes in the encoding of a form for a `d_bits`-bit
/// discriminant. The rest of the [`FORM_SIZE`] buffer is zero.
pub fn compressed_size(d_bits: usize) -> usize {
    (d_bits + 31) / 32 * 3 + 4
}

fn round_bits(d_bits: usize) -> usize {
    (d_bits + 31) & !31
}

/// The compressed representation of a form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressedForm {
    pub a: BigInt,
    pub t: BigInt,
    pub g: BigInt,
    pub b0: BigInt,
    pub b_sign: bool,
}

/// Compresses the reduced form with coefficients `(a, b)`.
pub fn compress(a: &BigInt, b: &BigInt) -> CompressedForm {
    if a == b {
        return CompressedForm {
            a: a.clone(),
            t: BigInt::zero(),
            g: BigInt::zero(),
            b0: BigInt::zero(),
            b_sign: false,
        };
    }

    let b_sign = b.is_negative();
    let a_sqrt = a.sqrt();
    let mut r2 = a.clone();
    let mut r1 = b.abs();
    let (_, co1) = xgcd_partial(&mut r2, &mut r1, &a_sqrt);
    let t = -co1;
    let g = a.gcd(&t);

    if g.is_one() {
        CompressedForm {
            a: a.clone(),
            t,
            g,
            b0: BigInt::zero(),
            b_sign,
        }
    } else {
        let a_prime = a / &g;
        let t = t / &g;
        let mut b0 = b / &a_prime;
        if b_sign {
            b0 = -b0;
        }
        CompressedForm {
            a: a_prime,
            t,
            g,
            b0,
            b_sign,
        }
    }
}

/// Recovers `(a, b)` from its compressed representation.
pub fn decompress(discriminant: &BigInt, c: &CompressedForm) -> Result<(BigInt, BigInt)> {
    if !c.a.is_positive() {
        return Err(ClassGroupError::MalformedEncoding("a must be positive"));
    }
    if c.t.is_zero() {
        return Ok((c.a.clone(), c.a.clone()));
    }

    let t = if c.t.is_negative() {
        &c.t + &c.a
    } else {
        c.t.clone()
    };
    let (gcd, t_inv, _) = gcdext(&t, &c.a);
    if !gcd.is_one() {
        return Err(ClassGroupError::MalformedEncoding("t is not invertible mod a"));
    }
    let t_inv = t_inv.mod_floor(&c.a);

    let d = discriminant.mod_floor(&c.a);
    let square = ((&c.t * &c.t).mod_floor(&c.a) * d).mod_floor(&c.a);
    let root = square.sqrt();
    if &root * &root != square {
        return Err(ClassGroupError::MalformedEncoding(
            "D * t^2 is not a square mod a",
        ));
    }

    let mut b = (root * t_inv).mod_floor(&c.a);
    let a = if c.g > BigInt::one() {
        &c.a * &c.g
    } else {
        c.a.clone()
    };
    if c.b0.is_positive() {
        b += &c.a * &c.b0;
    }
    if c.b_sign {
        b = -b;
    }
    Ok((a, b))
}

fn export(out: &mut Vec<u8>, width: usize, n: &BigInt, d_bits: usize) -> Result<()> {
    let bytes =
        to_padded_bytes_le(n.magnitude(), width).ok_or(ClassGroupError::EncodingOverflow(d_bits))?;
    out.extend_from_slice(&bytes);
    Ok(())
}

fn serialize_compressed(c: &CompressedForm, d_bits: usize) -> Result<Vec<u8>> {
    let d_bits = round_bits(d_bits);
    let g_size = c.g.bytelen() - 1;
    if g_size >= d_bits / 32 {
        return Err(ClassGroupError::EncodingOverflow(d_bits));
    }
    let mut flags = 0u8;
    if c.b_sign {
        flags |= B_SIGN;
    }
    if c.t.is_negative() {
        flags |= T_SIGN;
    }

    let mut out = Vec::with_capacity(FORM_SIZE);
    out.push(flags);
    out.push(g_size as u8);
    export(&mut out, d_bits / 16 - g_size, &c.a, d_bits)?;
    export(&mut out, d_bits / 32 - g_size, &c.t, d_bits)?;
    export(&mut out, g_size + 1, &c.g, d_bits)?;
    export(&mut out, g_size + 1, &c.b0, d_bits)?;
    Ok(out)
}

fn deserialize_compressed(bytes: &[u8], d_bits: usize) -> Result<CompressedForm> {
    let d_bits = round_bits(d_bits);
    let g_size = bytes[1] as usize;
    if g_size >= d_bits / 32 {
        return Err(ClassGroupError::MalformedEncoding("g_size out of range"));
    }
    let mut offset = 2;
    let mut read = |width: usize| -> Result<BigInt> {
        let field = bytes
            .get(offset..offset + width)
            .ok_or(ClassGroupError::MalformedEncoding("truncated field"))?;
        offset += width;
        Ok(BigInt::from(BigUint::from_bytes_le(field)))
    };
    let a = read(d_bits / 16 - g_size)?;
    let mut t = read(d_bits / 32 - g_size)?;
    let g = read(g_size + 1)?;
    let b0 = read(g_size + 1)?;
    if bytes[0] & T_SIGN != 0 {
        t = -t;
    }
    Ok(CompressedForm {
        a,
        t,
        g,
        b0,
        b_sign: bytes[0] & B_SIGN != 0,
    })
}

/// Encodes the coefficients `(a, b)` of a reduced form into a [`FORM_SIZE`]
/// buffer.
pub fn serialize_ab(a: &BigInt, b: &BigInt, d_bits: usize) -> Result<[u8; FORM_SIZE]> {
    if d_bits > MAX_DISCRIMINANT_BITS {
        return Err(ClassGroupError::EncodingOverflow(d_bits));
    }
    let mut out = [0u8; FORM_SIZE];
    if b.is_one() && a <= &BigInt::from(2) {
        out[0] = if a == &BigInt::from(2) {
            IS_GENERATOR
        } else {
            IS_IDENTITY
        };
        return Ok(out);
    }
    let bytes = serialize_compressed(&compress(a, b), d_bits)?;
    out[..bytes.len()].copy_from_slice(&bytes);
    Ok(out)
}

/// Decodes a [`FORM_SIZE`] buffer into the coefficients `(a, b)`, accepting
/// only the canonical encoding.
pub fn deserialize_ab(discriminant: &BigInt, bytes: &[u8], d_bits: usize) -> Result<(BigInt, BigInt)> {
    if bytes.len() != FORM_SIZE {
        return Err(ClassGroupError::MalformedEncoding("wrong buffer size"));
    }
    if d_bits > MAX_DISCRIMINANT_BITS {
        return Err(ClassGroupError::MalformedEncoding("discriminant too large"));
    }
    let (a, b) = if bytes[0] & (IS_IDENTITY | IS_GENERATOR) != 0 {
        let a = if bytes[0] & IS_GENERATOR != 0 { 2 } else { 1 };
        (BigInt::from(a), BigInt::one())
    } else {
        let compressed = deserialize_compressed(bytes, d_bits)?;
        decompress(discriminant, &compressed)?
    };

    let canonical = serialize_ab(&a, &b, d_bits)
        .map_err(|_| ClassGroupError::MalformedEncoding("decoded form does not fit"))?;
    if canonical[..] != bytes[..] {
        return Err(ClassGroupError::MalformedEncoding("non-canonical encoding"));
    }
    Ok((a, b))
}

impl QuadraticForm {
    /// Serializes the reduced representative of `self`.
    pub fn serialize(&self, discriminant: &Discriminant) -> Result<[u8; FORM_SIZE]> {
        if self.is_reduced() {
            serialize_ab(self.a(), self.b(), discriminant.bits())
        } else {
            let reduced = self.clone().reduced();
            serialize_ab(reduced.a(), reduced.b(), discriminant.bits())
        }
    }

    /// Deserializes a form, rejecting anything but the canonical encoding of
    /// a reduced form of this discriminant.
    pub fn deserialize(discriminant: &Discriminant, bytes: &[u8]) -> Result<Self> {
        let (a, b) = deserialize_ab(discriminant.value(), bytes, discriminant.bits())?;
        let numerator = &b * &b - discriminant.value();
        let four_a = &a << 2u32;
        if !numerator.is_multiple_of(&four_a) {
            return Err(ClassGroupError::MalformedEncoding(
                "not a form of this discriminant",
            ));
        }
        let form = QuadraticForm::from_coefficients_unchecked(a, b, numerator / four_a);
        if !form.is_reduced() {
            return Err(ClassGroupError::MalformedEncoding("form is not reduced"));
        }
        Ok(form)
    }
}
