//! Extended GCD routines used by the composition algorithms and the codec.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use std::mem;

/// Extended GCD: returns `(g, s, t)` with `g = gcd(a, b) >= 0` and
/// `a*s + b*t = g`.
///
/// The cofactor `s` is the one of smallest absolute value, i.e.
/// `|s| <= |b| / (2g)`, so every caller sees the same representatives
/// whatever the quotient sequence was.
pub fn gcdext(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    while !r.is_zero() {
        let (q, rem) = old_r.div_rem(&r);
        old_r = mem::replace(&mut r, rem);
        let next = &old_s - &q * &s;
        old_s = mem::replace(&mut s, next);
    }
    if old_r.is_negative() {
        old_r = -old_r;
        old_s = -old_s;
    }
    let g = old_r;
    if g.is_zero() {
        return (g, BigInt::zero(), BigInt::zero());
    }
    if b.is_zero() {
        return (g, a.signum(), BigInt::zero());
    }

    let period = (b / &g).abs();
    let mut s = old_s.mod_floor(&period);
    if &s + &s > period {
        s -= &period;
    }
    let t = (&g - a * &s) / b;
    (g, s, t)
}

/// Low 64 bits of `|x| >> shift`, reinterpreted as a signed word.
fn shifted_word(x: &BigInt, shift: u64) -> i64 {
    let mut digits = x.magnitude().iter_u64_digits().skip((shift / 64) as usize);
    let lo = digits.next().unwrap_or(0);
    let offset = shift % 64;
    if offset == 0 {
        return lo as i64;
    }
    let hi = digits.next().unwrap_or(0);
    ((lo >> offset) | (hi << (64 - offset))) as i64
}

/// Partial extended GCD of `(r2, r1)`, stopping as soon as `r1 <= bound`.
///
/// On return `r2` and `r1` hold the last two remainders and the cofactors
/// satisfy `r2 + co2 * r1_orig = r1 + co1 * r1_orig = 0 (mod r2_orig)`. Both
/// inputs must be non-negative.
///
/// Several Euclidean steps are performed per big-integer operation by running
/// them on the leading 63 bits of the operands (Lehmer). A word step is only
/// accepted while the remainder sequence of the approximation provably agrees
/// with the exact one; when no word step is accepted a single exact division
/// is done instead.
pub fn xgcd_partial(r2: &mut BigInt, r1: &mut BigInt, bound: &BigInt) -> (BigInt, BigInt) {
    let mut co2 = BigInt::zero();
    let mut co1 = -BigInt::one();

    while !r1.is_zero() && &*r1 > bound {
        let bits = r2.bits().max(r1.bits()).max(1).saturating_sub(63);
        let mut rr2 = shifted_word(r2, bits);
        let mut rr1 = shifted_word(r1, bits);
        let bb = shifted_word(bound, bits);

        let (mut aa2, mut aa1) = (0i64, 1i64);
        let (mut bb2, mut bb1) = (1i64, 0i64);
        let mut steps = 0u32;
        while rr1 != 0 && rr1 > bb {
            let qq = rr2 / rr1;
            let t1 = rr2.wrapping_sub(qq.wrapping_mul(rr1));
            let t2 = aa2.wrapping_sub(qq.wrapping_mul(aa1));
            let t3 = bb2.wrapping_sub(qq.wrapping_mul(bb1));
            let diverged = if steps & 1 == 1 {
                t1 < t3.wrapping_neg() || rr1.wrapping_sub(t1) < t2.wrapping_sub(aa1)
            } else {
                t1 < t2.wrapping_neg() || rr1.wrapping_sub(t1) < t3.wrapping_sub(bb1)
            };
            if diverged {
                break;
            }
            rr2 = rr1;
            rr1 = t1;
            aa2 = aa1;
            aa1 = t2;
            bb2 = bb1;
            bb1 = t3;
            steps += 1;
        }

        if steps == 0 {
            let (q, r) = r2.div_rem(r1);
            *r2 = mem::replace(r1, r);
            let next = &co2 - &q * &co1;
            co2 = mem::replace(&mut co1, next);
        } else {
            let r = &*r2 * bb2 + &*r1 * aa2;
            *r1 = &*r1 * aa1 + &*r2 * bb1;
            *r2 = r;
            let co = &co2 * bb2 + &co1 * aa2;
            co1 = &co1 * aa1 + &co2 * bb1;
            co2 = co;
            if r1.is_negative() {
                co1 = -co1;
                *r1 = -&*r1;
            }
            if r2.is_negative() {
                co2 = -co2;
                *r2 = -&*r2;
            }
        }
    }

    if r2.is_negative() {
        co2 = -co2;
        co1 = -co1;
        *r2 = -&*r2;
    }
    (co2, co1)
}
