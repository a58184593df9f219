//! NUCOMP and NUDUPL (Shanks, Atkin; in the formulation of Jacobson and van der
//! Poorten as implemented by Hart).
//!
//! Both algorithms work with intermediate values of the size of `|D|^(1/4)`
//! rather than `|D|^(1/2)`: when the leading coefficient exceeds the bound `L`
//! a partial extended GCD is used to split the computation. Their output
//! represents the right class but is not reduced.

use crate::{
    xgcd::{gcdext, xgcd_partial},
    Discriminant, QuadraticForm,
};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

/// Composition of `f` and `g`. The result is not reduced.
pub fn nucomp(f: &QuadraticForm, g: &QuadraticForm, discriminant: &Discriminant) -> QuadraticForm {
    if f.a() > g.a() {
        return nucomp(g, f, discriminant);
    }
    let bound = discriminant.bound();

    let mut a1 = f.a().clone();
    let mut a2 = g.a().clone();
    let mut c2 = g.c().clone();
    let ss: BigInt = (f.b() + g.b()) >> 1u32;
    let m: BigInt = (f.b() - g.b()) >> 1u32;

    let t = a2.mod_floor(&a1);
    let (sp, v1) = if t.is_zero() {
        (a1.clone(), BigInt::zero())
    } else {
        let (sp, v1, _) = gcdext(&t, &a1);
        (sp, v1)
    };

    let mut k = (&m * &v1).mod_floor(&a1);
    if !sp.is_one() {
        let (s, v2, u2) = gcdext(&ss, &sp);
        k = &k * &u2 - &v2 * &c2;
        if !s.is_one() {
            a1 /= &s;
            a2 /= &s;
            c2 *= &s;
        }
        k = k.mod_floor(&a1);
    }

    let (ca, cb, cc);
    if &a1 < bound {
        let t = &a2 * &k;
        ca = &a2 * &a1;
        cb = (&t << 1u32) + g.b();
        cc = ((g.b() + &t) * &k + &c2) / &a1;
    } else {
        let mut r2 = a1.clone();
        let mut r1 = k;
        let (co2, co1) = xgcd_partial(&mut r2, &mut r1, bound);

        let t = &a2 * &r1;
        let m1 = (&m * &co1 + &t) / &a1;
        let m2 = (&ss * &r1 - &c2 * &co1) / &a1;

        let mut a = &r1 * &m1;
        let temp = &co1 * &m2;
        if co1.is_negative() {
            a -= temp;
        } else {
            a = temp - a;
        }

        let b = (((&t - &a * &co2) << 1u32) / &co1 - g.b()).mod_floor(&(&a << 1u32));
        let c = ((&b * &b - discriminant.value()) / &a) >> 2u32;
        if a.is_negative() {
            ca = -a;
            cc = -c;
        } else {
            ca = a;
            cc = c;
        }
        cb = b;
    }
    QuadraticForm::from_coefficients_unchecked(ca, cb, cc)
}

/// Squaring of `f`. The result is not reduced.
pub fn nudupl(f: &QuadraticForm, discriminant: &Discriminant) -> QuadraticForm {
    let bound = discriminant.bound();
    let b = f.b();

    let mut a1 = f.a().clone();
    let mut c1 = f.c().clone();
    let (s, mut v2, _) = gcdext(&b.abs(), &a1);
    if b.is_negative() {
        v2 = -v2;
    }
    let mut k = -(&v2 * &c1);
    if !s.is_one() {
        a1 = a1.div_floor(&s);
        c1 *= &s;
    }
    k = k.mod_floor(&a1);

    if &a1 < bound {
        let t = &a1 * &k;
        let ra = &a1 * &a1;
        let rb = (&t << 1u32) + b;
        let rc = ((b + &t) * &k + &c1).div_floor(&a1);
        return QuadraticForm::from_coefficients_unchecked(ra, rb, rc);
    }

    let mut r2 = a1.clone();
    let mut r1 = k;
    let (co2, co1) = xgcd_partial(&mut r2, &mut r1, bound);

    let m2 = (b * &r1 - &c1 * &co1) / &a1;
    let mut ra = &r1 * &r1 - &co1 * &m2;
    if !co1.is_negative() {
        ra = -ra;
    }
    let rb = ((((&a1 * &r1) - &ra * &co2) << 1u32) / &co1 - b).mod_floor(&(&ra << 1u32));
    let rc = (&rb * &rb - discriminant.value()) / (&ra << 2u32);
    if ra.is_negative() {
        QuadraticForm::from_coefficients_unchecked(-ra, rb, -rc)
    } else {
        QuadraticForm::from_coefficients_unchecked(ra, rb, rc)
    }
}

/// `x^exponent`, reduced.
///
/// Right-to-left binary method. Intermediate forms are only reduced once their
/// leading coefficient outgrows the discriminant.
pub fn pow(x: &QuadraticForm, exponent: &BigUint, discriminant: &Discriminant) -> QuadraticForm {
    let max_bits = discriminant.bits() as u64;
    let mut res = QuadraticForm::identity(discriminant);
    let mut base = x.clone();
    let bits = exponent.bits();
    for i in 0..bits {
        if exponent.bit(i) {
            res = nucomp(&res, &base, discriminant);
            if res.a().bits() > max_bits {
                res.reduce();
            }
        }
        if i + 1 < bits {
            base = nudupl(&base, discriminant);
            if base.a().bits() > max_bits {
                base.reduce();
            }
        }
    }
    res.reduced()
}

impl QuadraticForm {
    /// Group operation: the reduced composition of `self` and `other`.
    pub fn compose(&self, other: &QuadraticForm, discriminant: &Discriminant) -> QuadraticForm {
        nucomp(self, other, discriminant).reduced()
    }

    /// The reduced square of `self`.
    pub fn square(&self, discriminant: &Discriminant) -> QuadraticForm {
        nudupl(self, discriminant).reduced()
    }

    /// `self^(2^n)`, reduced after every squaring.
    pub fn repeated_square(&self, n: u64, discriminant: &Discriminant) -> QuadraticForm {
        let mut f = self.clone();
        for _ in 0..n {
            f = f.square(discriminant);
        }
        f
    }

    /// `self^exponent`, reduced.
    pub fn pow(&self, exponent: &BigUint, discriminant: &Discriminant) -> QuadraticForm {
        pow(self, exponent, discriminant)
    }
}
