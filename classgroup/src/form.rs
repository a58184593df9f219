//! Binary quadratic forms `a*x^2 + b*x*y + c*y^2` of negative discriminant.

use crate::{ClassGroupError, Discriminant, Result};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use std::fmt;

/// A binary quadratic form `(a, b, c)`.
///
/// Forms produced by [`QuadraticForm::reduce`] are in the canonical reduced
/// representation `|b| <= a <= c`, with `b >= 0` when `a == c` or `|b| == a`,
/// so two reduced forms represent the same class group element if and only if
/// their coefficients are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QuadraticForm {
    a: BigInt,
    b: BigInt,
    c: BigInt,
}

impl QuadraticForm {
    /// Builds a form from its three coefficients without any check.
    ///
    /// Meant for code that produced the coefficients itself (accelerated
    /// squaring kernels, tests). Untrusted input goes through
    /// [`QuadraticForm::from_abd`].
    pub fn from_coefficients_unchecked(a: BigInt, b: BigInt, c: BigInt) -> Self {
        QuadraticForm { a, b, c }
    }

    /// Builds the reduced form `(a, b, (b^2 - D) / 4a)`.
    ///
    /// Fails with [`ClassGroupError::InvalidForm`] unless `a > 0` and `4a`
    /// divides `b^2 - D`.
    pub fn from_abd(a: BigInt, b: BigInt, discriminant: &Discriminant) -> Result<Self> {
        if !a.is_positive() {
            return Err(ClassGroupError::InvalidForm("a must be positive"));
        }
        let numerator = &b * &b - discriminant.value();
        let (c, rem) = numerator.div_rem(&(&a << 2u32));
        if !rem.is_zero() {
            return Err(ClassGroupError::InvalidForm(
                "b^2 - D is not divisible by 4a",
            ));
        }
        let mut form = QuadraticForm { a, b, c };
        form.reduce();
        Ok(form)
    }

    /// The neutral element, `(1, 1, (1 - D) / 4)`.
    pub fn identity(discriminant: &Discriminant) -> Self {
        let c = (BigInt::one() - discriminant.value()) >> 2u32;
        QuadraticForm {
            a: BigInt::one(),
            b: BigInt::one(),
            c,
        }
    }

    /// The form `(2, 1, (1 - D) / 8)`, the conventional starting point of a
    /// VDF run.
    pub fn generator(discriminant: &Discriminant) -> Self {
        let c = (BigInt::one() - discriminant.value()) >> 3u32;
        let mut form = QuadraticForm {
            a: BigInt::from(2),
            b: BigInt::one(),
            c,
        };
        form.reduce();
        form
    }

    pub fn a(&self) -> &BigInt {
        &self.a
    }

    pub fn b(&self) -> &BigInt {
        &self.b
    }

    pub fn c(&self) -> &BigInt {
        &self.c
    }

    /// `b^2 - 4ac`
    pub fn discriminant(&self) -> BigInt {
        &self.b * &self.b - ((&self.a * &self.c) << 2u32)
    }

    /// Whether this is the reduced representative of the neutral element.
    pub fn is_identity(&self) -> bool {
        self.a.is_one() && self.b.is_one()
    }

    /// Shifts `b` into `(-a, a]` with an equivalent form.
    pub fn normalize(&mut self) {
        if -&self.a < self.b && self.b <= self.a {
            return;
        }
        let two_a = &self.a << 1u32;
        let r = (&self.a - &self.b).div_floor(&two_a);
        // c' = a r^2 + b r + c, using the old b
        self.c += &r * (&self.b + &self.a * &r);
        self.b += &two_a * &r;
    }

    /// Replaces the form by its canonical reduced representative.
    pub fn reduce(&mut self) {
        self.normalize();
        while self.a > self.c || (self.a == self.c && self.b.is_negative()) {
            let two_c = &self.c << 1u32;
            let s = (&self.c + &self.b).div_floor(&two_c);
            let b = &two_c * &s - &self.b;
            let c = &self.c * &s * &s - &self.b * &s + &self.a;
            self.a = std::mem::replace(&mut self.c, c);
            self.b = b;
        }
        self.normalize();
    }

    /// Consumes the form and returns its reduced representative.
    pub fn reduced(mut self) -> Self {
        self.reduce();
        self
    }

    pub fn is_reduced(&self) -> bool {
        let abs_b = self.b.abs();
        if abs_b > self.a || self.a > self.c {
            return false;
        }
        if (self.a == self.c || abs_b == self.a) && self.b.is_negative() {
            return false;
        }
        true
    }

    /// The inverse element `(a, -b, c)`, reduced.
    pub fn inverse(&self) -> Self {
        QuadraticForm {
            a: self.a.clone(),
            b: -&self.b,
            c: self.c.clone(),
        }
        .reduced()
    }
}

impl fmt::Display for QuadraticForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.a, self.b, self.c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_discriminant() -> Discriminant {
        Discriminant::new(BigInt::from(-10007)).unwrap()
    }

    #[test]
    fn test_identity_and_generator_are_reduced() {
        let d = small_discriminant();
        let id = QuadraticForm::identity(&d);
        let g = QuadraticForm::generator(&d);
        assert!(id.is_reduced());
        assert!(g.is_reduced());
        assert!(id.is_identity());
        assert_eq!(&id.discriminant(), d.value());
        assert_eq!(&g.discriminant(), d.value());
        assert_eq!(g.a(), &BigInt::from(2));
    }

    #[test]
    fn test_from_abd_validates() {
        let d = small_discriminant();
        assert_eq!(
            QuadraticForm::from_abd(BigInt::from(0), BigInt::from(1), &d),
            Err(ClassGroupError::InvalidForm("a must be positive"))
        );
        assert!(QuadraticForm::from_abd(BigInt::from(3), BigInt::from(2), &d).is_err());
        let f = QuadraticForm::from_abd(BigInt::from(2), BigInt::from(5), &d).unwrap();
        assert!(f.is_reduced());
        assert_eq!(&f.discriminant(), d.value());
    }

    #[test]
    fn test_reduce_unreduced_form() {
        let d = small_discriminant();
        // (2, 1, c) moved by x -> x + 7y
        let g = QuadraticForm::generator(&d);
        let c = g.c().clone();
        let moved = QuadraticForm::from_coefficients_unchecked(
            BigInt::from(2),
            BigInt::from(1 + 2 * 2 * 7),
            BigInt::from(2 * 49 + 7) + &c,
        );
        assert_eq!(&moved.discriminant(), d.value());
        assert!(!moved.is_reduced());
        assert_eq!(moved.reduced(), g);
    }

    #[test]
    fn test_is_reduced_boundary_cases() {
        // a == c requires b >= 0
        let f = QuadraticForm::from_coefficients_unchecked(
            BigInt::from(3),
            BigInt::from(-1),
            BigInt::from(3),
        );
        assert!(!f.is_reduced());
        let f = QuadraticForm::from_coefficients_unchecked(
            BigInt::from(3),
            BigInt::from(1),
            BigInt::from(3),
        );
        assert!(f.is_reduced());
        // |b| == a requires b >= 0
        let f = QuadraticForm::from_coefficients_unchecked(
            BigInt::from(3),
            BigInt::from(-3),
            BigInt::from(5),
        );
        assert!(!f.is_reduced());
        let mut g = f.clone();
        g.reduce();
        assert!(g.is_reduced());
        assert_eq!(g.discriminant(), f.discriminant());
    }
}
