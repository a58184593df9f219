//! Fiat-Shamir challenge of a Wesolowski proof.

use crate::Result;
use classgroup::{hash_prime::hash_prime, Discriminant, QuadraticForm};
use num_bigint::BigUint;
use vdf_utils::bytes::to_twos_complement_be;

/// Bit length of the challenge prime `B`.
pub const B_BITS: usize = 264;

/// Width in bytes of each coefficient in [`serialize_for_challenge`].
pub fn challenge_int_size(discriminant: &Discriminant) -> usize {
    (discriminant.bits() + 16) >> 4
}

/// `a ‖ b` of the reduced form, each a big-endian two's complement integer
/// of `int_size` bytes.
pub fn serialize_for_challenge(form: &QuadraticForm, int_size: usize) -> Vec<u8> {
    let reduced;
    let form = if form.is_reduced() {
        form
    } else {
        reduced = form.clone().reduced();
        &reduced
    };
    let mut out = to_twos_complement_be(form.a(), int_size);
    out.extend(to_twos_complement_be(form.b(), int_size));
    out
}

/// The challenge prime `B` binding the statement `x -> y`.
pub fn get_b(discriminant: &Discriminant, x: &QuadraticForm, y: &QuadraticForm) -> Result<BigUint> {
    let int_size = challenge_int_size(discriminant);
    let mut seed = serialize_for_challenge(x, int_size);
    seed.extend(serialize_for_challenge(y, int_size));
    Ok(hash_prime(&seed, B_BITS, &[B_BITS - 1])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_serialization_layout() {
        let d = Discriminant::new(BigInt::from(-10007)).unwrap();
        assert_eq!(challenge_int_size(&d), 1);
        let f = QuadraticForm::from_abd(BigInt::from(2), BigInt::from(-1), &d).unwrap();
        // (2, -1) reduces to (2, -1): |b| < a
        assert_eq!(serialize_for_challenge(&f, 3), vec![0, 0, 2, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_challenge_prime_has_its_top_bit_set() {
        let d = Discriminant::from_seed(b"challenge", 256).unwrap();
        let g = QuadraticForm::generator(&d);
        let y = g.square(&d);
        let b = get_b(&d, &g, &y).unwrap();
        assert_eq!(b.bits(), B_BITS as u64);
        assert_ne!(b, get_b(&d, &y, &g).unwrap());
        assert_eq!(b, get_b(&d, &g, &y).unwrap());
    }

    #[test]
    fn test_known_challenge_prime() {
        // first segment of a deployed 1024-bit chained proof
        let d = Discriminant::new(-BigInt::parse_bytes(DEPLOYED_D.as_bytes(), 10).unwrap()).unwrap();
        let x = QuadraticForm::generator(&d);
        let y = QuadraticForm::from_abd(
            BigInt::parse_bytes(Y_A.as_bytes(), 10).unwrap(),
            BigInt::parse_bytes(Y_B.as_bytes(), 10).unwrap(),
            &d,
        )
        .unwrap();
        assert_eq!(challenge_int_size(&d), 65);
        let b = get_b(&d, &x, &y).unwrap();
        assert_eq!(
            b.to_str_radix(16),
            "e0652ce74311c76a29d39ae80f2e7cd7d173a4dc9393f91b4cf3ac5e044fe76c91"
        );
    }

    const DEPLOYED_D: &str = "131653324254138636653163861414331698305531090221496467927360326686715180966094250598321899621249972220387687148397451395672779897144571112116763666653213748473909547482437246405018707472153290116227072825447643324530509016778432769802300913461285128339119844239772697652504835780459732685000796733645621728639";
    const Y_A: &str = "5517436327149872046546878506605134587704193325380154545997786212474158387198753710217879487526136269059505907649629276125919198819729733830474387095124960";
    const Y_B: &str = "-1766681113868088597407713849015007782377250592485009431960153953819446891525334119453118167284928870887811599566129554957131326857465981126123806026197249";
}
