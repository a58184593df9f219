//! Baillie-PSW probable prime test.
//!
//! The test is the conjunction of trial division, a strong Fermat test to
//! base 2 and a strong Lucas test with Selfridge parameters, completed by the
//! `V_{n+1} = 2Q (mod n)` check. No composite passing it is known.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

const SMALL_PRIMES: [u32; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// Returns true if `n` is a Baillie-PSW probable prime.
pub fn is_probable_prime(n: &BigUint) -> bool {
    if n < &BigUint::from(2u32) {
        return false;
    }
    for p in SMALL_PRIMES {
        if n == &BigUint::from(p) {
            return true;
        }
        if (n % p).is_zero() {
            return false;
        }
    }
    strong_fermat_base_2(n) && !is_perfect_square(n) && strong_lucas(n)
}

/// Returns true if `n` is a square.
pub fn is_perfect_square(n: &BigUint) -> bool {
    let root = n.sqrt();
    &root * &root == *n
}

fn strong_fermat_base_2(n: &BigUint) -> bool {
    let n_minus_one = n - 1u32;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;
    let mut x = BigUint::from(2u32).modpow(&d, n);
    if x.is_one() || x == n_minus_one {
        return true;
    }
    for _ in 1..s {
        x = (&x * &x) % n;
        if x == n_minus_one {
            return true;
        }
        if x.is_one() {
            return false;
        }
    }
    false
}

/// Jacobi symbol `(a / n)` for odd positive `n`.
pub fn jacobi(a: &BigInt, n: &BigUint) -> i32 {
    let mut n = n.clone();
    let mut a = a.mod_floor(&BigInt::from(n.clone())).magnitude().clone();
    let mut result = 1;
    while !a.is_zero() {
        while a.is_even() {
            a >>= 1u32;
            let r = (&n % 8u32).to_u32().unwrap_or(0);
            if r == 3 || r == 5 {
                result = -result;
            }
        }
        std::mem::swap(&mut a, &mut n);
        if (&a % 4u32) == BigUint::from(3u32) && (&n % 4u32) == BigUint::from(3u32) {
            result = -result;
        }
        a %= &n;
    }
    if n.is_one() {
        result
    } else {
        0
    }
}

/// Selfridge's method A: the first `d` in `5, -7, 9, -11, ...` with
/// `(d / n) = -1`. Returns `None` if a factor of `n` shows up on the way.
fn selfridge_parameter(n: &BigUint) -> Option<i64> {
    let mut d: i64 = 5;
    loop {
        let symbol = jacobi(&BigInt::from(d), n);
        if symbol == -1 {
            return Some(d);
        }
        if symbol == 0 && BigUint::from(d.unsigned_abs()) != *n {
            return None;
        }
        d = if d > 0 { -(d + 2) } else { -(d - 2) };
    }
}

fn half_mod(x: BigInt, n: &BigInt) -> BigInt {
    if x.is_odd() {
        (x + n) >> 1u32
    } else {
        x >> 1u32
    }
}

fn strong_lucas(n: &BigUint) -> bool {
    let Some(d) = selfridge_parameter(n) else {
        return false;
    };
    let modulus = BigInt::from(n.clone());
    let p = BigInt::one();
    let q = BigInt::from((1 - d) / 4);
    let disc = BigInt::from(d);

    let n_plus_one = n + 1u32;
    let s = n_plus_one.trailing_zeros().unwrap_or(0);
    let odd = &n_plus_one >> s;

    // U_1 = 1, V_1 = P, Q^1 = Q
    let mut u = BigInt::one();
    let mut v = p.clone();
    let mut qk = q.mod_floor(&modulus);
    for bit in (0..odd.bits().saturating_sub(1)).rev() {
        u = (&u * &v).mod_floor(&modulus);
        v = (&v * &v - &qk - &qk).mod_floor(&modulus);
        qk = (&qk * &qk).mod_floor(&modulus);
        if odd.bit(bit) {
            let next_u = half_mod((&p * &u + &v).mod_floor(&modulus), &modulus);
            let next_v = half_mod((&disc * &u + &p * &v).mod_floor(&modulus), &modulus);
            u = next_u;
            v = next_v;
            qk = (&qk * &q).mod_floor(&modulus);
        }
    }

    let mut probable = u.is_zero() || v.is_zero();
    for r in 1..=s {
        v = (&v * &v - &qk - &qk).mod_floor(&modulus);
        qk = (&qk * &qk).mod_floor(&modulus);
        if r < s && v.is_zero() {
            probable = true;
        }
    }
    probable && v == (&q + &q).mod_floor(&modulus)
}
