use classgroup::{primality::is_probable_prime, Discriminant, QuadraticForm};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed};

#[test]
fn test_discriminants_from_seeds() {
    for seed in [
        "a4bb1461ade74ac602e9ae511af68bb254dfe65d61b7faf9fab82d0b4364a30b",
        "1633f29c0ca0597258507bc7d323a8bd485d5f059da56340a2c616081fb05b7f",
        "6aa2451d1469e1213e50f114a49744f96073fedbe53921c8294a303779baa32d",
    ] {
        let d = Discriminant::from_seed(&hex::decode(seed).unwrap(), 1024).unwrap();
        let p = d.value().abs();
        assert!(p.bit(1023), "bit 1023 must be set");
        assert!(p < BigInt::one() << 1024u32);
        assert_eq!(d.value().mod_floor(&BigInt::from(8)), BigInt::one());
        assert!(is_probable_prime(p.magnitude()));
        assert_eq!(d.bits(), 1024);
    }
}

#[test]
fn test_same_seed_same_discriminant() {
    let seed = [0u8, 0, 1, 2, 3, 3, 4, 4];
    let d1 = Discriminant::from_seed(&seed, 512).unwrap();
    let d2 = Discriminant::from_seed(&seed, 512).unwrap();
    assert_eq!(d1, d2);
    assert_ne!(d1, Discriminant::from_seed(&[0u8, 0, 1, 2, 3, 3, 4, 5], 512).unwrap());
    let g = QuadraticForm::generator(&d1);
    assert_eq!(&g.discriminant(), d1.value());
}
