use classgroup::{bqfc::FORM_SIZE, Discriminant, QuadraticForm};
use num_bigint::BigInt;
use vdf::{
    prover::prove_slow,
    verifier::{verify_n_wesolowski, verify_proof_bytes, verify_wesolowski},
};
use vdf_utils::bytes::from_twos_complement_be;

// Compressed output and proof of a 1024-bit run from a deployed timelord.
const DEPLOYED_CHALLENGE: &str = "9104c5b5e45d48f374efa0488fe6a617790e9aecb3c9cddec06809b09f45ce9b";
const DEPLOYED_ITERATIONS: u64 = 129_499_136;
const DEPLOYED_PROOF: &str = "0200553bf0f382fc65a94f20afad5dbce2c1ee8ba3bf93053559ac9960c8fd80ac2222e9b649701a4141a4d8999f0dbfe0c39ea744096598a7528328e5199f0aa30aec8aae8ab5018bf1245329a8272ddff1afbd87ad2eaba1b7fd57bd25edc62e0b010000003f0ffcd0dc307a2aa4678bafba661c77d176ef23afc86e7ea9f4f9eac52b8e1850748019245ecc96547da9b731dc72cded5582a9b0c63e13fd42446c7b28b41d3ded1d0b666d5ddb5b29719e4ebe70969e67e42ddd8591eae60d83dbe619f1250400";

// A chained proof of depth 2 from a deployed timelord, in the uncompressed
// format: forms are `a ‖ b`, 65-byte big-endian two's complement each.
const CHAINED_D: &str = concat!(
    "13165332425413863665316386141433169830553109022149646792736032668671518096609425",
    "05983218996212499722203876871483974513956727798971445711121167636666532137484739",
    "09547482437246405018707472153290116227072825447643324530509016778432769802300913",
    "461285128339119844239772697652504835780459732685000796733645621728639",
);
const CHAINED_ITERATIONS: u64 = 33_554_432;
const CHAINED_PROOF: &str = concat!(
    "003f360be667de706fe886f766fe20240de04fe2c2f91207f1bbdddf20c554ab8d168b2ce9664d75",
    "f4613375a0ab12bf8158983574c9f5cd61c6b8a905fd3fa6bbffc5401b4ccedbe093b560293263a2",
    "26e46302e720726586251116bc689ef09dc70d99e0a090c4409f928e218e85032fdbee02fedd5630",
    "73be555b75a70a2d6a430033bc7a4926e3504e87698a0ace0dee6364cced2e9142b4e4cbe55a6371",
    "aab41e501ceed21d79d3a0dbbd82ce913c5de40b13eb7c59b1b52b6ef270ee603bd5e7fffcc9f5fa",
    "e6dbd5aeec394181af130c0fdd195b22be745449b7a584ac80fc75ed49acfdb4d650f5cd344f8637",
    "7ebbbaef5b19a0af3ae08101d1697f5656a52193000000000071c6f40024c342868a0c2a201b1b26",
    "a5d52c5d2f92a106c19ff926deb3fba1e74a444ecee3f8f507c062b949a2eaadd442b049417f82e8",
    "811526fa83c6d099d75323e068ffeca9dcd163761000c65d21dede72787ac350f25bdd3d29db6e9c",
    "b0e22c8124c724db33660c88784e2871b62ecf816846db7b469c71cad9a5dcfc5548ed2dd781006f",
    "a15b968facf4d79219646267eb187a670306d1ff1a59fc28ae00d36bb5a1cba659f48aa64a902271",
    "1a66105ef14401ff3948add265240aaad329ee76ba4c2300496746b86bcccacff5947c3fcb956cde",
    "2cffae10435960d7097f989aac742cf1047887f11584d20297958385e1715fe0f9b69141750c20d8",
    "134420eafec68fd10000000001555540006958aabfe4cc5d870e61fef82bcf1f2c3859e2bd8b1177",
    "e8a8872376b5cabace5dcb59b6fecada7e522d05f6f0e352939a6bfdf8c454fbe822cfa5ce97d17b",
    "e0ffde44a4812cde9d04ec5c08dce6f9146586fdc8e081e05ec690b7effe24ea756f3d300f361203",
    "b61e1a39220c6eafa7852842674e317dcae5549c78c7144296ff004a6d0d2854c55e4c1de2f17dc4",
    "480b81652cfec37124ef41560a28c853482732434d1c006763b2e341528ae0bcc29fb76f1a4dafd9",
    "9ade4fd75ec9cc9ca3f3d7001bcb6eb71e43eb22169ab721637551a8ec93838eb0825e9ecba91752",
    "97a00b146e9fdd244c5b722f29d3c46ec38840ba18f1f06ddec3dea844867386c2e1ac95",
);

fn generator_bytes() -> Vec<u8> {
    let mut x = vec![0u8; FORM_SIZE];
    x[0] = 0x08;
    x
}

#[test]
fn test_deployed_proof_is_canonical() {
    let seed = hex::decode(DEPLOYED_CHALLENGE).unwrap();
    let d = Discriminant::from_seed(&seed, 1024).unwrap();
    let proof = hex::decode(DEPLOYED_PROOF).unwrap();
    assert_eq!(proof.len(), 2 * FORM_SIZE);
    for bytes in proof.chunks_exact(FORM_SIZE) {
        let form = QuadraticForm::deserialize(&d, bytes).unwrap();
        assert!(form.is_reduced());
        assert_eq!(form.serialize(&d).unwrap().as_slice(), bytes);
    }
    // well-formed, so verification answers instead of failing
    let x = generator_bytes();
    assert!(verify_n_wesolowski(&d, &x, &proof, DEPLOYED_ITERATIONS, 0).is_ok());
}

#[test]
fn test_deployed_chained_proof_verifies() {
    const INT_SIZE: usize = 65;
    let value = BigInt::parse_bytes(CHAINED_D.as_bytes(), 10).unwrap();
    let d = Discriminant::new(-value).unwrap();
    let blob = hex::decode(CHAINED_PROOF).unwrap();
    let form = |bytes: &[u8]| {
        let a = from_twos_complement_be(&bytes[..INT_SIZE]);
        let b = from_twos_complement_be(&bytes[INT_SIZE..2 * INT_SIZE]);
        QuadraticForm::from_abd(a, b, &d).unwrap()
    };
    let y = form(&blob[..2 * INT_SIZE]);
    let proof = form(&blob[2 * INT_SIZE..4 * INT_SIZE]);
    let tuple_size = 8 + 4 * INT_SIZE;
    let tuples = &blob[4 * INT_SIZE..];
    assert_eq!(tuples.len(), 2 * tuple_size);

    let mut x = QuadraticForm::generator(&d);
    let mut remaining = CHAINED_ITERATIONS;
    for tuple in tuples.chunks_exact(tuple_size).rev() {
        let mut length = [0u8; 8];
        length.copy_from_slice(&tuple[..8]);
        let length = u64::from_be_bytes(length);
        let y_i = form(&tuple[8..8 + 2 * INT_SIZE]);
        let proof_i = form(&tuple[8 + 2 * INT_SIZE..]);
        assert!(verify_wesolowski(&d, &x, &y_i, &proof_i, length).unwrap());
        assert!(!verify_wesolowski(&d, &x, &y_i, &proof_i, length + 1).unwrap());
        x = y_i;
        remaining -= length;
    }
    assert_eq!(remaining, 3_728_332);
    assert!(verify_wesolowski(&d, &x, &y, &proof, remaining).unwrap());
    assert!(!verify_wesolowski(&d, &x, &proof, &y, remaining).unwrap());
}

#[test]
fn test_flipped_bytes_never_verify() {
    let seed = hex::decode(DEPLOYED_CHALLENGE).unwrap();
    let d = Discriminant::from_seed(&seed, 1024).unwrap();
    let proof = hex::decode(DEPLOYED_PROOF).unwrap();
    let x = generator_bytes();
    for position in (0..proof.len()).step_by(3) {
        for mask in [0x01u8, 0x80] {
            let mut flipped = proof.clone();
            flipped[position] ^= mask;
            let outcome = verify_n_wesolowski(&d, &x, &flipped, DEPLOYED_ITERATIONS, 0);
            assert!(
                !matches!(outcome, Ok(true)),
                "flip {mask:#04x} at byte {position} verified"
            );
        }
    }
}

#[test]
fn test_prove_slow_on_a_512_bit_discriminant() {
    let seed = hex::decode("a6c42558174fb1eedc64").unwrap();
    let d = Discriminant::from_seed(&seed, 512).unwrap();
    let x_bytes = hex::decode("0300aca4849458af5c557710c80f21519f196907764d2d55c9b70581a90d49ca7b3201ad6a9da836429e6592c200e965434f0100000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000").unwrap();
    let x = QuadraticForm::deserialize(&d, &x_bytes).unwrap();
    assert_eq!(x.serialize(&d).unwrap().to_vec(), x_bytes);

    let proof = prove_slow(&d, &x, 90909).unwrap();
    assert_eq!(proof.len(), 2 * FORM_SIZE);
    assert!(verify_proof_bytes(&d, &x_bytes, &proof, 90909).unwrap());
}

#[test]
fn test_prove_slow_tiny_iterations() {
    let d = Discriminant::from_seed(&[0, 0, 1, 2, 3, 3, 4, 4], 1024).unwrap();
    let x = QuadraticForm::generator(&d);
    let x_bytes = x.serialize(&d).unwrap();
    assert_eq!(x_bytes.to_vec(), generator_bytes());
    for iterations in [1, 2] {
        let proof = prove_slow(&d, &x, iterations).unwrap();
        assert_eq!(proof.len(), 2 * FORM_SIZE);
        let y = QuadraticForm::deserialize(&d, &proof[..FORM_SIZE]).unwrap();
        assert_eq!(y, x.repeated_square(iterations, &d));
        QuadraticForm::deserialize(&d, &proof[FORM_SIZE..]).unwrap();
        assert!(verify_proof_bytes(&d, &x_bytes, &proof, iterations).unwrap());
    }
}

#[test]
#[ignore = "a million squarings of a 1024-bit form"]
fn test_prove_slow_one_million() {
    let d = Discriminant::from_seed(&[0, 0, 1, 2, 3, 3, 4, 4], 1024).unwrap();
    let x = QuadraticForm::generator(&d);
    let x_bytes = x.serialize(&d).unwrap();
    let proof = prove_slow(&d, &x, 1_000_000).unwrap();
    assert!(verify_proof_bytes(&d, &x_bytes, &proof, 1_000_000).unwrap());
    let mut flipped = proof.clone();
    flipped[FORM_SIZE + 10] ^= 1;
    assert!(!matches!(
        verify_proof_bytes(&d, &x_bytes, &flipped, 1_000_000),
        Ok(true)
    ));
}
