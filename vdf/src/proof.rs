//! Wire format of proofs.
//!
//! A proof is `y ‖ π`. A chained (N-Wesolowski) proof appends one tuple per
//! inner segment, `length (8 bytes, big-endian) ‖ y_i ‖ π_i`, outermost
//! first: the tuple of the first segment comes last, and `π` proves the last
//! segment, from the output of the segment before it to `y`.
//!
//! A compact proof drops `y`: it is `π ‖ tuples`, and the verifier recovers
//! `y` from `π` and the challenge prime `B` sent alongside.

use crate::{Result, VdfError};
use classgroup::{bqfc::FORM_SIZE, ClassGroupError, Discriminant, QuadraticForm};

/// Most tuples a chained proof can carry.
pub const MAX_DEPTH: usize = 63;

/// Size of one tuple.
pub const TUPLE_SIZE: usize = 8 + 2 * FORM_SIZE;

/// A proof ready to be sent: the serialized output, the serialized proof
/// body, and the number of chained tuples in the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    pub y: Vec<u8>,
    pub proof: Vec<u8>,
    pub witness_type: u8,
}

impl Proof {
    /// `y ‖ proof`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.y.clone();
        bytes.extend_from_slice(&self.proof);
        bytes
    }

    pub fn hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// A proven run of `length` squarings starting `start` squarings into the
/// computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub start: u64,
    pub length: u64,
    pub x: QuadraticForm,
    pub y: QuadraticForm,
    pub proof: QuadraticForm,
}

/// Chains `segments`, given in execution order, into a single proof.
pub fn encode_segments(discriminant: &Discriminant, segments: &[Segment]) -> Result<Proof> {
    let Some((last, inner)) = segments.split_last() else {
        return Err(VdfError::TooManySegments(0));
    };
    if inner.len() > MAX_DEPTH {
        return Err(VdfError::TooManySegments(segments.len()));
    }
    let mut proof = Vec::with_capacity(FORM_SIZE + inner.len() * TUPLE_SIZE);
    proof.extend_from_slice(&last.proof.serialize(discriminant)?);
    for segment in inner.iter().rev() {
        proof.extend_from_slice(&segment.length.to_be_bytes());
        proof.extend_from_slice(&segment.y.serialize(discriminant)?);
        proof.extend_from_slice(&segment.proof.serialize(discriminant)?);
    }
    Ok(Proof {
        y: last.y.serialize(discriminant)?.to_vec(),
        proof,
        witness_type: inner.len() as u8,
    })
}

/// A decoded inner segment.
pub struct Tuple {
    pub length: u64,
    pub y: QuadraticForm,
    pub proof: QuadraticForm,
}

/// A decoded chained proof.
pub struct DecodedProof {
    pub y: QuadraticForm,
    pub proof: QuadraticForm,
    /// In execution order, first segment first.
    pub tuples: Vec<Tuple>,
}

fn malformed(reason: &'static str) -> VdfError {
    VdfError::ClassGroup(ClassGroupError::MalformedEncoding(reason))
}

/// A decoded compact proof.
pub struct DecodedCompactProof {
    pub proof: QuadraticForm,
    /// In execution order, first segment first.
    pub tuples: Vec<Tuple>,
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(malformed("proof depth above 63"));
    }
    Ok(())
}

fn decode_tuples(discriminant: &Discriminant, bytes: &[u8]) -> Result<Vec<Tuple>> {
    bytes
        .chunks_exact(TUPLE_SIZE)
        .rev()
        .map(|chunk| -> Result<Tuple> {
            let (length, forms) = chunk.split_at(8);
            let mut length_bytes = [0u8; 8];
            length_bytes.copy_from_slice(length);
            Ok(Tuple {
                length: u64::from_be_bytes(length_bytes),
                y: QuadraticForm::deserialize(discriminant, &forms[..FORM_SIZE])?,
                proof: QuadraticForm::deserialize(discriminant, &forms[FORM_SIZE..])?,
            })
        })
        .collect()
}

/// Parses `y ‖ π ‖ tuples` for a proof of the given depth.
pub fn decode_proof(discriminant: &Discriminant, blob: &[u8], depth: usize) -> Result<DecodedProof> {
    check_depth(depth)?;
    if blob.len() != 2 * FORM_SIZE + depth * TUPLE_SIZE {
        return Err(malformed("proof length does not match its depth"));
    }
    let y = QuadraticForm::deserialize(discriminant, &blob[..FORM_SIZE])?;
    let proof = QuadraticForm::deserialize(discriminant, &blob[FORM_SIZE..2 * FORM_SIZE])?;
    let tuples = decode_tuples(discriminant, &blob[2 * FORM_SIZE..])?;
    Ok(DecodedProof { y, proof, tuples })
}

/// Parses `π ‖ tuples`, the body of a [`Proof`], for a proof of the given
/// depth.
pub fn decode_compact_proof(
    discriminant: &Discriminant,
    blob: &[u8],
    depth: usize,
) -> Result<DecodedCompactProof> {
    check_depth(depth)?;
    if blob.len() != FORM_SIZE + depth * TUPLE_SIZE {
        return Err(malformed("compact proof length does not match its depth"));
    }
    let proof = QuadraticForm::deserialize(discriminant, &blob[..FORM_SIZE])?;
    let tuples = decode_tuples(discriminant, &blob[FORM_SIZE..])?;
    Ok(DecodedCompactProof { proof, tuples })
}
