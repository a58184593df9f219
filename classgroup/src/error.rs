//! This module implements the [`ClassGroupError`] type.

use thiserror::Error;

/// Errors that can arise when building, encoding or decoding class group elements
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassGroupError {
    #[error("invalid form: {0}")]
    InvalidForm(&'static str),

    #[error("malformed form encoding: {0}")]
    MalformedEncoding(&'static str),

    #[error("invalid discriminant: {0}")]
    InvalidDiscriminant(&'static str),

    #[error("invalid hash-to-prime parameters: {0}")]
    InvalidPrimeParameters(&'static str),

    #[error("the form does not fit the encoding of a {0}-bit discriminant")]
    EncodingOverflow(usize),
}
