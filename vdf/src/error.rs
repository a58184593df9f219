//! This module implements the [`VdfError`] type.

use classgroup::ClassGroupError;
use thiserror::Error;

/// Errors that can arise while running the squaring loop or producing and
/// checking proofs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VdfError {
    #[error("class group error: {0}")]
    ClassGroup(#[from] ClassGroupError),

    #[error("block index of block {0} does not fit in k bits")]
    BlockIndexOutOfRange(u64),

    #[error("no checkpoint slot for iteration {0}")]
    IndexOutOfRange(u64),

    #[error("checkpoint for iteration {0} was not written")]
    MissingCheckpoint(u64),

    #[error("the squaring loop lapped the checkpoint window of iteration {0}")]
    WindowOverrun(u64),

    #[error("progress stalled at {progress} while waiting for iteration {target}")]
    Desynchronized { progress: u64, target: u64 },

    #[error("the run was stopped")]
    Stopped,

    #[error("the squaring loop ended at iteration {0}")]
    IterationsExhausted(u64),

    #[error("a proof cannot chain {0} segments")]
    TooManySegments(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("invalid proof: {0}")]
    InvalidProof(&'static str),

    #[error("the squaring driver failed: {0}")]
    DriverFailed(String),
}
