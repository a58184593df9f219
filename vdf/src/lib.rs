#![doc = include_str!("../README.md")]

pub mod challenge;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod driver;
pub mod env;
pub mod error;
pub mod fence;
pub mod listener;
pub mod n_weso;
pub mod one_weso;
pub mod params;
pub mod proof;
pub mod prover;
pub mod run;
pub mod two_weso;
pub mod verifier;

pub use config::VdfConfig;
pub use error::VdfError;
pub use proof::{Proof, Segment};
pub use run::VdfRun;

/// Result type of the VDF operations.
pub type Result<T> = std::result::Result<T, VdfError>;
