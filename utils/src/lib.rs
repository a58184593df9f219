pub mod biguint_helpers;
pub mod bytes;
pub mod math;

pub use biguint_helpers::{BigIntHelpers, BigUintHelpers};
