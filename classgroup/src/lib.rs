//! Arithmetic in the class group of an imaginary quadratic order.
//!
//! Elements are represented by reduced binary quadratic forms `(a, b, c)` of a
//! fixed negative discriminant. Composition uses NUCOMP and squaring uses
//! NUDUPL; both leave their output unreduced so callers can amortize
//! reductions.

pub mod bqfc;
pub mod discriminant;
pub mod error;
pub mod form;
pub mod hash_prime;
pub mod nucomp;
pub mod primality;
pub mod xgcd;

pub use discriminant::Discriminant;
pub use error::ClassGroupError;
pub use form::QuadraticForm;

/// Result type of the class group operations.
pub type Result<T> = std::result::Result<T, ClassGroupError>;
