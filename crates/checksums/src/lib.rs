//! Weak and strong block checksums for the rdelta transfer engine.
//!
//! The weak checksum is an Adler-32 style rolling sum that can slide over a
//! byte window in O(1) per step; it nominates candidate blocks cheaply. The
//! strong checksum (MD4 or MD5, optionally truncated) confirms a candidate
//! before a copy instruction is emitted.

#![deny(unsafe_code)]
#![deny(missing_docs)]

mod rolling;
mod strong;

pub use rolling::{RollingChecksum, RollingError};
pub use strong::{STRONG_DIGEST_LEN, StrongAlgorithm, StrongHasher, strong_sum};
