//! Basis file signatures for rdelta.
//!
//! A signature is the compact fingerprint of a basis file: one weak rolling
//! checksum and one (possibly truncated) strong digest per fixed-size block.
//! This crate owns the in-memory signature model, the negotiation of block
//! and strong-sum lengths from a source size, the weak-sum block index used
//! during delta matching, and the reference-counted handle that shares one
//! loaded signature across concurrent delta runs.

#![deny(unsafe_code)]
#![deny(missing_docs)]

mod block;
mod format;
mod handle;
mod index;
mod params;
mod signature;

pub use block::BlockSum;
pub use format::SignatureFormat;
pub use handle::SignatureHandle;
pub use index::BlockIndex;
pub use params::{
    DEFAULT_BLOCK_LENGTH, MAX_BLOCK_LENGTH, MIN_BLOCK_LENGTH, ParamsError, SignatureParams,
    negotiate_params,
};
pub use signature::Signature;
