//! crates/signature/src/signature.rs
//!
//! Aggregated in-memory signature of one basis file.

use crate::block::BlockSum;
use crate::params::SignatureParams;

/// Loaded signature: negotiated parameters plus the ordered block list.
///
/// Block `i` covers basis offset `i * block_length`. The final block may
/// describe fewer than `block_length` bytes; the wire format does not record
/// the basis length, so a short tail is only ever reproduced through literal
/// data in the delta.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    params: SignatureParams,
    blocks: Vec<BlockSum>,
}

impl Signature {
    /// Assembles a signature from parsed components.
    #[must_use]
    pub const fn from_parts(params: SignatureParams, blocks: Vec<BlockSum>) -> Self {
        Self { params, blocks }
    }

    /// Returns the negotiated parameters the signature was generated with.
    #[inline]
    #[must_use]
    pub const fn params(&self) -> &SignatureParams {
        &self.params
    }

    /// Returns the block entries in basis order.
    #[inline]
    #[must_use]
    pub fn blocks(&self) -> &[BlockSum] {
        &self.blocks
    }

    /// Returns the number of described blocks.
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the basis offset covered by block `index`.
    #[inline]
    #[must_use]
    pub fn block_offset(&self, index: usize) -> u64 {
        index as u64 * u64::from(self.params.block_length())
    }
}
