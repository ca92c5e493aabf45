//! crates/signature/src/index.rs
//!
//! Weak-sum lookup table over a signature's blocks.

use rustc_hash::FxHashMap;

use crate::signature::Signature;

/// Hash table mapping weak checksums to candidate block indices.
///
/// Built once per loaded signature before the first delta run. Weak sums
/// collide by design, so a lookup returns every candidate and the caller
/// confirms with the strong digest.
#[derive(Debug, Default)]
pub struct BlockIndex {
    map: FxHashMap<u32, Vec<u32>>,
}

impl BlockIndex {
    /// Builds the table from a signature's block list.
    #[must_use]
    pub fn build(signature: &Signature) -> Self {
        let mut map: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for (index, block) in signature.blocks().iter().enumerate() {
            map.entry(block.weak()).or_default().push(index as u32);
        }
        Self { map }
    }

    /// Returns the candidate block indices for a weak checksum.
    #[inline]
    #[must_use]
    pub fn candidates(&self, weak: u32) -> &[u32] {
        self.map.get(&weak).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of distinct weak sums in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` when the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
