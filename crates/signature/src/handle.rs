//! crates/signature/src/handle.rs
//!
//! Shared handle over one loaded signature and its build-once block index.

use std::sync::{Arc, OnceLock};

use crate::index::BlockIndex;
use crate::signature::Signature;

/// Reference-counted handle sharing a loaded signature across delta runs.
///
/// The weak-sum index is built at most once per handle, no matter how many
/// concurrent delta runs trigger it; later callers block until the first
/// build finishes and then observe the same fully built table. After the
/// build the signature and index are immutable, so concurrent delta runs
/// read them without further locking. The underlying signature is released
/// when the last clone of the handle drops.
#[derive(Clone, Debug)]
pub struct SignatureHandle {
    inner: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    signature: Signature,
    index: OnceLock<BlockIndex>,
}

impl SignatureHandle {
    /// Wraps a loaded signature. The index is not built yet.
    #[must_use]
    pub fn new(signature: Signature) -> Self {
        Self {
            inner: Arc::new(Shared {
                signature,
                index: OnceLock::new(),
            }),
        }
    }

    /// Returns the wrapped signature.
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    /// Returns the block index, building it on the first call.
    pub fn ensure_index(&self) -> &BlockIndex {
        self.inner
            .index
            .get_or_init(|| BlockIndex::build(&self.inner.signature))
    }

    /// Reports whether the one-time index build has completed.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.inner.index.get().is_some()
    }

    /// Scoped access to the signature and its index.
    ///
    /// Triggers the one-time build if necessary, then hands both immutable
    /// views to the closure.
    pub fn with_index<T>(&self, f: impl FnOnce(&Signature, &BlockIndex) -> T) -> T {
        let index = self.ensure_index();
        f(&self.inner.signature, index)
    }
}
