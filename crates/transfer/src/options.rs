//! crates/transfer/src/options.rs
//!
//! Immutable pipeline configuration.

use std::num::{NonZeroU8, NonZeroU32};

use signature::{SignatureFormat, SignatureParams};

use crate::error::{Error, JobKind};

/// Default I/O granularity for pipeline windows (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Windows are never sized below this, so every command header and block
/// entry fits with room to spare.
pub(crate) const MIN_WINDOW: usize = 4096;

/// Immutable configuration shared by every pipeline built from it.
///
/// Constructed once, then copied by value into each run; nothing ever
/// mutates an options value after construction, so reusing one across any
/// number of sequential or concurrent runs is always safe.
#[derive(Clone, Copy, Debug)]
pub struct SyncOptions {
    buffer_size: usize,
    block_length: Option<NonZeroU32>,
    strong_length: Option<NonZeroU8>,
    format: SignatureFormat,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            block_length: None,
            strong_length: None,
            format: SignatureFormat::default(),
        }
    }
}

impl SyncOptions {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the I/O buffer granularity in bytes.
    ///
    /// Also bounds how far ahead delta matching can look within one step.
    #[must_use]
    pub const fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Pins the block length instead of deriving it from the source size.
    #[must_use]
    pub const fn with_block_length(mut self, block_length: NonZeroU32) -> Self {
        self.block_length = Some(block_length);
        self
    }

    /// Truncates stored strong sums to `strong_length` bytes.
    #[must_use]
    pub const fn with_strong_length(mut self, strong_length: NonZeroU8) -> Self {
        self.strong_length = Some(strong_length);
        self
    }

    /// Selects the signature checksum family.
    #[must_use]
    pub const fn with_format(mut self, format: SignatureFormat) -> Self {
        self.format = format;
        self
    }

    /// Returns the configured buffer granularity.
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Returns the pinned block length, if any.
    #[must_use]
    pub const fn block_length(&self) -> Option<NonZeroU32> {
        self.block_length
    }

    /// Returns the pinned strong-sum length, if any.
    #[must_use]
    pub const fn strong_length(&self) -> Option<NonZeroU8> {
        self.strong_length
    }

    /// Returns the signature format family.
    #[must_use]
    pub const fn format(&self) -> SignatureFormat {
        self.format
    }

    /// One-time negotiation of concrete signature parameters.
    pub(crate) fn negotiate(&self, source_size: Option<u64>) -> Result<SignatureParams, Error> {
        signature::negotiate_params(source_size, self.format, self.block_length, self.strong_length)
            .map_err(|error| Error::JobCreation {
                op: JobKind::Signature,
                reason: error.to_string(),
            })
    }

    /// Window capacity actually allocated for a run.
    pub(crate) fn window_capacity(&self) -> usize {
        self.buffer_size.max(MIN_WINDOW)
    }

    /// Delta input windows must span at least two blocks so a match can
    /// straddle a refill boundary.
    pub(crate) fn delta_window_capacity(&self, block_length: u32) -> usize {
        self.window_capacity().max(2 * block_length as usize)
    }
}
