//! crates/signature/src/params.rs
//!
//! Negotiation of concrete signature parameters from a source size.

use std::num::{NonZeroU8, NonZeroU32};

use thiserror::Error;

use crate::format::SignatureFormat;

/// Block length used for sources below the square-root threshold.
pub const DEFAULT_BLOCK_LENGTH: u32 = 700;

/// Smallest block length worth the per-block overhead.
pub const MIN_BLOCK_LENGTH: u32 = 64;

/// Largest negotiated block length (128 KiB).
pub const MAX_BLOCK_LENGTH: u32 = 1 << 17;

/// Errors raised while negotiating signature parameters.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ParamsError {
    /// Automatic block sizing was requested but the source size is unknown.
    #[error("cannot derive signature parameters: source size is unknown")]
    UnknownSourceSize,
    /// The requested strong-sum length exceeds the format's digest width.
    #[error("strong checksum length {requested} exceeds the {format} digest width of {max}")]
    StrongLengthTooLarge {
        /// Format whose digest width was exceeded.
        format: SignatureFormat,
        /// Requested truncation length.
        requested: u8,
        /// Maximum length the format can provide.
        max: usize,
    },
}

/// Concrete, fully negotiated signature parameters.
///
/// Every field is pinned before a signature job starts; the same values are
/// recovered from the signature header on the delta side.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureParams {
    format: SignatureFormat,
    block_length: NonZeroU32,
    strong_length: NonZeroU8,
}

impl SignatureParams {
    /// Assembles parameters from already validated components.
    #[must_use]
    pub const fn new(
        format: SignatureFormat,
        block_length: NonZeroU32,
        strong_length: NonZeroU8,
    ) -> Self {
        Self {
            format,
            block_length,
            strong_length,
        }
    }

    /// Returns the signature format family.
    #[inline]
    #[must_use]
    pub const fn format(&self) -> SignatureFormat {
        self.format
    }

    /// Returns the block length in bytes.
    #[inline]
    #[must_use]
    pub const fn block_length(&self) -> u32 {
        self.block_length.get()
    }

    /// Returns the stored strong-sum length in bytes.
    #[inline]
    #[must_use]
    pub const fn strong_length(&self) -> usize {
        self.strong_length.get() as usize
    }

    /// Returns the wire size of one block entry: weak sum plus strong sum.
    #[inline]
    #[must_use]
    pub const fn entry_len(&self) -> usize {
        4 + self.strong_length()
    }
}

/// Derives concrete parameters, filling in anything the caller left automatic.
///
/// The block length uses the square-root heuristic: sources up to
/// `DEFAULT_BLOCK_LENGTH^2` bytes keep the default, larger sources scale with
/// the square root of their size rounded to a multiple of eight, clamped to
/// [`MIN_BLOCK_LENGTH`]..=[`MAX_BLOCK_LENGTH`]. An automatic block length
/// with an unknown source size is a terminal negotiation error; explicit
/// overrides never need the size.
///
/// # Errors
///
/// Returns [`ParamsError::UnknownSourceSize`] when the block length is
/// automatic and `source_size` is `None`, and
/// [`ParamsError::StrongLengthTooLarge`] when the requested truncation
/// exceeds the format's digest width.
pub fn negotiate_params(
    source_size: Option<u64>,
    format: SignatureFormat,
    block_length: Option<NonZeroU32>,
    strong_length: Option<NonZeroU8>,
) -> Result<SignatureParams, ParamsError> {
    let block_length = match block_length {
        Some(explicit) => explicit,
        None => {
            let size = source_size.ok_or(ParamsError::UnknownSourceSize)?;
            NonZeroU32::new(derive_block_length(size)).expect("derived block length is clamped above zero")
        }
    };

    let max = format.digest_len();
    let strong_length = match strong_length {
        Some(explicit) => {
            if usize::from(explicit.get()) > max {
                return Err(ParamsError::StrongLengthTooLarge {
                    format,
                    requested: explicit.get(),
                    max,
                });
            }
            explicit
        }
        None => NonZeroU8::new(max as u8).expect("digest widths are non-zero"),
    };

    Ok(SignatureParams::new(format, block_length, strong_length))
}

/// Square-root block sizing, rounded down to a multiple of eight.
fn derive_block_length(source_size: u64) -> u32 {
    if source_size <= u64::from(DEFAULT_BLOCK_LENGTH) * u64::from(DEFAULT_BLOCK_LENGTH) {
        return DEFAULT_BLOCK_LENGTH;
    }
    let root = source_size.isqrt();
    let rounded = u32::try_from(root & !7).unwrap_or(MAX_BLOCK_LENGTH);
    rounded.clamp(MIN_BLOCK_LENGTH, MAX_BLOCK_LENGTH)
}
