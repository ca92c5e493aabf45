//! crates/engine/src/error.rs
//!
//! Engine result codes surfaced when a job cannot make progress.

use std::io;

use thiserror::Error;

/// Errors reported by transform jobs.
///
/// Any of these is fatal to the job that raised it; the job must be dropped
/// and a fresh one created to retry.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Signature bytes did not parse.
    #[error("corrupt signature: {reason}")]
    CorruptSignature {
        /// What failed to parse.
        reason: String,
    },
    /// The signature header carried an unrecognized magic.
    #[error("unrecognized signature magic {magic:#010x}")]
    UnknownSignatureMagic {
        /// The magic value found on the wire.
        magic: u32,
    },
    /// Delta bytes did not parse.
    #[error("corrupt delta: {reason}")]
    CorruptDelta {
        /// What failed to parse.
        reason: String,
    },
    /// The delta header carried an unrecognized magic.
    #[error("unrecognized delta magic {magic:#010x}")]
    UnknownDeltaMagic {
        /// The magic value found on the wire.
        magic: u32,
    },
    /// Reading the basis during patch application failed.
    #[error("failed to read basis at offset {offset}: {source}")]
    BasisRead {
        /// Offset the failed read targeted.
        offset: u64,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The delta requested basis bytes past the end of the basis.
    #[error("delta references {length} byte(s) at basis offset {offset} beyond the basis end")]
    BasisOutOfRange {
        /// Offset of the unsatisfiable read.
        offset: u64,
        /// Bytes still owed when the basis ran out.
        length: u64,
    },
    /// A job was stepped after finishing or misused by its driver.
    #[error("invalid job state: {reason}")]
    InvalidState {
        /// Which invariant was violated.
        reason: &'static str,
    },
}

impl EngineError {
    pub(crate) fn corrupt_signature(reason: impl Into<String>) -> Self {
        Self::CorruptSignature {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt_delta(reason: impl Into<String>) -> Self {
        Self::CorruptDelta {
            reason: reason.into(),
        }
    }

    pub(crate) const fn invalid_state(reason: &'static str) -> Self {
        Self::InvalidState { reason }
    }
}
