//! crates/transfer/src/error.rs
//!
//! Classified failures for pipeline runs.

use std::io;
use std::path::PathBuf;

use engine::EngineError;
use thiserror::Error;

/// Which engine job a failure belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobKind {
    /// Signature generation.
    Signature,
    /// Signature loading.
    LoadSignature,
    /// Delta generation.
    Delta,
    /// Patch application.
    Patch,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signature => f.write_str("signature generation"),
            Self::LoadSignature => f.write_str("signature load"),
            Self::Delta => f.write_str("delta generation"),
            Self::Patch => f.write_str("patch application"),
        }
    }
}

/// Errors terminating a pipeline run.
///
/// Every run either completes with valid output or fails with exactly one of
/// these; resources are released before the error propagates.
#[derive(Debug, Error)]
pub enum Error {
    /// The source path does not exist. Raised before any job or file handle
    /// is created.
    #[error("source not found: {path}")]
    SourceNotFound {
        /// The missing path.
        path: PathBuf,
    },
    /// The source exists but could not be opened.
    #[error("failed to open {path}: {source}")]
    SourceOpen {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Reading from the source failed mid-stream.
    #[error("failed to read from source: {source}")]
    SourceRead {
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Writing to the sink failed.
    #[error("failed to write to sink: {source}")]
    SinkWrite {
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Signature bytes were malformed or carried an unknown magic.
    #[error("invalid or corrupt signature: {source}")]
    CorruptSignature {
        /// Engine diagnosis of the corruption.
        #[source]
        source: EngineError,
    },
    /// The engine reported a fatal result code.
    #[error("{op} failed: {source}")]
    Engine {
        /// The job that failed.
        op: JobKind,
        /// The engine's result code.
        #[source]
        source: EngineError,
    },
    /// The job stopped making progress against a full window.
    #[error("{op} made no progress with a {capacity}-byte window; buffer too small")]
    InsufficientBuffer {
        /// The job that stalled.
        op: JobKind,
        /// Capacity of the window that was too small.
        capacity: usize,
    },
    /// A job could not be created from the given inputs.
    #[error("cannot create {op} job: {reason}")]
    JobCreation {
        /// The job that could not start.
        op: JobKind,
        /// Why creation failed.
        reason: String,
    },
    /// A released or half-initialized resource was used.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Which invariant was violated.
        reason: &'static str,
    },
}

impl Error {
    pub(crate) fn source_read(source: io::Error) -> Self {
        Self::SourceRead { source }
    }

    pub(crate) fn sink_write(source: io::Error) -> Self {
        Self::SinkWrite { source }
    }

    /// Classifies an engine result code for the given job.
    ///
    /// Corrupt-signature codes keep their own category no matter which job
    /// surfaced them, so callers can always match on signature corruption.
    pub(crate) fn engine(op: JobKind, source: EngineError) -> Self {
        match source {
            EngineError::CorruptSignature { .. } | EngineError::UnknownSignatureMagic { .. } => {
                Self::CorruptSignature { source }
            }
            other => Self::Engine { op, source: other },
        }
    }
}
