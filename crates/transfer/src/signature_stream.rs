//! crates/transfer/src/signature_stream.rs
//!
//! Lazy signature generation over files and readers.

use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use tokio::fs::File;
use tracing::debug;

use engine::{SignatureJob, SignatureLoader};
use signature::SignatureHandle;

use crate::driver::{DynReader, JobDriver};
use crate::error::{Error, JobKind};
use crate::options::SyncOptions;

enum State {
    PendingPath { path: PathBuf },
    PendingReader { reader: DynReader, size: Option<u64> },
    Running(JobDriver<DynReader, SignatureJob>),
    Finished,
}

/// Lazy stream of signature bytes for one basis source.
///
/// Nothing is opened until the first pull: the source is validated, its size
/// feeds the one-time parameter negotiation, and only then does the job
/// start. A missing path therefore fails with
/// [`Error::SourceNotFound`] before any resource exists. Dropping the stream
/// at any point releases the job and the source.
pub struct SignatureStream {
    state: State,
    options: SyncOptions,
}

impl SignatureStream {
    /// Fingerprints the file at `path`.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>, options: SyncOptions) -> Self {
        Self {
            state: State::PendingPath { path: path.into() },
            options,
        }
    }

    /// Fingerprints an arbitrary reader.
    ///
    /// `source_size` feeds parameter negotiation; leaving it `None` requires
    /// the options to pin an explicit block length.
    #[must_use]
    pub fn from_reader(
        reader: impl tokio::io::AsyncRead + Send + Unpin + 'static,
        source_size: Option<u64>,
        options: SyncOptions,
    ) -> Self {
        Self {
            state: State::PendingReader {
                reader: Box::new(reader),
                size: source_size,
            },
            options,
        }
    }

    /// Pulls the next chunk of signature bytes.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, Error>> {
        loop {
            match &mut self.state {
                State::Running(driver) => {
                    let chunk = driver.next_chunk().await;
                    if !matches!(chunk, Some(Ok(_))) {
                        self.state = State::Finished;
                    }
                    return chunk;
                }
                State::Finished => return None,
                State::PendingPath { .. } | State::PendingReader { .. } => {
                    let pending = std::mem::replace(&mut self.state, State::Finished);
                    match start(pending, self.options).await {
                        Ok(driver) => self.state = State::Running(driver),
                        Err(error) => return Some(Err(error)),
                    }
                }
            }
        }
    }

    /// Runs the whole stream and concatenates it into one buffer.
    ///
    /// Convenience for signatures known to fit in memory; unbounded sources
    /// should pull chunks instead.
    pub async fn collect(mut self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes)
    }
}

/// Lazy initialization: validate the source, negotiate parameters, begin.
async fn start(
    pending: State,
    options: SyncOptions,
) -> Result<JobDriver<DynReader, SignatureJob>, Error> {
    let (reader, size): (DynReader, Option<u64>) = match pending {
        State::PendingPath { path } => {
            let metadata = tokio::fs::metadata(&path).await.map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    Error::SourceNotFound { path: path.clone() }
                } else {
                    Error::SourceOpen {
                        path: path.clone(),
                        source,
                    }
                }
            })?;
            let file = File::open(&path).await.map_err(|source| Error::SourceOpen {
                path: path.clone(),
                source,
            })?;
            (Box::new(file), Some(metadata.len()))
        }
        State::PendingReader { reader, size } => (reader, size),
        State::Running(_) | State::Finished => {
            return Err(Error::InvalidState {
                reason: "signature stream cannot restart",
            });
        }
    };

    let params = options.negotiate(size)?;
    debug!(
        block_length = params.block_length(),
        strong_length = params.strong_length(),
        format = %params.format(),
        "starting signature job"
    );
    let capacity = options.window_capacity();
    Ok(JobDriver::new(
        reader,
        SignatureJob::new(params),
        JobKind::Signature,
        capacity,
        capacity,
    ))
}

/// Loads collected signature bytes into a shareable handle.
///
/// The bytes may be the concatenation of any chunking of a signature
/// stream; sub-chunk boundaries carry no meaning.
pub fn load_signature(bytes: &[u8]) -> Result<SignatureHandle, Error> {
    let mut loader = SignatureLoader::new();
    loader
        .push(bytes)
        .map_err(|error| Error::engine(JobKind::LoadSignature, error))?;
    let parsed = loader
        .finish()
        .map_err(|error| Error::engine(JobKind::LoadSignature, error))?;
    Ok(SignatureHandle::new(parsed))
}
