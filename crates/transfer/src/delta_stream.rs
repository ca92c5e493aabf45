//! crates/transfer/src/delta_stream.rs
//!
//! Lazy delta generation over files and readers.

use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use tokio::fs::File;
use tracing::debug;

use engine::DeltaJob;
use signature::SignatureHandle;

use crate::driver::{DynReader, JobDriver};
use crate::error::{Error, JobKind};
use crate::options::SyncOptions;

enum State {
    PendingPath { path: PathBuf },
    PendingReader { reader: DynReader },
    Running(JobDriver<DynReader, DeltaJob>),
    Finished,
}

/// Lazy stream of delta bytes describing new data against a basis signature.
///
/// The signature handle is shared: any number of delta streams may run
/// concurrently against one handle, and the first of them triggers the
/// handle's one-time index build. The input window spans at least two blocks
/// so matching can look across refill boundaries; the output window stays at
/// the configured buffer size.
pub struct DeltaStream {
    state: State,
    handle: SignatureHandle,
    options: SyncOptions,
}

impl DeltaStream {
    /// Diffs the file at `path` against the loaded signature.
    #[must_use]
    pub fn for_path(
        path: impl Into<PathBuf>,
        handle: &SignatureHandle,
        options: SyncOptions,
    ) -> Self {
        Self {
            state: State::PendingPath { path: path.into() },
            handle: handle.clone(),
            options,
        }
    }

    /// Diffs an arbitrary reader against the loaded signature.
    #[must_use]
    pub fn from_reader(
        reader: impl tokio::io::AsyncRead + Send + Unpin + 'static,
        handle: &SignatureHandle,
        options: SyncOptions,
    ) -> Self {
        Self {
            state: State::PendingReader {
                reader: Box::new(reader),
            },
            handle: handle.clone(),
            options,
        }
    }

    /// Pulls the next chunk of delta bytes.
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
                    match start(pending, &self.handle, self.options).await {
                        Ok(driver) => self.state = State::Running(driver),
                        Err(error) => return Some(Err(error)),
                    }
                }
            }
        }
    }

    /// Runs the whole stream and concatenates it into one buffer.
    pub async fn collect(mut self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes)
    }
}

/// Lazy initialization: open the new-data source and begin the job.
///
/// Creating the job triggers the handle's one-time index build when no
/// earlier run has done it.
async fn start(
    pending: State,
    handle: &SignatureHandle,
    options: SyncOptions,
) -> Result<JobDriver<DynReader, DeltaJob>, Error> {
    let reader: DynReader = match pending {
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
            debug!(path = %path.display(), size = metadata.len(), "starting delta job");
            let file = File::open(&path).await.map_err(|source| Error::SourceOpen {
                path: path.clone(),
                source,
            })?;
            Box::new(file)
        }
        State::PendingReader { reader } => reader,
        State::Running(_) | State::Finished => {
            return Err(Error::InvalidState {
                reason: "delta stream cannot restart",
            });
        }
    };

    let block_length = handle.signature().params().block_length();
    Ok(JobDriver::new(
        reader,
        DeltaJob::new(handle),
        JobKind::Delta,
        options.delta_window_capacity(block_length),
        options.window_capacity(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature_stream::{SignatureStream, load_signature};
    use engine::wire::DELTA_MAGIC;
    use tempfile::TempDir;

    async fn handle_for(data: &[u8], options: SyncOptions) -> SignatureHandle {
        let bytes = SignatureStream::from_reader(
            std::io::Cursor::new(data.to_vec()),
            Some(data.len() as u64),
            options,
        )
        .collect()
        .await
        .expect("signature");
        load_signature(&bytes).expect("load")
    }

    #[tokio::test]
    async fn missing_new_file_fails_before_any_resource_is_created() {
        let handle = handle_for(b"basis", SyncOptions::default()).await;
        let mut stream =
            DeltaStream::for_path("/no/such/new-file", &handle, SyncOptions::default());
        let result = stream.next_chunk().await.expect("error is surfaced");
        assert!(matches!(result, Err(Error::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn delta_stream_starts_with_the_delta_magic() {
        let data: Vec<u8> = (0..4000u32).map(|v| (v * 3 % 256) as u8).collect();
        let handle = handle_for(&data, SyncOptions::default()).await;
        let delta = DeltaStream::from_reader(
            std::io::Cursor::new(data.clone()),
            &handle,
            SyncOptions::default(),
        )
        .collect()
        .await
        .expect("delta");
        assert_eq!(&delta[..4], &DELTA_MAGIC.to_be_bytes());
    }

    #[tokio::test]
    async fn identity_delta_is_smaller_than_the_input() {
        let line = b"a line that repeats over and over again\n";
        let data: Vec<u8> = line.iter().copied().cycle().take(32 * 1024).collect();
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("new.bin");
        std::fs::write(&path, &data).expect("write new data");

        let handle = handle_for(&data, SyncOptions::default()).await;
        let delta = DeltaStream::for_path(&path, &handle, SyncOptions::default())
            .collect()
            .await
            .expect("delta");
        assert!(
            delta.len() < data.len(),
            "identity delta must be smaller: {} vs {}",
            delta.len(),
            data.len()
        );
    }

    #[tokio::test]
    async fn construction_triggers_the_index_build_once() {
        let handle = handle_for(b"shared basis content", SyncOptions::default()).await;
        assert!(!handle.is_indexed());
        let _delta = DeltaStream::from_reader(
            std::io::Cursor::new(b"new".to_vec()),
            &handle,
            SyncOptions::default(),
        )
        .collect()
        .await
        .expect("delta");
        assert!(handle.is_indexed());
    }
}
