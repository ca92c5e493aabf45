//! crates/transfer/src/patch.rs
//!
//! Applying a delta to a basis to reconstruct the new data.

use std::path::Path;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use engine::{BasisSource, PatchJob};

use crate::driver::JobDriver;
use crate::error::{Error, JobKind};
use crate::options::SyncOptions;
use crate::temp::create_sibling_tmpfile;

/// Applies an in-memory delta to a basis, writing reconstructed bytes to
/// `sink` as they are produced.
///
/// The basis is consulted by offset through [`BasisSource`] for as long as
/// the job runs and released on every exit path. Returns the number of
/// bytes written.
pub async fn apply_delta<B, W>(
    delta: &[u8],
    basis: B,
    sink: &mut W,
    options: SyncOptions,
) -> Result<u64, Error>
where
    B: BasisSource,
    W: AsyncWrite + Unpin,
{
    let capacity = options.window_capacity();
    let mut driver = JobDriver::new(delta, PatchJob::new(basis), JobKind::Patch, capacity, capacity);

    let mut written = 0u64;
    while let Some(chunk) = driver.next_chunk().await {
        let chunk = chunk?;
        sink.write_all(&chunk).await.map_err(Error::sink_write)?;
        written += chunk.len() as u64;
    }
    sink.flush().await.map_err(Error::sink_write)?;
    Ok(written)
}

/// Applies a delta to the basis file and atomically replaces `dest`.
///
/// The reconstruction goes to a hidden temp file beside `dest`, then a
/// single rename moves it into place, so a concurrent reader of `dest`
/// never observes a partially written file. Any failure removes the temp
/// file and leaves `dest` untouched.
pub async fn apply_delta_to_path(
    delta: &[u8],
    basis_path: impl AsRef<Path>,
    dest_path: impl AsRef<Path>,
    options: SyncOptions,
) -> Result<u64, Error> {
    let basis_path = basis_path.as_ref();
    let dest_path = dest_path.as_ref();

    if !tokio::fs::try_exists(basis_path)
        .await
        .map_err(|source| Error::SourceOpen {
            path: basis_path.to_path_buf(),
            source,
        })?
    {
        return Err(Error::SourceNotFound {
            path: basis_path.to_path_buf(),
        });
    }
    let basis = std::fs::File::open(basis_path).map_err(|source| Error::SourceOpen {
        path: basis_path.to_path_buf(),
        source,
    })?;

    let (temp_file, mut guard) = create_sibling_tmpfile(dest_path).map_err(Error::sink_write)?;
    let mut sink = tokio::fs::File::from_std(temp_file);

    let written = apply_delta(delta, basis, &mut sink, options).await?;
    sink.sync_all().await.map_err(Error::sink_write)?;
    drop(sink);

    tokio::fs::rename(guard.path(), dest_path)
        .await
        .map_err(Error::sink_write)?;
    guard.keep();
    debug!(dest = %dest_path.display(), written, "patched file renamed into place");
    Ok(written)
}
