//! crates/transfer/src/temp.rs
//!
//! Temporary output files with guaranteed cleanup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Characters used for random suffix generation.
const RAND_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Maximum attempts to find a unique temp file name before giving up.
const MAX_OPEN_ATTEMPTS: u32 = 100;

/// Creates `.name.XXXXXX` beside `dest` with a fresh random suffix,
/// atomically via `O_EXCL`, retrying on collisions.
///
/// Returns the open file plus a guard that deletes the temp file on drop
/// unless [`TempFileGuard::keep`] was called after a successful rename.
pub(crate) fn create_sibling_tmpfile(dest: &Path) -> io::Result<(fs::File, TempFileGuard)> {
    let name = dest
        .file_name()
        .map_or_else(|| "rdelta".to_owned(), |n| n.to_string_lossy().into_owned());
    let dir = dest.parent().unwrap_or(Path::new("."));

    for _ in 0..MAX_OPEN_ATTEMPTS {
        let candidate = dir.join(format!(".{name}.{}", random_suffix()?));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((file, TempFileGuard::new(candidate))),
            Err(ref error) if error.kind() == io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("failed to create temp file beside {} after {MAX_OPEN_ATTEMPTS} attempts", dest.display()),
    ))
}

fn random_suffix() -> io::Result<String> {
    let mut raw = [0u8; 6];
    getrandom::fill(&mut raw).map_err(io::Error::other)?;
    Ok(raw
        .iter()
        .map(|&b| RAND_CHARS[(b as usize) % RAND_CHARS.len()] as char)
        .collect())
}

/// RAII guard deleting the temp file on drop.
///
/// Call [`keep`](Self::keep) once the file was renamed into place.
#[derive(Debug)]
pub(crate) struct TempFileGuard {
    path: PathBuf,
    keep_on_drop: bool,
}

impl TempFileGuard {
    pub(crate) const fn new(path: PathBuf) -> Self {
        Self {
            path,
            keep_on_drop: false,
        }
    }

    pub(crate) const fn keep(&mut self) {
        self.keep_on_drop = true;
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.keep_on_drop {
            // Best effort: the file may already be renamed away or never
            // created, and drop cannot propagate errors.
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn temp_file_is_created_beside_the_destination() {
        let dir = tempdir().expect("temp dir");
        let dest = dir.path().join("output.bin");
        let (_file, mut guard) = create_sibling_tmpfile(&dest).expect("create temp");
        assert_eq!(guard.path().parent().unwrap(), dir.path());
        let name = guard.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".output.bin."), "got: {name}");
        guard.keep();
    }

    #[test]
    fn guard_deletes_on_drop() {
        let dir = tempdir().expect("temp dir");
        let dest = dir.path().join("output.bin");
        let temp_path;
        {
            let (_file, guard) = create_sibling_tmpfile(&dest).expect("create temp");
            temp_path = guard.path().to_path_buf();
            assert!(temp_path.exists());
        }
        assert!(!temp_path.exists());
    }

    #[test]
    fn kept_files_survive_the_guard() {
        let dir = tempdir().expect("temp dir");
        let dest = dir.path().join("output.bin");
        let temp_path;
        {
            let (_file, mut guard) = create_sibling_tmpfile(&dest).expect("create temp");
            guard.keep();
            temp_path = guard.path().to_path_buf();
        }
        assert!(temp_path.exists());
    }

    #[test]
    fn two_calls_never_collide() {
        let dir = tempdir().expect("temp dir");
        let dest = dir.path().join("output.bin");
        let (_f1, g1) = create_sibling_tmpfile(&dest).expect("first temp");
        let (_f2, g2) = create_sibling_tmpfile(&dest).expect("second temp");
        assert_ne!(g1.path(), g2.path());
    }
}
