//! Streaming pipelines over the rdelta transform engine.
//!
//! This crate turns the engine's one-shot, buffer-at-a-time jobs into lazy,
//! pull-based chunk streams that work the same over files, in-memory
//! buffers, and sockets, without ever holding more than a bounded window of
//! data. The [`JobDriver`] owns that translation: it refills a
//! [`BufferWindow`] from an async source, runs exactly one engine step at a
//! time, and yields whatever the step produced as a [`bytes::Bytes`] chunk.
//!
//! Three pipelines sit on top of the driver: [`SignatureStream`]
//! fingerprints a basis, [`DeltaStream`] diffs new data against a loaded
//! [`signature::SignatureHandle`], and [`apply_delta`] /
//! [`apply_delta_to_path`] rebuild the new data from basis plus delta.
//! Dropping any of them mid-stream releases the job, the window, and any
//! open file; abandoning a run is always equivalent to having drained it.

#![deny(unsafe_code)]
#![deny(missing_docs)]

mod delta_stream;
mod driver;
mod error;
mod options;
mod patch;
mod signature_stream;
mod temp;
mod window;

pub use delta_stream::DeltaStream;
pub use driver::JobDriver;
pub use error::{Error, JobKind};
pub use options::{DEFAULT_BUFFER_SIZE, SyncOptions};
pub use patch::{apply_delta, apply_delta_to_path};
pub use signature_stream::{SignatureStream, load_signature};
pub use window::BufferWindow;
