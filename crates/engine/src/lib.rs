//! The rdelta transform engine.
//!
//! Every operation in this crate is a [`Job`]: a synchronous, one-shot codec
//! that is driven a single bounded step at a time. A step receives whatever
//! input bytes the caller currently has windowed, an end-of-input flag, and
//! spare output space; it consumes and produces what it can and reports
//! whether it is still running, blocked on more input, or done. Jobs never
//! perform I/O of their own (the one exception is the patch job's on-demand
//! basis reads through [`BasisSource`]) and never hold more than a bounded
//! amount of internal state, so the caller decides how data is buffered,
//! scheduled, and suspended.
//!
//! Four jobs exist: [`SignatureJob`] fingerprints a basis stream,
//! [`LoadSignatureJob`] parses signature bytes back into a
//! [`signature::Signature`], [`DeltaJob`] matches new data against a loaded
//! signature, and [`PatchJob`] replays a delta against a random-access basis.

#![deny(unsafe_code)]
#![deny(missing_docs)]

mod delta;
mod error;
mod patch;
mod sig_gen;
mod sig_load;
mod step;
pub mod wire;

pub use delta::DeltaJob;
pub use error::EngineError;
pub use patch::{BasisSource, PatchJob};
pub use sig_gen::SignatureJob;
pub use sig_load::{LoadSignatureJob, SignatureLoader};
pub use step::{Job, StepIo, StepState};
