//! crates/engine/src/sig_load.rs
//!
//! Parsing signature bytes back into the in-memory model.

use std::num::{NonZeroU8, NonZeroU32};

use signature::{BlockSum, Signature, SignatureFormat, SignatureParams};

use crate::error::EngineError;
use crate::step::{Job, StepIo, StepState};
use crate::wire::SIG_HEADER_LEN;

/// Parses a signature byte stream into a [`Signature`].
///
/// Accepts the stream in arbitrarily sized pieces; a header or block entry
/// split across steps is stitched together through a small carry buffer.
/// Produces no output bytes. Once stepped to [`StepState::Done`] the parsed
/// signature is claimed with [`into_signature`](Self::into_signature).
#[derive(Debug, Default)]
pub struct LoadSignatureJob {
    stash: Vec<u8>,
    params: Option<SignatureParams>,
    blocks: Vec<BlockSum>,
    finished: bool,
}

impl LoadSignatureJob {
    /// Begins an empty load job.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the parsed signature after the job reported done.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] when the job has not finished.
    pub fn into_signature(self) -> Result<Signature, EngineError> {
        if !self.finished {
            return Err(EngineError::invalid_state(
                "signature claimed before load finished",
            ));
        }
        let params = self
            .params
            .ok_or(EngineError::invalid_state("finished load job lost its header"))?;
        Ok(Signature::from_parts(params, self.blocks))
    }

    /// Tops the stash up to `need` bytes from the input, consuming as it
    /// goes. Returns `true` once the stash holds exactly `need` bytes.
    fn gather(&mut self, io: &mut StepIo<'_>, need: usize) -> bool {
        let input = io.input();
        let take = (need - self.stash.len()).min(input.len());
        self.stash.extend_from_slice(&input[..take]);
        io.consume(take);
        self.stash.len() == need
    }

    fn parse_header(&mut self) -> Result<SignatureParams, EngineError> {
        let magic = u32::from_be_bytes(self.stash[0..4].try_into().expect("slice is 4 bytes"));
        let format = SignatureFormat::from_magic(magic)
            .ok_or(EngineError::UnknownSignatureMagic { magic })?;
        let block_length =
            u32::from_be_bytes(self.stash[4..8].try_into().expect("slice is 4 bytes"));
        let strong_length =
            u32::from_be_bytes(self.stash[8..12].try_into().expect("slice is 4 bytes"));

        let block_length = NonZeroU32::new(block_length)
            .ok_or_else(|| EngineError::corrupt_signature("block length is zero"))?;
        let strong_length = u8::try_from(strong_length)
            .ok()
            .and_then(NonZeroU8::new)
            .filter(|len| usize::from(len.get()) <= format.digest_len())
            .ok_or_else(|| {
                EngineError::corrupt_signature(format!(
                    "strong length {strong_length} is outside 1..={}",
                    format.digest_len()
                ))
            })?;
        Ok(SignatureParams::new(format, block_length, strong_length))
    }

    fn push_entry(&mut self, entry: &[u8]) {
        let weak = u32::from_be_bytes(entry[0..4].try_into().expect("slice is 4 bytes"));
        self.blocks.push(BlockSum::new(weak, entry[4..].to_vec()));
    }
}

impl Job for LoadSignatureJob {
    fn step(&mut self, io: &mut StepIo<'_>) -> Result<StepState, EngineError> {
        if self.finished {
            return Err(EngineError::invalid_state("load job stepped after done"));
        }

        if self.params.is_none() {
            if !self.gather(io, SIG_HEADER_LEN) {
                return self.end_or_wait(io, "signature ended inside the header");
            }
            self.params = Some(self.parse_header()?);
            self.stash.clear();
        }

        let entry_len = self
            .params
            .as_ref()
            .expect("header parsed above")
            .entry_len();

        loop {
            if !self.stash.is_empty() || io.input().len() < entry_len {
                // Split entry: stitch through the stash.
                if !self.gather(io, entry_len) {
                    break;
                }
                let entry = std::mem::take(&mut self.stash);
                self.push_entry(&entry);
            } else {
                let input = io.input();
                self.push_entry(&input[..entry_len]);
                io.consume(entry_len);
            }
        }

        self.end_or_wait(io, "signature ended inside a block entry")
    }
}

impl LoadSignatureJob {
    fn end_or_wait(
        &mut self,
        io: &StepIo<'_>,
        truncation: &'static str,
    ) -> Result<StepState, EngineError> {
        if io.input_ended() && io.input().is_empty() {
            if !self.stash.is_empty() {
                return Err(EngineError::corrupt_signature(truncation));
            }
            if self.params.is_none() {
                return Err(EngineError::corrupt_signature("signature is empty"));
            }
            self.finished = true;
            return Ok(StepState::Done);
        }
        if io.made_progress() {
            Ok(StepState::Running)
        } else {
            Ok(StepState::Blocked)
        }
    }
}

/// Push-style wrapper over [`LoadSignatureJob`].
///
/// Collected signature bytes can arrive in any sub-chunking; feed each piece
/// with [`push`](Self::push) and claim the handle with
/// [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct SignatureLoader {
    job: LoadSignatureJob,
}

impl SignatureLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one piece of the signature stream.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), EngineError> {
        let mut sink = [0u8; 0];
        let mut io = StepIo::new(chunk, false, &mut sink);
        while !io.input().is_empty() {
            self.job.step(&mut io)?;
        }
        Ok(())
    }

    /// Signals end of input and returns the parsed signature.
    pub fn finish(mut self) -> Result<Signature, EngineError> {
        let mut sink = [0u8; 0];
        let mut io = StepIo::new(&[], true, &mut sink);
        loop {
            if self.job.step(&mut io)? == StepState::Done {
                break;
            }
        }
        self.job.into_signature()
    }
}
