//! crates/engine/src/sig_gen.rs
//!
//! Streaming signature generation job.

use checksums::{RollingChecksum, StrongHasher};
use signature::SignatureParams;

use crate::error::EngineError;
use crate::step::{Job, StepIo, StepState};
use crate::wire::SIG_HEADER_LEN;

/// Fingerprints a basis stream into signature bytes.
///
/// Emits the fixed header, then one weak/strong entry per block. Block
/// contents may arrive split across any number of steps; both checksums are
/// fed incrementally so no block is ever buffered. A trailing partial block
/// is hashed over the bytes it actually has.
#[derive(Debug)]
pub struct SignatureJob {
    params: SignatureParams,
    weak: RollingChecksum,
    strong: StrongHasher,
    filled: u64,
    header_written: bool,
    finished: bool,
}

impl SignatureJob {
    /// Begins a signature job with fully negotiated parameters.
    #[must_use]
    pub fn new(params: SignatureParams) -> Self {
        Self {
            params,
            weak: RollingChecksum::new(),
            strong: StrongHasher::new(params.format().algorithm()),
            filled: 0,
            header_written: false,
            finished: false,
        }
    }

    fn emit_entry(&mut self, io: &mut StepIo<'_>) {
        io.produce(&self.weak.digest().to_be_bytes());
        let digest = self.strong.finalize_reset();
        io.produce(&digest[..self.params.strong_length()]);
        self.weak.reset();
        self.filled = 0;
    }
}

impl Job for SignatureJob {
    fn step(&mut self, io: &mut StepIo<'_>) -> Result<StepState, EngineError> {
        if self.finished {
            return Err(EngineError::invalid_state("signature job stepped after done"));
        }

        if !self.header_written {
            if io.output_spare() < SIG_HEADER_LEN {
                return Ok(StepState::Blocked);
            }
            io.produce(&self.params.format().magic().to_be_bytes());
            io.produce(&self.params.block_length().to_be_bytes());
            io.produce(&(self.params.strong_length() as u32).to_be_bytes());
            self.header_written = true;
        }

        let block_length = u64::from(self.params.block_length());
        let entry_len = self.params.entry_len();

        loop {
            let input = io.input();
            if input.is_empty() {
                break;
            }
            let need = block_length - self.filled;
            let take = usize::try_from(need).map_or(input.len(), |need| need.min(input.len()));
            // The entry that would complete must fit before its bytes are consumed.
            if u64::try_from(take).is_ok_and(|take| take == need) && io.output_spare() < entry_len {
                break;
            }
            self.weak.update(&input[..take]);
            self.strong.update(&input[..take]);
            io.consume(take);
            self.filled += take as u64;
            if self.filled == block_length {
                self.emit_entry(io);
            }
        }

        if io.input_ended() && io.input().is_empty() {
            if self.filled > 0 {
                if io.output_spare() < entry_len {
                    return Ok(StepState::Running);
                }
                self.emit_entry(io);
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
