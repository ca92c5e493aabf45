//! crates/engine/src/patch.rs
//!
//! Replaying a delta against a random-access basis.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::EngineError;
use crate::step::{Job, StepIo, StepState};
use crate::wire::{
    DELTA_MAGIC, OP_COPY_32_16, OP_COPY_32_32, OP_COPY_64_16, OP_COPY_64_32, OP_END, OP_LITERAL_8,
    OP_LITERAL_16, OP_LITERAL_32, command_param_len, read_be,
};

/// Random-access view of the basis consulted while a delta is applied.
///
/// Copy commands address the basis by absolute offset, in whatever order the
/// delta encoder emitted them, so sequential access is not enough. Reads may
/// return fewer bytes than requested; the patch job loops. A zero-length
/// read before the requested range is satisfied means the delta references
/// data the basis does not have.
pub trait BasisSource {
    /// Reads up to `buf.len()` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

impl BasisSource for std::fs::File {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.seek(SeekFrom::Start(offset))?;
        self.read(buf)
    }
}

impl BasisSource for &[u8] {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        if offset >= self.len() {
            return Ok(0);
        }
        let take = buf.len().min(self.len() - offset);
        buf[..take].copy_from_slice(&self[offset..offset + take]);
        Ok(take)
    }
}

impl BasisSource for Vec<u8> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.as_slice().read_at(offset, buf)
    }
}

#[derive(Debug)]
enum PatchState {
    Magic,
    Command,
    Literal { remaining: u64 },
    Copy { offset: u64, remaining: u64 },
    Finished,
}

/// Reconstructs new data by replaying delta commands against a basis.
///
/// Input is the delta stream; output is the reconstructed data. The basis is
/// held open for the whole job and released when the job drops. Command
/// headers split across input chunks are stitched through a carry buffer, so
/// the delta may arrive in any sub-chunking.
#[derive(Debug)]
pub struct PatchJob<B> {
    basis: B,
    state: PatchState,
    stash: Vec<u8>,
}

impl<B: BasisSource> PatchJob<B> {
    /// Begins a patch job over the given basis.
    #[must_use]
    pub fn new(basis: B) -> Self {
        Self {
            basis,
            state: PatchState::Magic,
            stash: Vec::new(),
        }
    }

    /// Tops the stash up to `need` bytes, returning `true` when complete.
    fn gather(&mut self, io: &mut StepIo<'_>, need: usize) -> bool {
        let input = io.input();
        let take = (need - self.stash.len()).min(input.len());
        self.stash.extend_from_slice(&input[..take]);
        io.consume(take);
        self.stash.len() == need
    }

    fn decode_command(&mut self) -> Result<PatchState, EngineError> {
        let op = self.stash[0];
        let params = &self.stash[1..];
        let state = match op {
            OP_END => PatchState::Finished,
            OP_LITERAL_8 | OP_LITERAL_16 | OP_LITERAL_32 => PatchState::Literal {
                remaining: read_be(params, params.len()),
            },
            OP_COPY_32_16 | OP_COPY_32_32 => PatchState::Copy {
                offset: read_be(params, 4),
                remaining: read_be(&params[4..], params.len() - 4),
            },
            OP_COPY_64_16 | OP_COPY_64_32 => PatchState::Copy {
                offset: read_be(params, 8),
                remaining: read_be(&params[8..], params.len() - 8),
            },
            other => {
                return Err(EngineError::corrupt_delta(format!(
                    "unknown command opcode {other:#04x}"
                )));
            }
        };
        self.stash.clear();
        Ok(state)
    }
}

impl<B: BasisSource> Job for PatchJob<B> {
    fn step(&mut self, io: &mut StepIo<'_>) -> Result<StepState, EngineError> {
        loop {
            match self.state {
                PatchState::Magic => {
                    if !self.gather(io, 4) {
                        return structural_wait(io, "delta ended inside the magic");
                    }
                    let magic =
                        u32::from_be_bytes(self.stash[..4].try_into().expect("slice is 4 bytes"));
                    if magic != DELTA_MAGIC {
                        return Err(EngineError::UnknownDeltaMagic { magic });
                    }
                    self.stash.clear();
                    self.state = PatchState::Command;
                }
                PatchState::Command => {
                    if !self.gather(io, 1) {
                        return structural_wait(io, "delta has no end-of-stream command");
                    }
                    let Some(param_len) = command_param_len(self.stash[0]) else {
                        return Err(EngineError::corrupt_delta(format!(
                            "unknown command opcode {:#04x}",
                            self.stash[0]
                        )));
                    };
                    if !self.gather(io, 1 + param_len) {
                        return structural_wait(io, "delta ended inside a command header");
                    }
                    self.state = self.decode_command()?;
                }
                PatchState::Literal { remaining } => {
                    if remaining == 0 {
                        self.state = PatchState::Command;
                        continue;
                    }
                    let input = io.input();
                    let take = usize::try_from(remaining)
                        .unwrap_or(usize::MAX)
                        .min(input.len())
                        .min(io.output_spare());
                    if take == 0 {
                        if input.is_empty() && io.input_ended() {
                            return Err(EngineError::corrupt_delta(
                                "delta ended inside a literal run",
                            ));
                        }
                        return Ok(drained(io));
                    }
                    io.produce(&input[..take]);
                    io.consume(take);
                    self.state = PatchState::Literal {
                        remaining: remaining - take as u64,
                    };
                }
                PatchState::Copy { offset, remaining } => {
                    if remaining == 0 {
                        self.state = PatchState::Command;
                        continue;
                    }
                    let want = usize::try_from(remaining)
                        .unwrap_or(usize::MAX)
                        .min(io.output_spare());
                    if want == 0 {
                        return Ok(drained(io));
                    }
                    let spare = io.spare_output_mut();
                    let read = self
                        .basis
                        .read_at(offset, &mut spare[..want])
                        .map_err(|source| EngineError::BasisRead { offset, source })?;
                    if read == 0 {
                        return Err(EngineError::BasisOutOfRange {
                            offset,
                            length: remaining,
                        });
                    }
                    io.advance_produced(read);
                    self.state = PatchState::Copy {
                        offset: offset + read as u64,
                        remaining: remaining - read as u64,
                    };
                }
                PatchState::Finished => {
                    return if io.made_progress() {
                        // Hand back the bytes produced alongside the end
                        // marker; the caller finalizes on the next step.
                        Ok(StepState::Done)
                    } else {
                        Err(EngineError::invalid_state("patch job stepped after done"))
                    };
                }
            }
        }
    }
}

/// Classifies a step that ran out of input while a structural element (magic
/// or command header) is incomplete: at end of input that is a truncated
/// delta, otherwise the job waits for more bytes.
fn structural_wait(io: &StepIo<'_>, truncation: &'static str) -> Result<StepState, EngineError> {
    if io.input_ended() && io.input().is_empty() {
        return Err(EngineError::corrupt_delta(truncation));
    }
    Ok(drained(io))
}

/// Classifies a step that stopped because the output window filled up.
fn drained(io: &StepIo<'_>) -> StepState {
    if io.made_progress() {
        StepState::Running
    } else {
        StepState::Blocked
    }
}
