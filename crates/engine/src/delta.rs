//! crates/engine/src/delta.rs
//!
//! Streaming delta generation against a loaded signature.

use checksums::{RollingChecksum, StrongAlgorithm, strong_sum};
use signature::{BlockIndex, Signature, SignatureHandle};

use crate::error::EngineError;
use crate::step::{Job, StepIo, StepState};
use crate::wire::{
    DELTA_MAGIC, MAX_COPY_HEADER, MAX_LITERAL_HEADER, OP_END, encode_copy, encode_literal_header,
};

/// Computes a delta describing new data in terms of a basis signature.
///
/// Slides the weak checksum over the current input window one byte at a
/// time; weak hits are confirmed against the stored strong digest before a
/// copy command is emitted, and everything between matches becomes literal
/// runs. The job keeps no window of its own: bytes stay in the caller's
/// window until they are represented in the output, and the caller's window
/// must span at least one block so a match can straddle refills.
#[derive(Debug)]
pub struct DeltaJob {
    handle: SignatureHandle,
    header_written: bool,
    finished: bool,
}

impl DeltaJob {
    /// Begins a delta job against a loaded signature.
    ///
    /// Triggers the handle's one-time index build if no earlier run has.
    #[must_use]
    pub fn new(handle: &SignatureHandle) -> Self {
        handle.ensure_index();
        Self {
            handle: handle.clone(),
            header_written: false,
            finished: false,
        }
    }
}

impl Job for DeltaJob {
    fn step(&mut self, io: &mut StepIo<'_>) -> Result<StepState, EngineError> {
        if self.finished {
            return Err(EngineError::invalid_state("delta job stepped after done"));
        }

        if !self.header_written {
            if io.output_spare() < 4 {
                return Ok(StepState::Blocked);
            }
            io.produce(&DELTA_MAGIC.to_be_bytes());
            self.header_written = true;
        }

        let handle = self.handle.clone();
        let sig = handle.signature();
        let index = handle.ensure_index();
        let params = sig.params();
        let block = params.block_length() as usize;
        let algorithm = params.format().algorithm();
        let strong_len = params.strong_length();

        let data = io.input();
        let n = data.len();

        let mut emit_end = 0usize;
        let mut pos = 0usize;
        let mut out_of_space = false;

        let mut weak = RollingChecksum::new();
        if n >= block {
            weak.update_from_block(&data[..block]);
        }

        while pos + block <= n {
            let window = &data[pos..pos + block];
            let found = find_match(weak.digest(), window, algorithm, strong_len, sig, index);
            if let Some(matched) = found {
                let emitted = emit_literal(io, &data[emit_end..pos]);
                emit_end += emitted;
                if emit_end < pos || io.output_spare() < MAX_COPY_HEADER {
                    out_of_space = true;
                    break;
                }
                let mut buf = [0u8; MAX_COPY_HEADER];
                let len = encode_copy(sig.block_offset(matched as usize), block as u32, &mut buf);
                io.produce(&buf[..len]);
                emit_end = pos + block;
                pos = emit_end;
                if pos + block <= n {
                    weak.update_from_block(&data[pos..pos + block]);
                }
            } else {
                if pos + block < n {
                    weak
                        .roll(data[pos], data[pos + block])
                        .map_err(|_| EngineError::invalid_state("rolled an empty weak window"))?;
                }
                pos += 1;
            }
        }

        if !out_of_space {
            if io.input_ended() {
                // Trailing partial window can never match a full block.
                let emitted = emit_literal(io, &data[emit_end..n]);
                emit_end += emitted;
                if emit_end == n && io.output_spare() >= 1 {
                    io.produce(&[OP_END]);
                    self.finished = true;
                }
            } else {
                // Everything before the scan cursor was checked and cannot
                // begin a future match, so it ships as literal now.
                let emitted = emit_literal(io, &data[emit_end..pos]);
                emit_end += emitted;
            }
        }

        io.consume(emit_end);

        if self.finished {
            return Ok(StepState::Done);
        }
        if io.made_progress() {
            Ok(StepState::Running)
        } else {
            Ok(StepState::Blocked)
        }
    }
}

/// Confirms a weak hit against stored strong digests.
fn find_match(
    digest: u32,
    window: &[u8],
    algorithm: StrongAlgorithm,
    strong_len: usize,
    sig: &Signature,
    index: &BlockIndex,
) -> Option<u32> {
    let candidates = index.candidates(digest);
    if candidates.is_empty() {
        return None;
    }
    let strong = strong_sum(algorithm, window);
    candidates
        .iter()
        .copied()
        .find(|&candidate| sig.blocks()[candidate as usize].strong() == &strong[..strong_len])
}

/// Emits as much of `data` as the output window allows, split into literal
/// commands. Returns the number of payload bytes shipped.
fn emit_literal(io: &mut StepIo<'_>, mut data: &[u8]) -> usize {
    let mut emitted = 0;
    while !data.is_empty() {
        let spare = io.output_spare();
        if spare <= MAX_LITERAL_HEADER {
            break;
        }
        let payload = data
            .len()
            .min(spare - MAX_LITERAL_HEADER)
            .min(u32::MAX as usize);
        let mut buf = [0u8; MAX_LITERAL_HEADER];
        let header = encode_literal_header(payload as u32, &mut buf);
        io.produce(&buf[..header]);
        io.produce(&data[..payload]);
        data = &data[payload..];
        emitted += payload;
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig_gen::SignatureJob;
    use crate::sig_load::SignatureLoader;
    use signature::{SignatureFormat, SignatureParams};
    use std::num::{NonZeroU8, NonZeroU32};

    fn handle_for(data: &[u8], block: u32) -> SignatureHandle {
        let params = SignatureParams::new(
            SignatureFormat::Md5,
            NonZeroU32::new(block).unwrap(),
            NonZeroU8::new(16).unwrap(),
        );
        let mut job = SignatureJob::new(params);
        let mut out = vec![0u8; 1 << 16];
        let mut bytes = Vec::new();
        let mut offset = 0;
        loop {
            let mut io = StepIo::new(&data[offset..], true, &mut out);
            let state = job.step(&mut io).expect("signature step succeeds");
            offset += io.consumed();
            bytes.extend_from_slice(&out[..io.produced()]);
            if state == StepState::Done {
                break;
            }
        }
        let mut loader = SignatureLoader::new();
        loader.push(&bytes).expect("push succeeds");
        SignatureHandle::new(loader.finish().expect("load succeeds"))
    }

    fn run_delta(handle: &SignatureHandle, new_data: &[u8], feed: usize) -> Vec<u8> {
        let mut job = DeltaJob::new(handle);
        let mut out = vec![0u8; 4096];
        let mut delta = Vec::new();
        let mut window: Vec<u8> = Vec::new();
        let mut offset = 0;
        loop {
            if window.len() < 2048 && offset < new_data.len() {
                let end = (offset + feed).min(new_data.len());
                window.extend_from_slice(&new_data[offset..end]);
                offset = end;
            }
            let ended = offset == new_data.len();
            let mut io = StepIo::new(&window, ended, &mut out);
            let state = job.step(&mut io).expect("delta step succeeds");
            let consumed = io.consumed();
            delta.extend_from_slice(&out[..io.produced()]);
            window.drain(..consumed);
            if state == StepState::Done {
                break;
            }
        }
        delta
    }

    #[test]
    fn identity_delta_is_mostly_copies() {
        let data: Vec<u8> = (0..4096u32).map(|v| (v * 7 % 256) as u8).collect();
        let handle = handle_for(&data, 64);
        let delta = run_delta(&handle, &data, 4096);
        assert!(
            delta.len() < data.len() / 4,
            "identity delta should compress: {} bytes",
            delta.len()
        );
        assert_eq!(&delta[..4], &DELTA_MAGIC.to_be_bytes());
        assert_eq!(*delta.last().unwrap(), OP_END);
    }

    #[test]
    fn disjoint_data_is_all_literals() {
        let basis = vec![0u8; 512];
        let new_data = vec![0xffu8; 300];
        let handle = handle_for(&basis, 64);
        let delta = run_delta(&handle, &new_data, 300);
        // magic + literal header + payload + end
        assert!(delta.len() > new_data.len());
        assert_eq!(*delta.last().unwrap(), OP_END);
    }

    #[test]
    fn empty_new_data_yields_header_and_end() {
        let handle = handle_for(b"some basis data", 64);
        let delta = run_delta(&handle, b"", 1);
        assert_eq!(delta.len(), 5);
        assert_eq!(&delta[..4], &DELTA_MAGIC.to_be_bytes());
        assert_eq!(delta[4], OP_END);
    }

    #[test]
    fn matches_found_for_shifted_content() {
        let basis: Vec<u8> = (0..2048u32).map(|v| (v * 13 % 256) as u8).collect();
        let mut new_data = b"prefix inserted up front".to_vec();
        new_data.extend_from_slice(&basis);
        let handle = handle_for(&basis, 64);
        let delta = run_delta(&handle, &new_data, 4096);
        // The shifted basis content should still be found block by block.
        assert!(delta.len() < new_data.len() / 2);
    }
}
