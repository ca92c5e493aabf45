//! crates/engine/src/wire.rs
//!
//! On-the-wire layout of signature and delta streams.
//!
//! Signature: `magic u32 | block_length u32 | strong_length u32`, then one
//! `weak u32 | strong[strong_length]` entry per block, all big-endian, the
//! block list delimited by end of input.
//!
//! Delta: `magic u32`, then commands. Literal commands carry a 1/2/4-byte
//! length followed by that many payload bytes; copy commands carry a 4/8-byte
//! basis offset and a 2/4-byte length; `0x00` ends the stream. Encoders pick
//! the smallest header that fits.

/// Magic opening every delta stream (`"rdd1"`).
pub const DELTA_MAGIC: u32 = 0x7264_6431;

/// Size of the fixed signature header.
pub const SIG_HEADER_LEN: usize = 12;

/// Ends the delta command stream.
pub(crate) const OP_END: u8 = 0x00;
/// Literal run, `u8` length.
pub(crate) const OP_LITERAL_8: u8 = 0x41;
/// Literal run, `u16` length.
pub(crate) const OP_LITERAL_16: u8 = 0x42;
/// Literal run, `u32` length.
pub(crate) const OP_LITERAL_32: u8 = 0x43;
/// Copy from basis, `u32` offset, `u16` length.
pub(crate) const OP_COPY_32_16: u8 = 0x45;
/// Copy from basis, `u32` offset, `u32` length.
pub(crate) const OP_COPY_32_32: u8 = 0x46;
/// Copy from basis, `u64` offset, `u16` length.
pub(crate) const OP_COPY_64_16: u8 = 0x47;
/// Copy from basis, `u64` offset, `u32` length.
pub(crate) const OP_COPY_64_32: u8 = 0x48;

/// Largest literal command header: opcode plus `u32` length.
pub(crate) const MAX_LITERAL_HEADER: usize = 5;

/// Largest copy command header: opcode plus `u64` offset plus `u32` length.
pub(crate) const MAX_COPY_HEADER: usize = 13;

/// Encodes a literal command header into `buf`, returning its length.
pub(crate) fn encode_literal_header(len: u32, buf: &mut [u8; MAX_LITERAL_HEADER]) -> usize {
    if let Ok(len) = u8::try_from(len) {
        buf[0] = OP_LITERAL_8;
        buf[1] = len;
        2
    } else if let Ok(len) = u16::try_from(len) {
        buf[0] = OP_LITERAL_16;
        buf[1..3].copy_from_slice(&len.to_be_bytes());
        3
    } else {
        buf[0] = OP_LITERAL_32;
        buf[1..5].copy_from_slice(&len.to_be_bytes());
        5
    }
}

/// Encodes a copy command into `buf`, returning its length.
pub(crate) fn encode_copy(offset: u64, len: u32, buf: &mut [u8; MAX_COPY_HEADER]) -> usize {
    let short_offset = u32::try_from(offset).ok();
    let short_len = u16::try_from(len).ok();
    match (short_offset, short_len) {
        (Some(offset), Some(len)) => {
            buf[0] = OP_COPY_32_16;
            buf[1..5].copy_from_slice(&offset.to_be_bytes());
            buf[5..7].copy_from_slice(&len.to_be_bytes());
            7
        }
        (Some(offset), None) => {
            buf[0] = OP_COPY_32_32;
            buf[1..5].copy_from_slice(&offset.to_be_bytes());
            buf[5..9].copy_from_slice(&len.to_be_bytes());
            9
        }
        (None, Some(len)) => {
            buf[0] = OP_COPY_64_16;
            buf[1..9].copy_from_slice(&offset.to_be_bytes());
            buf[9..11].copy_from_slice(&len.to_be_bytes());
            11
        }
        (None, None) => {
            buf[0] = OP_COPY_64_32;
            buf[1..9].copy_from_slice(&offset.to_be_bytes());
            buf[9..13].copy_from_slice(&len.to_be_bytes());
            13
        }
    }
}

/// Returns the parameter byte count that follows a command opcode, or `None`
/// for an unrecognized opcode.
pub(crate) const fn command_param_len(op: u8) -> Option<usize> {
    match op {
        OP_END => Some(0),
        OP_LITERAL_8 => Some(1),
        OP_LITERAL_16 => Some(2),
        OP_LITERAL_32 => Some(4),
        OP_COPY_32_16 => Some(6),
        OP_COPY_32_32 => Some(8),
        OP_COPY_64_16 => Some(10),
        OP_COPY_64_32 => Some(12),
        _ => None,
    }
}

/// Reads a big-endian unsigned integer of `len` bytes from `bytes`.
pub(crate) fn read_be(bytes: &[u8], len: usize) -> u64 {
    let mut value = 0u64;
    for &byte in &bytes[..len] {
        value = (value << 8) | u64::from(byte);
    }
    value
}
