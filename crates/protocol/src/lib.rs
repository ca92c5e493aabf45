//! Chunk framing for rdelta byte streams.
//!
//! Any lazy chunk stream (signature, delta, or patched output) can be
//! carried over a raw byte connection by framing each chunk as
//! `hex(length) CRLF payload CRLF`. The framing adds no stream terminator of
//! its own: end of stream is a transport-level event, usually connection
//! close, and peers that need explicit end-of-stream signaling layer their
//! own convention (for example a zero-length frame) on top.

#![deny(unsafe_code)]
#![deny(missing_docs)]

mod framing;

pub use framing::{FramingError, MAX_HEADER_DIGITS, read_chunk, write_chunk};
