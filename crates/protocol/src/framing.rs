//! crates/protocol/src/framing.rs
//!
//! Wire format: lowercase hex length, CRLF, payload, CRLF.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Longest accepted length header: 16 hex digits covers the full `u64`
/// range, so anything longer is a malformed or hostile header.
pub const MAX_HEADER_DIGITS: usize = 16;

/// Connection failures raised by the framing layer.
///
/// Any of these terminates the stream on the connection that raised it;
/// unrelated connections are unaffected.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The underlying transport failed (including truncation mid-frame).
    #[error("connection I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The length header ran past [`MAX_HEADER_DIGITS`] without a CRLF.
    #[error("frame header exceeded {MAX_HEADER_DIGITS} hex digits without a terminator")]
    UnterminatedHeader,
    /// The length header held a byte outside lowercase hex.
    #[error("frame header contains invalid byte {found:#04x}")]
    InvalidHeader {
        /// The offending byte.
        found: u8,
    },
    /// A CRLF arrived before any hex digit.
    #[error("frame header is empty")]
    EmptyHeader,
    /// The advertised length does not fit in memory on this platform.
    #[error("frame of {size} bytes exceeds addressable memory")]
    OversizedFrame {
        /// The advertised payload size.
        size: u64,
    },
    /// The payload was not followed by CRLF.
    #[error("frame trailer is missing its CRLF")]
    MissingTrailer,
}

/// Writes one framed chunk: hex length, CRLF, payload, CRLF.
///
/// A zero-length payload writes only header and trailer; the format permits
/// it even though the pipelines never emit empty chunks.
pub async fn write_chunk<W>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("{:x}\r\n", payload.len());
    writer.write_all(header.as_bytes()).await?;
    if !payload.is_empty() {
        writer.write_all(payload).await?;
    }
    writer.write_all(b"\r\n").await?;
    writer.flush().await?;
    trace!(len = payload.len(), "frame sent");
    Ok(())
}

/// Reads one framed chunk, returning its payload.
///
/// The header is consumed byte by byte up to its CRLF terminator within a
/// bounded window, so no payload byte is ever taken speculatively. The
/// payload read loops until exactly the advertised count arrived, since the
/// transport may deliver it in any number of pieces. A connection closed
/// mid-frame surfaces as [`FramingError::Io`] with
/// [`io::ErrorKind::UnexpectedEof`].
pub async fn read_chunk<R>(reader: &mut R) -> Result<Vec<u8>, FramingError>
where
    R: AsyncRead + Unpin,
{
    let size = read_header(reader).await?;
    let len = usize::try_from(size).map_err(|_| FramingError::OversizedFrame { size })?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    let mut trailer = [0u8; 2];
    reader.read_exact(&mut trailer).await?;
    if &trailer != b"\r\n" {
        return Err(FramingError::MissingTrailer);
    }
    trace!(len, "frame received");
    Ok(payload)
}

/// Parses the lowercase hex length and consumes its terminating CRLF.
async fn read_header<R>(reader: &mut R) -> Result<u64, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut digits = 0usize;
    let mut value = 0u64;
    loop {
        let byte = reader.read_u8().await?;
        match byte {
            b'\r' => {
                let lf = reader.read_u8().await?;
                if lf != b'\n' {
                    return Err(FramingError::InvalidHeader { found: lf });
                }
                if digits == 0 {
                    return Err(FramingError::EmptyHeader);
                }
                return Ok(value);
            }
            b'0'..=b'9' | b'a'..=b'f' => {
                if digits == MAX_HEADER_DIGITS {
                    return Err(FramingError::UnterminatedHeader);
                }
                value = (value << 4) | u64::from(hex_value(byte));
                digits += 1;
            }
            other => return Err(FramingError::InvalidHeader { found: other }),
        }
    }
}

const fn hex_value(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        _ => byte - b'a' + 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn round_trip(payload: &[u8]) -> Vec<u8> {
        let (mut tx, mut rx) = tokio::io::duplex(256);
        let payload_owned = payload.to_vec();
        let writer = tokio::spawn(async move {
            write_chunk(&mut tx, &payload_owned).await.expect("write succeeds");
        });
        let received = read_chunk(&mut rx).await.expect("read succeeds");
        writer.await.expect("writer task");
        received
    }

    #[tokio::test]
    async fn empty_frame_round_trips() {
        assert_eq!(round_trip(b"").await, b"");
    }

    #[tokio::test]
    async fn single_byte_frame_round_trips() {
        assert_eq!(round_trip(b"x").await, b"x");
    }

    #[tokio::test]
    async fn frame_larger_than_the_pipe_buffer_round_trips() {
        let payload: Vec<u8> = (0..64 * 1024u32).map(|v| (v % 256) as u8).collect();
        assert_eq!(round_trip(&payload).await, payload);
    }

    #[tokio::test]
    async fn header_is_lowercase_hex() {
        let (mut tx, mut rx) = tokio::io::duplex(256);
        write_chunk(&mut tx, &[0u8; 255]).await.expect("write succeeds");
        let mut raw = [0u8; 4];
        rx.read_exact(&mut raw).await.expect("read header");
        assert_eq!(&raw, b"ff\r\n");
    }

    #[tokio::test]
    async fn multiple_frames_preserve_order() {
        let (mut tx, mut rx) = tokio::io::duplex(4096);
        for piece in [b"first".as_slice(), b"second", b"third"] {
            write_chunk(&mut tx, piece).await.expect("write succeeds");
        }
        assert_eq!(read_chunk(&mut rx).await.expect("read"), b"first");
        assert_eq!(read_chunk(&mut rx).await.expect("read"), b"second");
        assert_eq!(read_chunk(&mut rx).await.expect("read"), b"third");
    }

    #[tokio::test]
    async fn uppercase_hex_is_rejected() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"FF\r\nxx\r\n").await.expect("raw write");
        assert!(matches!(
            read_chunk(&mut rx).await,
            Err(FramingError::InvalidHeader { found: b'F' })
        ));
    }

    #[tokio::test]
    async fn bare_lf_header_is_rejected() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"2\nab\r\n").await.expect("raw write");
        assert!(matches!(
            read_chunk(&mut rx).await,
            Err(FramingError::InvalidHeader { .. })
        ));
    }

    #[tokio::test]
    async fn empty_header_is_rejected() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"\r\n\r\n").await.expect("raw write");
        assert!(matches!(
            read_chunk(&mut rx).await,
            Err(FramingError::EmptyHeader)
        ));
    }

    #[tokio::test]
    async fn overlong_header_is_rejected() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"00000000000000000\r\n").await.expect("raw write");
        assert!(matches!(
            read_chunk(&mut rx).await,
            Err(FramingError::UnterminatedHeader)
        ));
    }

    #[tokio::test]
    async fn corrupt_trailer_is_rejected() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"2\r\nab!!").await.expect("raw write");
        assert!(matches!(
            read_chunk(&mut rx).await,
            Err(FramingError::MissingTrailer)
        ));
    }

    #[tokio::test]
    async fn truncated_payload_surfaces_an_io_error() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"a\r\nonly4").await.expect("raw write");
        drop(tx);
        assert!(matches!(read_chunk(&mut rx).await, Err(FramingError::Io(_))));
    }

    #[tokio::test]
    async fn payload_delivered_in_many_small_pieces_is_reassembled() {
        let (mut tx, mut rx) = tokio::io::duplex(8);
        let payload: Vec<u8> = (0..100u8).collect();
        let payload_clone = payload.clone();
        let writer = tokio::spawn(async move {
            write_chunk(&mut tx, &payload_clone).await.expect("write succeeds");
        });
        let received = read_chunk(&mut rx).await.expect("read succeeds");
        writer.await.expect("writer task");
        assert_eq!(received, payload);
    }
}
