//! Framed stream format constants and error handling.
//!
//! The stream format wraps Snappy blocks in length-delimited chunks:
//! a 4-byte header (1 byte type + 3 bytes little-endian body length), with
//! compressed and uncompressed data chunks carrying a masked CRC32C of the
//! uncompressed payload in their first 4 body bytes.
//!
//! See the [Snappy framing format] for the authoritative chunk-type ranges.
//!
//! [Snappy framing format]: https://github.com/google/snappy/blob/main/framing_format.txt

use core::fmt;

use crate::block::compress::max_compressed_length;
use crate::block::decompress::DecompressError;
use crate::block::types::BLOCK_SIZE;

// ─────────────────────────────────────────────────────────────────────────────
// Chunk format constants
// ─────────────────────────────────────────────────────────────────────────────

/// The stream identifier chunk, complete with its own header: chunk type
/// 0xff, body length 6, body `"sNaPpY"`.  Every stream starts with these
/// ten bytes.
pub const STREAM_IDENTIFIER: [u8; 10] =
    [0xff, 0x06, 0x00, 0x00, 0x73, 0x4e, 0x61, 0x50, 0x70, 0x59];

/// Body of the stream identifier chunk.
pub const STREAM_IDENTIFIER_BODY: [u8; 6] = *b"sNaPpY";

/// Chunk header: 1 byte type + 3 bytes little-endian body length.
pub const CHUNK_HEADER_SIZE: usize = 4;

/// Masked CRC32C prefix carried by data chunk bodies.
pub const CHUNK_CRC_SIZE: usize = 4;

/// Chunk type: Snappy-compressed block, preceded by its masked CRC.
pub const CHUNK_COMPRESSED: u8 = 0x00;

/// Chunk type: raw payload, preceded by its masked CRC.
pub const CHUNK_UNCOMPRESSED: u8 = 0x01;

/// Chunk type: padding; body is discarded.
pub const CHUNK_PADDING: u8 = 0xfe;

/// Chunk type: stream identifier.
pub const CHUNK_STREAM_IDENTIFIER: u8 = 0xff;

/// Largest legal body for an uncompressed data chunk: a full block plus its
/// CRC prefix.
pub const MAX_DATA_CHUNK_BODY: usize = BLOCK_SIZE + CHUNK_CRC_SIZE;

/// Largest compressed-chunk body this decoder accepts.  Conforming encoders
/// emit compressed chunks only when they shrink, but a maximally expanded
/// block from another implementation must still be readable.
pub const MAX_COMPRESSED_CHUNK_BODY: usize = max_compressed_length(BLOCK_SIZE) + CHUNK_CRC_SIZE;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by the stream compressor and decompressor.
///
/// Everything except [`FrameError::OutputTooSmall`] is fatal for the
/// current stream: the instance keeps failing until `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The stream does not begin with the stream identifier chunk, or an
    /// identifier chunk carries the wrong magic body.
    BadStreamIdentifier,
    /// A reserved unskippable chunk type (0x02..=0x7f).
    UnsupportedChunkType(u8),
    /// A chunk body length outside the legal range for its type.
    BadChunkLength,
    /// The masked CRC32C of a chunk's payload does not match the stored
    /// value.
    ChecksumMismatch,
    /// The Snappy block inside a compressed chunk is malformed.
    Block(DecompressError),
    /// The destination buffer cannot hold the emitted chunks.  Recoverable:
    /// retry with a buffer sized by the encoder's `write_bound`.
    OutputTooSmall,
    /// A previous error already poisoned this stream; `reset` before reuse.
    Failed,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::BadStreamIdentifier => f.write_str("missing or invalid stream identifier"),
            FrameError::UnsupportedChunkType(t) => {
                write!(f, "reserved unskippable chunk type {t:#04x}")
            }
            FrameError::BadChunkLength => f.write_str("chunk body length out of range"),
            FrameError::ChecksumMismatch => f.write_str("chunk checksum mismatch"),
            FrameError::Block(e) => write!(f, "bad compressed chunk: {e}"),
            FrameError::OutputTooSmall => f.write_str("output buffer too small"),
            FrameError::Failed => f.write_str("stream already failed"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Block(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecompressError> for FrameError {
    fn from(e: DecompressError) -> Self {
        FrameError::Block(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_identifier_layout() {
        assert_eq!(STREAM_IDENTIFIER[0], CHUNK_STREAM_IDENTIFIER);
        assert_eq!(STREAM_IDENTIFIER[1..4], [6, 0, 0]);
        assert_eq!(&STREAM_IDENTIFIER[4..], b"sNaPpY");
    }

    #[test]
    fn data_chunk_bound() {
        // Chunk payloads never exceed 65540 bytes: 64 KiB + 4-byte CRC.
        assert_eq!(MAX_DATA_CHUNK_BODY, 65_540);
    }
}
