//! Snappy compression for Rust — block format and framed stream format.
//!
//! Snappy trades ratio for speed: a single-pass LZ77-style matcher over
//! 64 KiB fragments, aiming for throughput on the order of a GB/s per core.
//! This crate implements both on-the-wire formats:
//!
//! - the **block format** ([`block`]): a varint length prefix followed by a
//!   literal/copy tag stream — [`compress_block`] / [`decompress_block`],
//!   plus resumable decoding via [`Decompressor`];
//! - the **framed stream format** ([`frame`]): length-delimited chunks with
//!   a masked CRC32C per chunk — [`FrameEncoder`] / [`FrameDecoder`], both
//!   synchronous and resumable over arbitrary input/output splits.
//!
//! There are no compression levels and no dictionaries; Snappy has exactly
//! one operating point.  Output is valid for any Snappy decoder, but is not
//! promised to be byte-identical to other implementations.
//!
//! ```
//! let data = b"well-worn words, well-worn words, well-worn words";
//! let mut compressed = vec![0u8; snappy::max_compressed_length(data.len())];
//! let n = snappy::compress_block(data, &mut compressed).unwrap();
//!
//! let len = snappy::uncompressed_length(&compressed[..n]).unwrap() as usize;
//! let mut out = vec![0u8; len];
//! snappy::decompress_block(&compressed[..n], &mut out).unwrap();
//! assert_eq!(&out, data);
//! ```

pub mod block;
pub mod crc32c;
pub mod frame;
pub mod varint;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level re-exports for the primary API entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// One-shot block compression.
pub use block::compress::compress_block;
/// Worst-case compressed size, varint prefix included.
pub use block::compress::max_compressed_length;
/// Error type for block compression.
pub use block::compress::CompressError;
/// Block compressor with a reusable hash table.
pub use block::compress::Compressor;

/// One-shot block decompression.
pub use block::decompress::decompress_block;
/// Read the uncompressed length from a block's varint prefix.
pub use block::decompress::uncompressed_length;
/// Error type for block decompression.
pub use block::decompress::DecompressError;
/// Resumable block decompressor.
pub use block::decompress::Decompressor;

/// Streaming compressor for the framed format.
pub use frame::compress::FrameEncoder;
/// Streaming decompressor for the framed format.
pub use frame::decompress::FrameDecoder;
/// Error type for the framed format.
pub use frame::types::FrameError;

/// Compression fragment cap and stream chunk cap (64 KiB).
pub use block::types::BLOCK_SIZE;
