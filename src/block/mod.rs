//! Snappy block format — compression and decompression.
//!
//! A block is a varint-encoded uncompressed length followed by a stream of
//! literal and copy tags.  This module holds the codecs and the primitives
//! they share.

pub mod compress;
pub mod decompress;
pub mod types;

// Re-export the most important public API items at the module level.
pub use compress::{compress_block, max_compressed_length, CompressError, Compressor};
pub use decompress::{decompress_block, uncompressed_length, DecompressError, Decompressor};
pub use types::BLOCK_SIZE;
