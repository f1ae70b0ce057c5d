//! Snappy framed stream format — streaming compression and decompression.
//!
//! Length-delimited chunks with per-chunk masked CRC32C, suitable for
//! appending and for resumable reads over arbitrary input splits.

pub mod compress;
pub mod decompress;
pub mod types;

// Re-export key public API items at the module level.
pub use compress::FrameEncoder;
pub use decompress::FrameDecoder;
pub use types::{FrameError, STREAM_IDENTIFIER};
