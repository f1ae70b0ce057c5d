//! Framed stream compression.
//!
//! Chops input into [`BLOCK_SIZE`] blocks and emits the chunked stream
//! format: the stream identifier once, then one data chunk per block with a
//! 4-byte header and the masked CRC32C of the uncompressed payload.  A block
//! whose compression did not shrink it is written verbatim as an
//! uncompressed chunk — the compressed bytes in the scratch buffer are
//! simply abandoned.
//!
//! The encoder is synchronous and resumable: `write` appends input and may
//! emit zero or more complete chunks into the caller's buffer, `flush`
//! drains the buffered partial block.  Sizing the buffer with
//! [`FrameEncoder::write_bound`] makes [`FrameError::OutputTooSmall`]
//! impossible.

use byteorder::{ByteOrder, LittleEndian};

use crate::block::compress::{max_compressed_length, Compressor};
use crate::block::types::BLOCK_SIZE;
use crate::crc32c::masked_crc32c;
use crate::frame::types::{
    FrameError, CHUNK_COMPRESSED, CHUNK_CRC_SIZE, CHUNK_HEADER_SIZE, CHUNK_UNCOMPRESSED,
    STREAM_IDENTIFIER,
};

/// Chunk header + CRC: fixed per-chunk overhead on top of the payload.
const CHUNK_OVERHEAD: usize = CHUNK_HEADER_SIZE + CHUNK_CRC_SIZE;

// ─────────────────────────────────────────────────────────────────────────────
// FrameEncoder
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming compressor for the framed format.
///
/// ```
/// use snappy::frame::{FrameDecoder, FrameEncoder};
///
/// let data = b"the framed format wraps blocks in checksummed chunks";
/// let mut enc = FrameEncoder::new();
/// let mut out = vec![0u8; enc.write_bound(data.len())];
/// let mut n = enc.write(data, &mut out).unwrap();
/// n += enc.flush(&mut out[n..]).unwrap();
///
/// let mut dec = FrameDecoder::new();
/// let mut plain = vec![0u8; data.len()];
/// let (consumed, written) = dec.decompress(&out[..n], &mut plain).unwrap();
/// assert_eq!((consumed, written), (n, data.len()));
/// assert_eq!(&plain, data);
/// ```
pub struct FrameEncoder {
    compressor: Compressor,
    /// Accumulates input until a full block is ready.
    buffer: Vec<u8>,
    /// Compression workspace, sized so a block can never fail to fit.
    scratch: Vec<u8>,
    wrote_stream_identifier: bool,
}

impl FrameEncoder {
    pub fn new() -> Self {
        FrameEncoder {
            compressor: Compressor::new(),
            buffer: Vec::with_capacity(BLOCK_SIZE),
            scratch: vec![0; max_compressed_length(BLOCK_SIZE)],
            wrote_stream_identifier: false,
        }
    }

    /// Prepare for a new stream, keeping allocations.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.wrote_stream_identifier = false;
    }

    /// Worst-case bytes emitted by one `write` of `src_len` bytes (or by
    /// `flush`, for which `src_len = 0`).
    pub fn write_bound(&self, src_len: usize) -> usize {
        let pending = self.buffer.len() + src_len;
        let chunks = pending / BLOCK_SIZE + 1;
        STREAM_IDENTIFIER.len() + chunks * (BLOCK_SIZE + CHUNK_OVERHEAD)
    }

    /// Append `src` to the current block, emitting a data chunk into `dst`
    /// for every full block.  Returns the number of bytes written to `dst`.
    pub fn write(&mut self, mut src: &[u8], dst: &mut [u8]) -> Result<usize, FrameError> {
        let mut written = self.write_stream_identifier(dst)?;

        while !src.is_empty() {
            if self.buffer.is_empty() && src.len() >= BLOCK_SIZE {
                // A whole block is available: skip the staging copy.
                written += self.emit_data_chunk(&src[..BLOCK_SIZE], &mut dst[written..])?;
                src = &src[BLOCK_SIZE..];
            } else {
                let take = (BLOCK_SIZE - self.buffer.len()).min(src.len());
                self.buffer.extend_from_slice(&src[..take]);
                src = &src[take..];
                if self.buffer.len() == BLOCK_SIZE {
                    written += emit_chunk(
                        &mut self.compressor,
                        &mut self.scratch,
                        &self.buffer,
                        &mut dst[written..],
                    )?;
                    self.buffer.clear();
                }
            }
        }
        Ok(written)
    }

    /// Emit any buffered partial block (and the stream identifier, if no
    /// `write` preceded).  Returns the number of bytes written to `dst`.
    pub fn flush(&mut self, dst: &mut [u8]) -> Result<usize, FrameError> {
        let mut written = self.write_stream_identifier(dst)?;
        if !self.buffer.is_empty() {
            written +=
                emit_chunk(&mut self.compressor, &mut self.scratch, &self.buffer, &mut dst[written..])?;
            self.buffer.clear();
        }
        Ok(written)
    }

    fn write_stream_identifier(&mut self, dst: &mut [u8]) -> Result<usize, FrameError> {
        if self.wrote_stream_identifier {
            return Ok(0);
        }
        if dst.len() < STREAM_IDENTIFIER.len() {
            return Err(FrameError::OutputTooSmall);
        }
        dst[..STREAM_IDENTIFIER.len()].copy_from_slice(&STREAM_IDENTIFIER);
        self.wrote_stream_identifier = true;
        Ok(STREAM_IDENTIFIER.len())
    }

    fn emit_data_chunk(&mut self, block: &[u8], dst: &mut [u8]) -> Result<usize, FrameError> {
        emit_chunk(&mut self.compressor, &mut self.scratch, block, dst)
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Compress `block` and emit one data chunk: `[type][len24][crc32]` then
/// the payload.  Falls back to the uncompressed chunk type whenever
/// compression failed to shrink the block.
fn emit_chunk(
    compressor: &mut Compressor,
    scratch: &mut [u8],
    block: &[u8],
    dst: &mut [u8],
) -> Result<usize, FrameError> {
    debug_assert!(!block.is_empty() && block.len() <= BLOCK_SIZE);
    let crc = masked_crc32c(block);

    // The scratch buffer is bound-sized, so this cannot fail.
    let compressed_len = compressor
        .try_compress(block, scratch)
        .expect("scratch sized by max_compressed_length");

    let (chunk_type, payload): (u8, &[u8]) = if compressed_len < block.len() {
        (CHUNK_COMPRESSED, &scratch[..compressed_len])
    } else {
        (CHUNK_UNCOMPRESSED, block)
    };

    let total = CHUNK_OVERHEAD + payload.len();
    if dst.len() < total {
        return Err(FrameError::OutputTooSmall);
    }
    dst[0] = chunk_type;
    LittleEndian::write_u24(&mut dst[1..4], (CHUNK_CRC_SIZE + payload.len()) as u32);
    LittleEndian::write_u32(&mut dst[4..8], crc);
    dst[CHUNK_OVERHEAD..total].copy_from_slice(payload);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc32c;

    #[test]
    fn identifier_emitted_once() {
        let mut enc = FrameEncoder::new();
        let mut dst = vec![0u8; enc.write_bound(4)];
        let n = enc.write(b"abcd", &mut dst).unwrap();
        assert_eq!(&dst[..n], &STREAM_IDENTIFIER);
        let n2 = enc.write(b"efgh", &mut dst).unwrap();
        assert_eq!(n2, 0);
        // Nothing chunked yet: 8 bytes are still buffered.
        let n3 = enc.flush(&mut dst).unwrap();
        assert!(n3 > 0);
        assert_ne!(dst[0], 0xff);
    }

    /// Tiny blocks expand under compression, so the encoder must choose the
    /// uncompressed chunk type with the payload stored verbatim.
    #[test]
    fn incompressible_block_stored_raw() {
        let mut enc = FrameEncoder::new();
        let mut dst = vec![0u8; enc.write_bound(4)];
        let mut n = enc.write(b"abcd", &mut dst).unwrap();
        n += enc.flush(&mut dst[n..]).unwrap();

        let chunk = &dst[STREAM_IDENTIFIER.len()..n];
        assert_eq!(chunk[0], CHUNK_UNCOMPRESSED);
        assert_eq!(LittleEndian::read_u24(&chunk[1..4]), 4 + 4);
        assert_eq!(
            LittleEndian::read_u32(&chunk[4..8]),
            crc32c::masked_crc32c(b"abcd")
        );
        assert_eq!(&chunk[8..], b"abcd");
    }

    /// Repetitive blocks compress, so the chunk type flips and the payload
    /// is a valid Snappy block.
    #[test]
    fn compressible_block_stored_compressed() {
        let data = vec![0x61u8; 4096];
        let mut enc = FrameEncoder::new();
        let mut dst = vec![0u8; enc.write_bound(data.len())];
        let mut n = enc.write(&data, &mut dst).unwrap();
        n += enc.flush(&mut dst[n..]).unwrap();

        let chunk = &dst[STREAM_IDENTIFIER.len()..n];
        assert_eq!(chunk[0], CHUNK_COMPRESSED);
        let body_len = LittleEndian::read_u24(&chunk[1..4]) as usize;
        assert!(body_len < data.len());
        let payload = &chunk[8..4 + body_len];
        let mut out = vec![0u8; data.len()];
        let m = crate::block::decompress::decompress_block(payload, &mut out).unwrap();
        assert_eq!(&out[..m], &data[..]);
    }

    /// Inputs over a block are split; block boundaries fall every 64 KiB.
    #[test]
    fn multi_block_chunking() {
        let data = vec![0x42u8; BLOCK_SIZE + 100];
        let mut enc = FrameEncoder::new();
        let mut dst = vec![0u8; enc.write_bound(data.len())];
        let mut n = enc.write(&data, &mut dst).unwrap();
        n += enc.flush(&mut dst[n..]).unwrap();

        // Walk the chunks: identifier, then exactly two data chunks.
        let mut off = STREAM_IDENTIFIER.len();
        let mut kinds = Vec::new();
        while off < n {
            kinds.push(dst[off]);
            off += CHUNK_HEADER_SIZE + LittleEndian::read_u24(&dst[off + 1..off + 4]) as usize;
        }
        assert_eq!(off, n);
        assert_eq!(kinds.len(), 2);
        assert!(kinds.iter().all(|&k| k == CHUNK_COMPRESSED));
    }

    #[test]
    fn output_too_small_reported() {
        let mut enc = FrameEncoder::new();
        let mut tiny = [0u8; 4];
        assert_eq!(enc.write(b"abcd", &mut tiny), Err(FrameError::OutputTooSmall));
    }
}
