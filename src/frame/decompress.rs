//! Framed stream decompression.
//!
//! A resumable state machine over the chunked stream format: parse a chunk
//! header, demux on the chunk type, validate the masked CRC32C, and hand
//! the payload to the caller — through the block decompressor for
//! compressed chunks, via an internal staging buffer for uncompressed ones.
//! Skippable chunks (`0x80..=0xfe`) are discarded; reserved unskippable
//! types (`0x02..=0x7f`) are fatal; the first chunk of a stream must be the
//! stream identifier.
//!
//! Chunk payloads are validated *before* any byte reaches the caller: a
//! tampered checksum fails the whole chunk and yields nothing.
//!
//! Each state carries exactly the bytes-remaining / checksum context it
//! needs, so resuming after an arbitrary input split is a matter of
//! re-entering the `match`.

use byteorder::{ByteOrder, LittleEndian};

use crate::block::decompress::Decompressor;
use crate::block::types::BLOCK_SIZE;
use crate::crc32c;
use crate::frame::types::{
    FrameError, CHUNK_CRC_SIZE, CHUNK_HEADER_SIZE, CHUNK_COMPRESSED, CHUNK_STREAM_IDENTIFIER,
    CHUNK_UNCOMPRESSED, MAX_COMPRESSED_CHUNK_BODY, MAX_DATA_CHUNK_BODY, STREAM_IDENTIFIER_BODY,
};

// ─────────────────────────────────────────────────────────────────────────────
// Decode stages
// ─────────────────────────────────────────────────────────────────────────────

/// Where the decoder stands between two input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Accumulating a 4-byte chunk header.
    Header,
    /// Reading the 6-byte stream identifier body.
    StreamIdentifier { remaining: usize },
    /// Reading the masked CRC that opens a data chunk body.
    DataCrc { compressed: bool, body_remaining: usize },
    /// Feeding a compressed chunk body into the block decompressor.
    CompressedBody { body_remaining: usize, expected_crc: u32 },
    /// Staging an uncompressed chunk body while checksumming it.
    UncompressedBody { body_remaining: usize, expected_crc: u32, crc: u32 },
    /// Handing a validated payload to the caller.
    Drain { from_block: bool },
    /// Discarding a skippable chunk body.
    Skipping { remaining: usize },
    /// Poisoned by an earlier error; only `reset` recovers.
    Failed,
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameDecoder
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming decompressor for the framed format.
///
/// Call [`FrameDecoder::decompress`] with whatever input is on hand and
/// whatever output room is available; it returns `(consumed, written)` and
/// picks up exactly where it stopped.  See [`FrameEncoder`] for the
/// round-trip example.
///
/// [`FrameEncoder`]: crate::frame::FrameEncoder
pub struct FrameDecoder {
    stage: Stage,
    block: Decompressor,
    /// Staged body of the current uncompressed chunk.
    passthrough: Vec<u8>,
    passthrough_pos: usize,
    /// Accumulator for chunk headers, CRCs and the identifier body.
    scratch: [u8; 6],
    scratch_len: usize,
    seen_stream_identifier: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        let mut block = Decompressor::new();
        block.set_length_limit(BLOCK_SIZE as u32);
        FrameDecoder {
            stage: Stage::Header,
            block,
            passthrough: Vec::new(),
            passthrough_pos: 0,
            scratch: [0; 6],
            scratch_len: 0,
            seen_stream_identifier: false,
        }
    }

    /// Prepare for a new stream, keeping allocations.
    pub fn reset(&mut self) {
        self.stage = Stage::Header;
        self.block.reset();
        self.passthrough.clear();
        self.passthrough_pos = 0;
        self.scratch_len = 0;
        self.seen_stream_identifier = false;
    }

    /// True when the decoder sits cleanly between chunks — the only place a
    /// stream may legally end.
    pub fn is_at_chunk_boundary(&self) -> bool {
        self.stage == Stage::Header && self.scratch_len == 0
    }

    /// Consume bytes from `src` and produce bytes into `dst`.
    ///
    /// Returns `(consumed, written)`.  The call returns as soon as input is
    /// exhausted or output is full; both sides resume on the next call.  Any
    /// error poisons the stream: further calls fail with
    /// [`FrameError::Failed`] until [`FrameDecoder::reset`].
    pub fn decompress(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
    ) -> Result<(usize, usize), FrameError> {
        let mut consumed = 0usize;
        let mut written = 0usize;

        loop {
            match self.stage {
                Stage::Failed => return Err(FrameError::Failed),

                Stage::Header => {
                    if !self.fill_scratch(CHUNK_HEADER_SIZE, src, &mut consumed) {
                        return Ok((consumed, written));
                    }
                    self.scratch_len = 0;
                    let chunk_type = self.scratch[0];
                    let body_len = LittleEndian::read_u24(&self.scratch[1..4]) as usize;
                    if !self.seen_stream_identifier && chunk_type != CHUNK_STREAM_IDENTIFIER {
                        return self.fail(FrameError::BadStreamIdentifier);
                    }
                    self.stage = match chunk_type {
                        CHUNK_STREAM_IDENTIFIER => {
                            if body_len != STREAM_IDENTIFIER_BODY.len() {
                                return self.fail(FrameError::BadStreamIdentifier);
                            }
                            Stage::StreamIdentifier {
                                remaining: body_len,
                            }
                        }
                        CHUNK_COMPRESSED => {
                            if body_len <= CHUNK_CRC_SIZE || body_len > MAX_COMPRESSED_CHUNK_BODY {
                                return self.fail(FrameError::BadChunkLength);
                            }
                            self.block.reset();
                            Stage::DataCrc {
                                compressed: true,
                                body_remaining: body_len - CHUNK_CRC_SIZE,
                            }
                        }
                        CHUNK_UNCOMPRESSED => {
                            if body_len < CHUNK_CRC_SIZE || body_len > MAX_DATA_CHUNK_BODY {
                                return self.fail(FrameError::BadChunkLength);
                            }
                            self.passthrough.clear();
                            self.passthrough_pos = 0;
                            Stage::DataCrc {
                                compressed: false,
                                body_remaining: body_len - CHUNK_CRC_SIZE,
                            }
                        }
                        0x02..=0x7f => {
                            return self.fail(FrameError::UnsupportedChunkType(chunk_type))
                        }
                        // 0x80..=0xfe: reserved skippable, incl. padding.
                        _ => Stage::Skipping {
                            remaining: body_len,
                        },
                    };
                }

                Stage::StreamIdentifier { remaining } => {
                    let have = STREAM_IDENTIFIER_BODY.len() - remaining;
                    let take = remaining.min(src.len() - consumed);
                    self.scratch[have..have + take]
                        .copy_from_slice(&src[consumed..consumed + take]);
                    consumed += take;
                    if take < remaining {
                        self.stage = Stage::StreamIdentifier {
                            remaining: remaining - take,
                        };
                        return Ok((consumed, written));
                    }
                    if self.scratch != STREAM_IDENTIFIER_BODY {
                        return self.fail(FrameError::BadStreamIdentifier);
                    }
                    self.seen_stream_identifier = true;
                    self.stage = Stage::Header;
                }

                Stage::DataCrc {
                    compressed,
                    body_remaining,
                } => {
                    if !self.fill_scratch(CHUNK_CRC_SIZE, src, &mut consumed) {
                        return Ok((consumed, written));
                    }
                    self.scratch_len = 0;
                    let expected_crc = LittleEndian::read_u32(&self.scratch[..4]);
                    self.stage = if compressed {
                        Stage::CompressedBody {
                            body_remaining,
                            expected_crc,
                        }
                    } else {
                        Stage::UncompressedBody {
                            body_remaining,
                            expected_crc,
                            crc: 0,
                        }
                    };
                }

                Stage::CompressedBody {
                    body_remaining,
                    expected_crc,
                } => {
                    let take = body_remaining.min(src.len() - consumed);
                    if take > 0 {
                        if let Err(e) = self.block.decompress(&src[consumed..consumed + take]) {
                            return self.fail(e.into());
                        }
                        consumed += take;
                    }
                    if take < body_remaining {
                        self.stage = Stage::CompressedBody {
                            body_remaining: body_remaining - take,
                            expected_crc,
                        };
                        return Ok((consumed, written));
                    }
                    // The whole body has been fed; the block must be exactly
                    // done, and its output must match the stored checksum
                    // before a single byte is released.
                    if !self.block.all_data_decompressed() || self.block.has_partial_state() {
                        return self.fail(FrameError::Block(
                            crate::block::decompress::DecompressError::InvalidData,
                        ));
                    }
                    if crc32c::masked_crc32c(self.block.output()) != expected_crc {
                        return self.fail(FrameError::ChecksumMismatch);
                    }
                    self.stage = Stage::Drain { from_block: true };
                }

                Stage::UncompressedBody {
                    body_remaining,
                    expected_crc,
                    crc,
                } => {
                    let take = body_remaining.min(src.len() - consumed);
                    let bytes = &src[consumed..consumed + take];
                    let crc = crc32c::append(crc, bytes);
                    self.passthrough.extend_from_slice(bytes);
                    consumed += take;
                    if take < body_remaining {
                        self.stage = Stage::UncompressedBody {
                            body_remaining: body_remaining - take,
                            expected_crc,
                            crc,
                        };
                        return Ok((consumed, written));
                    }
                    if crc32c::mask(crc) != expected_crc {
                        return self.fail(FrameError::ChecksumMismatch);
                    }
                    self.stage = Stage::Drain { from_block: false };
                }

                Stage::Drain { from_block } => {
                    if from_block {
                        written += self.block.read(&mut dst[written..]);
                        if self.block.unread_len() > 0 {
                            return Ok((consumed, written));
                        }
                    } else {
                        let avail = self.passthrough.len() - self.passthrough_pos;
                        let n = avail.min(dst.len() - written);
                        dst[written..written + n].copy_from_slice(
                            &self.passthrough[self.passthrough_pos..self.passthrough_pos + n],
                        );
                        written += n;
                        self.passthrough_pos += n;
                        if self.passthrough_pos < self.passthrough.len() {
                            return Ok((consumed, written));
                        }
                    }
                    self.stage = Stage::Header;
                }

                Stage::Skipping { remaining } => {
                    let take = remaining.min(src.len() - consumed);
                    consumed += take;
                    if take < remaining {
                        self.stage = Stage::Skipping {
                            remaining: remaining - take,
                        };
                        return Ok((consumed, written));
                    }
                    self.stage = Stage::Header;
                }
            }
        }
    }

    /// Accumulate up to `need` bytes in `scratch`; true once complete.
    fn fill_scratch(&mut self, need: usize, src: &[u8], consumed: &mut usize) -> bool {
        let take = (need - self.scratch_len).min(src.len() - *consumed);
        self.scratch[self.scratch_len..self.scratch_len + take]
            .copy_from_slice(&src[*consumed..*consumed + take]);
        self.scratch_len += take;
        *consumed += take;
        self.scratch_len == need
    }

    fn fail<T>(&mut self, e: FrameError) -> Result<T, FrameError> {
        self.stage = Stage::Failed;
        Err(e)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::compress::FrameEncoder;
    use crate::frame::types::STREAM_IDENTIFIER;

    fn encode(data: &[u8]) -> Vec<u8> {
        let mut enc = FrameEncoder::new();
        let mut out = vec![0u8; enc.write_bound(data.len())];
        let mut n = enc.write(data, &mut out).unwrap();
        n += enc.flush(&mut out[n..]).unwrap();
        out.truncate(n);
        out
    }

    fn decode_all(stream: &[u8]) -> Result<Vec<u8>, FrameError> {
        let mut dec = FrameDecoder::new();
        let mut out = Vec::new();
        let mut buf = [0u8; 997];
        let mut off = 0;
        loop {
            let (c, w) = dec.decompress(&stream[off..], &mut buf)?;
            off += c;
            out.extend_from_slice(&buf[..w]);
            if c == 0 && w == 0 {
                assert!(dec.is_at_chunk_boundary(), "stream ended mid-chunk");
                return Ok(out);
            }
        }
    }

    #[test]
    fn empty_stream_roundtrip() {
        let stream = encode(b"");
        assert_eq!(stream, STREAM_IDENTIFIER);
        assert_eq!(decode_all(&stream).unwrap(), b"");
    }

    #[test]
    fn basic_roundtrip() {
        let data = b"chunked streams carry their own checksums".repeat(50);
        assert_eq!(decode_all(&encode(&data)).unwrap(), data);
    }

    #[test]
    fn stream_must_open_with_identifier() {
        // A bare data chunk with no identifier in front.
        let mut stream = encode(b"payload");
        stream.drain(..STREAM_IDENTIFIER.len());
        assert_eq!(
            decode_all(&stream),
            Err(FrameError::BadStreamIdentifier)
        );
    }

    #[test]
    fn wrong_magic_rejected() {
        let mut stream = encode(b"payload");
        stream[4] = b'x';
        assert_eq!(decode_all(&stream), Err(FrameError::BadStreamIdentifier));
    }

    #[test]
    fn reserved_unskippable_is_fatal() {
        let mut stream = Vec::from(STREAM_IDENTIFIER);
        stream.extend_from_slice(&[0x42, 0x01, 0x00, 0x00, 0xaa]);
        assert_eq!(decode_all(&stream), Err(FrameError::UnsupportedChunkType(0x42)));
    }

    #[test]
    fn skippable_chunks_are_skipped() {
        let payload = b"real data after padding";
        let encoded = encode(payload);
        let mut stream = Vec::from(&encoded[..STREAM_IDENTIFIER.len()]);
        // Padding chunk, then a skippable chunk, then the data chunks.
        stream.extend_from_slice(&[0xfe, 0x03, 0x00, 0x00, 1, 2, 3]);
        stream.extend_from_slice(&[0x80, 0x02, 0x00, 0x00, 9, 9]);
        stream.extend_from_slice(&encoded[STREAM_IDENTIFIER.len()..]);
        assert_eq!(decode_all(&stream).unwrap(), payload);
    }

    #[test]
    fn crc_tampering_detected_and_sticky() {
        let stream = {
            let mut s = encode(b"checksummed payload");
            // Flip one bit of the chunk CRC (byte 4 of the data chunk body).
            s[STREAM_IDENTIFIER.len() + 4] ^= 0x01;
            s
        };
        let mut dec = FrameDecoder::new();
        let mut out = [0u8; 256];
        assert_eq!(
            dec.decompress(&stream, &mut out),
            Err(FrameError::ChecksumMismatch)
        );
        // Poisoned until reset.
        assert_eq!(dec.decompress(&[], &mut out), Err(FrameError::Failed));
        dec.reset();
        let good = encode(b"checksummed payload");
        let (c, w) = dec.decompress(&good, &mut out).unwrap();
        assert_eq!(c, good.len());
        assert_eq!(&out[..w], b"checksummed payload");
    }

    #[test]
    fn one_byte_at_a_time_both_sides() {
        let data = b"tiny output buffers and tiny input slices must both resume".repeat(20);
        let stream = encode(&data);
        let mut dec = FrameDecoder::new();
        let mut out = Vec::new();
        let mut hole = [0u8; 1];
        let mut off = 0;
        loop {
            let src: &[u8] = if off < stream.len() {
                &stream[off..off + 1]
            } else {
                &[]
            };
            let (c, w) = dec.decompress(src, &mut hole).unwrap();
            off += c;
            out.extend_from_slice(&hole[..w]);
            if off >= stream.len() && w == 0 {
                break;
            }
        }
        assert_eq!(out, data);
        assert!(dec.is_at_chunk_boundary());
    }
}
