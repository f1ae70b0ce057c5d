//! Snappy block decompression.
//!
//! A streaming tag interpreter: reads the varint length prefix, then walks
//! the literal/copy tag stream, reconstructing output in a lookback buffer
//! so back-references can resolve.  Input may arrive in arbitrary slices —
//! even one byte at a time — so every piece of parser state is resumable:
//!
//!   - the varint prefix accumulates across calls (`length_shift` /
//!     `length_partial`);
//!   - a tag header straddling two input slices is carried in a 5-byte
//!     scratch buffer;
//!   - a literal body straddling two slices is tracked by
//!     `remaining_literal`.
//!
//! # Security boundary
//!
//! This is the security-critical decode path.  Malformed input — a copy
//! offset of zero or past the produced bytes, a length prefix that
//! overflows, a tag stream that overruns the advertised length — must
//! return [`DecompressError::InvalidData`], never panic or touch memory out
//! of bounds.  All `unsafe` blocks carry explicit bounds reasoning.

use core::fmt;
use core::ptr;

use super::types::{
    copy128, entry_length, entry_offset_partial, entry_trailer_bytes, incremental_copy, load32,
    CHAR_TABLE, MAX_TAG_LENGTH, TAG_LITERAL, TRAILER_MASKS,
};
use crate::varint::{read_varint32, Varint32};

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by block decompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressError {
    /// The compressed data is malformed or truncated: bad varint, copy
    /// offset of zero or beyond the produced output, tag stream overrunning
    /// the advertised length, or trailing garbage.
    InvalidData,
    /// The destination buffer is smaller than the advertised uncompressed
    /// length.  Recoverable: retry with `uncompressed_length` bytes.
    OutputTooSmall,
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompressError::InvalidData => f.write_str("malformed snappy block"),
            DecompressError::OutputTooSmall => f.write_str("output buffer too small"),
        }
    }
}

impl std::error::Error for DecompressError {}

#[inline(always)]
fn invalid<T>() -> Result<T, DecompressError> {
    Err(DecompressError::InvalidData)
}

// ─────────────────────────────────────────────────────────────────────────────
// Length prefix
// ─────────────────────────────────────────────────────────────────────────────

/// Read the uncompressed length from the front of a compressed block.
///
/// Fails with [`DecompressError::InvalidData`] when the varint is truncated
/// or encodes more than 32 bits.
pub fn uncompressed_length(input: &[u8]) -> Result<u32, DecompressError> {
    match read_varint32(input) {
        Varint32::Done(value, _) => Ok(value),
        _ => invalid(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tag decoder — the resumable core shared by one-shot and streaming paths
// ─────────────────────────────────────────────────────────────────────────────

/// Resumable tag-stream state: a partial tag header carried across input
/// boundaries, and the unwritten tail of a straddling literal.
struct TagDecoder {
    scratch: [u8; MAX_TAG_LENGTH],
    scratch_len: usize,
    remaining_literal: usize,
}

/// Header size implied by a tag byte: the tag itself plus its trailer
/// (copy offsets, or long-literal length bytes).
#[inline(always)]
fn tag_header_size(c: u8) -> usize {
    if c & 3 == TAG_LITERAL {
        let field = (c >> 2) as usize;
        if field < 60 {
            1
        } else {
            field - 58 // 1 + (field - 59) trailing length bytes
        }
    } else {
        1 + entry_trailer_bytes(CHAR_TABLE[c as usize])
    }
}

impl TagDecoder {
    const fn new() -> Self {
        TagDecoder {
            scratch: [0; MAX_TAG_LENGTH],
            scratch_len: 0,
            remaining_literal: 0,
        }
    }

    fn reset(&mut self) {
        self.scratch_len = 0;
        self.remaining_literal = 0;
    }

    /// True when a partial tag header is waiting for more input.
    fn has_partial_tag(&self) -> bool {
        self.scratch_len != 0
    }

    /// Resolve a back-reference: validate the offset against the bytes
    /// produced so far, then run the self-copy engine.
    ///
    /// # Safety
    /// `out` must be writable for `cap` bytes and `*pos <= cap`.
    #[inline(always)]
    unsafe fn copy_from_lookback(
        out: *mut u8,
        cap: usize,
        pos: &mut usize,
        offset: usize,
        length: usize,
    ) -> Result<(), DecompressError> {
        if offset == 0 || offset > *pos {
            return invalid();
        }
        if length > cap - *pos {
            return invalid();
        }
        let op = out.add(*pos);
        // SAFETY: offset <= *pos keeps src inside the written prefix; the
        // engine may overshoot op_end but never buf_end = out + cap.
        incremental_copy(op.sub(offset), op, op.add(length), out.add(cap));
        *pos += length;
        Ok(())
    }

    /// Apply one complete non-short-literal tag header.
    ///
    /// Copy tags perform their copy and return 0; long-literal headers
    /// return the body length for the caller to drain from the input.
    ///
    /// # Safety
    /// `header` holds the full `tag_header_size(header[0])` bytes; `out`
    /// writable for `cap` bytes.
    unsafe fn apply_header(
        header: &[u8; 8],
        out: *mut u8,
        cap: usize,
        pos: &mut usize,
    ) -> Result<usize, DecompressError> {
        let c = header[0];
        let trailer = u32::from_le_bytes(header[1..5].try_into().unwrap());
        if c & 3 == TAG_LITERAL {
            let extra = (c >> 2) as usize - 59;
            let literal_len = (trailer & TRAILER_MASKS[extra]) as usize + 1;
            Ok(literal_len)
        } else {
            let entry = CHAR_TABLE[c as usize];
            let trailer = trailer & TRAILER_MASKS[entry_trailer_bytes(entry)];
            let offset = (entry_offset_partial(entry) + trailer) as usize;
            Self::copy_from_lookback(out, cap, pos, offset, entry_length(entry))?;
            Ok(0)
        }
    }

    /// Decode tags from `input` into `out[..cap]` at `*pos`, consuming the
    /// entire slice.  Parser state is saved whenever the input ends inside
    /// a tag or a literal body.
    ///
    /// # Safety
    /// `out` writable for `cap` bytes; `*pos <= cap`.
    unsafe fn decode_tags(
        &mut self,
        input: &[u8],
        out: *mut u8,
        cap: usize,
        pos: &mut usize,
    ) -> Result<(), DecompressError> {
        let mut ip = input.as_ptr();
        let input_end = ip.add(input.len());

        // ── Resume: complete a tag header carried from the previous slice ────
        if self.scratch_len > 0 {
            let needed = tag_header_size(self.scratch[0]);
            let take = (needed - self.scratch_len).min(input.len());
            self.scratch[self.scratch_len..self.scratch_len + take]
                .copy_from_slice(&input[..take]);
            self.scratch_len += take;
            ip = ip.add(take);
            if self.scratch_len < needed {
                return Ok(());
            }
            let mut header = [0u8; 8];
            header[..MAX_TAG_LENGTH].copy_from_slice(&self.scratch);
            self.scratch_len = 0;
            self.remaining_literal = Self::apply_header(&header, out, cap, pos)?;
        }

        // ── Resume: drain a literal body split across slices ─────────────────
        if self.remaining_literal > 0 {
            let avail = input_end as usize - ip as usize;
            let take = self.remaining_literal.min(avail);
            if take > cap - *pos {
                return invalid();
            }
            ptr::copy_nonoverlapping(ip, out.add(*pos), take);
            *pos += take;
            ip = ip.add(take);
            self.remaining_literal -= take;
            if self.remaining_literal > 0 {
                return Ok(());
            }
        }

        // ── Hot loop: while a worst-case trailer is prefetchable ─────────────
        // Up to MAX_TAG_LENGTH - 1 trailing bytes are left to the tail loop,
        // so a 4-byte read past the tag byte is always in bounds here.
        let margin = (input_end as usize - ip as usize).min(MAX_TAG_LENGTH - 1);
        let input_limit = input_end.sub(margin);

        while (ip as usize) < input_limit as usize {
            let c = *ip;
            ip = ip.add(1);

            if c & 3 == TAG_LITERAL {
                let mut literal_len = (c >> 2) as usize + 1;
                // Short literal with slack on both sides: one wide store.
                if literal_len <= 16
                    && input_end as usize - ip as usize >= 16
                    && cap - *pos >= 16
                {
                    copy128(ip, out.add(*pos));
                    ip = ip.add(literal_len);
                    *pos += literal_len;
                    continue;
                }
                if literal_len > 60 {
                    // 1..=4 little-endian length bytes; ip + 4 <= input_end
                    // holds because ip was below input_limit.
                    let extra = literal_len - 60;
                    literal_len = (load32(ip) & TRAILER_MASKS[extra]) as usize + 1;
                    ip = ip.add(extra);
                }
                let avail = input_end as usize - ip as usize;
                let take = literal_len.min(avail);
                if take > cap - *pos {
                    return invalid();
                }
                ptr::copy_nonoverlapping(ip, out.add(*pos), take);
                *pos += take;
                ip = ip.add(take);
                if take < literal_len {
                    self.remaining_literal = literal_len - take;
                    return Ok(());
                }
                continue;
            }

            // Copy tag: the table gives trailer width, length and the high
            // offset bits; one masked u32 read covers all three classes,
            // Copy4 included.
            let entry = CHAR_TABLE[c as usize];
            let trailer_bytes = entry_trailer_bytes(entry);
            let trailer = load32(ip) & TRAILER_MASKS[trailer_bytes];
            ip = ip.add(trailer_bytes);
            let offset = (entry_offset_partial(entry) + trailer) as usize;
            Self::copy_from_lookback(out, cap, pos, offset, entry_length(entry))?;
        }

        // ── Tail: under MAX_TAG_LENGTH bytes left; no wide reads ─────────────
        while (ip as usize) < input_end as usize {
            let c = *ip;
            if c & 3 == TAG_LITERAL && (c >> 2) < 60 {
                let literal_len = (c >> 2) as usize + 1;
                ip = ip.add(1);
                let avail = input_end as usize - ip as usize;
                let take = literal_len.min(avail);
                if take > cap - *pos {
                    return invalid();
                }
                ptr::copy_nonoverlapping(ip, out.add(*pos), take);
                *pos += take;
                ip = ip.add(take);
                if take < literal_len {
                    self.remaining_literal = literal_len - take;
                    return Ok(());
                }
                continue;
            }

            let needed = tag_header_size(c);
            let remaining = input_end as usize - ip as usize;
            if remaining < needed {
                // Stash the partial header for the next slice.
                let rest = core::slice::from_raw_parts(ip, remaining);
                self.scratch[..remaining].copy_from_slice(rest);
                self.scratch_len = remaining;
                return Ok(());
            }
            let mut header = [0u8; 8];
            header[..needed].copy_from_slice(core::slice::from_raw_parts(ip, needed));
            ip = ip.add(needed);
            let literal_len = Self::apply_header(&header, out, cap, pos)?;
            if literal_len > 0 {
                let avail = input_end as usize - ip as usize;
                let take = literal_len.min(avail);
                if take > cap - *pos {
                    return invalid();
                }
                ptr::copy_nonoverlapping(ip, out.add(*pos), take);
                *pos += take;
                ip = ip.add(take);
                if take < literal_len {
                    self.remaining_literal = literal_len - take;
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming decompressor instance
// ─────────────────────────────────────────────────────────────────────────────

/// Resumable block decompressor.
///
/// Feed compressed bytes with [`Decompressor::decompress`] in slices of any
/// size; drain output with [`Decompressor::read`].  The first bytes fed are
/// the varint length prefix, which sizes the lookback buffer; the buffer
/// holds everything produced so far so back-references always resolve.
///
/// ```
/// use snappy::block::{compress_block, max_compressed_length, Decompressor};
///
/// let data = b"to be or not to be, to be or not to be";
/// let mut buf = vec![0u8; max_compressed_length(data.len())];
/// let n = compress_block(data, &mut buf).unwrap();
///
/// let mut d = Decompressor::new();
/// for byte in &buf[..n] {
///     d.decompress(core::slice::from_ref(byte)).unwrap();
/// }
/// assert!(d.all_data_decompressed());
/// let mut out = vec![0u8; data.len()];
/// assert_eq!(d.read(&mut out), data.len());
/// assert_eq!(&out, data);
/// ```
pub struct Decompressor {
    tags: TagDecoder,
    /// Advertised uncompressed length; meaningful once `length_known`.
    expected_length: u32,
    length_known: bool,
    /// Resumable varint prefix accumulation.
    length_shift: u32,
    length_partial: u32,
    /// Advertised lengths above this are rejected before allocating.
    length_limit: u32,
    /// All bytes produced so far; back-references index into this.
    lookback: Vec<u8>,
    lookback_pos: usize,
    read_pos: usize,
}

impl Decompressor {
    pub fn new() -> Self {
        Decompressor {
            tags: TagDecoder::new(),
            expected_length: 0,
            length_known: false,
            length_shift: 0,
            length_partial: 0,
            length_limit: u32::MAX,
            lookback: Vec::new(),
            lookback_pos: 0,
            read_pos: 0,
        }
    }

    /// Reject blocks advertising more than `limit` bytes.  The stream
    /// decompressor caps chunks at the block size this way, so a forged
    /// length prefix cannot force a huge allocation.
    pub(crate) fn set_length_limit(&mut self, limit: u32) {
        self.length_limit = limit;
    }

    /// Prepare the instance for a new block, keeping allocations.
    pub fn reset(&mut self) {
        self.tags.reset();
        self.expected_length = 0;
        self.length_known = false;
        self.length_shift = 0;
        self.length_partial = 0;
        self.lookback_pos = 0;
        self.read_pos = 0;
    }

    /// Consume one slice of compressed input, appending decoded bytes to
    /// the internal buffer.
    pub fn decompress(&mut self, mut input: &[u8]) -> Result<(), DecompressError> {
        if !self.length_known {
            input = self.take_length_prefix(input)?;
            if !self.length_known {
                return Ok(());
            }
        }
        if input.is_empty() {
            return Ok(());
        }
        if self.all_data_decompressed() {
            // Data past the advertised length is not a valid block.
            return invalid();
        }
        let cap = self.expected_length as usize;
        let mut pos = self.lookback_pos;
        // SAFETY: lookback was sized to `cap` when the prefix completed, and
        // pos tracks the written prefix.
        let result = unsafe {
            self.tags
                .decode_tags(input, self.lookback.as_mut_ptr(), cap, &mut pos)
        };
        self.lookback_pos = pos;
        result
    }

    /// True once the advertised number of bytes has been produced.
    pub fn all_data_decompressed(&self) -> bool {
        self.length_known && self.lookback_pos == self.expected_length as usize
    }

    /// Move decoded bytes out to `dst`; returns how many were copied.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.lookback_pos - self.read_pos);
        dst[..n].copy_from_slice(&self.lookback[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        n
    }

    /// Bytes decoded so far (read or not).
    pub(crate) fn output(&self) -> &[u8] {
        &self.lookback[..self.lookback_pos]
    }

    /// Decoded bytes not yet drained by [`Decompressor::read`].
    pub(crate) fn unread_len(&self) -> usize {
        self.lookback_pos - self.read_pos
    }

    /// True when the input stopped mid-tag and more bytes are required.
    pub(crate) fn has_partial_state(&self) -> bool {
        !self.length_known || self.tags.has_partial_tag() || self.tags.remaining_literal != 0
    }

    /// Accumulate varint prefix bytes; returns the unconsumed remainder.
    fn take_length_prefix<'a>(&mut self, input: &'a [u8]) -> Result<&'a [u8], DecompressError> {
        for (i, &b) in input.iter().enumerate() {
            if self.length_shift > 28 || (self.length_shift == 28 && b > 0x0f) {
                return invalid();
            }
            self.length_partial |= ((b & 0x7f) as u32) << self.length_shift;
            if b & 0x80 == 0 {
                if self.length_partial > self.length_limit {
                    return invalid();
                }
                self.expected_length = self.length_partial;
                self.length_known = true;
                self.lookback.clear();
                self.lookback.resize(self.expected_length as usize, 0);
                return Ok(&input[i + 1..]);
            }
            self.length_shift += 7;
        }
        Ok(&[])
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// One-shot API
// ─────────────────────────────────────────────────────────────────────────────

/// Decompress a complete block into `output`.
///
/// `output` must hold at least [`uncompressed_length`]`(input)` bytes;
/// returns the number of bytes written.  Decoding goes straight into the
/// caller's buffer — the advertised length bounds every write, so bytes of
/// `output` beyond it are never touched.
pub fn decompress_block(input: &[u8], output: &mut [u8]) -> Result<usize, DecompressError> {
    let (length, prefix) = match read_varint32(input) {
        Varint32::Done(v, n) => (v as usize, n),
        _ => return invalid(),
    };
    if output.len() < length {
        return Err(DecompressError::OutputTooSmall);
    }
    let mut tags = TagDecoder::new();
    let mut pos = 0usize;
    // SAFETY: output holds at least `length` writable bytes.
    unsafe { tags.decode_tags(&input[prefix..], output.as_mut_ptr(), length, &mut pos)? };
    if pos != length || tags.has_partial_tag() || tags.remaining_literal != 0 {
        // Truncated tag stream, or one that stopped short of its length.
        return invalid();
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::compress::{compress_block, max_compressed_length};

    fn decompress_vec(input: &[u8]) -> Result<Vec<u8>, DecompressError> {
        let len = uncompressed_length(input)? as usize;
        let mut out = vec![0u8; len];
        let n = decompress_block(input, &mut out)?;
        out.truncate(n);
        Ok(out)
    }

    #[test]
    fn empty_block() {
        assert_eq!(decompress_vec(&[0x00]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn single_byte_block() {
        assert_eq!(decompress_vec(&[0x01, 0x00, 0x41]).unwrap(), b"A");
    }

    /// Length 9, offset 1: the self-copy engine must replicate the single
    /// seed byte into ten.
    #[test]
    fn run_length_self_copy() {
        assert_eq!(
            decompress_vec(&[0x0a, 0x00, 0x61, 0x15, 0x01]).unwrap(),
            vec![0x61; 10]
        );
    }

    /// Copy4 is never emitted by the compressor but must decode.
    #[test]
    fn copy4_accepted() {
        // Literal "ab", then Copy4 of length 2 at offset 2 (4-byte LE).
        let block = [0x04, 0x04, 0x61, 0x62, 0x07, 0x02, 0x00, 0x00, 0x00];
        assert_eq!(decompress_vec(&block).unwrap(), b"abab");
    }

    #[test]
    fn rejects_bad_offsets() {
        // Copy1 with offset 0.
        assert_eq!(
            decompress_vec(&[0x05, 0x00, 0x61, 0x05, 0x00]),
            Err(DecompressError::InvalidData)
        );
        // Copy1 with offset 2 after a single produced byte.
        assert_eq!(
            decompress_vec(&[0x05, 0x00, 0x61, 0x05, 0x02]),
            Err(DecompressError::InvalidData)
        );
    }

    #[test]
    fn rejects_overlong_and_truncated() {
        // Literal of 4 claims but block advertises 2 bytes.
        assert_eq!(
            decompress_vec(&[0x02, 0x0c, 0x61, 0x62, 0x63, 0x64]),
            Err(DecompressError::InvalidData)
        );
        // Advertises 3 bytes but the stream stops after 1.
        assert_eq!(
            decompress_vec(&[0x03, 0x00, 0x61]),
            Err(DecompressError::InvalidData)
        );
        // Varint runs past five bytes.
        assert_eq!(
            uncompressed_length(&[0xff, 0xff, 0xff, 0xff, 0xff]),
            Err(DecompressError::InvalidData)
        );
    }

    #[test]
    fn output_too_small_is_distinct() {
        let mut out = [0u8; 1];
        assert_eq!(
            decompress_block(&[0x0a, 0x00, 0x61, 0x15, 0x01], &mut out),
            Err(DecompressError::OutputTooSmall)
        );
    }

    /// Long literal headers (61..=64) decode through the 4-byte trailer read.
    #[test]
    fn long_literal_roundtrip() {
        for len in [61usize, 100, 256, 5000, 70_000] {
            let data: Vec<u8> = (0..len).map(|i| (i * 13 % 251) as u8).collect();
            let mut buf = vec![0u8; max_compressed_length(len)];
            let n = compress_block(&data, &mut buf).unwrap();
            assert_eq!(decompress_vec(&buf[..n]).unwrap(), data);
        }
    }

    /// Feeding a block byte-by-byte must match the one-shot result, which
    /// exercises every scratch / remaining-literal resume path.
    #[test]
    fn byte_at_a_time_matches_oneshot() {
        let mut data = Vec::new();
        for i in 0..3000u32 {
            data.extend_from_slice(format!("item-{} ", i % 97).as_bytes());
        }
        let mut buf = vec![0u8; max_compressed_length(data.len())];
        let n = compress_block(&data, &mut buf).unwrap();

        let mut d = Decompressor::new();
        for b in &buf[..n] {
            d.decompress(core::slice::from_ref(b)).unwrap();
        }
        assert!(d.all_data_decompressed());
        assert!(!d.has_partial_state());
        let mut out = vec![0u8; data.len()];
        assert_eq!(d.read(&mut out), data.len());
        assert_eq!(out, data);
    }

    #[test]
    fn decompressor_reset_reuses_buffers() {
        let mut d = Decompressor::new();
        d.decompress(&[0x01, 0x00, 0x41]).unwrap();
        assert!(d.all_data_decompressed());
        d.reset();
        d.decompress(&[0x0a, 0x00, 0x61, 0x15, 0x01]).unwrap();
        assert!(d.all_data_decompressed());
        let mut out = [0u8; 10];
        assert_eq!(d.read(&mut out), 10);
        assert_eq!(out, [0x61; 10]);
    }

    #[test]
    fn trailing_garbage_rejected() {
        let mut d = Decompressor::new();
        d.decompress(&[0x01, 0x00, 0x41]).unwrap();
        assert_eq!(d.decompress(&[0x00]), Err(DecompressError::InvalidData));
    }
}
