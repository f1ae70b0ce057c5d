//! E2E Test Suite 03: Framed Stream One-Shot
//!
//! Validates the framed format end to end with whole-buffer calls:
//! - stream identifier emission and chunk layout
//! - compressed vs uncompressed chunk-type selection
//! - masked CRC32C on both chunk kinds
//! - round-trips from empty streams to multi-chunk payloads

extern crate snappy;

use snappy::frame::types::{
    CHUNK_COMPRESSED, CHUNK_HEADER_SIZE, CHUNK_UNCOMPRESSED, STREAM_IDENTIFIER,
};
use snappy::{FrameDecoder, FrameEncoder, BLOCK_SIZE};

fn random_bytes(mut seed: u64, len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 8);
    while out.len() < len {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        out.extend_from_slice(&seed.to_le_bytes());
    }
    out.truncate(len);
    out
}

fn encode(data: &[u8]) -> Vec<u8> {
    let mut enc = FrameEncoder::new();
    let mut out = vec![0u8; enc.write_bound(data.len())];
    let mut n = enc.write(data, &mut out).unwrap();
    n += enc.flush(&mut out[n..]).unwrap();
    out.truncate(n);
    out
}

fn decode(stream: &[u8]) -> Vec<u8> {
    let mut dec = FrameDecoder::new();
    let mut out = Vec::new();
    let mut buf = [0u8; 8192];
    let mut off = 0;
    loop {
        let (c, w) = dec.decompress(&stream[off..], &mut buf).unwrap();
        off += c;
        out.extend_from_slice(&buf[..w]);
        if c == 0 && w == 0 {
            assert_eq!(off, stream.len(), "stream not fully consumed");
            assert!(dec.is_at_chunk_boundary(), "stream ended mid-chunk");
            return out;
        }
    }
}

/// Chunk types in stream order, skipping the identifier.
fn chunk_types(stream: &[u8]) -> Vec<u8> {
    let mut types = Vec::new();
    let mut off = STREAM_IDENTIFIER.len();
    while off < stream.len() {
        types.push(stream[off]);
        let body = u32::from_le_bytes([stream[off + 1], stream[off + 2], stream[off + 3], 0]);
        off += CHUNK_HEADER_SIZE + body as usize;
    }
    assert_eq!(off, stream.len());
    types
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: stream layout
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_stream_opens_with_identifier() {
    let stream = encode(b"hello framed world");
    assert_eq!(&stream[..10], &STREAM_IDENTIFIER);
}

#[test]
fn test_empty_stream_is_identifier_only() {
    let stream = encode(b"");
    assert_eq!(stream, STREAM_IDENTIFIER);
    assert_eq!(decode(&stream), b"");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: chunk-type selection
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_compressible_data_uses_compressed_chunks() {
    let data = b"again and again and again and ".repeat(1000);
    let stream = encode(&data);
    assert!(chunk_types(&stream)
        .iter()
        .all(|&t| t == CHUNK_COMPRESSED));
    assert!(stream.len() < data.len());
    assert_eq!(decode(&stream), data);
}

/// A full block of pseudo-random bytes cannot shrink, so the encoder must
/// emit chunk type 0x01 and the decoder must still validate its masked CRC.
#[test]
fn test_incompressible_block_stored_uncompressed() {
    let data = random_bytes(0x0123_4567_89ab_cdef, BLOCK_SIZE);
    let stream = encode(&data);
    assert_eq!(chunk_types(&stream), vec![CHUNK_UNCOMPRESSED]);
    // 10 identifier + 4 header + 4 CRC + raw payload.
    assert_eq!(stream.len(), 10 + 4 + 4 + BLOCK_SIZE);
    assert_eq!(decode(&stream), data);
}

#[test]
fn test_mixed_chunk_kinds_in_one_stream() {
    let mut data = random_bytes(11, BLOCK_SIZE);
    data.extend_from_slice(&b"squeeze me squeeze me squeeze me".repeat(4096)[..BLOCK_SIZE]);
    let stream = encode(&data);
    assert_eq!(
        chunk_types(&stream),
        vec![CHUNK_UNCOMPRESSED, CHUNK_COMPRESSED]
    );
    assert_eq!(decode(&stream), data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: round-trips across sizes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_sizes() {
    for len in [
        0usize,
        1,
        100,
        BLOCK_SIZE - 1,
        BLOCK_SIZE,
        BLOCK_SIZE + 1,
        3 * BLOCK_SIZE + 12345,
    ] {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        assert_eq!(decode(&encode(&data)), data, "len={len}");
    }
}

#[test]
fn test_encoder_reset_reuse() {
    let mut enc = FrameEncoder::new();
    for round in 0..3u8 {
        enc.reset();
        let data = vec![round; 1000];
        let mut out = vec![0u8; enc.write_bound(data.len())];
        let mut n = enc.write(&data, &mut out).unwrap();
        n += enc.flush(&mut out[n..]).unwrap();
        assert_eq!(&out[..10], &STREAM_IDENTIFIER, "round={round}");
        assert_eq!(decode(&out[..n]), data);
    }
}
