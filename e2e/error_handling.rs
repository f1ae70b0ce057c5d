//! E2E Test Suite 05: Error Handling
//!
//! Validates the failure contracts across the whole surface: recoverable
//! `OutputTooSmall` on both codecs, `InvalidData` for every malformed-input
//! class, frame-level chunk validation, and error stickiness/reset rules.

extern crate snappy;

use snappy::frame::types::{STREAM_IDENTIFIER, MAX_DATA_CHUNK_BODY};
use snappy::{
    compress_block, decompress_block, max_compressed_length, uncompressed_length, CompressError,
    DecompressError, FrameDecoder, FrameEncoder, FrameError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: varint prefix validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_uncompressed_length_rejects_bad_prefixes() {
    // Truncated mid-varint.
    assert!(uncompressed_length(&[]).is_err());
    assert!(uncompressed_length(&[0x80]).is_err());
    assert!(uncompressed_length(&[0xff, 0xff]).is_err());
    // Six continuation bytes.
    assert!(uncompressed_length(&[0xff, 0xff, 0xff, 0xff, 0xff, 0x01]).is_err());
    // 33rd value bit set.
    assert!(uncompressed_length(&[0xff, 0xff, 0xff, 0xff, 0x1f]).is_err());
    // u32::MAX itself is representable.
    assert_eq!(
        uncompressed_length(&[0xff, 0xff, 0xff, 0xff, 0x0f]),
        Ok(u32::MAX)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: recoverable OutputTooSmall on both codecs
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_compress_recovers_with_larger_buffer() {
    let data = b"recoverable failure recoverable failure".repeat(10);
    let mut small = vec![0u8; 8];
    assert_eq!(
        compress_block(&data, &mut small),
        Err(CompressError::OutputTooSmall)
    );
    // Same input, adequate buffer: succeeds.
    let mut big = vec![0u8; max_compressed_length(data.len())];
    let n = compress_block(&data, &mut big).unwrap();

    let mut tiny_out = vec![0u8; data.len() - 1];
    assert_eq!(
        decompress_block(&big[..n], &mut tiny_out),
        Err(DecompressError::OutputTooSmall)
    );
    let mut out = vec![0u8; data.len()];
    assert_eq!(decompress_block(&big[..n], &mut out), Ok(data.len()));
    assert_eq!(out, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: malformed tag streams
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_copy_before_any_output() {
    // First tag is a copy: offset can never be valid with zero bytes produced.
    let mut out = [0u8; 16];
    assert_eq!(
        decompress_block(&[0x04, 0x05, 0x01], &mut out),
        Err(DecompressError::InvalidData)
    );
}

#[test]
fn test_copy4_with_huge_offset() {
    // Copy4 offset far past the produced output.
    let block = [0x08, 0x04, 0x61, 0x62, 0x07, 0xff, 0xff, 0xff, 0x7f];
    let mut out = [0u8; 16];
    assert_eq!(
        decompress_block(&block, &mut out),
        Err(DecompressError::InvalidData)
    );
}

#[test]
fn test_literal_overruns_advertised_length() {
    // Advertises 2 bytes, literal brings 5.
    let block = [0x02, 0x10, 0x61, 0x62, 0x63, 0x64, 0x65];
    let mut out = [0u8; 16];
    assert_eq!(
        decompress_block(&block, &mut out),
        Err(DecompressError::InvalidData)
    );
}

#[test]
fn test_stream_shorter_than_advertised() {
    let block = [0x0a, 0x00, 0x61]; // promises 10, delivers 1
    let mut out = [0u8; 16];
    assert_eq!(
        decompress_block(&block, &mut out),
        Err(DecompressError::InvalidData)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: frame-level validation
// ─────────────────────────────────────────────────────────────────────────────

fn data_chunk_header(chunk_type: u8, body_len: usize) -> [u8; 4] {
    [
        chunk_type,
        body_len as u8,
        (body_len >> 8) as u8,
        (body_len >> 16) as u8,
    ]
}

#[test]
fn test_uncompressed_chunk_body_too_large() {
    let mut stream = Vec::from(STREAM_IDENTIFIER);
    stream.extend_from_slice(&data_chunk_header(0x01, MAX_DATA_CHUNK_BODY + 1));
    let mut out = [0u8; 64];
    assert_eq!(
        FrameDecoder::new().decompress(&stream, &mut out),
        Err(FrameError::BadChunkLength)
    );
}

#[test]
fn test_compressed_chunk_body_too_short() {
    // Four body bytes leave no room for any compressed block.
    let mut stream = Vec::from(STREAM_IDENTIFIER);
    stream.extend_from_slice(&data_chunk_header(0x00, 4));
    stream.extend_from_slice(&[0, 0, 0, 0]);
    let mut out = [0u8; 64];
    assert_eq!(
        FrameDecoder::new().decompress(&stream, &mut out),
        Err(FrameError::BadChunkLength)
    );
}

#[test]
fn test_identifier_with_wrong_body_length() {
    let mut stream = Vec::from(STREAM_IDENTIFIER);
    // A second identifier chunk claiming a 7-byte body.
    stream.extend_from_slice(&[0xff, 0x07, 0x00, 0x00]);
    stream.extend_from_slice(b"sNaPpY?");
    let mut out = [0u8; 64];
    assert_eq!(
        FrameDecoder::new().decompress(&stream, &mut out),
        Err(FrameError::BadStreamIdentifier)
    );
}

/// A compressed chunk whose block advertises more than 64 KiB must be
/// rejected without allocating for it.
#[test]
fn test_oversized_block_in_chunk_rejected() {
    let mut stream = Vec::from(STREAM_IDENTIFIER);
    // Body: 4 CRC bytes + a varint advertising 2^20 output bytes.
    stream.extend_from_slice(&data_chunk_header(0x00, 4 + 3));
    stream.extend_from_slice(&[0, 0, 0, 0]);
    stream.extend_from_slice(&[0x80, 0x80, 0x40]);
    let mut out = [0u8; 64];
    assert!(matches!(
        FrameDecoder::new().decompress(&stream, &mut out),
        Err(FrameError::Block(DecompressError::InvalidData))
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: stickiness and reset
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_frame_errors_are_sticky_until_reset() {
    let mut dec = FrameDecoder::new();
    let mut out = [0u8; 64];
    assert_eq!(
        dec.decompress(&[0x00, 0x05, 0x00, 0x00], &mut out),
        Err(FrameError::BadStreamIdentifier)
    );
    assert_eq!(dec.decompress(&[], &mut out), Err(FrameError::Failed));
    assert_eq!(
        dec.decompress(&STREAM_IDENTIFIER, &mut out),
        Err(FrameError::Failed)
    );

    dec.reset();
    assert_eq!(dec.decompress(&STREAM_IDENTIFIER, &mut out), Ok((10, 0)));
    assert!(dec.is_at_chunk_boundary());
}

#[test]
fn test_encoder_output_too_small_is_recoverable() {
    let mut enc = FrameEncoder::new();
    let mut tiny = [0u8; 2];
    assert_eq!(enc.write(b"xyz", &mut tiny), Err(FrameError::OutputTooSmall));
    // Same call with a bound-sized buffer succeeds.
    let mut dst = vec![0u8; enc.write_bound(3)];
    let n = enc.write(b"xyz", &mut dst).unwrap();
    assert_eq!(n, STREAM_IDENTIFIER.len());
}
