//! E2E Test Suite 04: Framed Stream Resumable API
//!
//! Exercises the stream decompressor's state machine across arbitrary
//! input/output splits, plus the chunk-type rules: skippable chunks are
//! discarded, reserved unskippable chunks are fatal, checksum tampering is
//! detected before any payload byte escapes, and concatenated streams decode
//! through a single decoder.

extern crate snappy;

use snappy::frame::types::STREAM_IDENTIFIER;
use snappy::{FrameDecoder, FrameEncoder, FrameError, BLOCK_SIZE};

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

fn encode_in_writes(data: &[u8], write_size: usize) -> Vec<u8> {
    let mut enc = FrameEncoder::new();
    let mut out = vec![0u8; enc.write_bound(data.len())];
    let mut n = 0;
    for piece in data.chunks(write_size.max(1)) {
        n += enc.write(piece, &mut out[n..]).unwrap();
    }
    n += enc.flush(&mut out[n..]).unwrap();
    out.truncate(n);
    out
}

fn decode_in_steps(stream: &[u8], in_step: usize, out_step: usize) -> Result<Vec<u8>, FrameError> {
    let mut dec = FrameDecoder::new();
    let mut out = Vec::new();
    let mut buf = vec![0u8; out_step.max(1)];
    let mut off = 0;
    loop {
        let end = (off + in_step.max(1)).min(stream.len());
        let (c, w) = dec.decompress(&stream[off..end], &mut buf)?;
        off += c;
        out.extend_from_slice(&buf[..w]);
        if off >= stream.len() && w == 0 && c == 0 {
            return Ok(out);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: chunking invariance on both sides
// ─────────────────────────────────────────────────────────────────────────────

/// The decoded stream must not depend on how the writer chunked its input.
#[test]
fn test_write_chunking_invariance() {
    let data = b"stream me in pieces of any size whatsoever; ".repeat(4000);
    let whole = encode_in_writes(&data, data.len());
    for write_size in [1usize, 7, 1000, BLOCK_SIZE, BLOCK_SIZE + 1] {
        let stream = encode_in_writes(&data, write_size);
        assert_eq!(stream, whole, "write_size={write_size}");
    }
    assert_eq!(decode_in_steps(&whole, whole.len(), 8192).unwrap(), data);
}

#[test]
fn test_read_chunking_invariance() {
    let mut data = b"compressible prefix ".repeat(2000);
    data.extend_from_slice(&random_bytes(3, BLOCK_SIZE));
    let stream = encode_in_writes(&data, data.len());
    for (in_step, out_step) in [(1usize, 1usize), (3, 8), (997, 64), (stream.len(), 1 << 20)] {
        assert_eq!(
            decode_in_steps(&stream, in_step, out_step).unwrap(),
            data,
            "in={in_step} out={out_step}"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: chunk-type rules
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_skippable_and_padding_chunks() {
    let payload = b"the data the padding hides between";
    let encoded = encode_in_writes(payload, payload.len());
    let mut stream = Vec::from(&encoded[..STREAM_IDENTIFIER.len()]);
    stream.extend_from_slice(&[0xfe, 0x05, 0x00, 0x00, 1, 2, 3, 4, 5]); // padding
    stream.extend_from_slice(&[0x80, 0x00, 0x00, 0x00]); // empty skippable
    stream.extend_from_slice(&[0xfd, 0x02, 0x00, 0x00, 0xab, 0xcd]); // skippable
    stream.extend_from_slice(&encoded[STREAM_IDENTIFIER.len()..]);
    assert_eq!(decode_in_steps(&stream, 3, 16).unwrap(), payload);
}

#[test]
fn test_reserved_unskippable_fatal() {
    let mut stream = Vec::from(STREAM_IDENTIFIER);
    stream.extend_from_slice(&[0x02, 0x01, 0x00, 0x00, 0x00]);
    assert_eq!(
        decode_in_steps(&stream, stream.len(), 64),
        Err(FrameError::UnsupportedChunkType(0x02))
    );
    let mut stream = Vec::from(STREAM_IDENTIFIER);
    stream.extend_from_slice(&[0x7f, 0x01, 0x00, 0x00, 0x00]);
    assert_eq!(
        decode_in_steps(&stream, stream.len(), 64),
        Err(FrameError::UnsupportedChunkType(0x7f))
    );
}

#[test]
fn test_stream_without_identifier_fatal() {
    let encoded = encode_in_writes(b"some payload", 12);
    let headless = &encoded[STREAM_IDENTIFIER.len()..];
    assert_eq!(
        decode_in_steps(headless, headless.len(), 64),
        Err(FrameError::BadStreamIdentifier)
    );
}

#[test]
fn test_concatenated_streams_decode_as_one() {
    let a = b"first stream".to_vec();
    let b = random_bytes(21, 5000);
    let mut stream = encode_in_writes(&a, a.len());
    stream.extend_from_slice(&encode_in_writes(&b, b.len()));

    let mut expected = a.clone();
    expected.extend_from_slice(&b);
    assert_eq!(decode_in_steps(&stream, 11, 100).unwrap(), expected);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: checksum integrity
// ─────────────────────────────────────────────────────────────────────────────

/// Flipping one CRC bit must fail the chunk and yield none of its bytes.
#[test]
fn test_crc_tamper_compressed_chunk() {
    let data = b"verify me verify me verify me".repeat(100);
    let mut stream = encode_in_writes(&data, data.len());
    stream[STREAM_IDENTIFIER.len() + 4] ^= 0x40;

    // The whole stream and ample output are on hand, so the failure surfaces
    // in a single call — before any payload byte is produced.
    let mut dec = FrameDecoder::new();
    let mut out = vec![0u8; data.len()];
    assert_eq!(
        dec.decompress(&stream, &mut out),
        Err(FrameError::ChecksumMismatch)
    );
}

#[test]
fn test_crc_tamper_uncompressed_chunk() {
    let data = random_bytes(17, BLOCK_SIZE); // stored raw
    let mut stream = encode_in_writes(&data, data.len());
    stream[STREAM_IDENTIFIER.len() + 4] ^= 0x01;

    let mut dec = FrameDecoder::new();
    let mut out = vec![0u8; data.len()];
    assert_eq!(
        dec.decompress(&stream, &mut out),
        Err(FrameError::ChecksumMismatch)
    );
    // No payload byte escaped, and the decoder stays poisoned.
    assert_eq!(
        dec.decompress(&stream, &mut out),
        Err(FrameError::Failed)
    );
    dec.reset();
    let clean = encode_in_writes(&data, data.len());
    assert_eq!(
        decode_in_steps(&clean, clean.len(), data.len()).unwrap(),
        data
    );
}

/// Corrupting a payload byte flips the recomputed CRC instead.
#[test]
fn test_payload_tamper_detected() {
    let data = b"payload integrity payload integrity".repeat(50);
    let mut stream = encode_in_writes(&data, data.len());
    let last = stream.len() - 1;
    stream[last] ^= 0x10;

    let mut dec = FrameDecoder::new();
    let mut out = vec![0u8; data.len()];
    let err = dec.decompress(&stream, &mut out).unwrap_err();
    assert!(
        matches!(err, FrameError::ChecksumMismatch | FrameError::Block(_)),
        "unexpected error {err:?}"
    );
}
