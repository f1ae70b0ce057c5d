//! E2E Test Suite 02: Block Streaming API
//!
//! Tests the resumable block decompressor (`Decompressor`): feeding input in
//! arbitrary slices, draining output in arbitrary pieces, and resuming
//! through every kind of split — inside the varint prefix, inside a tag
//! header, inside a literal body.

extern crate snappy;

use snappy::{compress_block, max_compressed_length, DecompressError, Decompressor};

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

fn compress_vec(data: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; max_compressed_length(data.len())];
    let n = compress_block(data, &mut buf).unwrap();
    buf.truncate(n);
    buf
}

/// Feed `compressed` in slices of `step` bytes and drain at the end.
fn decompress_chunked(compressed: &[u8], step: usize, expected: &[u8]) {
    let mut d = Decompressor::new();
    for chunk in compressed.chunks(step) {
        d.decompress(chunk).unwrap();
    }
    assert!(d.all_data_decompressed(), "step={step}");
    let mut out = vec![0u8; expected.len()];
    assert_eq!(d.read(&mut out), expected.len());
    assert_eq!(&out, expected, "step={step}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: partial tag across every boundary (byte-at-a-time)
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_byte_at_a_time_equals_oneshot() {
    let data = b"split me anywhere you like; split me anywhere you like!".repeat(30);
    let compressed = compress_vec(&data);
    decompress_chunked(&compressed, 1, &data);
}

#[test]
fn test_various_chunk_sizes() {
    let mut data = Vec::new();
    for i in 0u32..2000 {
        data.extend_from_slice(format!("{i:08x}:{}|", i % 13).as_bytes());
    }
    let compressed = compress_vec(&data);
    for step in [1usize, 2, 3, 5, 7, 64, 997, compressed.len()] {
        decompress_chunked(&compressed, step, &data);
    }
}

/// Incompressible input keeps long literal runs; splitting inside both the
/// long-literal header and the body must resume correctly.
#[test]
fn test_long_literal_splits() {
    let data = random_bytes(0xdead_beef, 100_000);
    let compressed = compress_vec(&data);
    for step in [1usize, 4, 6, 4093] {
        decompress_chunked(&compressed, step, &data);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: draining in pieces, interleaved with feeding
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_read_in_small_pieces() {
    let data = b"drip drip drip ".repeat(500);
    let compressed = compress_vec(&data);
    let mut d = Decompressor::new();
    d.decompress(&compressed).unwrap();

    let mut out = Vec::new();
    let mut piece = [0u8; 17];
    loop {
        let n = d.read(&mut piece);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&piece[..n]);
    }
    assert_eq!(out, data);
}

#[test]
fn test_interleaved_feed_and_read() {
    let data = b"interleaved reads see output before the block completes".repeat(100);
    let compressed = compress_vec(&data);
    let (first, second) = compressed.split_at(compressed.len() / 2);

    let mut d = Decompressor::new();
    d.decompress(first).unwrap();
    assert!(!d.all_data_decompressed());

    // Whatever is already decoded can be read out early.
    let mut out = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let n = d.read(&mut buf);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    let early = out.len();
    assert_eq!(&out[..], &data[..early]);

    d.decompress(second).unwrap();
    assert!(d.all_data_decompressed());
    loop {
        let n = d.read(&mut buf);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: instance lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_reset_between_blocks() {
    let a = b"first block first block first block".to_vec();
    let b = random_bytes(99, 5000);
    let mut d = Decompressor::new();

    for data in [&a, &b] {
        d.reset();
        d.decompress(&compress_vec(data)).unwrap();
        assert!(d.all_data_decompressed());
        let mut out = vec![0u8; data.len()];
        assert_eq!(d.read(&mut out), data.len());
        assert_eq!(&out, data.as_slice());
    }
}

#[test]
fn test_error_on_garbage_after_completion() {
    let mut d = Decompressor::new();
    d.decompress(&compress_vec(b"done")).unwrap();
    assert!(d.all_data_decompressed());
    assert_eq!(d.decompress(&[0x41]), Err(DecompressError::InvalidData));
}

/// The varint prefix itself can straddle input boundaries.
#[test]
fn test_length_prefix_split() {
    // 300 bytes → 2-byte varint (0xac 0x02).
    let data = vec![0x55u8; 300];
    let compressed = compress_vec(&data);
    assert!(compressed[0] & 0x80 != 0);

    let mut d = Decompressor::new();
    d.decompress(&compressed[..1]).unwrap();
    assert!(!d.all_data_decompressed());
    d.decompress(&compressed[1..]).unwrap();
    assert!(d.all_data_decompressed());
    let mut out = vec![0u8; 300];
    assert_eq!(d.read(&mut out), 300);
    assert_eq!(out, data);
}
