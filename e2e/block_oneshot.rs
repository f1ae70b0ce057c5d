//! E2E Test Suite 01: Block One-Shot API
//!
//! Validates the core block compression and decompression functions:
//! - compress_block / Compressor::compress / try_compress
//! - decompress_block
//! - max_compressed_length
//! - uncompressed_length
//!
//! These tests pin the exact wire bytes for the seed inputs and verify the
//! format-level invariants (round-trip, ratio bound, rejection of invalid
//! streams) across sizes from empty to multi-fragment.

extern crate snappy;

use snappy::{
    compress_block, decompress_block, max_compressed_length, uncompressed_length, CompressError,
    Compressor, DecompressError, BLOCK_SIZE,
};

/// Deterministic pseudo-random bytes (xorshift64), so failures reproduce.
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

fn roundtrip(data: &[u8]) -> Vec<u8> {
    let mut compressed = vec![0u8; max_compressed_length(data.len())];
    let n = compress_block(data, &mut compressed).expect("compression should succeed");
    assert!(
        n <= max_compressed_length(data.len()),
        "ratio bound violated: {} > bound for {}",
        n,
        data.len()
    );
    let len = uncompressed_length(&compressed[..n]).expect("readable prefix") as usize;
    assert_eq!(len, data.len());
    let mut out = vec![0u8; len];
    let m = decompress_block(&compressed[..n], &mut out).expect("decompression should succeed");
    assert_eq!(m, len);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: seed vectors — exact bytes on the wire
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_input_exact_bytes() {
    let mut out = [0xeeu8; 8];
    let n = compress_block(&[], &mut out).unwrap();
    assert_eq!(&out[..n], &[0x00]);

    let mut decoded = [0u8; 4];
    assert_eq!(decompress_block(&[0x00], &mut decoded), Ok(0));
}

#[test]
fn test_single_byte_exact_bytes() {
    let mut out = [0u8; 8];
    let n = compress_block(&[0x41], &mut out).unwrap();
    assert_eq!(&out[..n], &[0x01, 0x00, 0x41]);
    assert_eq!(roundtrip(&[0x41]), &[0x41]);
}

/// A length-9 offset-1 copy tag; the decompressor's self-copy must expand
/// one seed byte into ten.
#[test]
fn test_small_repeat_copy_decode() {
    let mut decoded = [0u8; 10];
    let n = decompress_block(&[0x0a, 0x00, 0x61, 0x15, 0x01], &mut decoded).unwrap();
    assert_eq!(n, 10);
    assert_eq!(decoded, [0x61; 10]);

    // Our own encoding of the same input round-trips as well.
    assert_eq!(roundtrip(&[0x61; 10]), vec![0x61; 10]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: round-trips across data shapes and sizes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_typical_text() {
    let original = b"The quick brown fox jumps over the lazy dog. ".repeat(200);
    assert_eq!(roundtrip(&original), original);

    // Repetitive data must actually shrink.
    let mut compressed = vec![0u8; max_compressed_length(original.len())];
    let n = compress_block(&original, &mut compressed).unwrap();
    assert!(n < original.len());
}

#[test]
fn test_roundtrip_incompressible() {
    for len in [1usize, 100, 4096, BLOCK_SIZE, BLOCK_SIZE + 17] {
        let original = random_bytes(0x9e37_79b9_7f4a_7c15, len);
        assert_eq!(roundtrip(&original), original, "len={len}");
    }
}

#[test]
fn test_roundtrip_multi_fragment() {
    // Several fragments, each with its own hash table; the tag streams are
    // simply concatenated so offsets stay fragment-local.
    let mut data = Vec::new();
    for i in 0u32..40_000 {
        data.extend_from_slice(format!("record {} of the corpus|", i % 777).as_bytes());
    }
    assert!(data.len() > 5 * BLOCK_SIZE);
    assert_eq!(roundtrip(&data), data);
}

#[test]
fn test_roundtrip_edge_sizes() {
    for len in [
        0usize,
        1,
        15,
        16,
        17,
        59,
        60,
        61,
        255,
        256,
        BLOCK_SIZE - 1,
        BLOCK_SIZE,
        BLOCK_SIZE + 1,
    ] {
        let data: Vec<u8> = (0..len).map(|i| (i % 7) as u8).collect();
        assert_eq!(roundtrip(&data), data, "len={len}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: compressor instance reuse
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_compressor_reuse_across_inputs() {
    let mut compressor = Compressor::new();
    let inputs: Vec<Vec<u8>> = vec![
        b"first input, first input".to_vec(),
        random_bytes(42, 10_000),
        vec![0x7f; 3000],
        b"tiny".to_vec(),
    ];
    for data in &inputs {
        let mut compressed = vec![0u8; max_compressed_length(data.len())];
        let n = compressor.compress(data, &mut compressed).unwrap();
        let mut out = vec![0u8; data.len()];
        decompress_block(&compressed[..n], &mut out).unwrap();
        assert_eq!(&out, data);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: failure modes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_try_compress_none_on_small_output() {
    let data = random_bytes(7, 1000);
    let mut compressor = Compressor::new();
    let mut small = [0u8; 100];
    assert_eq!(compressor.try_compress(&data, &mut small), None);

    let mut big = vec![0u8; max_compressed_length(data.len())];
    assert!(compressor.try_compress(&data, &mut big).is_some());
}

#[test]
fn test_compress_output_too_small() {
    let data = vec![0u8; 1000];
    let mut out = [0u8; 10];
    assert_eq!(
        compress_block(&data, &mut out),
        Err(CompressError::OutputTooSmall)
    );
}

#[test]
fn test_decompress_rejects_invalid() {
    // Copy offset of zero.
    let mut out = [0u8; 16];
    assert_eq!(
        decompress_block(&[0x05, 0x00, 0x61, 0x05, 0x00], &mut out),
        Err(DecompressError::InvalidData)
    );
    // Copy offset beyond the bytes produced so far.
    assert_eq!(
        decompress_block(&[0x05, 0x00, 0x61, 0x05, 0x07], &mut out),
        Err(DecompressError::InvalidData)
    );
    // Varint length prefix with six continuation bytes.
    assert_eq!(
        uncompressed_length(&[0xff; 6]),
        Err(DecompressError::InvalidData)
    );
}

#[test]
fn test_decompress_output_too_small() {
    let mut out = [0u8; 5];
    assert_eq!(
        decompress_block(&[0x0a, 0x00, 0x61, 0x15, 0x01], &mut out),
        Err(DecompressError::OutputTooSmall)
    );
}

/// Every strict prefix of a valid block must be rejected, whatever tag the
/// cut lands in.
#[test]
fn test_all_truncations_rejected() {
    let data = b"truncation probe truncation probe truncation probe".repeat(4);
    let mut compressed = vec![0u8; max_compressed_length(data.len())];
    let n = compress_block(&data, &mut compressed).unwrap();

    let mut out = vec![0u8; data.len()];
    for cut in 0..n {
        assert!(
            decompress_block(&compressed[..cut], &mut out).is_err(),
            "prefix of {cut} bytes accepted"
        );
    }
    assert!(decompress_block(&compressed[..n], &mut out).is_ok());
}
