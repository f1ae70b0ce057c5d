#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Compress with a bound-sized buffer so the encoder cannot run short.
    let mut compressed = vec![0u8; snappy::max_compressed_length(data.len())];
    let n = snappy::compress_block(data, &mut compressed).unwrap();

    // Decompress back and compare byte for byte.
    let len = snappy::uncompressed_length(&compressed[..n]).unwrap() as usize;
    assert_eq!(len, data.len(), "length prefix does not match input");
    let mut recovered = vec![0u8; len];
    let m = snappy::decompress_block(&compressed[..n], &mut recovered).unwrap();

    assert_eq!(
        &recovered[..m],
        data,
        "block round-trip mismatch: {} bytes in, {} bytes back",
        data.len(),
        m
    );
});
