#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Compress data as a complete framed stream.
    let mut encoder = snappy::FrameEncoder::new();
    let mut compressed = vec![0u8; encoder.write_bound(data.len())];
    let mut n = encoder.write(data, &mut compressed).unwrap();
    n += encoder.flush(&mut compressed[n..]).unwrap();

    // Decompress the stream back.
    let mut decoder = snappy::FrameDecoder::new();
    let mut recovered = vec![0u8; data.len()];
    let mut consumed = 0usize;
    let mut written = 0usize;
    loop {
        let (c, w) = decoder
            .decompress(&compressed[consumed..n], &mut recovered[written..])
            .expect("decompression of self-compressed stream failed");
        consumed += c;
        written += w;
        if c == 0 && w == 0 {
            break;
        }
    }

    assert_eq!(consumed, n, "stream not fully consumed");
    assert_eq!(
        &recovered[..written],
        data,
        "frame round-trip mismatch: {} bytes in, {} bytes back",
        data.len(),
        written
    );
});
