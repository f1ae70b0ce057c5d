#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes through the stream decompressor: errors are expected,
    // panics and out-of-bounds access are not.
    let mut decoder = snappy::FrameDecoder::new();
    let mut out = [0u8; 1024];
    let mut off = 0usize;
    while off < data.len() {
        match decoder.decompress(&data[off..], &mut out) {
            Ok((c, w)) => {
                if c == 0 && w == 0 {
                    break;
                }
                off += c;
            }
            Err(_) => break,
        }
    }

    // The same bytes again, split into tiny slices, must behave identically.
    let mut decoder = snappy::FrameDecoder::new();
    for chunk in data.chunks(5) {
        let mut off = 0usize;
        loop {
            match decoder.decompress(&chunk[off..], &mut out) {
                Ok((c, w)) => {
                    off += c;
                    if off >= chunk.len() || (c == 0 && w == 0) {
                        break;
                    }
                }
                Err(_) => return,
            }
        }
    }
});
