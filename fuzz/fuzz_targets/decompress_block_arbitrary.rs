#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes through the block decompressor.
    // Err results are expected and fine; what we verify is no panics or UB.

    // Zero-length output buffer.
    {
        let mut dst = vec![0u8; 0];
        let _ = snappy::decompress_block(data, &mut dst);
    }

    // 4 KiB output buffer — covers most real block sizes.
    {
        let mut dst = vec![0u8; 4096];
        let _ = snappy::decompress_block(data, &mut dst);
    }

    // Resumable path: the same bytes one slice at a time.
    {
        let mut d = snappy::Decompressor::new();
        for chunk in data.chunks(3) {
            if d.decompress(chunk).is_err() {
                break;
            }
        }
    }
});
