/// Returns compressible synthetic data of the given size.
///
/// Mixes prose with record-style lines so the benchmark exercises both long
/// matches (repeated phrases) and short ones (shared field prefixes with
/// varying numbers), which is closer to real workloads than pure lorem
/// ipsum.
pub fn synthetic_data(size: usize) -> Vec<u8> {
    const PHRASES: [&str; 3] = [
        "the quick brown fox jumps over the lazy dog; ",
        "pack my box with five dozen liquor jugs; ",
        "how vexingly quick daft zebras jump; ",
    ];

    let mut out = Vec::with_capacity(size + 64);
    let mut record = 0u32;
    while out.len() < size {
        out.extend_from_slice(PHRASES[record as usize % PHRASES.len()].as_bytes());
        out.extend_from_slice(format!("id={record:08} seq={:04} ", record % 7919).as_bytes());
        record = record.wrapping_add(1);
    }
    out.truncate(size);
    out
}

/// Returns benchmark corpus chunks, each of exactly `chunk_size` bytes.
///
/// If the environment variable `SNAPPY_CORPUS_DIR` is set, files are read
/// from that directory and padded / truncated to `chunk_size`.  Otherwise a
/// few synthetic chunks are returned so that `cargo bench` always works
/// without any external corpus present.
#[allow(dead_code)]
pub fn corpus_chunks(chunk_size: usize) -> Vec<Vec<u8>> {
    use std::io::Read;

    if let Ok(dir) = std::env::var("SNAPPY_CORPUS_DIR") {
        let mut chunks = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Ok(mut f) = std::fs::File::open(&path) else {
                    continue;
                };
                let mut buf = Vec::new();
                if f.read_to_end(&mut buf).is_err() || buf.is_empty() {
                    continue;
                }
                // Pad short files by repeating their content.
                let mut chunk = buf.clone();
                while chunk.len() < chunk_size {
                    let rem = chunk_size - chunk.len();
                    chunk.extend_from_slice(&buf[..rem.min(buf.len())]);
                }
                chunk.truncate(chunk_size);
                chunks.push(chunk);
            }
        }
        if !chunks.is_empty() {
            return chunks;
        }
    }

    // Synthetic fallback, always available.
    (0..3).map(|_| synthetic_data(chunk_size)).collect()
}
