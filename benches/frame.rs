//! Criterion benchmarks for the Snappy framed stream format.
//!
//! Run with:
//!   cargo bench --bench frame
//!
//! Optionally set SNAPPY_CORPUS_DIR for real-world corpus data.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use snappy::{FrameDecoder, FrameEncoder};

mod corpus {
    include!("corpus.rs");
}

fn bench_frame_compress_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_compress_decompress");

    for &chunk_size in &[65_536usize, 262_144, 4_194_304] {
        // Use real corpus data when SNAPPY_CORPUS_DIR is set, else synthetic.
        let chunks = corpus::corpus_chunks(chunk_size);
        let chunk = chunks[0].clone();

        // ── FrameEncoder::write + flush ──────────────────────────────────────
        {
            let mut encoder = FrameEncoder::new();
            let mut dst = vec![0u8; encoder.write_bound(chunk_size)];

            group.throughput(Throughput::Bytes(chunk_size as u64));
            group.bench_with_input(
                BenchmarkId::new("frame_compress", chunk_size),
                &chunk,
                |b, chunk| {
                    b.iter(|| {
                        encoder.reset();
                        let mut n = encoder.write(chunk, &mut dst).unwrap();
                        n += encoder.flush(&mut dst[n..]).unwrap();
                        n
                    })
                },
            );

            // Build the pre-compressed stream for the decompress bench below.
            encoder.reset();
            let mut n = encoder.write(&chunk, &mut dst).unwrap();
            n += encoder.flush(&mut dst[n..]).unwrap();
            let compressed = dst[..n].to_vec();

            // ── FrameDecoder::decompress (streaming) ─────────────────────────
            // The decoder is reset at the start of every iteration so only
            // the decode work is measured, not allocation.
            let mut out_buf = vec![0u8; chunk_size];
            let mut decoder = FrameDecoder::new();

            group.throughput(Throughput::Bytes(chunk_size as u64));
            group.bench_with_input(
                BenchmarkId::new("frame_decompress", chunk_size),
                &compressed,
                |b, compressed| {
                    b.iter(|| {
                        decoder.reset();
                        let mut consumed = 0usize;
                        let mut written = 0usize;
                        while consumed < compressed.len() || written < chunk_size {
                            let (c, w) = decoder
                                .decompress(&compressed[consumed..], &mut out_buf[written..])
                                .unwrap();
                            consumed += c;
                            written += w;
                            if c == 0 && w == 0 {
                                break;
                            }
                        }
                        written
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_frame_compress_decompress);
criterion_main!(benches);
