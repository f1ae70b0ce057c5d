//! Criterion benchmarks for the Snappy block (raw) compression API.
//!
//! Run with:
//!   cargo bench --bench block
//!
//! Optionally set SNAPPY_CORPUS_DIR to a directory of corpus files so the
//! benchmarks run against real-world data instead of synthetic lorem ipsum.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

mod corpus {
    include!("corpus.rs");
}

fn bench_block_compress_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_compress_decompress");

    for &chunk_size in &[65_536usize, 262_144] {
        // Use real corpus chunks when SNAPPY_CORPUS_DIR is set, else synthetic.
        let chunks = corpus::corpus_chunks(chunk_size);
        let chunk = chunks[0].clone();
        let bound = snappy::max_compressed_length(chunk_size);

        // ── compress_block (one-shot, throwaway hash table) ─────────────────
        {
            let mut dst = vec![0u8; bound];
            group.throughput(Throughput::Bytes(chunk_size as u64));
            group.bench_with_input(
                BenchmarkId::new("compress_block", chunk_size),
                &chunk,
                |b, chunk| b.iter(|| snappy::compress_block(chunk, &mut dst).unwrap()),
            );
        }

        // ── Compressor::compress (reused hash table) ─────────────────────────
        {
            let mut dst = vec![0u8; bound];
            let mut compressor = snappy::Compressor::new();
            group.throughput(Throughput::Bytes(chunk_size as u64));
            group.bench_with_input(
                BenchmarkId::new("compressor_reuse", chunk_size),
                &chunk,
                |b, chunk| b.iter(|| compressor.compress(chunk, &mut dst).unwrap()),
            );
        }

        // ── decompress_block — pre-compress the chunk once, then benchmark ──
        {
            let mut tmp = vec![0u8; bound];
            let n = snappy::compress_block(&chunk, &mut tmp).unwrap();
            let compressed = tmp[..n].to_vec();
            let mut decomp_dst = vec![0u8; chunk_size];

            // Throughput measured in *decompressed* bytes (the meaningful quantity).
            group.throughput(Throughput::Bytes(chunk_size as u64));
            group.bench_with_input(
                BenchmarkId::new("decompress_block", chunk_size),
                &compressed,
                |b, compressed| {
                    b.iter(|| snappy::decompress_block(compressed, &mut decomp_dst).unwrap())
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_block_compress_decompress);
criterion_main!(benches);
