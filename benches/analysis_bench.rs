//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use heapdup::collect::Multiset;
use heapdup::fingerprint::{ArrayFingerprint, BlockFingerprint};

fn benchmark_fingerprinting(c: &mut Criterion) {
    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();

    c.bench_function("fingerprint_4k_array", |b| {
        b.iter(|| black_box(ArrayFingerprint::new(1024, "int", black_box(&payload))));
    });

    c.bench_function("aggregate_64k_instances", |b| {
        b.iter(|| {
            let mut set = Multiset::new();
            for i in 0u32..65_536 {
                let bytes = (i % 512).to_be_bytes();
                set.add(BlockFingerprint::new(black_box(&bytes)));
            }
            black_box(set.distinct_len())
        });
    });
}

criterion_group!(benches, benchmark_fingerprinting);
criterion_main!(benches);
