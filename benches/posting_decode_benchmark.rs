use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use comic_search::build::shard::shard_for_key;
use comic_search::compression::varint::{decode_doc_ids, encode_doc_ids};
use comic_search::text::normalize::{ngram_token_keys, normalize};

fn doc_id_run(count: u32, spacing: u32) -> Vec<u32> {
    (0..count).map(|i| i * spacing).collect()
}

fn bench_posting_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("posting_roundtrip");

    for &(label, count, spacing) in &[("dense_1000", 1000u32, 1u32), ("sparse_1000", 1000u32, 37u32)] {
        let ids = doc_id_run(count, spacing);
        let encoded = encode_doc_ids(&ids);

        group.bench_with_input(BenchmarkId::new("encode", label), &ids, |b, ids| {
            b.iter(|| black_box(encode_doc_ids(ids)));
        });

        group.bench_with_input(BenchmarkId::new("decode", label), &encoded, |b, encoded| {
            b.iter(|| black_box(decode_doc_ids(encoded).unwrap()));
        });
    }

    group.finish();
}

fn bench_shard_routing(c: &mut Criterion) {
    let keys: Vec<u32> = (0..10_000).collect();

    c.bench_function("shard_for_key_16_shards", |b| {
        b.iter(|| {
            for &key in &keys {
                black_box(shard_for_key(key, 16));
            }
        });
    });
}

fn bench_normalize_and_tokenize(c: &mut Criterion) {
    let title = "ONE PIECE: 航海王 the Great Pirate Era, Vol. 42!!";

    let mut group = c.benchmark_group("text_pipeline");
    group.bench_function("normalize", |b| {
        b.iter(|| black_box(normalize(title)));
    });
    let normalized = normalize(title);
    group.bench_function("ngram_token_keys", |b| {
        b.iter(|| black_box(ngram_token_keys(&normalized)));
    });
    group.finish();
}

criterion_group!(benches, bench_posting_roundtrip, bench_shard_routing, bench_normalize_and_tokenize);
criterion_main!(benches);
