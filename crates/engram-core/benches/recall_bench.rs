//! Engram Recall Benchmarks
//!
//! Benchmarks for the hot recall-path primitives using Criterion.
//! Run with: cargo bench -p engram-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engram_core::cosine_similarity;
use engram_core::search::{normalize_bm25, sanitize_fts5_query, weighted_merge};
use engram_core::temporal::TemporalExtractor;
use engram_core::Entity;
use engram_core::EntityExtractor;

fn bench_cosine_similarity(c: &mut Criterion) {
    let a: Vec<f32> = (0..384).map(|i| (i as f32).sin()).collect();
    let b: Vec<f32> = (0..384).map(|i| (i as f32).cos()).collect();

    c.bench_function("cosine_similarity_384d", |bench| {
        bench.iter(|| {
            black_box(cosine_similarity(&a, &b));
        })
    });
}

fn bench_weighted_merge(c: &mut Criterion) {
    let vector: Vec<(String, f32)> = (0..50)
        .map(|i| (format!("mem-{i}"), 1.0 - i as f32 / 50.0))
        .collect();
    let ranked: Vec<(String, f64)> = (0..50)
        .map(|i| (format!("mem-{}", 25 + i), -5.0 + i as f64 / 10.0))
        .collect();

    c.bench_function("weighted_merge_50x50", |bench| {
        bench.iter(|| {
            let text = normalize_bm25(&ranked);
            black_box(weighted_merge(&vector, &text, 0.7, 0.3));
        })
    });
}

fn bench_sanitize_fts5(c: &mut Criterion) {
    c.bench_function("sanitize_fts5_query", |bench| {
        bench.iter(|| {
            black_box(sanitize_fts5_query(
                "hello world \"exact phrase\" OR special-chars!@#",
            ));
        })
    });
}

fn bench_temporal_extract(c: &mut Criterion) {
    let extractor = TemporalExtractor::new();
    let texts = [
        "Meeting with Bob on January 15, 2025",
        "What did I accomplish last month?",
        "the deploy three weeks ago broke 2024-06-01 backups",
        "no dates in this one at all",
    ];

    c.bench_function("temporal_extract", |bench| {
        bench.iter(|| {
            for text in &texts {
                black_box(extractor.extract(text));
            }
        })
    });
}

fn bench_entity_extraction(c: &mut Criterion) {
    let fast = EntityExtractor::pattern();
    let accurate = EntityExtractor::hybrid();
    let text = "The auth-service uses PostgreSQL and Sarah deployed it to api-gateway";

    c.bench_function("extract_pattern", |bench| {
        bench.iter(|| {
            let entities: Vec<Entity> = fast.extract(text);
            black_box(entities);
        })
    });

    c.bench_function("extract_hybrid", |bench| {
        bench.iter(|| {
            let entities: Vec<Entity> = accurate.extract(text);
            black_box(entities);
        })
    });
}

criterion_group!(
    benches,
    bench_cosine_similarity,
    bench_weighted_merge,
    bench_sanitize_fts5,
    bench_temporal_extract,
    bench_entity_extraction,
);
criterion_main!(benches);
