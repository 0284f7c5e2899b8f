//! Criterion benchmarks for hit fetching.
//!
//! Covers:
//! - Fetching all hits of a frequent term with different thread counts
//! - Paging through the first hits only
//! - Counting far past the processing ceiling

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hitstream::prelude::*;

/// Generate test documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<String> {
    let words = [
        "search", "engine", "segment", "hit", "query", "document", "token", "span", "phrase",
        "filter", "window", "count", "store", "thread", "lazy", "fetch",
    ];

    let mut documents = Vec::with_capacity(count);
    for i in 0..count {
        let doc_length = 20 + (i % 60); // Variable length documents
        let doc_words: Vec<&str> = (0..doc_length)
            .map(|j| words[(i * 7 + j * 13) % words.len()]) // Pseudo-random distribution
            .collect();
        documents.push(doc_words.join(" "));
    }

    documents
}

fn corpus(segments: usize) -> Vec<SegmentRef> {
    let documents = generate_test_documents(20_000);
    let texts: Vec<&str> = documents.iter().map(String::as_str).collect();
    segments_from_texts(&texts, segments)
}

fn search(segments: &[SegmentRef], term: &str, config: FetchConfig) -> HitResults {
    let query = Arc::new(MemoryQuery::Term(term.to_string()));
    HitResults::new(segments, query, SearchSettings::new(config)).unwrap()
}

fn bench_fetch_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("fetch_all");
    let segments = corpus(8);
    let total = search(&segments, "hit", FetchConfig::default()).size().unwrap();
    group.throughput(Throughput::Elements(total as u64));

    for threads in [1, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let results = search(
                    &segments,
                    "hit",
                    FetchConfig::default().with_max_threads(threads),
                );
                black_box(results.size().unwrap())
            })
        });
    }

    group.finish();
}

fn bench_first_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_page");
    let segments = corpus(8);

    group.bench_function("window_0_20", |b| {
        b.iter(|| {
            let results = search(&segments, "query", FetchConfig::default());
            black_box(results.window(0, 20).unwrap())
        })
    });

    group.bench_function("iterate_100", |b| {
        b.iter(|| {
            let results = search(&segments, "query", FetchConfig::default());
            black_box(results.iter().take(100).count())
        })
    });

    group.finish();
}

fn bench_counting_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("counting_only");
    let segments = corpus(8);

    group.bench_function("store_1000_count_all", |b| {
        b.iter(|| {
            let config = FetchConfig::new(Some(1000), None);
            let results = search(&segments, "token", config);
            results.size().unwrap();
            black_box(results.results_stats())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_fetch_all, bench_first_page, bench_counting_only);
criterion_main!(benches);
