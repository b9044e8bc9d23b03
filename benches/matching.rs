//! Benchmarks for content selection, the Content Store and the wire codec

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_ccn_common::{matcher, ChildSelector, ContentObject, ExcludeFilter, Interest, Name};
use rust_ccn_fwd::ContentStore;
use std::time::Instant;

fn candidates(count: usize) -> Vec<ContentObject> {
    (0..count)
        .map(|i| {
            let name = Name::from_uri("/bench/data").unwrap().append_segment(i as u64);
            ContentObject::new(name, vec![0u8; 64])
        })
        .collect()
}

fn bench_select_best(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_best");
    let leftmost = Interest::new(Name::from_uri("/bench/data").unwrap());
    let rightmost = leftmost
        .clone()
        .with_child_selector(ChildSelector::RightmostDescendant)
        .unwrap();

    for count in [16usize, 256, 4096] {
        let pool = candidates(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("leftmost", count), &pool, |b, pool| {
            b.iter(|| black_box(matcher::select_best(&leftmost, pool)))
        });
        group.bench_with_input(BenchmarkId::new("rightmost", count), &pool, |b, pool| {
            b.iter(|| black_box(matcher::select_best(&rightmost, pool)))
        });
    }
    group.finish();
}

fn bench_exclusion(c: &mut Criterion) {
    let mut group = c.benchmark_group("exclusion");
    let pool = candidates(256);
    let excluded: Vec<_> = pool
        .iter()
        .take(200)
        .filter_map(|c| c.name().last().cloned())
        .collect();

    let explicit = excluded
        .iter()
        .cloned()
        .fold(ExcludeFilter::new(), |f, c| f.with_component(c));
    let compact = ExcludeFilter::from_components(&excluded, 32, &b"bench"[..]).unwrap();

    for (label, filter) in [("explicit", explicit), ("bloom", compact)] {
        let interest = Interest::new(Name::from_uri("/bench/data").unwrap()).with_exclude(filter);
        group.bench_function(label, |b| {
            b.iter(|| black_box(matcher::select_best(&interest, &pool)))
        });
    }
    group.finish();
}

fn bench_content_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_store");
    let now = Instant::now();

    group.bench_function("insert_with_eviction", |b| {
        let pool = candidates(1024);
        b.iter(|| {
            let mut cs = ContentStore::new(256);
            for content in &pool {
                black_box(cs.insert(content.clone(), now));
            }
        })
    });

    let mut cs = ContentStore::new(4096);
    for content in candidates(4096) {
        cs.insert(content, now);
    }
    let interest = Interest::new(Name::from_uri("/bench/data").unwrap())
        .with_child_selector(ChildSelector::RightmostDescendant)
        .unwrap();
    group.bench_function("lookup_rightmost", |b| {
        b.iter(|| black_box(cs.lookup(&interest, now)))
    });
    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let content = ContentObject::new(
        Name::from_uri("/bench/data/%00%01").unwrap(),
        vec![7u8; 1024],
    );
    let wire = content.to_bytes().unwrap();
    group.throughput(Throughput::Bytes(wire.len() as u64));

    group.bench_function("encode_content", |b| b.iter(|| black_box(content.to_bytes())));
    group.bench_function("decode_content", |b| {
        b.iter(|| black_box(ContentObject::from_bytes(wire.clone())))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_select_best,
    bench_exclusion,
    bench_content_store,
    bench_codec
);
criterion_main!(benches);
