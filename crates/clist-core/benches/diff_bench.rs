//! Benchmarks for the positional differ.
//!
//! Run with: cargo bench -p clist-core --bench diff_bench

use clist_core::{ItemCollection, ItemKind, ItemSize, ListItem, SizeQuery, diff};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn snapshot_of(keys: impl Iterator<Item = String>) -> ItemCollection {
    ItemCollection::new(
        keys.map(|key| {
            ListItem::new(
                key,
                ItemKind("message"),
                SizeQuery::concurrency_safe(|_| ItemSize::new(40.0)),
            )
        })
        .collect(),
    )
    .expect("bench keys are unique")
}

/// Pair of snapshots where `churn_pct` percent of the tail was replaced and
/// one item was prepended (the typical "received messages" shape).
fn make_pair(len: usize, churn_pct: usize) -> (ItemCollection, ItemCollection) {
    let old = snapshot_of((0..len).map(|i| format!("m{i}")));
    let replaced = len * churn_pct / 100;
    let keep = len - replaced;
    let new_keys = std::iter::once("fresh".to_string())
        .chain((0..keep).map(|i| format!("m{i}")))
        .chain((0..replaced).map(|i| format!("r{i}")));
    (old, snapshot_of(new_keys))
}

fn bench_diff_identical(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff/identical");
    for len in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(len as u64));
        let snap = snapshot_of((0..len).map(|i| format!("m{i}")));
        group.bench_with_input(BenchmarkId::new("diff", len), &(), |b, _| {
            b.iter(|| black_box(diff(&snap, &snap)))
        });
    }
    group.finish();
}

fn bench_diff_tail_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff/tail_churn_5pct");
    for len in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(len as u64));
        let (old, new) = make_pair(len, 5);
        group.bench_with_input(BenchmarkId::new("diff", len), &(), |b, _| {
            b.iter(|| black_box(diff(&old, &new)))
        });
    }
    group.finish();
}

fn bench_diff_full_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff/full_reorder");
    for len in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(len as u64));
        let old = snapshot_of((0..len).map(|i| format!("m{i}")));
        let new = snapshot_of((0..len).rev().map(|i| format!("m{i}")));
        group.bench_with_input(BenchmarkId::new("diff", len), &(), |b, _| {
            b.iter(|| black_box(diff(&old, &new)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_diff_identical,
    bench_diff_tail_churn,
    bench_diff_full_reorder
);
criterion_main!(benches);
