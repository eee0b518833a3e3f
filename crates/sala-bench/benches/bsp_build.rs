//! Criterion micro-benchmarks for BSP tree construction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sala_bench::{street_grid, tagged_room_row};
use sala_core::TaggedLine;
use sala_space::{BspConfig, BspTree};

/// Benchmark: build a tree over 20 rooms (82 lines).
fn bench_bsp_room_row(c: &mut Criterion) {
    let lines = tagged_room_row(20);
    let config = BspConfig::default();

    c.bench_function("bsp_room_row_20", |b| {
        b.iter(|| {
            let tree = BspTree::build(black_box(&lines), &config, None).unwrap();
            black_box(&tree);
        });
    });
}

/// Benchmark: build a tree over a 50 x 50 street grid, where most
/// splitting lines cut most others.
fn bench_bsp_street_grid(c: &mut Criterion) {
    let lines: Vec<TaggedLine> = street_grid(50, 10.0)
        .into_iter()
        .enumerate()
        .map(|(i, l)| TaggedLine::new(l, i as i32))
        .collect();
    let config = BspConfig::default();

    c.bench_function("bsp_street_grid_50", |b| {
        b.iter(|| {
            let tree = BspTree::build(black_box(&lines), &config, None).unwrap();
            black_box(&tree);
        });
    });
}

criterion_group!(benches, bench_bsp_room_row, bench_bsp_street_grid);
criterion_main!(benches);
