//! Pathfinding benchmarks for tactics_core.
//!
//! Run with: `cargo bench -p tactics_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tactics_core::coord::Coord;
use tactics_core::pathfinding::{CostGrid, Heuristic, MovementModel, Pathfinder, PathfinderConfig};

/// 64x64 grid with a comb of walls that forces long detours.
fn comb_grid() -> CostGrid {
    let mut costs = CostGrid::uniform(64, 64, 1);
    for x in (4..60).step_by(8) {
        let gap = if (x / 8) % 2 == 0 { 63 } else { 0 };
        for y in 0..64 {
            if y != gap {
                costs.set_weight(Coord::new(x, y), 0);
            }
        }
    }
    costs
}

pub fn pathfinding_benchmark(c: &mut Criterion) {
    let config = PathfinderConfig {
        search_limit: 10_000,
        ..PathfinderConfig::default()
    };
    let open = Pathfinder::new(CostGrid::uniform(64, 64, 1), config);
    let comb = Pathfinder::new(comb_grid(), config);
    let diagonal = Pathfinder::new(
        CostGrid::uniform(64, 64, 1),
        PathfinderConfig {
            movement: MovementModel::EightWay,
            heavy_diagonals: true,
            heuristic: Heuristic::DiagonalShortcut,
            ..config
        },
    );

    c.bench_function("astar_open_64", |b| {
        b.iter(|| open.find_path(black_box(Coord::new(0, 0)), black_box(Coord::new(63, 63))));
    });
    c.bench_function("astar_comb_64", |b| {
        b.iter(|| comb.find_path(black_box(Coord::new(0, 0)), black_box(Coord::new(63, 0))));
    });
    c.bench_function("astar_eight_way_64", |b| {
        b.iter(|| diagonal.find_path(black_box(Coord::new(0, 0)), black_box(Coord::new(63, 40))));
    });
    c.bench_function("range_costs_r12", |b| {
        b.iter(|| open.range_costs(black_box(Coord::new(32, 32)), black_box(12)));
    });
}

criterion_group!(benches, pathfinding_benchmark);
criterion_main!(benches);
