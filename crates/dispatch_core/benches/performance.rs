//! Performance benchmarks for dispatch_core using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dispatch_core::city_graph::CityGraph;
use dispatch_core::clock::SimulationClock;
use dispatch_core::config::{CityPreset, DispatchConfig};
use dispatch_core::coordinator::DispatchCoordinator;
use dispatch_core::demand::CallGenerator;
use dispatch_core::geometry::Position;

fn grid(side: usize) -> Vec<Position> {
    (0..side)
        .flat_map(|x| (0..side).map(move |y| Position::new(x as f64, y as f64)))
        .collect()
}

fn bench_graph_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_construction");
    for side in [6, 12, 20] {
        let intersections = grid(side);
        group.bench_with_input(
            BenchmarkId::from_parameter(side * side),
            &intersections,
            |b, intersections| {
                b.iter(|| black_box(CityGraph::new(intersections).expect("grid city")));
            },
        );
    }
    group.finish();
}

fn bench_position_distance(c: &mut Criterion) {
    let graph = CityGraph::new(&CityPreset::default().intersections).expect("default city");
    let from = Position::new(0.0, 1.0);
    let to = Position::new(7.0, 13.5);

    c.bench_function("position_distance_cached", |b| {
        b.iter(|| black_box(graph.position_distance(&from, &to).expect("route")));
    });
    c.bench_function("positions_at_distance", |b| {
        let start = graph.vertex_id(&Position::new(4.0, 8.0)).expect("home vertex");
        b.iter(|| black_box(graph.positions_at_distance(start, 3.7)));
    });
}

fn bench_allocation(c: &mut Criterion) {
    let preset = CityPreset::default();
    let mut group = c.benchmark_group("allocate_day");
    group.sample_size(20);
    group.bench_function("default_preset", |b| {
        b.iter(|| {
            let mut coordinator =
                DispatchCoordinator::from_preset(&preset, DispatchConfig::default(), None)
                    .expect("coordinator");
            let mut generator = CallGenerator::new(preset.demand.clone(), 42);
            let mut clock = SimulationClock::default();
            for _ in 0..24 {
                let calls = generator.generate_hour(coordinator.graph(), &clock);
                coordinator.allocate(&calls).expect("allocate");
                clock.step(1.0);
            }
            black_box(coordinator.payoff())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_graph_construction,
    bench_position_distance,
    bench_allocation
);
criterion_main!(benches);
