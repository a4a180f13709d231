//! Benchmarks for batch consolidation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use waymark::builder::{ConsolidationConfig, GraphBuilder, NullCheckpoint};
use waymark::graph::topology::TopologyGraph;
use waymark::oracle::distance::DistanceOracle;
use waymark::store::WaypointStore;
use waymark::waypoint::Waypoint;

fn scattered_waypoints(count: usize) -> Vec<Waypoint> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    (0..count)
        .map(|i| {
            Waypoint::new(
                i as u64,
                [rng.gen_range(0.0..6.0), rng.gen_range(0.0..6.0)],
                vec![],
                vec![],
            )
        })
        .collect()
}

fn bench_consolidate(c: &mut Criterion) {
    let oracle = DistanceOracle::default();
    let waypoints = scattered_waypoints(60);

    c.bench_function("consolidate_60", |bench| {
        bench.iter(|| {
            let mut graph = TopologyGraph::new();
            let mut pending = WaypointStore::new();
            for w in &waypoints {
                pending.append(w.clone());
            }
            let mut builder = GraphBuilder::with_seed(ConsolidationConfig::default(), 0);
            black_box(builder.consolidate(
                &oracle,
                &mut graph,
                &mut pending,
                &mut NullCheckpoint,
            ))
        })
    });
}

fn bench_find_path(c: &mut Criterion) {
    let oracle = DistanceOracle::default();
    let mut graph = TopologyGraph::new();
    let mut pending = WaypointStore::new();
    for (i, x) in (0..50).map(|i| (i, i as f64 * 0.5)) {
        pending.append(Waypoint::new(i as u64, [x, 0.0], vec![], vec![]));
    }
    let mut builder = GraphBuilder::with_seed(ConsolidationConfig::default(), 0);
    builder.consolidate(&oracle, &mut graph, &mut pending, &mut NullCheckpoint);
    let handles = graph.handles();
    let (first, last) = (handles[0], *handles.last().unwrap());

    c.bench_function("find_path_50_chain", |bench| {
        bench.iter(|| black_box(waymark::graph::path::find_path(&graph, first, last)))
    });
}

criterion_group!(benches, bench_consolidate, bench_find_path);
criterion_main!(benches);
