use criterion::{criterion_group, criterion_main, Criterion};
use geobench::{dataset::random_cities, BucketIndex, Point, SpatialIndex, VpTree};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rstar::RTree;
use std::hint::black_box;

const SEED: u64 = 0;
const N: usize = 100_000;
const LOOKUPS: usize = 1000;
const K: usize = 10;

fn dataset() -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(SEED);
    random_cities(N, &mut rng).points()
}

fn anchors(points: &[Point]) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(SEED + 1);
    (0..LOOKUPS)
        .map(|_| points[rng.gen_range(0..points.len())])
        .collect()
}

fn build(criterion: &mut Criterion) {
    let points = dataset();
    let mut group = criterion.benchmark_group("build");
    group.sample_size(10);

    group.bench_function("bucket", |b| {
        let mut index = BucketIndex::default();
        b.iter(|| {
            let grid = index.build(black_box(&points)).expect("bucket build");
            index.release(grid);
        });
    });

    group.bench_function("vptree", |b| {
        let mut index = VpTree::new();
        b.iter(|| {
            let arena = index.build(black_box(&points)).expect("vp-tree build");
            index.release(arena);
        });
    });

    group.bench_function("rstar", |b| {
        b.iter(|| RTree::bulk_load(black_box(points.clone())));
    });
    group.finish();
}

fn query(criterion: &mut Criterion) {
    let points = dataset();
    let queries = anchors(&points);
    let mut group = criterion.benchmark_group("query");
    group.sample_size(10);

    let mut bucket = BucketIndex::default();
    let grid = bucket.build(&points).expect("bucket build");
    group.bench_function("bucket", |b| {
        b.iter(|| {
            for query in &queries {
                let result = bucket.nearest_k(&grid, query, K).expect("bucket query");
                assert_eq!(result.len(), K);
            }
        });
    });

    let mut tree = VpTree::new();
    let arena = tree.build(&points).expect("vp-tree build");
    group.bench_function("vptree", |b| {
        b.iter(|| {
            for query in &queries {
                let result = tree.nearest_k(&arena, query, K).expect("vp-tree query");
                assert_eq!(result.len(), K);
            }
        });
    });

    let rstar = RTree::bulk_load(points.clone());
    group.bench_function("rstar", |b| {
        b.iter(|| {
            for query in &queries {
                let results = rstar.nearest_neighbor_iter(query).take(K).count();
                assert_eq!(results, K);
            }
        });
    });
    group.finish();

    bucket.release(grid);
    tree.release(arena);
}

criterion_group!(benches, build, query);
criterion_main!(benches);
