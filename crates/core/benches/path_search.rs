use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polis::{
    path::{HeapOpenSet, SortedOpenSet},
    NoiseTerrain, NoiseTerrainConfig, ShortestPaths, World, WorldConfig,
};

fn criterion_benchmark(c: &mut Criterion) {
    let oracle = NoiseTerrain::new(NoiseTerrainConfig::default()).unwrap();
    let world = World::generate(WorldConfig::default(), &oracle).unwrap();
    let graph = world.graph();
    let cities = world.cities();
    let (first, last) = (cities[0], cities[cities.len() - 1]);

    let mut group = c.benchmark_group("path-search");
    group.sample_size(20);
    group.bench_function("multi-source sorted set", |b| {
        b.iter(|| {
            ShortestPaths::multi_source_with::<SortedOpenSet, _>(
                &graph,
                black_box(cities.iter().copied()),
            )
        })
    });
    group.bench_function("multi-source binary heap", |b| {
        b.iter(|| {
            ShortestPaths::multi_source_with::<HeapOpenSet, _>(
                &graph,
                black_box(cities.iter().copied()),
            )
        })
    });
    group.bench_function("a-star sorted set", |b| {
        b.iter(|| {
            ShortestPaths::a_star_with::<SortedOpenSet, _>(
                &graph,
                black_box(first),
                black_box(last),
            )
        })
    });
    group.bench_function("a-star binary heap", |b| {
        b.iter(|| {
            ShortestPaths::a_star_with::<HeapOpenSet, _>(
                &graph,
                black_box(first),
                black_box(last),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
