//! # Resolver Benchmarks
//!
//! Performance benchmarks for chain walks, plate queries and abbreviations.
//!
//! Run with: `cargo bench -p waymark-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Quat, Vec3};
use std::hint::black_box;
use waymark_core::{
    AbbreviationEngine, AddressResolver, AggregateId, EdgeAddressing, Entity, PlacedObject,
    QueryVars, RoadWorld,
};

/// A street of `len` edges with a cross street at its first node.
fn create_street(len: usize) -> (RoadWorld, Entity) {
    let mut world = RoadWorld::new();
    let road = Some(AggregateId(1));
    let nodes: Vec<Entity> = (0..=len)
        .map(|i| world.add_node(Vec3::new(i as f32 * 80.0, 0.0, 0.0)))
        .collect();
    let mut own = None;
    for i in 0..len {
        let base = i as i32 * 100;
        let edge = world
            .add_straight_edge(nodes[i], nodes[i + 1], road, EdgeAddressing::new(base, base + 100))
            .expect("edge");
        own.get_or_insert(edge);
    }
    let cross = world.add_node(Vec3::new(0.0, 0.0, 80.0));
    let side = world
        .add_straight_edge(nodes[0], cross, None, EdgeAddressing::new(0, 100))
        .expect("edge");
    let object = world
        .add_object(
            PlacedObject {
                position: Vec3::new(4.0, 0.0, 4.0),
                rotation: Quat::IDENTITY,
                owner: Some(nodes[0]),
            },
            own,
            Some(side),
        )
        .expect("object");
    (world, object)
}

/// Resolver with every range and the placement already cached.
fn warm_resolver(world: &RoadWorld, object: Entity) -> AddressResolver {
    let mut resolver = AddressResolver::new();
    let vars = QueryVars::new();
    for _ in 0..4 {
        let _ = resolver.resolve(world, object, &vars);
        resolver.synchronize(world);
    }
    resolver
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_cold_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_resolution");

    for len in [1, 16, 256].iter() {
        let (world, object) = create_street(*len);
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, _| {
            b.iter(|| {
                let mut resolver = AddressResolver::new();
                let vars = QueryVars::new();
                let _ = resolver.resolve(&world, object, &vars);
                resolver.synchronize(&world);
                black_box(resolver.resolve(&world, object, &vars))
            });
        });
    }

    group.finish();
}

fn bench_cached_query(c: &mut Criterion) {
    let (world, object) = create_street(64);
    let mut resolver = warm_resolver(&world, object);
    let vars = QueryVars::new();

    c.bench_function("cached_query", |b| {
        b.iter(|| black_box(resolver.resolve(&world, black_box(object), &vars)));
    });
}

fn bench_abbreviation(c: &mut Criterion) {
    let engine = AbbreviationEngine::new();
    engine.load("Street = St\n(?i)avenue = Ave\nNorth = N\nSouth = S\n(\\d+)th = $1.\n");
    let mut group = c.benchmark_group("abbreviation");

    group.bench_function("memoized", |b| {
        b.iter(|| black_box(engine.apply(black_box("North 5th Street"))));
    });

    group.bench_function("unmemoized", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            black_box(engine.apply(&format!("South {i}th Avenue")))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_cold_resolution, bench_cached_query, bench_abbreviation);
criterion_main!(benches);
