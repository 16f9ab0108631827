use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use mesh_ghosting::coordinator::{AttachmentCoordinator, GhostingConfig, RelationshipManagerParams};
use mesh_ghosting::ghosting::{GhostingClass, TargetSystem};
use mesh_ghosting::mesh_generation::{MeshGenerationOptions, quad_mesh};

fn coordinator(n: usize, ranks: usize) -> AttachmentCoordinator {
    let mesh = quad_mesh(n, n, [0.0, 0.0], [1.0, 1.0], MeshGenerationOptions::on_rank(0, ranks))
        .expect("valid grid");
    let config = GhostingConfig {
        default_ghosting: false,
        ..GhostingConfig::default()
    };
    let mut c = AttachmentCoordinator::new(mesh, config).expect("coordinator");
    c.prepare_mesh().expect("prepare");
    c
}

fn bench_layer_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("ghost_query");

    for &depth in &[1u32, 2, 4] {
        let mut coord = coordinator(64, 8);
        coord
            .register(
                &RelationshipManagerParams::new("ElementPointNeighborLayers", GhostingClass::GEOMETRIC)
                    .layers(depth),
            )
            .expect("register");

        group.bench_with_input(BenchmarkId::new("point_layers", depth), &depth, |b, _| {
            b.iter(|| {
                let g = coord
                    .ghost_set(TargetSystem::Undisplaced, GhostingClass::GEOMETRIC, 3)
                    .expect("query");
                black_box(g);
            });
        });

        group.bench_with_input(BenchmarkId::new("all_ranks", depth), &depth, |b, _| {
            b.iter(|| {
                let all = coord
                    .ghost_sets_for_ranks(TargetSystem::Undisplaced, GhostingClass::GEOMETRIC)
                    .expect("query");
                black_box(all);
            });
        });
    }

    group.finish();
}

fn bench_registration(c: &mut Criterion) {
    c.bench_function("register_with_subsumption", |b| {
        b.iter(|| {
            let mut coord = coordinator(16, 4);
            for depth in [3u32, 1, 2, 3, 1] {
                let p = RelationshipManagerParams::new("ElementSideNeighborLayers", GhostingClass::GEOMETRIC)
                    .layers(depth);
                black_box(coord.register(&p).expect("register"));
            }
        });
    });
}

criterion_group!(benches, bench_layer_queries, bench_registration);
criterion_main!(benches);
