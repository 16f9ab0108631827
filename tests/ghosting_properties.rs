mod util;

use mesh_ghosting::coordinator::AttachmentCoordinator;
use mesh_ghosting::ghosting::{GhostingClass, TargetSystem};
use mesh_ghosting::mesh_generation::{MeshGenerationOptions, quad_mesh};
use mesh_ghosting::topology::point::ElemId;
use proptest::prelude::*;
use std::collections::BTreeSet;
use util::*;

fn coordinator(nx: usize, ny: usize, rank: usize, n_ranks: usize) -> AttachmentCoordinator {
    let mesh = quad_mesh(
        nx,
        ny,
        [0.0, 0.0],
        [1.0, 1.0],
        MeshGenerationOptions::on_rank(rank, n_ranks),
    )
    .unwrap();
    let mut c = AttachmentCoordinator::new(mesh, no_defaults()).unwrap();
    c.prepare_mesh().unwrap();
    c
}

/// Brute force on the structured grid: side layers reach Manhattan distance
/// `depth`, point layers Chebyshev distance `depth`.
fn expected(
    c: &AttachmentCoordinator,
    nx: usize,
    rank: usize,
    depth: u32,
    point: bool,
) -> BTreeSet<ElemId> {
    let mesh = c.mesh(TargetSystem::Undisplaced).unwrap();
    let cell = |e: ElemId| {
        let i = e.get() as i64;
        (i % nx as i64, i / nx as i64)
    };
    let owned: Vec<_> = mesh.active_elements_owned_by(rank).into_iter().map(cell).collect();
    mesh.active_elements()
        .filter(|e| e.processor_id != rank)
        .filter(|e| {
            let (x, y) = cell(e.id);
            owned.iter().any(|&(ox, oy)| {
                let (dx, dy) = ((x - ox).abs(), (y - oy).abs());
                let d = if point { dx.max(dy) } else { dx + dy };
                d <= depth as i64
            })
        })
        .map(|e| e.id)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn layers_match_grid_distance(
        nx in 2usize..7,
        ny in 1usize..6,
        n_ranks in 1usize..4,
        depth in 1u32..4,
        point in any::<bool>(),
    ) {
        let c = {
            let mut c = coordinator(nx, ny, 0, n_ranks);
            let params = if point {
                point_layers(GhostingClass::GEOMETRIC, depth)
            } else {
                side_layers(GhostingClass::GEOMETRIC, depth)
            };
            c.register(&params).unwrap();
            c
        };
        for rank in 0..n_ranks {
            let got = ghosts(&c, GhostingClass::GEOMETRIC, rank);
            prop_assert_eq!(&got, &expected(&c, nx, rank, depth, point), "rank {}", rank);
            let mesh = c.mesh(TargetSystem::Undisplaced).unwrap();
            prop_assert!(got.iter().all(|e| mesh.owner(*e) != Some(rank)));
        }
    }

    #[test]
    fn registration_order_never_shrinks_ghosting(
        depths in prop::collection::vec((1u32..4, any::<bool>()), 1..6),
        rank in 0usize..3,
    ) {
        let mut c = coordinator(5, 4, rank, 3);
        let mut prev = BTreeSet::new();
        for (depth, point) in depths {
            let params = if point {
                point_layers(GhostingClass::GEOMETRIC, depth)
            } else {
                side_layers(GhostingClass::GEOMETRIC, depth)
            };
            c.register(&params).unwrap();
            let now = ghosts(&c, GhostingClass::GEOMETRIC, rank);
            prop_assert!(now.is_superset(&prev));
            prev = now;
        }
    }

    #[test]
    fn subsumed_requests_add_nothing(
        deep in 1u32..5,
        shallow in 1u32..5,
    ) {
        prop_assume!(shallow <= deep);
        let mut c = coordinator(6, 3, 0, 2);
        c.register(&side_layers(GhostingClass::GEOMETRIC, deep)).unwrap();
        let before = ghosts(&c, GhostingClass::GEOMETRIC, 0);
        c.register(&side_layers(GhostingClass::GEOMETRIC, shallow)).unwrap();
        prop_assert_eq!(c.managers().count(), 1);
        prop_assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 0), before);
    }
}

#[test]
fn scattered_ownership_keeps_every_side_neighbour() {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let mut c = coordinator(8, 8, 0, 4);
    let owners: BTreeMap<ElemId, usize> = (0..64).map(|i| (eid(i), rng.gen_range(0..4))).collect();
    c.mesh_mut(TargetSystem::Undisplaced)
        .unwrap()
        .repartition(&owners);
    c.register(&side_layers(GhostingClass::GEOMETRIC, 1)).unwrap();

    let mesh = c.mesh(TargetSystem::Undisplaced).unwrap();
    for rank in 0..4 {
        let got = ghosts(&c, GhostingClass::GEOMETRIC, rank);
        for e in mesh.active_elements_owned_by(rank) {
            for n in mesh.side_neighbors(e).iter().flatten() {
                assert!(
                    mesh.owner(*n) == Some(rank) || got.contains(n),
                    "rank {rank}: neighbour {n:?} of {e:?} not ghosted"
                );
            }
        }
        assert!(got.iter().all(|e| owners[e] != rank));
    }
}
