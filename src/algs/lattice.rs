//! Element adjacency and neighbour layers.
//! All output collections are **sorted & deduplicated** for deterministic behaviour.

use crate::topology::mesh::DistributedMesh;
use crate::topology::point::ElemId;
use std::collections::{BTreeSet, VecDeque};

/// How two elements are considered adjacent:
/// - `Side`: they share a full side (or are periodic images across one).
/// - `Point`: they share at least one node, modulo periodic identification.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum AdjacencyKind {
    #[default]
    Side,
    Point,
}

/// Elements adjacent to `e` according to `kind`.
pub fn adjacent(mesh: &DistributedMesh, e: ElemId, kind: AdjacencyKind) -> Vec<ElemId> {
    match kind {
        AdjacencyKind::Side => mesh.side_and_periodic_neighbors(e),
        AdjacencyKind::Point => mesh.point_neighbors(e),
    }
}

/// Every element within `depth` hops of any seed, seeds excluded.
///
/// Multi-source BFS: a seed is at distance 0, its neighbours at 1, and so on.
/// Periodic images count as ordinary one-hop neighbours.
pub fn neighbor_layers<I>(
    mesh: &DistributedMesh,
    seeds: I,
    kind: AdjacencyKind,
    depth: u32,
) -> BTreeSet<ElemId>
where
    I: IntoIterator<Item = ElemId>,
{
    let mut seen: BTreeSet<ElemId> = BTreeSet::new();
    let mut q: VecDeque<(ElemId, u32)> = VecDeque::new();
    for s in seeds {
        if seen.insert(s) {
            q.push_back((s, 0));
        }
    }
    let origin = seen.clone();
    while let Some((e, d)) = q.pop_front() {
        if d >= depth {
            continue;
        }
        for n in adjacent(mesh, e, kind) {
            if seen.insert(n) {
                q.push_back((n, d + 1));
            }
        }
    }
    &seen - &origin
}
