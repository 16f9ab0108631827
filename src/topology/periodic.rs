//! Periodic node identification and side pairing.
//!
//! This module provides two complementary layers for periodic identification:
//! - [`NodeEquivalence`], a union-find structure over nodes that records which
//!   vertices are images of each other under the periodic transform.
//! - [`pair_periodic_sides`], which uses a canonical node map to pair the
//!   element sides of one boundary with their images on the paired boundary.
//!
//! Paired sides are treated as ordinary side adjacency by the ghosting
//! strategies: a periodic image is a same-cost hop.

use crate::mesh_error::GhostingError;
use crate::topology::point::{BoundaryId, ElemId, NodeId};
use std::collections::{BTreeMap, BTreeSet};

/// Union-find structure tracking equivalence classes of nodes.
#[derive(Debug, Default, Clone)]
pub struct NodeEquivalence {
    parent: BTreeMap<NodeId, NodeId>,
    rank: BTreeMap<NodeId, u32>,
}

impl NodeEquivalence {
    /// Create an empty equivalence relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node into the equivalence structure (as its own class).
    pub fn add_node(&mut self, node: NodeId) {
        self.parent.entry(node).or_insert(node);
        self.rank.entry(node).or_insert(0);
    }

    /// Returns true if no equivalences have been recorded.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    fn find_root(&mut self, node: NodeId) -> NodeId {
        if !self.parent.contains_key(&node) {
            self.add_node(node);
            return node;
        }
        let parent = self.parent[&node];
        if parent == node {
            return node;
        }
        let root = self.find_root(parent);
        self.parent.insert(node, root);
        root
    }

    /// Return the canonical representative for a node (with path compression).
    pub fn representative(&mut self, node: NodeId) -> NodeId {
        self.find_root(node)
    }

    /// Union two nodes and return the representative.
    pub fn union(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let ra = self.find_root(a);
        let rb = self.find_root(b);
        if ra == rb {
            return ra;
        }
        let rank_a = self.rank.get(&ra).copied().unwrap_or(0);
        let rank_b = self.rank.get(&rb).copied().unwrap_or(0);
        if rank_a < rank_b {
            self.parent.insert(ra, rb);
            rb
        } else {
            self.parent.insert(rb, ra);
            if rank_a == rank_b {
                self.rank.insert(ra, rank_a + 1);
            }
            ra
        }
    }

    /// Record that two nodes are periodic images of each other.
    pub fn add_equivalence(&mut self, a: NodeId, b: NodeId) {
        self.union(a, b);
    }

    /// Check whether two nodes are in the same equivalence class.
    pub fn are_equivalent(&mut self, a: NodeId, b: NodeId) -> bool {
        self.find_root(a) == self.find_root(b)
    }

    /// Build a canonical map for every node tracked so far.
    ///
    /// Nodes absent from the map are their own representative.
    pub fn canonical_map(&mut self) -> BTreeMap<NodeId, NodeId> {
        let nodes: Vec<_> = self.parent.keys().copied().collect();
        nodes.into_iter().map(|n| (n, self.find_root(n))).collect()
    }
}

/// A pair of boundaries identified with each other.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodicBoundary {
    pub primary: BoundaryId,
    pub secondary: BoundaryId,
}

impl PeriodicBoundary {
    pub fn new(primary: BoundaryId, secondary: BoundaryId) -> Self {
        Self { primary, secondary }
    }

    /// True if `b` is either side of this pair.
    pub fn involves(&self, b: BoundaryId) -> bool {
        self.primary == b || self.secondary == b
    }
}

/// An element side: `(element, local side index)`.
pub type SideRef = (ElemId, u16);

/// Pair the sides of `primary` with their images in `secondary`.
///
/// Each side is identified by its node set mapped through `canonical`; two
/// sides pair when their canonical node sets coincide. Sides with no image are
/// left unpaired. Returns an error if a side would pair with two different
/// images.
pub fn pair_periodic_sides(
    primary: &[(SideRef, Vec<NodeId>)],
    secondary: &[(SideRef, Vec<NodeId>)],
    canonical: &BTreeMap<NodeId, NodeId>,
) -> Result<Vec<(SideRef, SideRef)>, GhostingError> {
    let key = |nodes: &[NodeId]| -> BTreeSet<NodeId> {
        nodes
            .iter()
            .map(|n| canonical.get(n).copied().unwrap_or(*n))
            .collect()
    };

    let mut images: BTreeMap<BTreeSet<NodeId>, SideRef> = BTreeMap::new();
    for (side, nodes) in secondary {
        let k = key(nodes);
        if let Some(existing) = images.insert(k, *side) {
            if existing != *side {
                return Err(GhostingError::PeriodicMappingConflict {
                    node: nodes.first().map_or(0, |n| n.get()),
                    existing: existing.0.get(),
                    new: side.0.get(),
                });
            }
        }
    }

    let mut pairs = Vec::new();
    for (side, nodes) in primary {
        if let Some(image) = images.get(&key(nodes)) {
            if image != side {
                pairs.push((*side, *image));
            }
        }
    }
    pairs.sort_unstable();
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: u64) -> NodeId {
        NodeId::new(i)
    }

    #[test]
    fn equivalence_groups_nodes() {
        let mut eq = NodeEquivalence::new();
        eq.add_equivalence(n(1), n(2));
        assert!(eq.are_equivalent(n(1), n(2)));
        assert!(!eq.are_equivalent(n(1), n(3)));
        eq.add_equivalence(n(2), n(3));
        assert!(eq.are_equivalent(n(1), n(3)));
    }

    #[test]
    fn canonical_map_is_consistent() {
        let mut eq = NodeEquivalence::new();
        eq.add_equivalence(n(0), n(10));
        let map = eq.canonical_map();
        assert_eq!(map[&n(0)], map[&n(10)]);
    }

    #[test]
    fn pairs_matching_sides() {
        let mut eq = NodeEquivalence::new();
        eq.add_equivalence(n(0), n(10));
        let canonical = eq.canonical_map();
        let left = vec![((ElemId::new(0), 0), vec![n(0)])];
        let right = vec![((ElemId::new(9), 1), vec![n(10)])];
        let pairs = pair_periodic_sides(&left, &right, &canonical).unwrap();
        assert_eq!(pairs, vec![((ElemId::new(0), 0), (ElemId::new(9), 1))]);
    }

    #[test]
    fn conflicting_images_are_rejected() {
        let mut eq = NodeEquivalence::new();
        eq.add_equivalence(n(0), n(10));
        eq.add_equivalence(n(0), n(20));
        let canonical = eq.canonical_map();
        let left = vec![((ElemId::new(0), 0), vec![n(0)])];
        let right = vec![
            ((ElemId::new(9), 1), vec![n(10)]),
            ((ElemId::new(19), 1), vec![n(20)]),
        ];
        let err = pair_periodic_sides(&left, &right, &canonical).unwrap_err();
        assert!(matches!(err, GhostingError::PeriodicMappingConflict { .. }));
    }
}
