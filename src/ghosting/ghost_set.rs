//! The result of a ghosting query.
//!
//! A [`GhostSet`] maps each element that must be replicated to an optional
//! coupling restriction. `None` means full coupling and dominates any
//! partial restriction when sets are merged; two partial restrictions merge
//! by union. Iteration is in element-id order.

use crate::debug_invariants::ensure;
use crate::dof::coupling::CouplingMatrix;
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::point::{ElemId, Rank};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GhostSet {
    map: BTreeMap<ElemId, Option<Arc<CouplingMatrix>>>,
}

impl GhostSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `e` with restriction `cm`, merging with any existing entry.
    pub fn insert(&mut self, e: ElemId, cm: Option<Arc<CouplingMatrix>>) {
        match self.map.get_mut(&e) {
            None => {
                self.map.insert(e, cm);
            }
            Some(existing) => {
                *existing = match (existing.take(), cm) {
                    (None, _) | (_, None) => None,
                    (Some(a), Some(b)) if Arc::ptr_eq(&a, &b) || a == b => Some(a),
                    (Some(a), Some(b)) => Some(Arc::new(a.union(&b))),
                };
            }
        }
    }

    /// Insert `e` with full coupling.
    pub fn insert_full(&mut self, e: ElemId) {
        self.insert(e, None);
    }

    /// Merge every entry of `other` into `self`.
    pub fn merge(&mut self, other: GhostSet) {
        for (e, cm) in other.map {
            self.insert(e, cm);
        }
    }

    pub fn contains(&self, e: ElemId) -> bool {
        self.map.contains_key(&e)
    }

    /// `Some(None)` for full coupling, `Some(Some(m))` for a restriction,
    /// `None` if `e` is not in the set.
    pub fn coupling(&self, e: ElemId) -> Option<Option<&CouplingMatrix>> {
        self.map.get(&e).map(|cm| cm.as_deref())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.map.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElemId, Option<&CouplingMatrix>)> + '_ {
        self.map.iter().map(|(e, cm)| (*e, cm.as_deref()))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(ElemId) -> bool) {
        self.map.retain(|e, _| keep(*e));
    }

    pub fn to_set(&self) -> BTreeSet<ElemId> {
        self.map.keys().copied().collect()
    }

    /// Check the post-query invariants for `rank`: nothing owned by `rank`,
    /// every element active on `mesh`.
    pub fn validate_for(&self, mesh: &DistributedMesh, rank: Rank) -> Result<(), GhostingError> {
        for e in self.elements() {
            ensure(mesh.is_active(e), || {
                format!("ghost set for rank {rank} holds inactive or missing element {e}")
            })?;
            ensure(mesh.owner(e) != Some(rank), || {
                format!("ghost set for rank {rank} holds its own element {e}")
            })?;
        }
        Ok(())
    }
}

impl FromIterator<ElemId> for GhostSet {
    fn from_iter<T: IntoIterator<Item = ElemId>>(iter: T) -> Self {
        let mut s = GhostSet::new();
        for e in iter {
            s.insert_full(e);
        }
        s
    }
}
