//! Ghosting from caller-supplied adjacency.
//!
//! [`CustomTopology`] owns a copy of an element-to-element table; the
//! caller's table may be dropped or mutated after registration.
//! [`ExplicitGhosting`] replicates listed elements and every element on
//! listed boundaries to all ranks.

use crate::ghosting::ghost_set::GhostSet;
use crate::ghosting::QueryContext;
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::point::ElemId;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// Element adjacency table, stored symmetrically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomTopology {
    table: BTreeMap<ElemId, BTreeSet<ElemId>>,
}

impl CustomTopology {
    /// Copy `table`, adding the reverse of every entry.
    pub fn from_table(table: &BTreeMap<ElemId, Vec<ElemId>>) -> Self {
        let mut sym: BTreeMap<ElemId, BTreeSet<ElemId>> = BTreeMap::new();
        for (&a, bs) in table {
            for &b in bs {
                if a == b {
                    continue;
                }
                sym.entry(a).or_default().insert(b);
                sym.entry(b).or_default().insert(a);
            }
        }
        Self { table: sym }
    }

    pub fn from_pairs(pairs: &[(ElemId, ElemId)]) -> Self {
        let mut table: BTreeMap<ElemId, Vec<ElemId>> = BTreeMap::new();
        for &(a, b) in pairs {
            table.entry(a).or_default().push(b);
        }
        Self::from_table(&table)
    }

    pub fn n_links(&self) -> usize {
        self.table.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn coupled_elements(
        &self,
        _ctx: &QueryContext<'_>,
        range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError> {
        for e in range {
            if let Some(adj) = self.table.get(e) {
                adj.iter().for_each(|n| out.insert_full(*n));
            }
        }
        Ok(())
    }

    /// Every link of `other` is present here.
    pub fn covers(&self, other: &CustomTopology) -> bool {
        other.table.iter().all(|(a, bs)| {
            self.table
                .get(a)
                .is_some_and(|mine| bs.is_subset(mine))
        })
    }

    pub fn info(&self) -> String {
        format!("custom topology with {} links", self.n_links())
    }
}

/// Elements and boundaries replicated on every rank.
#[derive(Debug, Default)]
pub struct ExplicitGhosting {
    elements: RwLock<BTreeSet<ElemId>>,
    boundaries: RwLock<BTreeSet<String>>,
}

impl Clone for ExplicitGhosting {
    fn clone(&self) -> Self {
        Self {
            elements: RwLock::new(self.elements.read().clone()),
            boundaries: RwLock::new(self.boundaries.read().clone()),
        }
    }
}

impl ExplicitGhosting {
    pub fn new<E, B>(elements: E, boundaries: B) -> Self
    where
        E: IntoIterator<Item = ElemId>,
        B: IntoIterator<Item = String>,
    {
        Self {
            elements: RwLock::new(elements.into_iter().collect()),
            boundaries: RwLock::new(boundaries.into_iter().collect()),
        }
    }

    pub fn add_element(&self, e: ElemId) {
        self.elements.write().insert(e);
    }

    pub fn add_boundary(&self, name: &str) {
        self.boundaries.write().insert(name.to_string());
    }

    pub fn check_boundaries(&self, mesh: &DistributedMesh) -> Result<(), GhostingError> {
        for name in self.boundaries.read().iter() {
            mesh.boundary_id(name)?;
        }
        Ok(())
    }

    /// Boundary names are resolved on every query since more can be added.
    pub fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        _range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError> {
        for e in self.elements.read().iter() {
            out.insert_full(*e);
        }
        for name in self.boundaries.read().iter() {
            let bid = ctx.mesh.boundary_id(name)?;
            for e in ctx.mesh.active_elements_on_boundary(bid) {
                out.insert_full(e);
            }
        }
        Ok(())
    }

    pub fn covers(&self, other: &ExplicitGhosting) -> bool {
        other.elements.read().is_subset(&self.elements.read())
            && other.boundaries.read().is_subset(&self.boundaries.read())
    }

    pub fn info(&self) -> String {
        format!(
            "{} explicit element(s), {} explicit boundary(ies)",
            self.elements.read().len(),
            self.boundaries.read().len()
        )
    }
}
