//! Degree-of-freedom collaborator.
//!
//! A [`DofMap`] numbers the unknowns of one system and carries the algebraic
//! and coupling ghosting attached to it. Numbering is deterministic and
//! global: variable `v` of element `e` is dof `e * n_vars + v`. Distribution
//! computes the rank's local dofs and its send list (the non-local dofs its
//! algebraic and coupling ghosting require); sparsity construction asks the
//! coupling ghosting which elements each local element couples to.

pub mod coupling;
pub mod system;

pub use coupling::CouplingMatrix;
pub use system::{Constraint, GhostedVector, MatrixStorage, System};

use crate::ghosting::ghost_set::GhostSet;
use crate::ghosting::manager::RelationshipManager;
use crate::ghosting::{merge_queries, GhostingFunctor, PeerView, QueryContext};
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::point::ElemId;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;

/// Row-wise nonzero structure of a system matrix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparsityPattern {
    rows: BTreeMap<u64, BTreeSet<u64>>,
}

impl SparsityPattern {
    pub fn add(&mut self, row: u64, col: u64) {
        self.rows.entry(row).or_default().insert(col);
    }

    pub fn contains(&self, row: u64, col: u64) -> bool {
        self.rows.get(&row).is_some_and(|r| r.contains(&col))
    }

    pub fn row_nnz(&self, row: u64) -> usize {
        self.rows.get(&row).map_or(0, BTreeSet::len)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_nonzeros(&self) -> usize {
        self.rows.values().map(BTreeSet::len).sum()
    }

    pub fn rows(&self) -> impl Iterator<Item = (u64, &BTreeSet<u64>)> {
        self.rows.iter().map(|(r, cols)| (*r, cols))
    }
}

/// Unknown numbering plus attached algebraic/coupling ghosting for one system.
#[derive(Debug)]
pub struct DofMap {
    system: String,
    n_vars: usize,
    algebraic: Vec<Arc<RelationshipManager>>,
    coupling: Vec<Arc<RelationshipManager>>,
    local_dofs: Vec<u64>,
    send_list: Vec<u64>,
    sparsity: SparsityPattern,
    n_distributions: usize,
}

impl DofMap {
    pub fn new(system: &str, n_vars: usize) -> Self {
        Self {
            system: system.to_string(),
            n_vars: n_vars.max(1),
            algebraic: Vec::new(),
            coupling: Vec::new(),
            local_dofs: Vec::new(),
            send_list: Vec::new(),
            sparsity: SparsityPattern::default(),
            n_distributions: 0,
        }
    }

    pub fn system_name(&self) -> &str {
        &self.system
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Global index of variable `var` on element `e`.
    #[inline]
    pub fn dof(&self, e: ElemId, var: usize) -> Result<u64, GhostingError> {
        e.get()
            .checked_mul(self.n_vars as u64)
            .and_then(|base| base.checked_add(var as u64))
            .ok_or(GhostingError::DofIndexOverflow {
                elem: e,
                n_vars: self.n_vars,
            })
    }

    /// The contiguous dof range of element `e`.
    pub fn elem_dofs(&self, e: ElemId) -> Result<Range<u64>, GhostingError> {
        let first = self.dof(e, 0)?;
        let end = first
            .checked_add(self.n_vars as u64)
            .ok_or(GhostingError::DofIndexOverflow {
                elem: e,
                n_vars: self.n_vars,
            })?;
        Ok(first..end)
    }

    pub fn add_algebraic_ghosting_functor(&mut self, rm: Arc<RelationshipManager>) {
        self.algebraic.push(rm);
    }

    pub fn add_coupling_functor(&mut self, rm: Arc<RelationshipManager>) {
        self.coupling.push(rm);
    }

    /// Detach every manager named `name`. Returns how many were removed.
    pub fn remove_functor(&mut self, name: &str) -> usize {
        let before = self.algebraic.len() + self.coupling.len();
        self.algebraic.retain(|rm| rm.name() != name);
        self.coupling.retain(|rm| rm.name() != name);
        before - self.algebraic.len() - self.coupling.len()
    }

    pub fn algebraic_functors(&self) -> &[Arc<RelationshipManager>] {
        &self.algebraic
    }

    pub fn coupling_functors(&self) -> &[Arc<RelationshipManager>] {
        &self.coupling
    }

    /// Number local dofs and compute the send list.
    pub fn distribute_dofs(
        &mut self,
        mesh: &DistributedMesh,
        peer: Option<PeerView<'_>>,
    ) -> Result<(), GhostingError> {
        let me = mesh.my_rank();
        let local = mesh.active_local_elements();
        let ghosts = {
            let ctx = QueryContext::new(mesh).with_dof_map(self).with_peer(peer);
            let mut g = merge_queries(&self.algebraic, &ctx, &local, me)?;
            g.merge(merge_queries(&self.coupling, &ctx.for_coupling(), &local, me)?);
            g
        };
        let mut local_dofs = Vec::with_capacity(local.len() * self.n_vars);
        for &e in &local {
            local_dofs.extend(self.elem_dofs(e)?);
        }
        let mut send_list = Vec::new();
        for e in ghosts.elements() {
            send_list.extend(self.elem_dofs(e)?);
        }
        self.local_dofs = local_dofs;
        send_list.sort_unstable();
        send_list.dedup();
        self.send_list = send_list;
        self.n_distributions += 1;
        log::debug!(
            "rank {me}: system `{}` has {} local dofs, {} ghost dofs",
            self.system,
            self.local_dofs.len(),
            self.send_list.len()
        );
        Ok(())
    }

    /// Build the sparsity pattern of the local rows.
    ///
    /// Every element couples fully to itself; other couplings come from the
    /// attached coupling ghosting, restricted by its coupling matrices.
    pub fn compute_sparsity(
        &mut self,
        mesh: &DistributedMesh,
        peer: Option<PeerView<'_>>,
    ) -> Result<(), GhostingError> {
        let mut pattern = SparsityPattern::default();
        {
            let ctx = QueryContext::new(mesh)
                .with_dof_map(self)
                .with_peer(peer)
                .for_coupling();
            for e in mesh.active_local_elements() {
                let mut coupled = GhostSet::new();
                coupled.insert(e, None);
                for rm in &self.coupling {
                    rm.coupled_elements(&ctx, &[e], &mut coupled)?;
                }
                for (c, cm) in coupled.iter() {
                    if !mesh.is_active(c) {
                        continue;
                    }
                    for vi in 0..self.n_vars {
                        let row = self.dof(e, vi)?;
                        for vj in 0..self.n_vars {
                            if cm.is_none_or(|m| m.get(vi, vj)) {
                                pattern.add(row, self.dof(c, vj)?);
                            }
                        }
                    }
                }
            }
        }
        log::trace!(
            "system `{}`: sparsity has {} nonzeros",
            self.system,
            pattern.n_nonzeros()
        );
        self.sparsity = pattern;
        Ok(())
    }

    pub fn local_dofs(&self) -> &[u64] {
        &self.local_dofs
    }

    pub fn send_list(&self) -> &[u64] {
        &self.send_list
    }

    pub fn sparsity(&self) -> &SparsityPattern {
        &self.sparsity
    }

    /// How many times dofs have been distributed.
    pub fn n_distributions(&self) -> usize {
        self.n_distributions
    }
}
