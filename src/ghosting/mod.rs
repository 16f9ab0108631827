//! The ghosting query protocol.
//!
//! A ghosting functor answers one question: given a range of elements owned
//! by rank `p`, which other elements must `p` replicate, and with what
//! coupling? Engines (the mesh, DOF maps, the coordinator) ask every attached
//! functor and merge the answers with the [`GhostSet`] merge rule.
//!
//! Queries are deterministic and side-effect free. The only state a query may
//! touch is an idempotent cache of resolved boundary/subdomain ids. Functors
//! are `Send + Sync`, so per-rank queries may run concurrently once bound.

pub mod descriptor;
pub mod ghost_set;
pub mod manager;
pub mod rule;
pub mod strategies;

pub use descriptor::{GhostingClass, RelationshipDescriptor, TargetSystem};
pub use ghost_set::GhostSet;
pub use manager::RelationshipManager;
pub use rule::{AdjacencyRule, GhostingRule};

use crate::dof::DofMap;
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::point::{ElemId, Rank};
use std::fmt;
use std::sync::Arc;

/// The other copy of the system a proxy mirrors.
#[derive(Copy, Clone, Debug)]
pub struct PeerView<'a> {
    pub mesh: &'a DistributedMesh,
    pub dof_map: Option<&'a DofMap>,
}

/// Everything a functor may consult while answering a query.
#[derive(Copy, Clone, Debug)]
pub struct QueryContext<'a> {
    pub mesh: &'a DistributedMesh,
    pub dof_map: Option<&'a DofMap>,
    pub peer: Option<PeerView<'a>>,
    /// The functor is being evaluated as coupling (sparsity) ghosting.
    pub coupling: bool,
}

impl<'a> QueryContext<'a> {
    pub fn new(mesh: &'a DistributedMesh) -> Self {
        Self {
            mesh,
            dof_map: None,
            peer: None,
            coupling: false,
        }
    }

    pub fn with_dof_map(mut self, dof_map: &'a DofMap) -> Self {
        self.dof_map = Some(dof_map);
        self
    }

    pub fn with_peer(mut self, peer: Option<PeerView<'a>>) -> Self {
        self.peer = peer;
        self
    }

    pub fn for_coupling(mut self) -> Self {
        self.coupling = true;
        self
    }

    /// Context for querying the peer system itself.
    pub fn peer_context(&self) -> Option<QueryContext<'a>> {
        self.peer.map(|p| QueryContext {
            mesh: p.mesh,
            dof_map: p.dof_map,
            peer: None,
            coupling: self.coupling,
        })
    }
}

/// A source of ghosting and coupling information.
pub trait GhostingFunctor: Send + Sync + fmt::Debug {
    /// Add to `out` every element `range` couples to, unfiltered.
    ///
    /// This is the raw adjacency; sparsity construction uses it directly.
    fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError>;

    /// Elements rank `rank` must ghost for `range`: the raw adjacency minus
    /// elements owned by `rank` and inactive or absent elements.
    fn query(
        &self,
        ctx: &QueryContext<'_>,
        range: &[ElemId],
        rank: Rank,
    ) -> Result<GhostSet, GhostingError> {
        let mut out = GhostSet::new();
        self.coupled_elements(ctx, range, &mut out)?;
        out.retain(|e| ctx.mesh.is_active(e) && ctx.mesh.owner(e) != Some(rank));
        Ok(out)
    }

    /// The mesh was (re)prepared.
    fn mesh_reinit(&self, _mesh: &DistributedMesh) -> Result<(), GhostingError> {
        Ok(())
    }

    /// The DOF map was (re)distributed.
    fn dofmap_reinit(&self, _dof_map: &DofMap) -> Result<(), GhostingError> {
        Ok(())
    }

    /// Remote elements were deleted from `mesh`.
    fn delete_remote_elements(&self, _mesh: &DistributedMesh) -> Result<(), GhostingError> {
        Ok(())
    }
}

/// Query every functor and merge the answers.
pub fn merge_queries<'r, I>(
    functors: I,
    ctx: &QueryContext<'_>,
    range: &[ElemId],
    rank: Rank,
) -> Result<GhostSet, GhostingError>
where
    I: IntoIterator<Item = &'r Arc<RelationshipManager>>,
{
    let mut merged = GhostSet::new();
    for f in functors {
        let part = f.query(ctx, range, rank)?;
        log::trace!("`{}` ghosts {} elements for rank {rank}", f.name(), part.len());
        merged.merge(part);
    }
    crate::debug_invariants!(merged.validate_for(ctx.mesh, rank), "merge_queries");
    Ok(merged)
}
