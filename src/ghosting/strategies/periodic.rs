//! Ghost the periodic images of boundary elements.
//!
//! Until the mesh has paired the sides of a periodic boundary, every active
//! element on either side is ghosted (the conservative phase). Once the
//! pairing exists, only the actual images of the queried elements are
//! ghosted, optionally with their point neighbours.

use crate::ghosting::descriptor::GhostingClass;
use crate::ghosting::ghost_set::GhostSet;
use crate::ghosting::QueryContext;
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::periodic::PeriodicBoundary;
use crate::topology::point::ElemId;
use once_cell::sync::OnceCell;

#[derive(Clone, Debug, Default)]
pub struct PeriodicImages {
    /// `(primary, secondary)` boundary names; `None` means every periodic
    /// boundary the mesh declares.
    pair: Option<(String, String)>,
    ghost_point_neighbors: bool,
    resolved: OnceCell<PeriodicBoundary>,
}

impl PeriodicImages {
    pub fn new(pair: Option<(String, String)>, ghost_point_neighbors: bool) -> Self {
        Self {
            pair,
            ghost_point_neighbors,
            resolved: OnceCell::new(),
        }
    }

    pub fn pair(&self) -> Option<&(String, String)> {
        self.pair.as_ref()
    }

    fn boundaries(&self, mesh: &DistributedMesh) -> Result<Vec<PeriodicBoundary>, GhostingError> {
        match &self.pair {
            None => Ok(mesh.periodic_boundaries().copied().collect()),
            Some((p, s)) => {
                let pb = self.resolved.get_or_try_init(|| {
                    Ok::<_, GhostingError>(PeriodicBoundary::new(
                        mesh.boundary_id(p)?,
                        mesh.boundary_id(s)?,
                    ))
                })?;
                Ok(vec![*pb])
            }
        }
    }

    /// Resolve the boundary names against `mesh` and cache the pair.
    pub fn resolve(&self, mesh: &DistributedMesh) -> Result<(), GhostingError> {
        self.boundaries(mesh).map(|_| ())
    }

    pub fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        class: GhostingClass,
        range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError> {
        let mesh = ctx.mesh;
        for pb in self.boundaries(mesh)? {
            if !mesh.has_periodic_pairing(&pb) {
                if ctx.coupling || class == GhostingClass::COUPLING {
                    continue;
                }
                log::trace!("periodic pair {pb:?} not yet paired; ghosting both sides");
                for b in [pb.primary, pb.secondary] {
                    for e in mesh.active_elements_on_boundary(b) {
                        out.insert_full(e);
                    }
                }
                continue;
            }
            for &e in range {
                let Some(elem) = mesh.elem(e) else { continue };
                for s in 0..elem.n_sides() as u16 {
                    if !mesh.boundary_ids(e, s).any(|b| pb.involves(b)) {
                        continue;
                    }
                    if let Some(image) = mesh.periodic_neighbor(e, s) {
                        out.insert_full(image);
                        if self.ghost_point_neighbors {
                            for n in mesh.point_neighbors(image) {
                                out.insert_full(n);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Same pair, and at least as much point-neighbour ghosting.
    pub fn covers(&self, other: &PeriodicImages) -> bool {
        let pair_covers = match (&self.pair, &other.pair) {
            (None, _) => true,
            (Some(a), Some(b)) => a == b,
            (Some(_), None) => false,
        };
        pair_covers && (self.ghost_point_neighbors || !other.ghost_point_neighbors)
    }

    pub fn info(&self) -> String {
        match &self.pair {
            Some((p, s)) => format!("periodic images across {p} <-> {s}"),
            None => "periodic images across every periodic boundary".to_string(),
        }
    }
}
