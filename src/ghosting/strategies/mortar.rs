//! Ghost the elements coupled across a mortar interface.
//!
//! Before the mesh carries the interface's coupling table, every active
//! element on either boundary and in either lower-dimensional subdomain is
//! ghosted. Coupling-class instances skip that conservative phase: sparsity
//! is only built once the table exists. Afterwards each queried element is
//! mapped to its lower-d faces, the faces to their coupled counterparts, and
//! the counterparts to their interior parents.

use crate::ghosting::descriptor::GhostingClass;
use crate::ghosting::ghost_set::GhostSet;
use crate::ghosting::QueryContext;
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::mortar::MortarInterfaceKey;
use crate::topology::point::ElemId;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Names identifying one mortar interface.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MortarNames {
    pub primary_boundary: String,
    pub secondary_boundary: String,
    pub primary_subdomain: String,
    pub secondary_subdomain: String,
}

impl MortarNames {
    pub fn resolve(&self, mesh: &DistributedMesh) -> Result<MortarInterfaceKey, GhostingError> {
        Ok(MortarInterfaceKey {
            primary_boundary: mesh.boundary_id(&self.primary_boundary)?,
            secondary_boundary: mesh.boundary_id(&self.secondary_boundary)?,
            primary_subdomain: mesh.subdomain_id(&self.primary_subdomain)?,
            secondary_subdomain: mesh.subdomain_id(&self.secondary_subdomain)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct MortarInterface {
    names: MortarNames,
    ghost_point_neighbors: bool,
    key: OnceCell<MortarInterfaceKey>,
}

impl MortarInterface {
    pub fn new(names: MortarNames, ghost_point_neighbors: bool) -> Self {
        Self {
            names,
            ghost_point_neighbors,
            key: OnceCell::new(),
        }
    }

    pub fn names(&self) -> &MortarNames {
        &self.names
    }

    fn add_with_parent(&self, mesh: &DistributedMesh, lower: ElemId, out: &mut GhostSet) {
        out.insert_full(lower);
        if let Some(parent) = mesh.elem(lower).and_then(|e| e.interior_parent) {
            out.insert_full(parent);
            if self.ghost_point_neighbors {
                for n in mesh.point_neighbors(parent) {
                    out.insert_full(n);
                }
            }
        }
    }

    /// Resolve the names against `mesh` and cache the interface key.
    pub fn resolve(&self, mesh: &DistributedMesh) -> Result<MortarInterfaceKey, GhostingError> {
        self.key.get_or_try_init(|| self.names.resolve(mesh)).copied()
    }

    pub fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        class: GhostingClass,
        range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError> {
        let mesh = ctx.mesh;
        let key = self.resolve(mesh)?;

        let Some(table) = mesh.mortar_interface(&key) else {
            if ctx.coupling || class == GhostingClass::COUPLING {
                return Ok(());
            }
            log::trace!("mortar interface {key:?} has no coupling table yet; ghosting whole interface");
            for b in [key.primary_boundary, key.secondary_boundary] {
                mesh.active_elements_on_boundary(b)
                    .into_iter()
                    .for_each(|e| out.insert_full(e));
            }
            for s in [key.primary_subdomain, key.secondary_subdomain] {
                mesh.active_elements_in_subdomain(s)
                    .into_iter()
                    .for_each(|e| out.insert_full(e));
            }
            return Ok(());
        };

        for &e in range {
            let Some(elem) = mesh.elem(e) else { continue };
            let faces: Vec<ElemId> = if elem.interior_parent.is_some() {
                vec![e]
            } else {
                mesh.lower_d_children(e)
            };
            for face in faces {
                let Some(sub) = mesh.elem(face).map(|f| f.subdomain_id) else {
                    continue;
                };
                if sub == key.secondary_subdomain {
                    for p in table.primaries_of(face) {
                        self.add_with_parent(mesh, p, out);
                    }
                } else if sub == key.primary_subdomain {
                    for s in table.secondaries_of(face) {
                        self.add_with_parent(mesh, s, out);
                    }
                }
            }
        }
        Ok(())
    }

    /// Same interface, and at least as much point-neighbour ghosting.
    pub fn covers(&self, other: &MortarInterface) -> bool {
        self.names == other.names && (self.ghost_point_neighbors || !other.ghost_point_neighbors)
    }

    pub fn info(&self) -> String {
        format!(
            "mortar interface {}/{} ({} <-> {})",
            self.names.primary_boundary,
            self.names.secondary_boundary,
            self.names.primary_subdomain,
            self.names.secondary_subdomain
        )
    }
}
