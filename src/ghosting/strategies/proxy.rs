//! Mirror the ghosting of the peer copy of a system.
//!
//! A proxy re-asks every non-proxy manager of the same class attached to the
//! peer system (the displaced copy of an undisplaced system, or vice versa)
//! and translates element ids both ways through their shared unique ids. Two
//! copies of a system that are supposed to be identical therefore ghost the
//! same elements.

use crate::ghosting::descriptor::GhostingClass;
use crate::ghosting::ghost_set::GhostSet;
use crate::ghosting::manager::RelationshipManager;
use crate::ghosting::{GhostingFunctor, QueryContext};
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::point::ElemId;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProxyMirror;

fn translate(
    from: &DistributedMesh,
    to: &DistributedMesh,
    e: ElemId,
    system: &'static str,
) -> Result<ElemId, GhostingError> {
    let uid = from
        .elem(e)
        .ok_or(GhostingError::UnknownElement(e))?
        .unique_id;
    to.elem_by_unique_id(uid)
        .ok_or(GhostingError::CrossReferenceMissing {
            unique_id: uid,
            system,
        })
}

impl ProxyMirror {
    pub fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        class: GhostingClass,
        name: &str,
        range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError> {
        let peer_ctx = ctx
            .peer_context()
            .ok_or_else(|| GhostingError::PeerUnavailable(name.to_string()))?;

        let mut mirrored: Vec<&Arc<RelationshipManager>> = Vec::new();
        if class.contains(GhostingClass::GEOMETRIC) {
            mirrored.extend(peer_ctx.mesh.ghosting_functors());
        }
        if class.intersects(GhostingClass::ALGEBRAIC | GhostingClass::COUPLING) {
            let dof_map = peer_ctx
                .dof_map
                .ok_or_else(|| GhostingError::PeerUnavailable(name.to_string()))?;
            if class.contains(GhostingClass::ALGEBRAIC) {
                mirrored.extend(dof_map.algebraic_functors());
            }
            if class.contains(GhostingClass::COUPLING) {
                mirrored.extend(dof_map.coupling_functors());
            }
        }
        mirrored.retain(|rm| !rm.is_proxy() && rm.descriptor().class.intersects(class));
        if mirrored.is_empty() {
            return Ok(());
        }

        let peer_range = range
            .iter()
            .map(|&e| translate(ctx.mesh, peer_ctx.mesh, e, "peer"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut peer_out = GhostSet::new();
        for rm in mirrored {
            rm.coupled_elements(&peer_ctx, &peer_range, &mut peer_out)?;
        }
        for (pe, cm) in peer_out.iter() {
            if !peer_ctx.mesh.contains(pe) {
                continue;
            }
            let local = translate(peer_ctx.mesh, ctx.mesh, pe, "local")?;
            out.insert(local, cm.cloned().map(Arc::new));
        }
        Ok(())
    }
}
