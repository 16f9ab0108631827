//! A relationship manager: descriptor + adjacency rule + binding state.
//!
//! Managers are shared as `Arc<RelationshipManager>` between the coordinator,
//! the mesh (geometric ghosting) and DOF maps (algebraic/coupling ghosting).
//! After binding they are read-only apart from the append-only `for_whom`
//! list and the lazily resolved id caches inside their rules.

use crate::algs::communicator::Communicator;
use crate::dof::DofMap;
use crate::ghosting::descriptor::{GhostingClass, RelationshipDescriptor, TargetSystem};
use crate::ghosting::ghost_set::GhostSet;
use crate::ghosting::rule::AdjacencyRule;
use crate::ghosting::strategies::SharedElementData;
use crate::ghosting::{GhostingFunctor, QueryContext};
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::point::{ElemId, Rank};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub struct RelationshipManager {
    name: String,
    descriptor: RelationshipDescriptor,
    rule: AdjacencyRule,
    mesh_bound: OnceCell<()>,
    dof_bound: OnceCell<String>,
}

impl RelationshipManager {
    /// Create a manager with a unique generated name.
    pub fn new(descriptor: RelationshipDescriptor, rule: AdjacencyRule) -> Self {
        let n = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}_{n}", descriptor.type_name);
        Self::named(&name, descriptor, rule)
    }

    pub fn named(name: &str, descriptor: RelationshipDescriptor, rule: AdjacencyRule) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
            rule,
            mesh_bound: OnceCell::new(),
            dof_bound: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &RelationshipDescriptor {
        &self.descriptor
    }

    pub fn rule(&self) -> &AdjacencyRule {
        &self.rule
    }

    pub fn class(&self) -> GhostingClass {
        self.descriptor.class
    }

    pub fn target(&self) -> TargetSystem {
        self.descriptor.target
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self.rule, AdjacencyRule::Proxy(_))
    }

    pub fn attach_early(&self) -> bool {
        self.descriptor.attach_early()
    }

    /// `false` when class or target differ; otherwise the rule comparison.
    pub fn covers(&self, other: &RelationshipManager) -> Result<bool, GhostingError> {
        if self.class() != other.class() || self.target() != other.target() {
            return Ok(false);
        }
        self.rule.covers(&other.rule)
    }

    /// Bind to the mesh. A manager is bound to at most one mesh.
    pub fn bind_mesh(&self) -> Result<(), GhostingError> {
        self.mesh_bound
            .set(())
            .map_err(|_| GhostingError::AlreadyBound {
                manager: self.name.clone(),
                phase: "mesh",
            })
    }

    /// Bind to the DOF map of `system`. At most one DOF map per manager;
    /// further systems get clones.
    pub fn bind_dof_map(&self, system: &str) -> Result<(), GhostingError> {
        if !self.descriptor.class.needs_dof_map() {
            return Err(GhostingError::InvalidConfiguration {
                manager: self.name.clone(),
                reason: "geometric-only managers do not attach to DOF maps".into(),
            });
        }
        self.dof_bound
            .set(system.to_string())
            .map_err(|_| GhostingError::AlreadyBound {
                manager: self.name.clone(),
                phase: "DOF map",
            })
    }

    pub fn is_mesh_bound(&self) -> bool {
        self.mesh_bound.get().is_some()
    }

    pub fn bound_system(&self) -> Option<&str> {
        self.dof_bound.get().map(String::as_str)
    }

    pub fn is_bound(&self) -> bool {
        self.is_mesh_bound() || self.bound_system().is_some()
    }

    /// A fresh, unbound copy sharing descriptor and rule, named after the
    /// system it is for.
    pub fn clone_for(&self, system: &str) -> RelationshipManager {
        Self::named(
            &format!("{}@{system}", self.name),
            self.descriptor.clone(),
            self.rule.clone(),
        )
    }

    /// Forward a repartition to the rule. Only redistribution rules act.
    pub fn redistribute<C: Communicator>(
        &self,
        mesh: &DistributedMesh,
        moved: &[(ElemId, Rank, Rank)],
        comm: &C,
    ) -> Result<usize, GhostingError> {
        match &self.rule {
            AdjacencyRule::Redistribution(r) => r.redistribute(mesh, moved, comm),
            _ => Ok(0),
        }
    }

    /// Register a store with a redistribution manager.
    pub fn add_element_data(&self, store: SharedElementData) -> Result<(), GhostingError> {
        match &self.rule {
            AdjacencyRule::Redistribution(r) => {
                r.add_store(store);
                Ok(())
            }
            _ => Err(GhostingError::InvalidConfiguration {
                manager: self.name.clone(),
                reason: "only RedistributeProperties carries element data".into(),
            }),
        }
    }

    /// One-line human-readable description.
    pub fn info(&self) -> String {
        let whom = self.descriptor.for_whom();
        format!(
            "{} [{:?}, {}]: {}{}",
            self.descriptor.type_name,
            self.class(),
            self.target().as_str(),
            self.rule.info(),
            if whom.is_empty() {
                String::new()
            } else {
                format!(" for {}", whom.join(", "))
            }
        )
    }
}

impl GhostingFunctor for RelationshipManager {
    fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError> {
        self.rule
            .coupled_elements(ctx, self.class(), &self.name, range, out)
    }

    fn query(
        &self,
        ctx: &QueryContext<'_>,
        range: &[ElemId],
        rank: Rank,
    ) -> Result<GhostSet, GhostingError> {
        if !self.is_bound() {
            return Err(GhostingError::NotBound {
                manager: self.name.clone(),
                phase: "mesh",
            });
        }
        let mut out = GhostSet::new();
        self.coupled_elements(ctx, range, &mut out)?;
        out.retain(|e| ctx.mesh.is_active(e) && ctx.mesh.owner(e) != Some(rank));
        Ok(out)
    }

    fn dofmap_reinit(&self, dof_map: &DofMap) -> Result<(), GhostingError> {
        log::trace!("`{}` sees DOF map `{}` reinit", self.name, dof_map.system_name());
        Ok(())
    }

    fn delete_remote_elements(&self, mesh: &DistributedMesh) -> Result<(), GhostingError> {
        if let AdjacencyRule::Redistribution(r) = &self.rule {
            r.delete_remote_elements(mesh);
        }
        Ok(())
    }
}
