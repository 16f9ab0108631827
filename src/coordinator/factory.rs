//! Build relationship managers from parameters, by type name.

use crate::algs::lattice::AdjacencyKind;
use crate::coordinator::config::RelationshipManagerParams;
use crate::dof::coupling::CouplingMatrix;
use crate::ghosting::descriptor::RelationshipDescriptor;
use crate::ghosting::manager::RelationshipManager;
use crate::ghosting::rule::AdjacencyRule;
use crate::ghosting::strategies::{
    CustomTopology, ExplicitGhosting, LayeredNeighbors, MortarInterface, MortarNames,
    PeriodicImages, ProxyMirror, RedistributeProperties,
};
use crate::mesh_error::GhostingError;
use hashbrown::HashMap;
use std::sync::Arc;

/// Builds the rule for one type name.
pub type RuleConstructor =
    Box<dyn Fn(&RelationshipManagerParams) -> Result<AdjacencyRule, GhostingError> + Send + Sync>;

fn invalid(params: &RelationshipManagerParams, reason: impl Into<String>) -> GhostingError {
    GhostingError::InvalidConfiguration {
        manager: params.type_name.clone(),
        reason: reason.into(),
    }
}

fn layered(kind: AdjacencyKind) -> RuleConstructor {
    Box::new(move |p| {
        if kind == AdjacencyKind::Side && p.use_point_neighbors {
            return Err(invalid(p, "use_point_neighbors contradicts side-neighbour layers"));
        }
        let mut rule = LayeredNeighbors::new(kind, p.layers.unwrap_or(1))?;
        if !p.coupling.is_empty() {
            rule = rule.with_coupling(CouplingMatrix::from_pairs(0, &p.coupling));
        }
        Ok(AdjacencyRule::Layered(rule))
    })
}

fn periodic() -> RuleConstructor {
    Box::new(|p| {
        let pair = match (&p.primary_boundary, &p.secondary_boundary) {
            (Some(a), Some(b)) => Some((a.clone(), b.clone())),
            (None, None) => None,
            _ => return Err(invalid(p, "give both primary_boundary and secondary_boundary or neither")),
        };
        Ok(AdjacencyRule::Periodic(PeriodicImages::new(pair, p.ghost_point_neighbors)))
    })
}

fn mortar() -> RuleConstructor {
    Box::new(|p| {
        let need = |v: &Option<String>, what: &str| {
            v.clone()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| invalid(p, format!("missing {what}")))
        };
        let names = MortarNames {
            primary_boundary: need(&p.primary_boundary, "primary_boundary")?,
            secondary_boundary: need(&p.secondary_boundary, "secondary_boundary")?,
            primary_subdomain: need(&p.primary_subdomain, "primary_subdomain")?,
            secondary_subdomain: need(&p.secondary_subdomain, "secondary_subdomain")?,
        };
        if names.primary_boundary == names.secondary_boundary {
            return Err(invalid(p, "primary and secondary boundary are the same"));
        }
        Ok(AdjacencyRule::Mortar(MortarInterface::new(names, p.ghost_point_neighbors)))
    })
}

/// Type-name registry plus live/released instance accounting.
pub struct ManagerFactory {
    constructors: HashMap<String, RuleConstructor>,
    live: usize,
    released: usize,
}

impl std::fmt::Debug for ManagerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("ManagerFactory")
            .field("types", &names)
            .field("live", &self.live)
            .field("released", &self.released)
            .finish()
    }
}

impl Default for ManagerFactory {
    fn default() -> Self {
        let mut f = Self {
            constructors: HashMap::new(),
            live: 0,
            released: 0,
        };
        f.register_type("ElementSideNeighborLayers", layered(AdjacencyKind::Side));
        f.register_type("ElementPointNeighborLayers", layered(AdjacencyKind::Point));
        f.register_type("ProxyRelationshipManager", Box::new(|_| Ok(AdjacencyRule::Proxy(ProxyMirror))));
        f.register_type("PeriodicImageGhosting", periodic());
        f.register_type("AugmentSparsityOnInterface", mortar());
        f.register_type(
            "RedistributeProperties",
            Box::new(|_| Ok(AdjacencyRule::Redistribution(RedistributeProperties::new()))),
        );
        f.register_type(
            "ExplicitGhosting",
            Box::new(|p| {
                if p.elements.is_empty() && p.boundaries.is_empty() {
                    return Err(invalid(p, "needs elements or boundaries"));
                }
                Ok(AdjacencyRule::Explicit(ExplicitGhosting::new(
                    p.elements.iter().copied(),
                    p.boundaries.iter().cloned(),
                )))
            }),
        );
        f.register_type(
            "CustomTopologyGhosting",
            Box::new(|p| {
                if p.adjacency.is_empty() {
                    return Err(invalid(p, "needs a non-empty adjacency table"));
                }
                Ok(AdjacencyRule::Table(CustomTopology::from_pairs(&p.adjacency)))
            }),
        );
        f
    }
}

impl ManagerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the constructor for `type_name`.
    pub fn register_type(&mut self, type_name: &str, ctor: RuleConstructor) {
        self.constructors.insert(type_name.to_string(), ctor);
    }

    pub fn knows(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Build a manager. Configuration problems surface here, at registration.
    pub fn create(
        &mut self,
        params: &RelationshipManagerParams,
    ) -> Result<RelationshipManager, GhostingError> {
        let ctor = self
            .constructors
            .get(&params.type_name)
            .ok_or_else(|| GhostingError::UnknownStrategy(params.type_name.clone()))?;
        if params.class.is_empty() {
            return Err(invalid(params, "class must name at least one of GEOMETRIC, ALGEBRAIC, COUPLING"));
        }
        let rule = ctor(params)?;
        let descriptor = RelationshipDescriptor::new(&params.type_name, params.class)
            .with_target(params.target())
            .with_attach_geometric_early(params.attach_geometric_early)
            .for_whom_tag(&params.for_whom);
        Ok(self.adopt(RelationshipManager::new(descriptor, rule)))
    }

    /// Count a manager built outside the factory.
    pub fn adopt(&mut self, rm: RelationshipManager) -> RelationshipManager {
        self.live += 1;
        rm
    }

    /// Give back a manager rejected as redundant.
    pub fn release(&mut self, rm: RelationshipManager) {
        log::debug!("releasing redundant relationship manager `{}`", rm.name());
        self.live = self.live.saturating_sub(1);
        self.released += 1;
        drop(rm);
    }

    /// Drop a manager that failed validation before admission.
    pub fn reject(&mut self, rm: RelationshipManager) {
        log::debug!("rejecting invalid relationship manager `{}`", rm.name());
        self.live = self.live.saturating_sub(1);
    }

    /// Account for a manager removed after acceptance.
    pub fn retire(&mut self, rm: &Arc<RelationshipManager>) {
        log::debug!("retiring relationship manager `{}`", rm.name());
        self.live = self.live.saturating_sub(1);
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn released(&self) -> usize {
        self.released
    }
}
