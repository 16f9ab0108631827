//! The adjacency rule a manager applies, and the plugin seam for rules
//! defined outside this crate.
//!
//! Built-in strategies are variants of the closed [`AdjacencyRule`] enum so
//! the comparator can match on family without downcasting. Anything else
//! implements [`GhostingRule`] and rides in [`AdjacencyRule::Plugin`].

use crate::ghosting::descriptor::GhostingClass;
use crate::ghosting::ghost_set::GhostSet;
use crate::ghosting::strategies::{
    CustomTopology, ExplicitGhosting, LayeredNeighbors, MortarInterface, PeriodicImages,
    ProxyMirror, RedistributeProperties,
};
use crate::ghosting::QueryContext;
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::point::ElemId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A ghosting rule supplied by a requester.
///
/// `covers` has no useful default: a plugin that does not implement it
/// cannot be compared, and registration reports
/// [`GhostingError::NotImplemented`] instead of guessing.
pub trait GhostingRule: Send + Sync + fmt::Debug {
    /// Family name; rules of different families never cover each other.
    fn family(&self) -> &str;

    fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError>;

    /// True if every element `other` would ghost, `self` ghosts too.
    /// Only called with rules of the same family.
    fn covers(&self, _other: &dyn GhostingRule) -> Result<bool, GhostingError> {
        Err(GhostingError::NotImplemented {
            family: self.family().to_string(),
            operation: "covers",
        })
    }

    /// For downcasting in `covers`.
    fn as_any(&self) -> &dyn Any;

    fn info(&self) -> String {
        self.family().to_string()
    }
}

#[derive(Clone, Debug)]
pub enum AdjacencyRule {
    Layered(LayeredNeighbors),
    Proxy(ProxyMirror),
    Periodic(PeriodicImages),
    Mortar(MortarInterface),
    Redistribution(RedistributeProperties),
    Table(CustomTopology),
    Explicit(ExplicitGhosting),
    Plugin(Arc<dyn GhostingRule>),
}

impl AdjacencyRule {
    pub fn family(&self) -> &str {
        match self {
            AdjacencyRule::Layered(_) => "layered",
            AdjacencyRule::Proxy(_) => "proxy",
            AdjacencyRule::Periodic(_) => "periodic",
            AdjacencyRule::Mortar(_) => "mortar",
            AdjacencyRule::Redistribution(_) => "redistribution",
            AdjacencyRule::Table(_) => "table",
            AdjacencyRule::Explicit(_) => "explicit",
            AdjacencyRule::Plugin(p) => p.family(),
        }
    }

    /// Raw adjacency of `range`. `class` and `name` come from the owning
    /// manager.
    pub fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        class: GhostingClass,
        name: &str,
        range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError> {
        match self {
            AdjacencyRule::Layered(r) => r.coupled_elements(ctx, range, out),
            AdjacencyRule::Proxy(r) => r.coupled_elements(ctx, class, name, range, out),
            AdjacencyRule::Periodic(r) => r.coupled_elements(ctx, class, range, out),
            AdjacencyRule::Mortar(r) => r.coupled_elements(ctx, class, range, out),
            AdjacencyRule::Redistribution(_) => Ok(()),
            AdjacencyRule::Table(r) => r.coupled_elements(ctx, range, out),
            AdjacencyRule::Explicit(r) => r.coupled_elements(ctx, range, out),
            AdjacencyRule::Plugin(r) => r.coupled_elements(ctx, range, out),
        }
    }

    /// Check every boundary/subdomain name the rule refers to against
    /// `mesh`, whose names must be final.
    pub fn resolve_names(&self, mesh: &DistributedMesh) -> Result<(), GhostingError> {
        match self {
            AdjacencyRule::Periodic(r) => r.resolve(mesh),
            AdjacencyRule::Mortar(r) => r.resolve(mesh).map(|_| ()),
            AdjacencyRule::Explicit(r) => r.check_boundaries(mesh),
            _ => Ok(()),
        }
    }

    /// Does `self` ghost at least everything `other` ghosts?
    ///
    /// Different families never cover each other and a proxy covers nothing.
    pub fn covers(&self, other: &AdjacencyRule) -> Result<bool, GhostingError> {
        use AdjacencyRule::*;
        Ok(match (self, other) {
            (Layered(a), Layered(b)) => a.covers(b),
            (Proxy(_), _) => false,
            (Periodic(a), Periodic(b)) => a.covers(b),
            (Mortar(a), Mortar(b)) => a.covers(b),
            (Redistribution(a), Redistribution(b)) => a.covers(b),
            (Table(a), Table(b)) => a.covers(b),
            (Explicit(a), Explicit(b)) => a.covers(b),
            (Plugin(a), Plugin(b)) if a.family() == b.family() => a.covers(b.as_ref())?,
            _ => false,
        })
    }

    pub fn info(&self) -> String {
        match self {
            AdjacencyRule::Layered(r) => r.info(),
            AdjacencyRule::Proxy(_) => "mirrors the peer system".to_string(),
            AdjacencyRule::Periodic(r) => r.info(),
            AdjacencyRule::Mortar(r) => r.info(),
            AdjacencyRule::Redistribution(r) => r.info(),
            AdjacencyRule::Table(r) => r.info(),
            AdjacencyRule::Explicit(r) => r.info(),
            AdjacencyRule::Plugin(r) => r.info(),
        }
    }
}
