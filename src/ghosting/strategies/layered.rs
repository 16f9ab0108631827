//! Ghost every element within `depth` side- or point-neighbour hops.

use crate::algs::lattice::{neighbor_layers, AdjacencyKind};
use crate::dof::coupling::CouplingMatrix;
use crate::ghosting::ghost_set::GhostSet;
use crate::ghosting::QueryContext;
use crate::mesh_error::GhostingError;
use crate::topology::point::ElemId;
use std::sync::Arc;

/// Deepest layer count a layered strategy accepts.
pub const MAX_LAYERS: u32 = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct LayeredNeighbors {
    kind: AdjacencyKind,
    depth: u32,
    coupling: Option<Arc<CouplingMatrix>>,
}

impl LayeredNeighbors {
    /// Fails unless `1 <= depth <= MAX_LAYERS`.
    pub fn new(kind: AdjacencyKind, depth: u32) -> Result<Self, GhostingError> {
        if !(1..=MAX_LAYERS).contains(&depth) {
            return Err(GhostingError::InvalidConfiguration {
                manager: Self::type_name_for(kind).into(),
                reason: format!("layers must be in 1..={MAX_LAYERS}, got {depth}"),
            });
        }
        Ok(Self {
            kind,
            depth,
            coupling: None,
        })
    }

    /// Restrict the coupling to the ghosted elements.
    pub fn with_coupling(mut self, cm: CouplingMatrix) -> Self {
        self.coupling = Some(Arc::new(cm));
        self
    }

    pub fn type_name_for(kind: AdjacencyKind) -> &'static str {
        match kind {
            AdjacencyKind::Side => "ElementSideNeighborLayers",
            AdjacencyKind::Point => "ElementPointNeighborLayers",
        }
    }

    pub fn kind(&self) -> AdjacencyKind {
        self.kind
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError> {
        for e in neighbor_layers(ctx.mesh, range.iter().copied(), self.kind, self.depth) {
            out.insert(e, self.coupling.clone());
        }
        Ok(())
    }

    /// Same adjacency kind, at least as deep, and at least as much coupling.
    pub fn covers(&self, other: &LayeredNeighbors) -> bool {
        let coupling_covers = match (&self.coupling, &other.coupling) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a.is_superset_of(b),
        };
        self.kind == other.kind && self.depth >= other.depth && coupling_covers
    }

    pub fn info(&self) -> String {
        let what = match self.kind {
            AdjacencyKind::Side => "side",
            AdjacencyKind::Point => "point",
        };
        match &self.coupling {
            None => format!("{} {what} neighbor layer(s)", self.depth),
            Some(cm) => format!(
                "{} {what} neighbor layer(s), {} coupled variable pair(s)",
                self.depth,
                cm.n_set()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_bounds_are_enforced() {
        assert!(LayeredNeighbors::new(AdjacencyKind::Side, 0).is_err());
        assert!(LayeredNeighbors::new(AdjacencyKind::Side, 11).is_err());
        assert!(LayeredNeighbors::new(AdjacencyKind::Point, 10).is_ok());
    }

    #[test]
    fn deeper_covers_shallower_of_same_kind() {
        let s1 = LayeredNeighbors::new(AdjacencyKind::Side, 1).unwrap();
        let s2 = LayeredNeighbors::new(AdjacencyKind::Side, 2).unwrap();
        let p2 = LayeredNeighbors::new(AdjacencyKind::Point, 2).unwrap();
        assert!(s2.covers(&s1));
        assert!(!s1.covers(&s2));
        assert!(!p2.covers(&s1));
    }

    #[test]
    fn restricted_coupling_does_not_cover_full() {
        let full = LayeredNeighbors::new(AdjacencyKind::Side, 1).unwrap();
        let diag = full.clone().with_coupling(CouplingMatrix::diagonal(2));
        assert!(full.covers(&diag));
        assert!(!diag.covers(&full));
    }
}
