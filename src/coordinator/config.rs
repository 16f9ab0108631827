//! Coordinator and manager configuration.
//!
//! Both structs deserialize from JSON (or any serde format) with every field
//! optional; missing fields take their `Default`.

use crate::ghosting::descriptor::{GhostingClass, TargetSystem};
use crate::topology::point::ElemId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostingConfig {
    /// Attach one point-neighbour layer of geometric ghosting to the mesh and
    /// one side-neighbour layer of algebraic ghosting to every DOF map.
    pub default_ghosting: bool,
    /// Emit `log::warn!` when a late registration forces re-derivation.
    pub warn_on_rederivation: bool,
    /// How long a receive waits before the exchange fails.
    pub comm_timeout_ms: u64,
    /// Bounding-box tolerance for mortar interface coupling.
    pub mortar_tolerance: f64,
}

impl Default for GhostingConfig {
    fn default() -> Self {
        Self {
            default_ghosting: true,
            warn_on_rederivation: true,
            comm_timeout_ms: 10_000,
            mortar_tolerance: 1e-10,
        }
    }
}

impl GhostingConfig {
    pub fn comm_timeout(&self) -> Duration {
        Duration::from_millis(self.comm_timeout_ms)
    }
}

/// Request for one relationship manager, resolved by the factory.
///
/// Which fields matter depends on `type_name`; the factory rejects missing
/// or contradictory combinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipManagerParams {
    pub type_name: String,
    /// Tag of the requester, appended to the manager's `for_whom`.
    pub for_whom: String,
    pub class: GhostingClass,
    pub attach_geometric_early: bool,
    pub use_displaced_mesh: bool,

    // layered neighbours
    pub layers: Option<u32>,
    pub use_point_neighbors: bool,
    /// Restrict coupling to these `(var, var)` pairs; empty is full coupling.
    pub coupling: Vec<(usize, usize)>,

    // periodic / mortar
    pub primary_boundary: Option<String>,
    pub secondary_boundary: Option<String>,
    pub primary_subdomain: Option<String>,
    pub secondary_subdomain: Option<String>,
    pub ghost_point_neighbors: bool,

    // caller-supplied adjacency
    pub adjacency: Vec<(ElemId, ElemId)>,
    pub elements: Vec<ElemId>,
    pub boundaries: Vec<String>,
}

impl Default for RelationshipManagerParams {
    fn default() -> Self {
        Self {
            type_name: String::new(),
            for_whom: String::new(),
            class: GhostingClass::empty(),
            attach_geometric_early: true,
            use_displaced_mesh: false,
            layers: None,
            use_point_neighbors: false,
            coupling: Vec::new(),
            primary_boundary: None,
            secondary_boundary: None,
            primary_subdomain: None,
            secondary_subdomain: None,
            ghost_point_neighbors: false,
            adjacency: Vec::new(),
            elements: Vec::new(),
            boundaries: Vec::new(),
        }
    }
}

impl RelationshipManagerParams {
    pub fn new(type_name: &str, class: GhostingClass) -> Self {
        Self {
            type_name: type_name.to_string(),
            class,
            ..Self::default()
        }
    }

    pub fn for_whom(mut self, tag: &str) -> Self {
        self.for_whom = tag.to_string();
        self
    }

    pub fn layers(mut self, n: u32) -> Self {
        self.layers = Some(n);
        self
    }

    pub fn deferred(mut self) -> Self {
        self.attach_geometric_early = false;
        self
    }

    pub fn displaced(mut self) -> Self {
        self.use_displaced_mesh = true;
        self
    }

    pub fn boundaries_pair(mut self, primary: &str, secondary: &str) -> Self {
        self.primary_boundary = Some(primary.to_string());
        self.secondary_boundary = Some(secondary.to_string());
        self
    }

    pub fn subdomains_pair(mut self, primary: &str, secondary: &str) -> Self {
        self.primary_subdomain = Some(primary.to_string());
        self.secondary_subdomain = Some(secondary.to_string());
        self
    }

    pub fn target(&self) -> TargetSystem {
        if self.use_displaced_mesh {
            TargetSystem::Displaced
        } else {
            TargetSystem::Undisplaced
        }
    }
}
