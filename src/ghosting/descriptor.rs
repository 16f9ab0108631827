//! What a relationship manager is for: its ghosting classes, the system it
//! targets, when it attaches, and who asked for it.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// The kinds of ghosting a manager provides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GhostingClass: u8 {
        /// Element replication for geometric search and remote-element deletion.
        const GEOMETRIC = 1 << 0;
        /// Ghost solution values (the DOF send list).
        const ALGEBRAIC = 1 << 1;
        /// Matrix sparsity between elements.
        const COUPLING = 1 << 2;
    }
}

impl GhostingClass {
    /// Classes that need a DOF map to attach to.
    pub fn needs_dof_map(self) -> bool {
        self.intersects(GhostingClass::ALGEBRAIC | GhostingClass::COUPLING)
    }
}

/// Which copy of the systems a manager applies to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSystem {
    #[default]
    Undisplaced,
    Displaced,
}

impl TargetSystem {
    pub fn other(self) -> TargetSystem {
        match self {
            TargetSystem::Undisplaced => TargetSystem::Displaced,
            TargetSystem::Displaced => TargetSystem::Undisplaced,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetSystem::Undisplaced => "undisplaced",
            TargetSystem::Displaced => "displaced",
        }
    }
}

/// Metadata shared by every manager.
///
/// `for_whom` only ever grows: when a new request is subsumed by this
/// manager, the requester's tag is appended here.
#[derive(Debug)]
pub struct RelationshipDescriptor {
    pub type_name: String,
    pub class: GhostingClass,
    pub target: TargetSystem,
    pub attach_geometric_early: bool,
    for_whom: RwLock<Vec<String>>,
}

impl RelationshipDescriptor {
    pub fn new(type_name: &str, class: GhostingClass) -> Self {
        Self {
            type_name: type_name.to_string(),
            class,
            target: TargetSystem::Undisplaced,
            attach_geometric_early: true,
            for_whom: RwLock::new(Vec::new()),
        }
    }

    pub fn with_target(mut self, target: TargetSystem) -> Self {
        self.target = target;
        self
    }

    pub fn with_attach_geometric_early(mut self, early: bool) -> Self {
        self.attach_geometric_early = early;
        self
    }

    pub fn for_whom_tag(self, tag: &str) -> Self {
        self.add_for_whom(tag);
        self
    }

    /// True only for geometric managers that were not explicitly deferred.
    pub fn attach_early(&self) -> bool {
        self.class.contains(GhostingClass::GEOMETRIC) && self.attach_geometric_early
    }

    /// Append a requester tag unless already present.
    pub fn add_for_whom(&self, tag: &str) {
        let mut tags = self.for_whom.write();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    pub fn for_whom(&self) -> Vec<String> {
        self.for_whom.read().clone()
    }
}

impl Clone for RelationshipDescriptor {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name.clone(),
            class: self.class,
            target: self.target,
            attach_geometric_early: self.attach_geometric_early,
            for_whom: RwLock::new(self.for_whom()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_geometric_attaches_early() {
        let g = RelationshipDescriptor::new("t", GhostingClass::GEOMETRIC);
        assert!(g.attach_early());
        assert!(!g.clone().with_attach_geometric_early(false).attach_early());
        let a = RelationshipDescriptor::new("t", GhostingClass::ALGEBRAIC);
        assert!(!a.attach_early());
        assert!(a.class.needs_dof_map());
    }

    #[test]
    fn for_whom_appends_once() {
        let d = RelationshipDescriptor::new("t", GhostingClass::COUPLING).for_whom_tag("kernel_a");
        d.add_for_whom("kernel_b");
        d.add_for_whom("kernel_a");
        assert_eq!(d.for_whom(), vec!["kernel_a", "kernel_b"]);
    }

    #[test]
    fn class_parses_from_json() {
        let c: GhostingClass = serde_json::from_str("\"GEOMETRIC | ALGEBRAIC\"").unwrap();
        assert_eq!(c, GhostingClass::GEOMETRIC | GhostingClass::ALGEBRAIC);
    }
}
