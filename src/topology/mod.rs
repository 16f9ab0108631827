//! Top-level module for the mesh collaborator.
//!
//! This module provides the minimal mesh model the ghosting layer runs on:
//! - Strong ids for elements, nodes, boundaries and subdomains
//! - [`DistributedMesh`], a per-rank view with ownership and adjacency
//! - Periodic node identification and side pairing
//! - Mortar interface coupling tables between lower-dimensional subdomains

pub mod mesh;
pub mod mortar;
pub mod periodic;
pub mod point;

pub use mesh::{DistributedMesh, Elem, ElemType};
pub use mortar::{MortarInterfaceCoupling, MortarInterfaceKey};
pub use periodic::{NodeEquivalence, PeriodicBoundary, SideRef};
pub use point::{BoundaryId, ElemId, NodeId, Rank, SubdomainId, UniqueId};
