#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-ghosting
//!
//! mesh-ghosting is the ghosting policy layer of a distributed mesh: it
//! decides, for every rank, which remote elements must be replicated locally
//! and which element couplings enter the system matrix, and it keeps those
//! decisions consistent across the mesh and DOF lifecycle.
//!
//! ## Pieces
//! - [`ghosting`]: the query protocol ([`GhostingFunctor`](ghosting::GhostingFunctor)),
//!   [`GhostSet`](ghosting::GhostSet) with its merge rule, and the concrete
//!   strategies (neighbour layers, proxies, periodic images, mortar
//!   interfaces, data redistribution, caller-supplied tables).
//! - [`coordinator`]: registration, redundancy elimination and the
//!   early/deferred/late attachment rules
//!   ([`AttachmentCoordinator`](coordinator::AttachmentCoordinator)).
//! - [`topology`] and [`dof`]: the mesh and DOF-map collaborators the
//!   policies run against.
//! - [`algs`]: neighbour layers and pluggable communication (serial, Rayon,
//!   MPI) for the few collective steps.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-ghosting = "0.3"
//! # Optional features:
//! # features = ["parallel", "mpi-support", "strict-invariants"]
//! ```
//!
//! ## Determinism
//!
//! Every query is a pure function of the mesh, the DOF maps and the query
//! range. Ordered containers are used throughout, so ghost sets, send lists
//! and sparsity patterns come out identical on every run.

pub mod algs;
pub mod coordinator;
pub mod debug_invariants;
pub mod dof;
pub mod ghosting;
pub mod mesh_error;
pub mod mesh_generation;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use mesh_error::GhostingError;

/// The most-used types and traits in one import.
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::lattice::AdjacencyKind;
    pub use crate::coordinator::{
        Admission, AttachmentCoordinator, GhostingConfig, ManagerState,
        RelationshipManagerParams,
    };
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::dof::{CouplingMatrix, DofMap, System};
    pub use crate::ghosting::strategies::{ElementDataStore, SharedElementData};
    pub use crate::ghosting::{
        AdjacencyRule, GhostSet, GhostingClass, GhostingFunctor, GhostingRule,
        QueryContext, RelationshipDescriptor, RelationshipManager, TargetSystem,
    };
    pub use crate::mesh_error::GhostingError;
    pub use crate::topology::{DistributedMesh, ElemId, Rank, UniqueId};
}
