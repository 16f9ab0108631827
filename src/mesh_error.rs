//! GhostingError: unified error type for mesh-ghosting public APIs
//!
//! Every fallible operation in the crate returns this type. Variants fall into
//! four groups: configuration errors (bad requester input, reported at
//! registration), consistency errors (topology or programming bugs), mesh
//! lifecycle errors, and communication errors. None of them are retried.

use crate::topology::point::{ElemId, UniqueId};
use thiserror::Error;

/// Unified error type for mesh-ghosting operations.
#[derive(Debug, Error)]
pub enum GhostingError {
    /// A relationship manager was requested with missing or contradictory parameters.
    #[error("invalid configuration for `{manager}`: {reason}")]
    InvalidConfiguration { manager: String, reason: String },
    /// The factory has no constructor registered under this type name.
    #[error("unknown relationship manager type `{0}`")]
    UnknownStrategy(String),
    /// A boundary name did not resolve to an id on the finalized mesh.
    #[error("boundary `{0}` does not exist on the mesh")]
    UnknownBoundary(String),
    /// A subdomain name did not resolve to an id on the finalized mesh.
    #[error("subdomain `{0}` does not exist on the mesh")]
    UnknownSubdomain(String),
    /// Name resolution was attempted before the mesh was prepared.
    #[error("boundary/subdomain names are not finalized until the mesh is prepared")]
    NamesNotFinalized,

    /// A coverage comparison was requested from a rule that never implemented one.
    #[error("`{family}` does not implement `{operation}`")]
    NotImplemented {
        family: String,
        operation: &'static str,
    },
    /// Two systems that should be topologically identical disagree.
    #[error("no element with unique id {unique_id} on the {system} system")]
    CrossReferenceMissing {
        unique_id: UniqueId,
        system: &'static str,
    },
    /// A manager was bound twice in the same phase.
    #[error("`{manager}` is already bound to a {phase}")]
    AlreadyBound {
        manager: String,
        phase: &'static str,
    },
    /// A manager was queried before it was bound.
    #[error("`{manager}` has not been bound to a {phase}")]
    NotBound {
        manager: String,
        phase: &'static str,
    },
    /// A proxy was queried without access to the system it mirrors.
    #[error("`{0}` mirrors a system that is not available")]
    PeerUnavailable(String),
    /// An element id is not present on this rank's mesh.
    #[error("element {0} is not present on this mesh")]
    UnknownElement(ElemId),
    /// An operation was invoked in the wrong mesh/DOF lifecycle phase.
    #[error("`{operation}` is not allowed while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: String,
    },
    /// A periodic node already maps to a different counterpart.
    #[error("periodic node {node} already paired with {existing}, cannot pair with {new}")]
    PeriodicMappingConflict { node: u64, existing: u64, new: u64 },
    /// A structural invariant (e.g. neighbour symmetry) does not hold.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// Element id times variable count does not fit a dof index.
    #[error("dof index of element {elem} with {n_vars} variables overflows u64")]
    DofIndexOverflow { elem: ElemId, n_vars: usize },
    /// A system with this name was not found.
    #[error("no system named `{0}`")]
    UnknownSystem(String),

    /// Point-to-point communication failed or returned a short buffer.
    #[error("communication with rank {neighbor} failed: {source}")]
    CommError {
        neighbor: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A received message could not be decoded.
    #[error("malformed wire payload: {0}")]
    Wire(String),
}
