//! Structural checks on meshes and merged ghost sets.
//!
//! `DistributedMesh` checks neighbour symmetry after `prepare_for_use`, and
//! `merge_queries` checks that a merged `GhostSet` never holds the queried
//! rank's own elements or inactive ones. The checks run in debug builds and
//! under the `strict-invariants` feature; release builds skip them.

use crate::mesh_error::GhostingError;

/// A structure whose invariants can be checked without outside context.
pub trait DebugInvariants {
    /// Panic on the first violated invariant when checks are enabled.
    fn debug_assert_invariants(&self);
    /// Return the first violated invariant.
    fn validate_invariants(&self) -> Result<(), GhostingError>;
}

/// `Err(InvariantViolation)` with a lazily built message unless `holds`.
pub(crate) fn ensure(holds: bool, what: impl FnOnce() -> String) -> Result<(), GhostingError> {
    if holds {
        Ok(())
    } else {
        Err(GhostingError::InvariantViolation(what()))
    }
}

/// Run a fallible check and panic with `context` when it fails and checks
/// are enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[ghosting invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
