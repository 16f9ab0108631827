//! Per-manager state machine and coordinator counters.

use crate::ghosting::descriptor::GhostingClass;

/// Where a manager is in its life.
///
/// `Created → Accepted | RejectedAsRedundant`, then
/// `Accepted → BoundGeometric → BoundAlgebraic → Active`, skipping the
/// binding steps a manager's classes do not need.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ManagerState {
    Created,
    Accepted,
    RejectedAsRedundant,
    BoundGeometric,
    BoundAlgebraic,
    Active,
}

impl ManagerState {
    pub fn can_advance_to(self, next: ManagerState) -> bool {
        use ManagerState::*;
        matches!(
            (self, next),
            (Created, Accepted)
                | (Created, RejectedAsRedundant)
                | (Accepted, BoundGeometric)
                | (Accepted, BoundAlgebraic)
                | (BoundGeometric, BoundAlgebraic)
                | (BoundGeometric, Active)
                | (BoundAlgebraic, Active)
        )
    }

    /// State after the bindings `class` needs are complete.
    pub fn after_binding(geometric_done: bool, dof_done: bool, class: GhostingClass) -> ManagerState {
        let geo_needed = class.contains(GhostingClass::GEOMETRIC);
        let dof_needed = class.needs_dof_map();
        match (geo_needed && !geometric_done, dof_needed && !dof_done) {
            (false, false) => ManagerState::Active,
            (false, true) if geo_needed => ManagerState::BoundGeometric,
            (true, false) if dof_needed => ManagerState::BoundAlgebraic,
            _ => ManagerState::Accepted,
        }
    }
}

/// Counters the coordinator keeps for diagnostics and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Full re-derivation cycles forced by late registrations.
    pub forced_rederivations: usize,
    /// Geometric managers that arrived after remote elements were deleted.
    pub late_geometric: usize,
    pub accepted: usize,
    pub subsumed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        assert!(ManagerState::Created.can_advance_to(ManagerState::Accepted));
        assert!(!ManagerState::RejectedAsRedundant.can_advance_to(ManagerState::Active));
        assert!(ManagerState::BoundGeometric.can_advance_to(ManagerState::BoundAlgebraic));
    }

    #[test]
    fn binding_completion() {
        let g = GhostingClass::GEOMETRIC;
        let ga = GhostingClass::GEOMETRIC | GhostingClass::ALGEBRAIC;
        assert_eq!(ManagerState::after_binding(true, false, g), ManagerState::Active);
        assert_eq!(ManagerState::after_binding(true, false, ga), ManagerState::BoundGeometric);
        assert_eq!(ManagerState::after_binding(false, true, ga), ManagerState::BoundAlgebraic);
        assert_eq!(ManagerState::after_binding(false, false, ga), ManagerState::Accepted);
    }
}
