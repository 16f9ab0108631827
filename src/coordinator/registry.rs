//! Admission of new managers: accept, or reject as redundant.

use crate::coordinator::factory::ManagerFactory;
use crate::coordinator::lifecycle::ManagerState;
use crate::ghosting::descriptor::{GhostingClass, TargetSystem};
use crate::ghosting::manager::RelationshipManager;
use crate::mesh_error::GhostingError;
use std::sync::Arc;

#[derive(Debug)]
struct Entry {
    rm: Arc<RelationshipManager>,
    state: ManagerState,
}

/// Result of [`ManagerRegistry::admit`].
#[derive(Debug, Clone)]
pub enum Admission {
    /// The candidate is new; it is now tracked and must be attached.
    Accepted(Arc<RelationshipManager>),
    /// An accepted manager already covers the candidate.
    Subsumed {
        by: Arc<RelationshipManager>,
        candidate: String,
    },
}

/// Accepted managers in acceptance order.
///
/// The accepted set only grows by managers no existing one covers, so the
/// ghosting it induces never shrinks through registration.
#[derive(Debug, Default)]
pub struct ManagerRegistry {
    entries: Vec<Entry>,
    rejected: Vec<String>,
}

impl ManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `candidate` against every accepted manager of the same class
    /// and target. A plugin rule without a comparison fails the admission.
    pub fn admit(
        &mut self,
        candidate: RelationshipManager,
        factory: &mut ManagerFactory,
    ) -> Result<Admission, GhostingError> {
        for entry in &self.entries {
            if entry.rm.covers(&candidate)? {
                for tag in candidate.descriptor().for_whom() {
                    entry.rm.descriptor().add_for_whom(&tag);
                }
                log::debug!(
                    "`{}` is redundant with `{}`",
                    candidate.name(),
                    entry.rm.name()
                );
                let name = candidate.name().to_string();
                self.rejected.push(name.clone());
                factory.release(candidate);
                return Ok(Admission::Subsumed {
                    by: entry.rm.clone(),
                    candidate: name,
                });
            }
        }
        let rm = Arc::new(candidate);
        log::debug!("accepted relationship manager: {}", rm.info());
        self.entries.push(Entry {
            rm: rm.clone(),
            state: ManagerState::Accepted,
        });
        Ok(Admission::Accepted(rm))
    }

    /// Move `name` to `state`. Illegal transitions are reported, not applied.
    pub fn advance(&mut self, name: &str, state: ManagerState) -> Result<(), GhostingError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.rm.name() == name)
            .ok_or_else(|| GhostingError::UnknownStrategy(name.to_string()))?;
        if entry.state == state {
            return Ok(());
        }
        if !entry.state.can_advance_to(state) {
            return Err(GhostingError::InvalidPhase {
                operation: "advance",
                phase: format!("`{name}` cannot go from {:?} to {state:?}", entry.state),
            });
        }
        entry.state = state;
        Ok(())
    }

    pub fn state(&self, name: &str) -> Option<ManagerState> {
        self.entries
            .iter()
            .find(|e| e.rm.name() == name)
            .map(|e| e.state)
            .or_else(|| {
                self.rejected
                    .iter()
                    .any(|r| r == name)
                    .then_some(ManagerState::RejectedAsRedundant)
            })
    }

    /// Drop `name` from the accepted set.
    pub fn remove(&mut self, name: &str) -> Option<Arc<RelationshipManager>> {
        let pos = self.entries.iter().position(|e| e.rm.name() == name)?;
        Some(self.entries.remove(pos).rm)
    }

    pub fn managers(&self) -> impl Iterator<Item = &Arc<RelationshipManager>> {
        self.entries.iter().map(|e| &e.rm)
    }

    /// Accepted managers of `target` that provide any of `class`.
    pub fn with_class(
        &self,
        target: TargetSystem,
        class: GhostingClass,
    ) -> impl Iterator<Item = &Arc<RelationshipManager>> {
        self.managers()
            .filter(move |rm| rm.target() == target && rm.class().intersects(class))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::config::RelationshipManagerParams;

    fn params(layers: u32) -> RelationshipManagerParams {
        RelationshipManagerParams::new("ElementSideNeighborLayers", GhostingClass::ALGEBRAIC)
            .layers(layers)
    }

    #[test]
    fn deeper_layers_subsume_shallower() {
        let mut f = ManagerFactory::new();
        let mut reg = ManagerRegistry::new();
        let a = f.create(&params(2).for_whom("first")).unwrap();
        assert!(matches!(reg.admit(a, &mut f).unwrap(), Admission::Accepted(_)));
        let b = f.create(&params(1).for_whom("second")).unwrap();
        match reg.admit(b, &mut f).unwrap() {
            Admission::Subsumed { by, candidate } => {
                assert_eq!(by.descriptor().for_whom(), vec!["first", "second"]);
                assert_eq!(reg.state(&candidate), Some(ManagerState::RejectedAsRedundant));
            }
            other => panic!("expected subsumption, got {other:?}"),
        }
        assert_eq!(reg.len(), 1);
        assert_eq!(f.released(), 1);
    }

    #[test]
    fn shallower_first_keeps_both() {
        let mut f = ManagerFactory::new();
        let mut reg = ManagerRegistry::new();
        let a = f.create(&params(1)).unwrap();
        reg.admit(a, &mut f).unwrap();
        let b = f.create(&params(2)).unwrap();
        assert!(matches!(reg.admit(b, &mut f).unwrap(), Admission::Accepted(_)));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn states_follow_the_lifecycle() {
        let mut f = ManagerFactory::new();
        let mut reg = ManagerRegistry::new();
        let Admission::Accepted(rm) = reg.admit(f.create(&params(1)).unwrap(), &mut f).unwrap() else {
            panic!("not accepted");
        };
        assert_eq!(reg.state(rm.name()), Some(ManagerState::Accepted));
        reg.advance(rm.name(), ManagerState::BoundAlgebraic).unwrap();
        assert!(reg.advance(rm.name(), ManagerState::Created).is_err());
        reg.advance(rm.name(), ManagerState::Active).unwrap();
    }
}
