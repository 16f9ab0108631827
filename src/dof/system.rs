//! A named system: DOF map, solution vector, constraints and matrix storage.
//!
//! Derived state (vector layout, constraints, sparsity, matrix storage) is a
//! function of the DOF map and its ghosting. [`System::init`] derives it once;
//! [`System::rederive`] repeats the whole cycle after the ghosting changed and
//! counts how often that happened.

use crate::dof::DofMap;
use crate::ghosting::PeerView;
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use std::collections::{BTreeMap, BTreeSet};

/// Vector over the local dofs plus the ghost dofs of the send list.
#[derive(Clone, Debug, Default)]
pub struct GhostedVector {
    local: BTreeSet<u64>,
    values: BTreeMap<u64, f64>,
    n_localizations: usize,
}

impl GhostedVector {
    /// Value at `dof` if it is local or ghosted here.
    pub fn get(&self, dof: u64) -> Option<f64> {
        self.values.get(&dof).copied()
    }

    /// Set a local or ghost entry. Returns false if `dof` is not stored here.
    pub fn set(&mut self, dof: u64, v: f64) -> bool {
        match self.values.get_mut(&dof) {
            Some(slot) => {
                *slot = v;
                true
            }
            None => false,
        }
    }

    pub fn is_ghost(&self, dof: u64) -> bool {
        self.values.contains_key(&dof) && !self.local.contains(&dof)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Re-lay the vector over new local/ghost index sets, keeping the values
    /// of retained entries and zeroing new ones.
    pub fn relocalize(&mut self, local: &[u64], ghosts: &[u64]) {
        let mut values = BTreeMap::new();
        for &d in local.iter().chain(ghosts) {
            values.insert(d, self.values.get(&d).copied().unwrap_or(0.0));
        }
        self.local = local.iter().copied().collect();
        self.values = values;
        self.n_localizations += 1;
    }

    pub fn n_localizations(&self) -> usize {
        self.n_localizations
    }
}

/// Row lengths of the system matrix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatrixStorage {
    row_nnz: BTreeMap<u64, usize>,
}

impl MatrixStorage {
    pub fn row_nnz(&self, row: u64) -> usize {
        self.row_nnz.get(&row).copied().unwrap_or(0)
    }

    pub fn n_nonzeros(&self) -> usize {
        self.row_nnz.values().sum()
    }
}

/// A linear constraint `u[dof] = Σ coeff * u[dep]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub dof: u64,
    pub terms: Vec<(u64, f64)>,
}

#[derive(Debug)]
pub struct System {
    name: String,
    dof_map: DofMap,
    solution: GhostedVector,
    constraints: Vec<Constraint>,
    unresolved_constraint_terms: usize,
    matrix: Option<MatrixStorage>,
    initialized: bool,
    n_rederivations: usize,
}

impl System {
    pub fn new(name: &str, n_vars: usize) -> Self {
        Self {
            name: name.to_string(),
            dof_map: DofMap::new(name, n_vars),
            solution: GhostedVector::default(),
            constraints: Vec::new(),
            unresolved_constraint_terms: 0,
            matrix: None,
            initialized: false,
            n_rederivations: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dof_map(&self) -> &DofMap {
        &self.dof_map
    }

    pub fn dof_map_mut(&mut self) -> &mut DofMap {
        &mut self.dof_map
    }

    pub fn solution(&self) -> &GhostedVector {
        &self.solution
    }

    pub fn solution_mut(&mut self) -> &mut GhostedVector {
        &mut self.solution
    }

    pub fn matrix(&self) -> Option<&MatrixStorage> {
        self.matrix.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Full re-derivation cycles run after the first initialization.
    pub fn n_rederivations(&self) -> usize {
        self.n_rederivations
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Constraint terms whose dependency dof is neither local nor ghosted.
    pub fn unresolved_constraint_terms(&self) -> usize {
        self.unresolved_constraint_terms
    }

    /// Distribute dofs and derive everything downstream of them.
    pub fn init(
        &mut self,
        mesh: &DistributedMesh,
        peer: Option<PeerView<'_>>,
    ) -> Result<(), GhostingError> {
        if self.initialized {
            return Err(GhostingError::InvalidPhase {
                operation: "init",
                phase: format!("system `{}` is already initialized", self.name),
            });
        }
        self.derive(mesh, peer)?;
        self.initialized = true;
        Ok(())
    }

    /// Repeat the whole derivation after the ghosting changed.
    pub fn rederive(
        &mut self,
        mesh: &DistributedMesh,
        peer: Option<PeerView<'_>>,
    ) -> Result<(), GhostingError> {
        if !self.initialized {
            return Err(GhostingError::InvalidPhase {
                operation: "rederive",
                phase: format!("system `{}` is not initialized", self.name),
            });
        }
        self.derive(mesh, peer)?;
        self.n_rederivations += 1;
        Ok(())
    }

    fn derive(
        &mut self,
        mesh: &DistributedMesh,
        peer: Option<PeerView<'_>>,
    ) -> Result<(), GhostingError> {
        self.dof_map.distribute_dofs(mesh, peer)?;
        self.solution
            .relocalize(self.dof_map.local_dofs(), self.dof_map.send_list());
        self.reconstruct_constraints();
        self.dof_map.compute_sparsity(mesh, peer)?;
        self.rebuild_matrix();
        Ok(())
    }

    fn reconstruct_constraints(&mut self) {
        let missing = self
            .constraints
            .iter()
            .flat_map(|c| c.terms.iter())
            .filter(|(dep, _)| self.solution.get(*dep).is_none())
            .count();
        if missing > 0 {
            log::warn!(
                "system `{}`: {missing} constraint terms reference dofs that are not ghosted",
                self.name
            );
        }
        self.unresolved_constraint_terms = missing;
    }

    fn rebuild_matrix(&mut self) {
        let row_nnz = self
            .dof_map
            .sparsity()
            .rows()
            .map(|(r, cols)| (r, cols.len()))
            .collect();
        self.matrix = Some(MatrixStorage { row_nnz });
    }
}
