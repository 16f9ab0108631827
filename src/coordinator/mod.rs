//! Attachment coordinator: decides when each relationship manager is bound
//! to the mesh and to DOF maps, and keeps the mesh/DOF lifecycle honest
//! about late arrivals.
//!
//! Lifecycle of the owned systems:
//!
//! 1. `register` / `register_manager` while building (early geometric
//!    managers attach to the mesh immediately, algebraic ones to every DOF
//!    map of their target).
//! 2. [`prepare_mesh`](AttachmentCoordinator::prepare_mesh).
//! 3. [`delete_remote_elements`](AttachmentCoordinator::delete_remote_elements),
//!    which first runs [`finalize_geometric`](AttachmentCoordinator::finalize_geometric)
//!    for deferred geometric managers.
//! 4. [`init_dof_maps`](AttachmentCoordinator::init_dof_maps).
//!
//! Registrations after step 3 or 4 are legal but degraded: they suppress
//! further remote deletion, regather the mesh and force exactly one
//! re-derivation of every system.

pub mod config;
pub mod factory;
pub mod lifecycle;
pub mod registry;

pub use config::{GhostingConfig, RelationshipManagerParams};
pub use factory::{ManagerFactory, RuleConstructor};
pub use lifecycle::{CoordinatorStats, ManagerState};
pub use registry::{Admission, ManagerRegistry};

use crate::algs::communicator::Communicator;
use crate::dof::system::System;
use crate::ghosting::descriptor::{GhostingClass, RelationshipDescriptor, TargetSystem};
use crate::ghosting::ghost_set::GhostSet;
use crate::ghosting::manager::RelationshipManager;
use crate::ghosting::rule::AdjacencyRule;
use crate::ghosting::strategies::{ExplicitGhosting, MortarNames};
use crate::ghosting::{merge_queries, GhostingFunctor, PeerView, QueryContext};
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::mortar::{build_interface_coupling, gather_interface_coupling};
use crate::topology::point::{ElemId, Rank};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// `for_whom` tag of the managers added by `GhostingConfig::default_ghosting`.
pub const DEFAULT_GHOSTING: &str = "default_ghosting";
/// `for_whom` tag of the manager behind `add_ghosted_elem`/`add_ghosted_boundary`.
pub const GHOSTED_BY_REQUEST: &str = "ghosted_by_request";

/// A mesh and the systems defined on it.
#[derive(Debug)]
pub struct SystemSet {
    mesh: DistributedMesh,
    systems: Vec<System>,
}

impl SystemSet {
    fn new(mesh: DistributedMesh) -> Self {
        Self {
            mesh,
            systems: Vec::new(),
        }
    }

    pub fn mesh(&self) -> &DistributedMesh {
        &self.mesh
    }

    pub fn system(&self, name: &str) -> Option<&System> {
        self.systems.iter().find(|s| s.name() == name)
    }

    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    fn peer_view<'a>(&'a self, system: Option<&str>) -> PeerView<'a> {
        PeerView {
            mesh: &self.mesh,
            dof_map: system.and_then(|n| self.system(n)).map(System::dof_map),
        }
    }

    /// Elements this rank must keep when remote elements are deleted.
    fn keep_set(&self, peer: Option<&SystemSet>) -> Result<BTreeSet<ElemId>, GhostingError> {
        let ctx = QueryContext::new(&self.mesh).with_peer(peer.map(|p| p.peer_view(None)));
        let local = self.mesh.active_local_elements();
        let ghosts = merge_queries(
            self.mesh.ghosting_functors(),
            &ctx,
            &local,
            self.mesh.my_rank(),
        )?;
        Ok(ghosts.to_set())
    }

    fn derive(&mut self, peer: Option<&SystemSet>, first: bool) -> Result<(), GhostingError> {
        let SystemSet { mesh, systems } = self;
        for sys in systems.iter_mut() {
            let pv = peer.map(|p| p.peer_view(Some(sys.name())));
            if first {
                sys.init(mesh, pv)?;
            } else {
                sys.rederive(mesh, pv)?;
            }
            let dm = sys.dof_map();
            for rm in dm.algebraic_functors().iter().chain(dm.coupling_functors()) {
                rm.dofmap_reinit(dm)?;
            }
        }
        Ok(())
    }

    fn query(
        &self,
        peer: Option<&SystemSet>,
        class: GhostingClass,
        rank: Rank,
    ) -> Result<GhostSet, GhostingError> {
        let range = self.mesh.active_elements_owned_by(rank);
        let mut out = GhostSet::new();
        if class.contains(GhostingClass::GEOMETRIC) {
            let ctx = QueryContext::new(&self.mesh).with_peer(peer.map(|p| p.peer_view(None)));
            out.merge(merge_queries(self.mesh.ghosting_functors(), &ctx, &range, rank)?);
        }
        if class.needs_dof_map() {
            for sys in &self.systems {
                let dm = sys.dof_map();
                let ctx = QueryContext::new(&self.mesh)
                    .with_dof_map(dm)
                    .with_peer(peer.map(|p| p.peer_view(Some(sys.name()))));
                if class.contains(GhostingClass::ALGEBRAIC) {
                    out.merge(merge_queries(dm.algebraic_functors(), &ctx, &range, rank)?);
                }
                if class.contains(GhostingClass::COUPLING) {
                    let ctx = ctx.for_coupling();
                    out.merge(merge_queries(dm.coupling_functors(), &ctx, &range, rank)?);
                }
            }
        }
        Ok(out)
    }
}

/// Attach `rm` to the DOF maps of `systems`: the manager itself to the first
/// one it is not yet bound to, a fresh clone to every other.
fn attach_to_dof_maps(
    systems: &mut [System],
    rm: &Arc<RelationshipManager>,
) -> Result<(), GhostingError> {
    let class = rm.class();
    for sys in systems {
        let handle = if rm.bound_system().is_none() {
            rm.bind_dof_map(sys.name())?;
            rm.clone()
        } else {
            let c = rm.clone_for(sys.name());
            c.bind_dof_map(sys.name())?;
            Arc::new(c)
        };
        let dm = sys.dof_map_mut();
        if class.contains(GhostingClass::ALGEBRAIC) {
            dm.add_algebraic_ghosting_functor(handle.clone());
        }
        if class.contains(GhostingClass::COUPLING) {
            dm.add_coupling_functor(handle);
        }
    }
    Ok(())
}

/// Owns the undisplaced (and optionally displaced) mesh with its systems and
/// every accepted relationship manager.
#[derive(Debug)]
pub struct AttachmentCoordinator {
    config: GhostingConfig,
    factory: ManagerFactory,
    registry: ManagerRegistry,
    undisplaced: SystemSet,
    displaced: Option<SystemSet>,
    deferred: Vec<Arc<RelationshipManager>>,
    explicit: Option<Arc<RelationshipManager>>,
    stats: CoordinatorStats,
    remote_deleted: bool,
    dofs_initialized: bool,
}

impl AttachmentCoordinator {
    pub fn new(mesh: DistributedMesh, config: GhostingConfig) -> Result<Self, GhostingError> {
        let mut c = Self {
            config,
            factory: ManagerFactory::new(),
            registry: ManagerRegistry::new(),
            undisplaced: SystemSet::new(mesh),
            displaced: None,
            deferred: Vec::new(),
            explicit: None,
            stats: CoordinatorStats::default(),
            remote_deleted: false,
            dofs_initialized: false,
        };
        if c.config.default_ghosting {
            c.register_default_ghosting(TargetSystem::Undisplaced)?;
        }
        Ok(c)
    }

    fn register_default_ghosting(&mut self, target: TargetSystem) -> Result<(), GhostingError> {
        let displaced = target == TargetSystem::Displaced;
        let mut point =
            RelationshipManagerParams::new("ElementPointNeighborLayers", GhostingClass::GEOMETRIC)
                .layers(1)
                .for_whom(DEFAULT_GHOSTING);
        point.use_displaced_mesh = displaced;
        let mut side =
            RelationshipManagerParams::new("ElementSideNeighborLayers", GhostingClass::ALGEBRAIC)
                .layers(1)
                .for_whom(DEFAULT_GHOSTING);
        side.use_displaced_mesh = displaced;
        self.register(&point)?;
        self.register(&side)?;
        Ok(())
    }

    /// Create the displaced copy of the mesh. Systems added from now on get a
    /// displaced twin of the same name.
    pub fn enable_displaced(&mut self, id_offset: u64) -> Result<(), GhostingError> {
        if self.displaced.is_some() || self.dofs_initialized || self.remote_deleted {
            return Err(GhostingError::InvalidPhase {
                operation: "enable_displaced",
                phase: "displaced mesh must be created once, before remote deletion".into(),
            });
        }
        let mut set = SystemSet::new(self.undisplaced.mesh.displaced_copy(id_offset)?);
        for sys in &self.undisplaced.systems {
            set.systems.push(System::new(sys.name(), sys.dof_map().n_vars()));
        }
        self.displaced = Some(set);
        if self.config.default_ghosting {
            self.register_default_ghosting(TargetSystem::Displaced)?;
        }
        Ok(())
    }

    pub fn has_displaced(&self) -> bool {
        self.displaced.is_some()
    }

    fn set(&self, target: TargetSystem) -> Result<&SystemSet, GhostingError> {
        match target {
            TargetSystem::Undisplaced => Ok(&self.undisplaced),
            TargetSystem::Displaced => self
                .displaced
                .as_ref()
                .ok_or_else(|| GhostingError::UnknownSystem(target.as_str().into())),
        }
    }

    fn set_mut(&mut self, target: TargetSystem) -> Result<&mut SystemSet, GhostingError> {
        match target {
            TargetSystem::Undisplaced => Ok(&mut self.undisplaced),
            TargetSystem::Displaced => self
                .displaced
                .as_mut()
                .ok_or_else(|| GhostingError::UnknownSystem(target.as_str().into())),
        }
    }

    fn peer(&self, target: TargetSystem) -> Option<&SystemSet> {
        match target {
            TargetSystem::Undisplaced => self.displaced.as_ref(),
            TargetSystem::Displaced => Some(&self.undisplaced),
        }
    }

    /// Add a system to every target. Every accepted algebraic/coupling
    /// manager of a target is attached to the new DOF map.
    pub fn add_system(&mut self, name: &str, n_vars: usize) -> Result<(), GhostingError> {
        if self.dofs_initialized {
            return Err(GhostingError::InvalidPhase {
                operation: "add_system",
                phase: "DOF maps are already initialized".into(),
            });
        }
        if self.undisplaced.system(name).is_some() {
            return Err(GhostingError::InvalidConfiguration {
                manager: name.to_string(),
                reason: "a system with this name already exists".into(),
            });
        }
        for target in [TargetSystem::Undisplaced, TargetSystem::Displaced] {
            let managers: Vec<_> = self
                .registry
                .with_class(target, GhostingClass::ALGEBRAIC | GhostingClass::COUPLING)
                .cloned()
                .collect();
            let Ok(set) = self.set_mut(target) else {
                continue;
            };
            set.systems.push(System::new(name, n_vars));
            let last = set.systems.len() - 1;
            for rm in &managers {
                attach_to_dof_maps(&mut set.systems[last..], rm)?;
            }
            for rm in &managers {
                self.sync_state(rm)?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Build a manager from `params` and register it.
    pub fn register(
        &mut self,
        params: &RelationshipManagerParams,
    ) -> Result<Admission, GhostingError> {
        self.set(params.target())?;
        let rm = self.factory.create(params)?;
        self.admit_and_attach(rm)
    }

    /// Register a manager built by the caller (plugin rules, custom names).
    pub fn register_manager(
        &mut self,
        rm: RelationshipManager,
    ) -> Result<Admission, GhostingError> {
        self.set(rm.target())?;
        let rm = self.factory.adopt(rm);
        self.admit_and_attach(rm)
    }

    fn admit_and_attach(&mut self, rm: RelationshipManager) -> Result<Admission, GhostingError> {
        // Names are final once the mesh is prepared: bad ones are fatal now
        // rather than at the first query.
        let mesh = &self.set(rm.target())?.mesh;
        if mesh.is_prepared() {
            if let Err(e) = rm.rule().resolve_names(mesh) {
                self.factory.reject(rm);
                return Err(e);
            }
        }
        let admission = self.registry.admit(rm, &mut self.factory)?;
        let rm = match &admission {
            Admission::Subsumed { .. } => {
                self.stats.subsumed += 1;
                return Ok(admission);
            }
            Admission::Accepted(rm) => rm.clone(),
        };
        self.stats.accepted += 1;

        let mut rederive = false;
        if rm.class().contains(GhostingClass::GEOMETRIC) {
            rederive |= self.attach_geometric(&rm)?;
        }
        if rm.class().needs_dof_map() {
            attach_to_dof_maps(&mut self.set_mut(rm.target())?.systems, &rm)?;
            rederive |= self.dofs_initialized;
        }
        self.sync_state(&rm)?;
        if rederive {
            self.force_rederivation(rm.name())?;
        }
        Ok(admission)
    }

    /// Returns true if the attachment needs a re-derivation of the systems.
    fn attach_geometric(&mut self, rm: &Arc<RelationshipManager>) -> Result<bool, GhostingError> {
        let dofs_initialized = self.dofs_initialized;
        if !self.remote_deleted {
            let set = self.set_mut(rm.target())?;
            if !rm.attach_early() {
                set.mesh.allow_remote_element_removal(false);
                log::debug!("`{}` deferred until geometric finalization", rm.name());
                self.deferred.push(rm.clone());
                return Ok(false);
            }
            rm.bind_mesh()?;
            set.mesh.add_ghosting_functor(rm.clone());
            return Ok(dofs_initialized);
        }

        self.stats.late_geometric += 1;
        if self.config.warn_on_rederivation {
            log::warn!(
                "geometric ghosting `{}` registered after remote elements were deleted; \
                 suppressing further deletion and regathering the mesh",
                rm.name()
            );
        }
        let set = self.set_mut(rm.target())?;
        set.mesh.allow_remote_element_removal(false);
        let n = set.mesh.regather_all()?;
        log::debug!("regathered {n} elements for `{}`", rm.name());
        rm.bind_mesh()?;
        set.mesh.add_ghosting_functor(rm.clone());
        Ok(dofs_initialized)
    }

    fn sync_state(&mut self, rm: &RelationshipManager) -> Result<(), GhostingError> {
        let class = rm.class();
        let geo = rm.is_mesh_bound();
        let dof = rm.bound_system().is_some();
        let mut steps = Vec::new();
        if class.contains(GhostingClass::GEOMETRIC) && geo {
            steps.push(ManagerState::BoundGeometric);
        }
        if class.needs_dof_map() && dof {
            steps.push(ManagerState::BoundAlgebraic);
        }
        if ManagerState::after_binding(geo, dof, class) == ManagerState::Active {
            steps.push(ManagerState::Active);
        }
        for step in steps {
            if self.registry.state(rm.name()).is_some_and(|s| s < step) {
                self.registry.advance(rm.name(), step)?;
            }
        }
        Ok(())
    }

    fn force_rederivation(&mut self, cause: &str) -> Result<(), GhostingError> {
        self.stats.forced_rederivations += 1;
        if self.config.warn_on_rederivation {
            log::warn!(
                "late registration of `{cause}` forces re-derivation of every system \
                 (dofs, vectors, constraints, sparsity)"
            );
        }
        self.derive_all(false)
    }

    fn derive_all(&mut self, first: bool) -> Result<(), GhostingError> {
        self.undisplaced.derive(self.displaced.as_ref(), first)?;
        if let Some(d) = self.displaced.as_mut() {
            d.derive(Some(&self.undisplaced), first)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mesh lifecycle
    // -------------------------------------------------------------------------

    /// Prepare every mesh and tell its geometric managers.
    pub fn prepare_mesh(&mut self) -> Result<(), GhostingError> {
        for set in std::iter::once(&mut self.undisplaced).chain(self.displaced.as_mut()) {
            set.mesh.prepare_for_use()?;
            for rm in set.mesh.ghosting_functors() {
                rm.mesh_reinit(&set.mesh)?;
            }
        }
        Ok(())
    }

    /// Attach deferred geometric managers and lift the deletion suppression
    /// they caused. Idempotent.
    pub fn finalize_geometric(&mut self) -> Result<(), GhostingError> {
        let deferred = std::mem::take(&mut self.deferred);
        let remote_deleted = self.remote_deleted;
        for rm in &deferred {
            let set = self.set_mut(rm.target())?;
            rm.bind_mesh()?;
            set.mesh.add_ghosting_functor(rm.clone());
            if !remote_deleted {
                set.mesh.allow_remote_element_removal(true);
            }
            self.sync_state(rm)?;
        }
        // Deferred managers attached after DOF-map construction widen what
        // the systems ghost.
        if self.dofs_initialized && !deferred.is_empty() {
            self.force_rederivation(deferred[0].name())?;
        }
        Ok(())
    }

    /// Delete remote elements on every mesh, keeping what the attached
    /// geometric ghosting needs. Returns the number of elements removed.
    pub fn delete_remote_elements(&mut self) -> Result<usize, GhostingError> {
        self.finalize_geometric()?;
        let keep = self.undisplaced.keep_set(self.displaced.as_ref())?;
        let keep_displaced = match &self.displaced {
            Some(d) => Some(d.keep_set(Some(&self.undisplaced))?),
            None => None,
        };
        let mut n = self.undisplaced.mesh.delete_remote_elements(&keep)?;
        if let (Some(d), Some(k)) = (self.displaced.as_mut(), keep_displaced) {
            n += d.mesh.delete_remote_elements(&k)?;
        }
        self.remote_deleted = self.undisplaced.mesh.remote_elements_deleted();
        for rm in self.registry.managers() {
            rm.delete_remote_elements(&self.set(rm.target())?.mesh)?;
        }
        Ok(n)
    }

    /// Distribute dofs and build every derived structure, once.
    pub fn init_dof_maps(&mut self) -> Result<(), GhostingError> {
        if self.dofs_initialized {
            return Err(GhostingError::InvalidPhase {
                operation: "init_dof_maps",
                phase: "DOF maps are already initialized".into(),
            });
        }
        self.finalize_geometric()?;
        self.derive_all(true)?;
        self.dofs_initialized = true;
        Ok(())
    }

    /// Move elements to new owners, migrate registered element data and
    /// rebuild what depends on ownership. `owners` is keyed by undisplaced
    /// element id and must be identical on every rank. Returns the number of
    /// data entries this rank received.
    pub fn redistribute<C: Communicator>(
        &mut self,
        owners: &BTreeMap<ElemId, Rank>,
        comm: &C,
    ) -> Result<usize, GhostingError> {
        let was_deleted = self.remote_deleted;
        if was_deleted {
            self.undisplaced.mesh.regather_all()?;
            if let Some(d) = self.displaced.as_mut() {
                d.mesh.regather_all()?;
            }
        }

        let moved = self.undisplaced.mesh.repartition(owners);
        let moved_displaced = match self.displaced.as_mut() {
            Some(d) => {
                let translated: BTreeMap<ElemId, Rank> = owners
                    .iter()
                    .filter_map(|(&e, &r)| {
                        let uid = self.undisplaced.mesh.elem(e)?.unique_id;
                        Some((d.mesh.elem_by_unique_id(uid)?, r))
                    })
                    .collect();
                d.mesh.repartition(&translated)
            }
            None => Vec::new(),
        };
        log::debug!(
            "rank {}: {} elements changed owner",
            self.undisplaced.mesh.my_rank(),
            moved.len()
        );

        let mut received = 0;
        for rm in self.registry.managers() {
            let (mesh, moved) = match rm.target() {
                TargetSystem::Undisplaced => (&self.undisplaced.mesh, &moved),
                TargetSystem::Displaced => (&self.set(TargetSystem::Displaced)?.mesh, &moved_displaced),
            };
            received += rm.redistribute(mesh, moved, comm)?;
        }

        for set in std::iter::once(&mut self.undisplaced).chain(self.displaced.as_mut()) {
            for rm in set.mesh.ghosting_functors() {
                rm.mesh_reinit(&set.mesh)?;
            }
        }
        if was_deleted {
            self.remote_deleted = false;
            self.delete_remote_elements()?;
        }
        if self.dofs_initialized {
            self.derive_all(false)?;
        }
        Ok(received)
    }

    // -------------------------------------------------------------------------
    // Requester surface
    // -------------------------------------------------------------------------

    fn explicit_manager(&mut self) -> Result<Arc<RelationshipManager>, GhostingError> {
        if let Some(rm) = &self.explicit {
            return Ok(rm.clone());
        }
        let rm = RelationshipManager::new(
            RelationshipDescriptor::new(
                "ExplicitGhosting",
                GhostingClass::GEOMETRIC | GhostingClass::ALGEBRAIC,
            )
            .for_whom_tag(GHOSTED_BY_REQUEST),
            AdjacencyRule::Explicit(ExplicitGhosting::new(
                std::iter::empty::<ElemId>(),
                std::iter::empty::<String>(),
            )),
        );
        let rm = self.factory.adopt(rm);
        // Requests through this manager take effect at the next reinit, so
        // attach it directly instead of going through the late path.
        let rm = match self.registry.admit(rm, &mut self.factory)? {
            Admission::Subsumed { by, .. } => by,
            Admission::Accepted(rm) => {
                rm.bind_mesh()?;
                self.undisplaced.mesh.add_ghosting_functor(rm.clone());
                attach_to_dof_maps(&mut self.undisplaced.systems, &rm)?;
                self.sync_state(&rm)?;
                rm
            }
        };
        self.explicit = Some(rm.clone());
        Ok(rm)
    }

    /// Ghost `elem` to every rank from the next reinit on.
    pub fn add_ghosted_elem(&mut self, elem: ElemId) -> Result<(), GhostingError> {
        let rm = self.explicit_manager()?;
        if let AdjacencyRule::Explicit(x) = rm.rule() {
            x.add_element(elem);
        }
        if self.undisplaced.mesh.regather([elem])? > 0 {
            log::debug!("regathered explicitly ghosted element {elem}");
        }
        Ok(())
    }

    /// Ghost every element on boundary `name` to every rank from the next
    /// reinit on.
    pub fn add_ghosted_boundary(&mut self, name: &str) -> Result<(), GhostingError> {
        if self.undisplaced.mesh.is_prepared() {
            self.undisplaced.mesh.boundary_id(name)?;
        }
        let rm = self.explicit_manager()?;
        if let AdjacencyRule::Explicit(x) = rm.rule() {
            x.add_boundary(name);
        }
        Ok(())
    }

    /// Detach manager `name` (and its per-system clones) everywhere.
    /// Returns the number of attachments removed.
    pub fn remove_manager(&mut self, name: &str) -> Result<usize, GhostingError> {
        let rm = self
            .registry
            .remove(name)
            .ok_or_else(|| GhostingError::UnknownStrategy(name.to_string()))?;
        self.deferred.retain(|d| d.name() != name);
        if self.explicit.as_ref().is_some_and(|e| e.name() == name) {
            self.explicit = None;
        }
        let mut n = 0;
        for set in std::iter::once(&mut self.undisplaced).chain(self.displaced.as_mut()) {
            n += set.mesh.remove_ghosting_functor(name);
            for sys in &mut set.systems {
                let clone = format!("{name}@{}", sys.name());
                let dm = sys.dof_map_mut();
                n += dm.remove_functor(name) + dm.remove_functor(&clone);
            }
        }
        self.factory.retire(&rm);
        log::debug!("removed `{name}` from {n} attachments");
        Ok(n)
    }

    /// Build, gather and store the mortar coupling table for `names` on the
    /// `target` mesh. Returns the number of pairs.
    pub fn build_mortar_interface<C: Communicator>(
        &mut self,
        target: TargetSystem,
        names: &MortarNames,
        comm: &C,
    ) -> Result<usize, GhostingError> {
        let tol = self.config.mortar_tolerance;
        let set = self.set_mut(target)?;
        let key = names.resolve(&set.mesh)?;
        let local = build_interface_coupling(&set.mesh, &key, tol, true);
        let global = gather_interface_coupling(&local, comm)?;
        let n = global.len();
        set.mesh.set_mortar_interface(key, global);
        Ok(n)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Everything rank `rank` must ghost on `target` for `class`.
    pub fn ghost_set(
        &self,
        target: TargetSystem,
        class: GhostingClass,
        rank: Rank,
    ) -> Result<GhostSet, GhostingError> {
        self.set(target)?.query(self.peer(target), class, rank)
    }

    /// [`ghost_set`](Self::ghost_set) for every rank.
    #[cfg(feature = "parallel")]
    pub fn ghost_sets_for_ranks(
        &self,
        target: TargetSystem,
        class: GhostingClass,
    ) -> Result<BTreeMap<Rank, GhostSet>, GhostingError> {
        use rayon::prelude::*;
        let n = self.set(target)?.mesh.n_ranks();
        (0..n)
            .into_par_iter()
            .map(|r| self.ghost_set(target, class, r).map(|g| (r, g)))
            .collect()
    }

    /// [`ghost_set`](Self::ghost_set) for every rank.
    #[cfg(not(feature = "parallel"))]
    pub fn ghost_sets_for_ranks(
        &self,
        target: TargetSystem,
        class: GhostingClass,
    ) -> Result<BTreeMap<Rank, GhostSet>, GhostingError> {
        let n = self.set(target)?.mesh.n_ranks();
        (0..n)
            .map(|r| self.ghost_set(target, class, r).map(|g| (r, g)))
            .collect()
    }

    pub fn mesh(&self, target: TargetSystem) -> Result<&DistributedMesh, GhostingError> {
        Ok(&self.set(target)?.mesh)
    }

    /// Mutable mesh access for building it. Do not attach ghosting through
    /// this; register managers instead.
    pub fn mesh_mut(&mut self, target: TargetSystem) -> Result<&mut DistributedMesh, GhostingError> {
        Ok(&mut self.set_mut(target)?.mesh)
    }

    pub fn system(&self, target: TargetSystem, name: &str) -> Option<&System> {
        self.set(target).ok()?.system(name)
    }

    pub fn system_mut(&mut self, target: TargetSystem, name: &str) -> Option<&mut System> {
        self.set_mut(target)
            .ok()?
            .systems
            .iter_mut()
            .find(|s| s.name() == name)
    }

    pub fn system_set(&self, target: TargetSystem) -> Result<&SystemSet, GhostingError> {
        self.set(target)
    }

    pub fn manager(&self, name: &str) -> Option<&Arc<RelationshipManager>> {
        self.registry.managers().find(|rm| rm.name() == name)
    }

    pub fn managers(&self) -> impl Iterator<Item = &Arc<RelationshipManager>> {
        self.registry.managers()
    }

    pub fn manager_state(&self, name: &str) -> Option<ManagerState> {
        self.registry.state(name)
    }

    /// Register extra manager types before requesting them by name.
    pub fn factory_mut(&mut self) -> &mut ManagerFactory {
        &mut self.factory
    }

    pub fn factory(&self) -> &ManagerFactory {
        &self.factory
    }

    pub fn config(&self) -> &GhostingConfig {
        &self.config
    }

    pub fn stats(&self) -> &CoordinatorStats {
        &self.stats
    }

    pub fn dofs_initialized(&self) -> bool {
        self.dofs_initialized
    }

    pub fn remote_elements_deleted(&self) -> bool {
        self.remote_deleted
    }

    /// One line per accepted manager.
    pub fn info(&self) -> String {
        self.registry
            .managers()
            .map(|rm| format!("{}: {}", rm.name(), rm.info()))
            .join("\n")
    }
}
