//! Per-rank view of a distributed mesh.
//!
//! [`DistributedMesh`] is the mesh collaborator the ghosting layer consumes:
//! element storage with ownership, side/point adjacency, boundary and
//! subdomain naming, periodic pairing, mortar interface tables and the
//! remote-element-deletion switch. It is deliberately small: it knows how to
//! answer topology questions, not how to refine or partition.
//!
//! Every rank holds its own `DistributedMesh`. Before
//! [`DistributedMesh::delete_remote_elements`] the view is fully replicated;
//! afterwards only local elements and the elements kept by the attached
//! geometric ghosting remain resident. Deleted elements move to a detached
//! store that stands in for the copies held by their owners, from which
//! [`DistributedMesh::regather_all`] restores them.

use crate::debug_invariants::{DebugInvariants, ensure};
use crate::ghosting::manager::RelationshipManager;
use crate::mesh_error::GhostingError;
use crate::topology::mortar::{MortarInterfaceCoupling, MortarInterfaceKey};
use crate::topology::periodic::{pair_periodic_sides, NodeEquivalence, PeriodicBoundary, SideRef};
use crate::topology::point::{BoundaryId, ElemId, NodeId, Rank, SubdomainId, UniqueId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

/// Supported element shapes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ElemType {
    /// Zero-dimensional element (lower-d side of a 1-D mesh).
    NodeElem,
    /// Two-node segment.
    Edge2,
    /// Three-node triangle.
    Tri3,
    /// Four-node quadrilateral, nodes counter-clockwise.
    Quad4,
}

impl ElemType {
    pub fn dim(self) -> u8 {
        match self {
            ElemType::NodeElem => 0,
            ElemType::Edge2 => 1,
            ElemType::Tri3 | ElemType::Quad4 => 2,
        }
    }

    pub fn n_nodes(self) -> usize {
        match self {
            ElemType::NodeElem => 1,
            ElemType::Edge2 => 2,
            ElemType::Tri3 => 3,
            ElemType::Quad4 => 4,
        }
    }

    pub fn n_sides(self) -> usize {
        match self {
            ElemType::NodeElem => 0,
            ElemType::Edge2 => 2,
            ElemType::Tri3 => 3,
            ElemType::Quad4 => 4,
        }
    }

    /// Nodes of local side `side`, given the element's node list.
    ///
    /// Side `i` of a polygon runs from node `i` to node `i + 1`; side `i` of a
    /// segment is node `i`.
    pub fn side_nodes(self, nodes: &[NodeId], side: usize) -> Vec<NodeId> {
        match self {
            ElemType::NodeElem => Vec::new(),
            ElemType::Edge2 => vec![nodes[side]],
            ElemType::Tri3 | ElemType::Quad4 => {
                let n = self.n_nodes();
                vec![nodes[side], nodes[(side + 1) % n]]
            }
        }
    }
}

/// A mesh element with ownership and hierarchy metadata.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Elem {
    pub id: ElemId,
    pub unique_id: UniqueId,
    pub elem_type: ElemType,
    pub nodes: Vec<NodeId>,
    pub processor_id: Rank,
    pub subdomain_id: SubdomainId,
    /// Coarser element this one was refined from.
    pub parent: Option<ElemId>,
    /// Higher-dimensional element whose side this lower-d element lives on.
    pub interior_parent: Option<ElemId>,
    /// False once the element has been refined into children.
    pub active: bool,
}

impl Elem {
    /// Create an active element owned by rank 0 in subdomain 0.
    pub fn new(id: ElemId, elem_type: ElemType, nodes: Vec<NodeId>) -> Self {
        Self {
            id,
            unique_id: UniqueId::new(id.get()),
            elem_type,
            nodes,
            processor_id: 0,
            subdomain_id: SubdomainId::new(0),
            parent: None,
            interior_parent: None,
            active: true,
        }
    }

    pub fn with_owner(mut self, rank: Rank) -> Self {
        self.processor_id = rank;
        self
    }

    pub fn with_subdomain(mut self, sid: SubdomainId) -> Self {
        self.subdomain_id = sid;
        self
    }

    pub fn with_unique_id(mut self, uid: UniqueId) -> Self {
        self.unique_id = uid;
        self
    }

    pub fn with_interior_parent(mut self, parent: ElemId) -> Self {
        self.interior_parent = Some(parent);
        self
    }

    pub fn with_parent(mut self, parent: ElemId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn dim(&self) -> u8 {
        self.elem_type.dim()
    }

    pub fn n_sides(&self) -> usize {
        self.elem_type.n_sides()
    }

    pub fn side_nodes(&self, side: usize) -> Vec<NodeId> {
        self.elem_type.side_nodes(&self.nodes, side)
    }
}

/// One rank's view of a distributed mesh.
#[derive(Debug)]
pub struct DistributedMesh {
    my_rank: Rank,
    n_ranks: usize,
    elems: BTreeMap<ElemId, Elem>,
    coords: BTreeMap<NodeId, [f64; 3]>,
    boundary_sides: BTreeMap<SideRef, BTreeSet<BoundaryId>>,
    boundary_names: BTreeMap<String, BoundaryId>,
    subdomain_names: BTreeMap<String, SubdomainId>,
    node_equivalence: NodeEquivalence,
    periodic: BTreeSet<PeriodicBoundary>,

    // Derived in `prepare_for_use`.
    prepared: bool,
    side_neighbors: BTreeMap<ElemId, Vec<Option<ElemId>>>,
    periodic_neighbors: BTreeMap<SideRef, ElemId>,
    canonical: BTreeMap<NodeId, NodeId>,
    node_elems: BTreeMap<NodeId, Vec<ElemId>>,
    unique_index: BTreeMap<UniqueId, ElemId>,

    mortar: BTreeMap<MortarInterfaceKey, MortarInterfaceCoupling>,
    allow_remote_element_removal: bool,
    remote_elements_deleted: bool,
    detached: BTreeMap<ElemId, Elem>,
    geometric: Vec<Arc<RelationshipManager>>,
}

impl DistributedMesh {
    /// Create an empty mesh for `my_rank` out of `n_ranks`.
    pub fn new(my_rank: Rank, n_ranks: usize) -> Self {
        Self {
            my_rank,
            n_ranks: n_ranks.max(1),
            elems: BTreeMap::new(),
            coords: BTreeMap::new(),
            boundary_sides: BTreeMap::new(),
            boundary_names: BTreeMap::new(),
            subdomain_names: BTreeMap::new(),
            node_equivalence: NodeEquivalence::new(),
            periodic: BTreeSet::new(),
            prepared: false,
            side_neighbors: BTreeMap::new(),
            periodic_neighbors: BTreeMap::new(),
            canonical: BTreeMap::new(),
            node_elems: BTreeMap::new(),
            unique_index: BTreeMap::new(),
            mortar: BTreeMap::new(),
            allow_remote_element_removal: true,
            remote_elements_deleted: false,
            detached: BTreeMap::new(),
            geometric: Vec::new(),
        }
    }

    pub fn my_rank(&self) -> Rank {
        self.my_rank
    }

    pub fn n_ranks(&self) -> usize {
        self.n_ranks
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Insert an element. Invalidates derived adjacency.
    pub fn add_elem(&mut self, elem: Elem) -> Result<(), GhostingError> {
        if elem.nodes.len() != elem.elem_type.n_nodes() {
            return Err(GhostingError::InvalidConfiguration {
                manager: "mesh".into(),
                reason: format!(
                    "element {} of type {:?} has {} nodes",
                    elem.id,
                    elem.elem_type,
                    elem.nodes.len()
                ),
            });
        }
        self.elems.insert(elem.id, elem);
        self.prepared = false;
        Ok(())
    }

    pub fn set_node_coords(&mut self, node: NodeId, xyz: [f64; 3]) {
        self.coords.insert(node, xyz);
    }

    pub fn node_coords(&self, node: NodeId) -> Option<[f64; 3]> {
        self.coords.get(&node).copied()
    }

    /// Tag side `side` of `elem` with boundary `bid`.
    pub fn add_boundary_side(&mut self, elem: ElemId, side: u16, bid: BoundaryId) {
        self.boundary_sides.entry((elem, side)).or_default().insert(bid);
    }

    pub fn set_boundary_name(&mut self, bid: BoundaryId, name: &str) {
        self.boundary_names.insert(name.to_string(), bid);
    }

    pub fn set_subdomain_name(&mut self, sid: SubdomainId, name: &str) {
        self.subdomain_names.insert(name.to_string(), sid);
    }

    /// Record that two nodes are periodic images of each other.
    pub fn add_node_equivalence(&mut self, a: NodeId, b: NodeId) {
        self.node_equivalence.add_equivalence(a, b);
        self.prepared = false;
    }

    /// Mark `parent` as refined into `children` (which must already exist).
    pub fn refine_into(&mut self, parent: ElemId, children: &[ElemId]) -> Result<(), GhostingError> {
        for c in children {
            let child = self
                .elems
                .get_mut(c)
                .ok_or(GhostingError::UnknownElement(*c))?;
            child.parent = Some(parent);
        }
        let p = self
            .elems
            .get_mut(&parent)
            .ok_or(GhostingError::UnknownElement(parent))?;
        p.active = false;
        self.prepared = false;
        Ok(())
    }

    /// Compute adjacency, finalize names and rebuild periodic pairing.
    pub fn prepare_for_use(&mut self) -> Result<(), GhostingError> {
        self.canonical = if self.node_equivalence.is_empty() {
            BTreeMap::new()
        } else {
            self.node_equivalence.canonical_map()
        };
        self.unique_index = self
            .elems
            .values()
            .map(|e| (e.unique_id, e.id))
            .collect();
        self.build_side_neighbors();
        self.build_node_elems();
        self.prepared = true;
        self.build_periodic_pairing()?;
        crate::debug_invariants!(self.validate_invariants(), "prepare_for_use");
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    fn build_side_neighbors(&mut self) {
        let mut by_key: BTreeMap<(u8, Vec<NodeId>), Vec<SideRef>> = BTreeMap::new();
        for e in self.elems.values().filter(|e| e.active) {
            for s in 0..e.n_sides() {
                let mut key = e.side_nodes(s);
                key.sort_unstable();
                by_key.entry((e.dim(), key)).or_default().push((e.id, s as u16));
            }
        }
        let mut neighbors: BTreeMap<ElemId, Vec<Option<ElemId>>> = self
            .elems
            .values()
            .filter(|e| e.active)
            .map(|e| (e.id, vec![None; e.n_sides()]))
            .collect();
        for ((_, key), sides) in by_key {
            match sides.as_slice() {
                [(a, sa), (b, sb)] => {
                    if let Some(slot) = neighbors.get_mut(a) {
                        slot[*sa as usize] = Some(*b);
                    }
                    if let Some(slot) = neighbors.get_mut(b) {
                        slot[*sb as usize] = Some(*a);
                    }
                }
                [_] => {}
                many => {
                    log::warn!(
                        "Non-manifold side detected: nodes={key:?} incident_elems={}",
                        many.len()
                    );
                }
            }
        }
        self.side_neighbors = neighbors;
    }

    fn build_node_elems(&mut self) {
        let mut node_elems: BTreeMap<NodeId, Vec<ElemId>> = BTreeMap::new();
        for e in self.elems.values().filter(|e| e.active) {
            for n in &e.nodes {
                node_elems.entry(self.canonical_node(*n)).or_default().push(e.id);
            }
        }
        for list in node_elems.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        self.node_elems = node_elems;
    }

    fn canonical_node(&self, n: NodeId) -> NodeId {
        if self.periodic.is_empty() {
            n
        } else {
            self.canonical.get(&n).copied().unwrap_or(n)
        }
    }

    fn build_periodic_pairing(&mut self) -> Result<(), GhostingError> {
        self.periodic_neighbors.clear();
        if self.periodic.is_empty() {
            return Ok(());
        }
        let pairs: Vec<PeriodicBoundary> = self.periodic.iter().copied().collect();
        for pb in pairs {
            let primary = self.boundary_side_nodes(pb.primary);
            let secondary = self.boundary_side_nodes(pb.secondary);
            for (a, b) in pair_periodic_sides(&primary, &secondary, &self.canonical)? {
                self.periodic_neighbors.insert(a, b.0);
                self.periodic_neighbors.insert(b, a.0);
            }
        }
        // Point adjacency must see the periodic node identification too.
        self.build_node_elems();
        Ok(())
    }

    fn boundary_side_nodes(&self, bid: BoundaryId) -> Vec<(SideRef, Vec<NodeId>)> {
        self.boundary_sides
            .iter()
            .filter(|(_, ids)| ids.contains(&bid))
            .filter_map(|(&(e, s), _)| {
                let elem = self.elems.get(&e).filter(|el| el.active)?;
                Some(((e, s), elem.side_nodes(s as usize)))
            })
            .collect()
    }

    /// Declare a periodic boundary pair by name and build its side pairing.
    ///
    /// Names are only resolvable once the mesh is prepared.
    pub fn add_periodic_boundary(
        &mut self,
        primary: &str,
        secondary: &str,
    ) -> Result<PeriodicBoundary, GhostingError> {
        let pb = PeriodicBoundary::new(self.boundary_id(primary)?, self.boundary_id(secondary)?);
        self.periodic.insert(pb);
        self.canonical = self.node_equivalence.canonical_map();
        self.build_periodic_pairing()?;
        log::debug!("periodic pairing {primary} <-> {secondary} on rank {}", self.my_rank);
        Ok(pb)
    }

    /// True once side pairing for `pb` has been established.
    pub fn has_periodic_pairing(&self, pb: &PeriodicBoundary) -> bool {
        self.periodic.contains(pb)
    }

    pub fn periodic_boundaries(&self) -> impl Iterator<Item = &PeriodicBoundary> {
        self.periodic.iter()
    }

    // -------------------------------------------------------------------------
    // Names
    // -------------------------------------------------------------------------

    /// Resolve a boundary name (or numeric id string) to its id.
    pub fn boundary_id(&self, name: &str) -> Result<BoundaryId, GhostingError> {
        if !self.prepared {
            return Err(GhostingError::NamesNotFinalized);
        }
        self.lookup_boundary(name)
            .ok_or_else(|| GhostingError::UnknownBoundary(name.to_string()))
    }

    /// Resolve a subdomain name (or numeric id string) to its id.
    pub fn subdomain_id(&self, name: &str) -> Result<SubdomainId, GhostingError> {
        if !self.prepared {
            return Err(GhostingError::NamesNotFinalized);
        }
        self.lookup_subdomain(name)
            .ok_or_else(|| GhostingError::UnknownSubdomain(name.to_string()))
    }

    pub(crate) fn lookup_boundary(&self, name: &str) -> Option<BoundaryId> {
        if let Some(bid) = self.boundary_names.get(name) {
            return Some(*bid);
        }
        let bid = BoundaryId::new(name.parse().ok()?);
        self.boundary_sides
            .values()
            .any(|ids| ids.contains(&bid))
            .then_some(bid)
    }

    pub(crate) fn lookup_subdomain(&self, name: &str) -> Option<SubdomainId> {
        if let Some(sid) = self.subdomain_names.get(name) {
            return Some(*sid);
        }
        let sid = SubdomainId::new(name.parse().ok()?);
        self.elems
            .values()
            .any(|e| e.subdomain_id == sid)
            .then_some(sid)
    }

    // -------------------------------------------------------------------------
    // Element and ownership queries
    // -------------------------------------------------------------------------

    pub fn elem(&self, id: ElemId) -> Option<&Elem> {
        self.elems.get(&id)
    }

    pub fn contains(&self, id: ElemId) -> bool {
        self.elems.contains_key(&id)
    }

    pub fn n_elem(&self) -> usize {
        self.elems.len()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Elem> {
        self.elems.values()
    }

    pub fn active_elements(&self) -> impl Iterator<Item = &Elem> {
        self.elems.values().filter(|e| e.active)
    }

    pub fn is_active(&self, id: ElemId) -> bool {
        self.elems.get(&id).is_some_and(|e| e.active)
    }

    pub fn owner(&self, id: ElemId) -> Option<Rank> {
        self.elems.get(&id).map(|e| e.processor_id)
    }

    pub fn is_local(&self, id: ElemId) -> bool {
        self.owner(id) == Some(self.my_rank)
    }

    /// Active elements owned by `rank`, sorted.
    pub fn active_elements_owned_by(&self, rank: Rank) -> Vec<ElemId> {
        self.active_elements()
            .filter(|e| e.processor_id == rank)
            .map(|e| e.id)
            .collect()
    }

    pub fn active_local_elements(&self) -> Vec<ElemId> {
        self.active_elements_owned_by(self.my_rank)
    }

    /// Translate a cross-reference id into this mesh's element id.
    pub fn elem_by_unique_id(&self, uid: UniqueId) -> Option<ElemId> {
        if self.prepared {
            return self.unique_index.get(&uid).copied();
        }
        self.elems.values().find(|e| e.unique_id == uid).map(|e| e.id)
    }

    /// Boundary ids on side `side` of `elem`.
    pub fn boundary_ids(&self, elem: ElemId, side: u16) -> impl Iterator<Item = BoundaryId> + '_ {
        self.boundary_sides
            .get(&(elem, side))
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    /// Active elements with at least one side on boundary `bid`.
    pub fn active_elements_on_boundary(&self, bid: BoundaryId) -> BTreeSet<ElemId> {
        self.boundary_sides
            .iter()
            .filter(|(_, ids)| ids.contains(&bid))
            .map(|(&(e, _), _)| e)
            .filter(|e| self.is_active(*e))
            .collect()
    }

    /// Active elements in subdomain `sid`.
    pub fn active_elements_in_subdomain(&self, sid: SubdomainId) -> BTreeSet<ElemId> {
        self.active_elements()
            .filter(|e| e.subdomain_id == sid)
            .map(|e| e.id)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Adjacency
    // -------------------------------------------------------------------------

    /// Physical side neighbours, indexed by side. `None` is a boundary or a
    /// remote (deleted) neighbour.
    pub fn side_neighbors(&self, id: ElemId) -> &[Option<ElemId>] {
        self.side_neighbors.get(&id).map_or(&[], |v| v.as_slice())
    }

    /// Image of side `side` of `id` across a periodic boundary, if paired.
    pub fn periodic_neighbor(&self, id: ElemId, side: u16) -> Option<ElemId> {
        self.periodic_neighbors
            .get(&(id, side))
            .copied()
            .filter(|n| self.is_active(*n))
    }

    /// Side neighbours including periodic images, sorted and deduplicated.
    pub fn side_and_periodic_neighbors(&self, id: ElemId) -> Vec<ElemId> {
        let mut out: Vec<ElemId> = self.side_neighbors(id).iter().flatten().copied().collect();
        if let Some(e) = self.elems.get(&id) {
            for s in 0..e.n_sides() {
                if let Some(n) = self.periodic_neighbor(id, s as u16) {
                    out.push(n);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out.retain(|n| *n != id);
        out
    }

    /// Active elements of the same dimension sharing at least one node
    /// (modulo periodic identification), sorted.
    pub fn point_neighbors(&self, id: ElemId) -> Vec<ElemId> {
        let Some(elem) = self.elems.get(&id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for n in &elem.nodes {
            if let Some(list) = self.node_elems.get(&self.canonical_node(*n)) {
                out.extend(list.iter().copied().filter(|o| {
                    *o != id && self.elems.get(o).is_some_and(|x| x.dim() == elem.dim())
                }));
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Lower-dimensional elements whose interior parent is `id`.
    pub fn lower_d_children(&self, id: ElemId) -> Vec<ElemId> {
        self.active_elements()
            .filter(|e| e.interior_parent == Some(id))
            .map(|e| e.id)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Mortar tables
    // -------------------------------------------------------------------------

    pub fn set_mortar_interface(&mut self, key: MortarInterfaceKey, coupling: MortarInterfaceCoupling) {
        self.mortar.insert(key, coupling);
    }

    pub fn mortar_interface(&self, key: &MortarInterfaceKey) -> Option<&MortarInterfaceCoupling> {
        self.mortar.get(key)
    }

    // -------------------------------------------------------------------------
    // Remote elements
    // -------------------------------------------------------------------------

    /// Allow or suppress deletion of remote elements.
    pub fn allow_remote_element_removal(&mut self, allow: bool) {
        if !allow && self.allow_remote_element_removal {
            log::debug!("rank {}: remote element removal suppressed", self.my_rank);
        }
        self.allow_remote_element_removal = allow;
    }

    pub fn is_remote_element_removal_allowed(&self) -> bool {
        self.allow_remote_element_removal
    }

    pub fn remote_elements_deleted(&self) -> bool {
        self.remote_elements_deleted
    }

    /// Discard every element that is neither local nor in `keep`.
    ///
    /// Ancestors and interior parents of retained elements are retained too.
    /// Returns the number of elements discarded; 0 if removal is suppressed.
    pub fn delete_remote_elements(&mut self, keep: &BTreeSet<ElemId>) -> Result<usize, GhostingError> {
        if !self.allow_remote_element_removal {
            log::debug!(
                "rank {}: skipping remote element deletion (suppressed)",
                self.my_rank
            );
            return Ok(0);
        }
        let mut retained: BTreeSet<ElemId> = self
            .elems
            .values()
            .filter(|e| e.processor_id == self.my_rank)
            .map(|e| e.id)
            .collect();
        retained.extend(keep.iter().copied().filter(|e| self.elems.contains_key(e)));

        let mut queue: VecDeque<ElemId> = retained.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if let Some(e) = self.elems.get(&id) {
                for up in [e.parent, e.interior_parent].into_iter().flatten() {
                    if retained.insert(up) {
                        queue.push_back(up);
                    }
                }
            }
        }

        let doomed: Vec<ElemId> = self
            .elems
            .keys()
            .copied()
            .filter(|id| !retained.contains(id))
            .collect();
        for id in &doomed {
            if let Some(e) = self.elems.remove(id) {
                self.detached.insert(*id, e);
            }
        }
        self.remote_elements_deleted = true;
        if self.prepared {
            self.prepare_for_use()?;
        }
        log::debug!(
            "rank {}: deleted {} remote elements, {} resident",
            self.my_rank,
            doomed.len(),
            self.elems.len()
        );
        Ok(doomed.len())
    }

    /// Number of elements currently detached by remote deletion.
    pub fn n_detached(&self) -> usize {
        self.detached.len()
    }

    /// Restore the listed detached elements. Ids that are resident or unknown
    /// are ignored. Returns the number restored.
    pub fn regather<I>(&mut self, ids: I) -> Result<usize, GhostingError>
    where
        I: IntoIterator<Item = ElemId>,
    {
        let mut n = 0;
        for id in ids {
            if let Some(e) = self.detached.remove(&id) {
                self.elems.insert(id, e);
                n += 1;
            }
        }
        if self.detached.is_empty() {
            self.remote_elements_deleted = false;
        }
        if n > 0 && self.prepared {
            self.prepare_for_use()?;
        }
        Ok(n)
    }

    /// Restore every detached element, making the view fully resident again.
    pub fn regather_all(&mut self) -> Result<usize, GhostingError> {
        let n = self.detached.len();
        if n == 0 {
            return Ok(0);
        }
        let restored = std::mem::take(&mut self.detached);
        self.elems.extend(restored);
        self.remote_elements_deleted = false;
        if self.prepared {
            self.prepare_for_use()?;
        }
        Ok(n)
    }

    /// Apply a new element→rank assignment. Returns `(elem, old, new)` for
    /// every element whose owner changed.
    pub fn repartition(&mut self, owners: &BTreeMap<ElemId, Rank>) -> Vec<(ElemId, Rank, Rank)> {
        let mut moved = Vec::new();
        for e in self.elems.values_mut().chain(self.detached.values_mut()) {
            if let Some(&new) = owners.get(&e.id) {
                if new != e.processor_id {
                    moved.push((e.id, e.processor_id, new));
                    e.processor_id = new;
                }
            }
        }
        moved.sort_unstable();
        moved
    }

    /// Clone this mesh with every element id shifted by `id_offset`.
    ///
    /// Unique ids are preserved, so the copy is topologically identical and
    /// cross-referenceable. Attached ghosting and mortar tables are not copied.
    pub fn displaced_copy(&self, id_offset: u64) -> Result<DistributedMesh, GhostingError> {
        let shift = |e: ElemId| ElemId::new(e.get() + id_offset);
        let mut copy = DistributedMesh::new(self.my_rank, self.n_ranks);
        for e in self.elems.values() {
            let mut c = e.clone();
            c.id = shift(e.id);
            c.parent = e.parent.map(shift);
            c.interior_parent = e.interior_parent.map(shift);
            copy.elems.insert(c.id, c);
        }
        copy.coords = self.coords.clone();
        copy.boundary_sides = self
            .boundary_sides
            .iter()
            .map(|(&(e, s), ids)| ((shift(e), s), ids.clone()))
            .collect();
        copy.boundary_names = self.boundary_names.clone();
        copy.subdomain_names = self.subdomain_names.clone();
        copy.node_equivalence = self.node_equivalence.clone();
        copy.periodic = self.periodic.clone();
        copy.allow_remote_element_removal = self.allow_remote_element_removal;
        if self.prepared {
            copy.prepare_for_use()?;
        }
        Ok(copy)
    }

    // -------------------------------------------------------------------------
    // Attached geometric ghosting
    // -------------------------------------------------------------------------

    pub fn add_ghosting_functor(&mut self, rm: Arc<RelationshipManager>) {
        self.geometric.push(rm);
    }

    /// Detach every geometric manager named `name`. Returns how many were removed.
    pub fn remove_ghosting_functor(&mut self, name: &str) -> usize {
        let before = self.geometric.len();
        self.geometric.retain(|rm| rm.name() != name);
        before - self.geometric.len()
    }

    pub fn ghosting_functors(&self) -> &[Arc<RelationshipManager>] {
        &self.geometric
    }
}

impl DebugInvariants for DistributedMesh {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "DistributedMesh");
    }

    /// Side adjacency is symmetric and only links active elements.
    fn validate_invariants(&self) -> Result<(), GhostingError> {
        for (&e, nbrs) in &self.side_neighbors {
            for n in nbrs.iter().flatten() {
                ensure(self.is_active(*n), || {
                    format!("element {e} lists inactive neighbour {n}")
                })?;
                ensure(self.side_neighbors(*n).contains(&Some(e)), || {
                    format!("neighbour link {e} -> {n} is not symmetric")
                })?;
            }
        }
        Ok(())
    }
}
