//! Mortar interface coupling tables.
//!
//! A mortar interface joins two lower-dimensional subdomains built on a pair
//! of boundaries. Its coupling table records, for every secondary lower-d
//! element, the primary lower-d elements whose footprint overlaps it. The
//! table is computed from element bounding boxes on each rank and may be
//! completed across ranks with [`gather_interface_coupling`].

use crate::algs::communicator::Communicator;
use crate::algs::exchange::{exchange_all, CommTag};
use crate::algs::wire::{decode_pairs, encode_pairs};
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::point::{BoundaryId, ElemId, SubdomainId};
use std::collections::{BTreeMap, BTreeSet};

/// Identifies one mortar interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MortarInterfaceKey {
    pub primary_boundary: BoundaryId,
    pub secondary_boundary: BoundaryId,
    pub primary_subdomain: SubdomainId,
    pub secondary_subdomain: SubdomainId,
}

/// Secondary → primary lower-d element coupling.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MortarInterfaceCoupling {
    secondary_to_primary: BTreeMap<ElemId, BTreeSet<ElemId>>,
}

impl MortarInterfaceCoupling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, secondary: ElemId, primary: ElemId) {
        self.secondary_to_primary
            .entry(secondary)
            .or_default()
            .insert(primary);
    }

    pub fn is_empty(&self) -> bool {
        self.secondary_to_primary.is_empty()
    }

    /// Number of coupled pairs.
    pub fn len(&self) -> usize {
        self.secondary_to_primary.values().map(BTreeSet::len).sum()
    }

    pub fn primaries_of(&self, secondary: ElemId) -> impl Iterator<Item = ElemId> + '_ {
        self.secondary_to_primary
            .get(&secondary)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    pub fn secondaries_of(&self, primary: ElemId) -> impl Iterator<Item = ElemId> + '_ {
        self.secondary_to_primary
            .iter()
            .filter(move |(_, ps)| ps.contains(&primary))
            .map(|(s, _)| *s)
    }

    /// All `(secondary, primary)` pairs in order.
    pub fn pairs(&self) -> impl Iterator<Item = (ElemId, ElemId)> + '_ {
        self.secondary_to_primary
            .iter()
            .flat_map(|(s, ps)| ps.iter().map(move |p| (*s, *p)))
    }

    pub fn merge(&mut self, other: &MortarInterfaceCoupling) {
        for (s, p) in other.pairs() {
            self.insert(s, p);
        }
    }
}

type Bbox = ([f64; 3], [f64; 3]);

fn element_bbox(mesh: &DistributedMesh, e: ElemId) -> Option<Bbox> {
    let elem = mesh.elem(e)?;
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for n in &elem.nodes {
        let x = mesh.node_coords(*n)?;
        for d in 0..3 {
            lo[d] = lo[d].min(x[d]);
            hi[d] = hi[d].max(x[d]);
        }
    }
    Some((lo, hi))
}

/// Boxes overlap with positive measure along every axis where both have
/// extent; degenerate axes only need to touch within `tol`.
fn overlaps(a: &Bbox, b: &Bbox, tol: f64) -> bool {
    (0..3).all(|d| {
        let overlap = a.1[d].min(b.1[d]) - a.0[d].max(b.0[d]);
        let extended = a.1[d] - a.0[d] > tol && b.1[d] - b.0[d] > tol;
        if extended { overlap > tol } else { overlap >= -tol }
    })
}

/// Build the coupling for `key` from the elements resident on this rank.
///
/// With `local_only`, only secondaries owned by this rank are paired; the
/// per-rank tables then partition the global one and can be gathered.
pub fn build_interface_coupling(
    mesh: &DistributedMesh,
    key: &MortarInterfaceKey,
    tol: f64,
    local_only: bool,
) -> MortarInterfaceCoupling {
    let primaries: Vec<(ElemId, Bbox)> = mesh
        .active_elements_in_subdomain(key.primary_subdomain)
        .into_iter()
        .filter_map(|e| element_bbox(mesh, e).map(|b| (e, b)))
        .collect();
    let mut coupling = MortarInterfaceCoupling::new();
    for s in mesh.active_elements_in_subdomain(key.secondary_subdomain) {
        if local_only && !mesh.is_local(s) {
            continue;
        }
        let Some(sb) = element_bbox(mesh, s) else {
            continue;
        };
        for (p, pb) in &primaries {
            if overlaps(&sb, pb, tol) {
                coupling.insert(s, *p);
            }
        }
    }
    log::debug!(
        "rank {}: mortar interface {:?} has {} local pairs",
        mesh.my_rank(),
        key,
        coupling.len()
    );
    coupling
}

/// Complete per-rank tables into the global table on every rank.
pub fn gather_interface_coupling<C: Communicator>(
    local: &MortarInterfaceCoupling,
    comm: &C,
) -> Result<MortarInterfaceCoupling, GhostingError> {
    let pairs: Vec<(u64, u64)> = local.pairs().map(|(s, p)| (s.get(), p.get())).collect();
    let payload = encode_pairs(&pairs);
    let outgoing: BTreeMap<_, _> = (0..comm.size())
        .filter(|&r| r != comm.rank())
        .map(|r| (r, payload.clone()))
        .collect();
    let incoming = exchange_all(comm, CommTag::MORTAR_PAIRS, &outgoing)?;
    let mut global = local.clone();
    for (peer, buf) in incoming {
        let pairs = decode_pairs(&buf).map_err(|e| GhostingError::CommError {
            neighbor: peer,
            source: Box::new(e),
        })?;
        for (s, p) in pairs {
            global.insert(ElemId::new(s), ElemId::new(p));
        }
    }
    Ok(global)
}
