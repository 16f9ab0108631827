//! Keep per-element data with its element across repartitioning.
//!
//! This strategy ghosts nothing. Its job is the `redistribute` and
//! `delete_remote_elements` events: entries of elements that changed owner
//! are shipped to the new owner, and entries of elements this rank no longer
//! holds are dropped.

use crate::algs::communicator::Communicator;
use crate::algs::exchange::{exchange_all, CommTag};
use crate::algs::wire::{decode_entries, encode_entries};
use crate::mesh_error::GhostingError;
use crate::topology::mesh::DistributedMesh;
use crate::topology::point::{ElemId, Rank, UniqueId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named per-element values, e.g. stateful material properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementDataStore {
    name: String,
    entries: BTreeMap<ElemId, Vec<f64>>,
}

impl ElementDataStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&mut self, e: ElemId, values: Vec<f64>) {
        self.entries.insert(e, values);
    }

    pub fn get(&self, e: ElemId) -> Option<&[f64]> {
        self.entries.get(&e).map(Vec::as_slice)
    }

    pub fn contains(&self, e: ElemId) -> bool {
        self.entries.contains_key(&e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.entries.keys().copied()
    }
}

/// A store shared between its owner and the redistribution strategy.
pub type SharedElementData = Arc<RwLock<ElementDataStore>>;

#[derive(Debug, Default)]
pub struct RedistributeProperties {
    stores: RwLock<Vec<SharedElementData>>,
}

impl Clone for RedistributeProperties {
    fn clone(&self) -> Self {
        Self {
            stores: RwLock::new(self.stores.read().clone()),
        }
    }
}

impl RedistributeProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_store(&self, store: SharedElementData) {
        self.stores.write().push(store);
    }

    pub fn n_stores(&self) -> usize {
        self.stores.read().len()
    }

    /// Move entries of elements that changed owner.
    ///
    /// `moved` lists `(element, old owner, new owner)` and must be identical
    /// on every rank; `mesh` already reflects the new ownership. Returns the
    /// number of entries this rank received.
    pub fn redistribute<C: Communicator>(
        &self,
        mesh: &DistributedMesh,
        moved: &[(ElemId, Rank, Rank)],
        comm: &C,
    ) -> Result<usize, GhostingError> {
        let me = comm.rank();
        let mut received = 0;
        for store in self.stores.read().iter() {
            let mut outgoing: BTreeMap<Rank, Vec<(u64, Vec<f64>)>> = BTreeMap::new();
            {
                let guard = store.read();
                for &(e, old, new) in moved {
                    if old != me || new == me {
                        continue;
                    }
                    let (Some(values), Some(elem)) = (guard.entries.get(&e), mesh.elem(e)) else {
                        continue;
                    };
                    outgoing
                        .entry(new)
                        .or_default()
                        .push((elem.unique_id.get(), values.clone()));
                }
            }
            let payloads: BTreeMap<Rank, Vec<u8>> = outgoing
                .iter()
                .map(|(r, recs)| {
                    let borrowed: Vec<(u64, &[f64])> =
                        recs.iter().map(|(u, v)| (*u, v.as_slice())).collect();
                    (*r, encode_entries(&borrowed))
                })
                .collect();

            let incoming = exchange_all(comm, CommTag::ELEMENT_DATA, &payloads)?;

            let mut guard = store.write();
            for &(e, old, new) in moved {
                if old == me && new != me {
                    guard.entries.remove(&e);
                }
            }
            for (peer, buf) in incoming {
                if buf.is_empty() {
                    continue;
                }
                let records = decode_entries(&buf).map_err(|e| GhostingError::CommError {
                    neighbor: peer,
                    source: Box::new(e),
                })?;
                for (uid, values) in records {
                    let uid = UniqueId::new(uid);
                    let e = mesh
                        .elem_by_unique_id(uid)
                        .ok_or(GhostingError::CrossReferenceMissing {
                            unique_id: uid,
                            system: "local",
                        })?;
                    guard.entries.insert(e, values);
                    received += 1;
                }
            }
            log::debug!(
                "rank {me}: store `{}` holds {} entries after redistribution",
                guard.name,
                guard.entries.len()
            );
        }
        Ok(received)
    }

    /// Drop entries of elements no longer present on `mesh`.
    pub fn delete_remote_elements(&self, mesh: &DistributedMesh) {
        for store in self.stores.read().iter() {
            store.write().entries.retain(|e, _| mesh.contains(*e));
        }
    }

    /// Holds every store `other` holds.
    pub fn covers(&self, other: &RedistributeProperties) -> bool {
        let mine = self.stores.read();
        other
            .stores
            .read()
            .iter()
            .all(|s| mine.iter().any(|m| Arc::ptr_eq(m, s)))
    }

    pub fn info(&self) -> String {
        let names: Vec<String> = self
            .stores
            .read()
            .iter()
            .map(|s| s.read().name.clone())
            .collect();
        format!("redistributes [{}]", names.join(", "))
    }
}
