//! Pairwise all-to-all byte exchange.
//!
//! Every rank sends one (possibly empty) payload to every other rank and
//! receives one from each. Pairs are processed in increasing peer order; within
//! a pair the lower rank sends first, so backends with blocking sends cannot
//! deadlock. All receives are drained before the first error is returned.

use crate::algs::communicator::{Communicator, Wait};
use crate::mesh_error::GhostingError;
use crate::topology::point::Rank;
use std::collections::BTreeMap;

/// Message tags used by the ghosting layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(u16);

impl CommTag {
    pub const MORTAR_PAIRS: CommTag = CommTag(0x4d50);
    pub const ELEMENT_DATA: CommTag = CommTag(0x4544);

    pub const fn new(tag: u16) -> Self {
        CommTag(tag)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Exchange `outgoing[peer]` with every peer; missing entries send an empty
/// payload. Returns what each peer sent to us (self excluded).
pub fn exchange_all<C>(
    comm: &C,
    tag: CommTag,
    outgoing: &BTreeMap<Rank, Vec<u8>>,
) -> Result<BTreeMap<Rank, Vec<u8>>, GhostingError>
where
    C: Communicator,
{
    let me = comm.rank();
    let empty: Vec<u8> = Vec::new();
    let mut incoming = BTreeMap::new();
    let mut maybe_err = None;

    for peer in (0..comm.size()).filter(|&p| p != me) {
        let payload = outgoing.get(&peer).unwrap_or(&empty);
        let received = if me < peer {
            comm.isend(peer, tag.as_u16(), payload).wait();
            comm.irecv(peer, tag.as_u16()).wait()
        } else {
            let h = comm.irecv(peer, tag.as_u16());
            let data = h.wait();
            comm.isend(peer, tag.as_u16(), payload).wait();
            data
        };
        match received {
            Some(data) => {
                incoming.insert(peer, data);
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(GhostingError::CommError {
                    neighbor: peer,
                    source: format!("no message with tag {:#x} from rank {peer}", tag.as_u16())
                        .into(),
                });
            }
            None => {}
        }
    }

    if let Some(err) = maybe_err {
        return Err(err);
    }
    log::trace!(
        "rank {me}: exchanged tag {:#x} with {} peers",
        tag.as_u16(),
        incoming.len()
    );
    Ok(incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, RayonComm};
    use std::time::Duration;

    #[test]
    fn serial_exchange_is_empty() {
        let got = exchange_all(&NoComm, CommTag::new(1), &BTreeMap::new()).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn three_ranks_all_to_all() {
        let world = RayonComm::world(3);
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = world
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let me = comm.rank();
                        let out: BTreeMap<_, _> = (0..3)
                            .filter(|&p| p != me)
                            .map(|p| (p, vec![me as u8, p as u8]))
                            .collect();
                        exchange_all(comm, CommTag::new(5), &out).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results[0][&1], vec![1, 0]);
        assert_eq!(results[2][&0], vec![0, 2]);
        assert_eq!(results[1].len(), 2);
    }

    #[test]
    fn missing_peer_is_a_comm_error() {
        let world = RayonComm::world(2);
        let lonely = world[0].clone().with_timeout(Duration::from_millis(20));
        let err = exchange_all(&lonely, CommTag::new(2), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, GhostingError::CommError { neighbor: 1, .. }));
    }
}
