//! Thin façade over intra-process (Rayon) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices*. Receives are posted with
//! [`Communicator::irecv`] and completed with [`Wait::wait`], which returns
//! `None` when the message never arrived (timeout or serial backend).

use bytes::Bytes;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for pure serial runs: one rank, no peers.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}

    fn irecv(&self, _peer: usize, _tag: u16) {}
}

// --- RayonComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)
type Mailbox = DashMap<Key, VecDeque<Bytes>>;

/// Default time a receive waits before giving up.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// In-process communicator: every "rank" is a thread sharing one mailbox.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
    timeout: Duration,
}

impl RayonComm {
    /// Build `size` communicators that talk to each other.
    pub fn world(size: usize) -> Vec<RayonComm> {
        let mailbox = Arc::new(Mailbox::new());
        (0..size)
            .map(|rank| RayonComm {
                rank,
                size,
                mailbox: mailbox.clone(),
                timeout: DEFAULT_RECV_TIMEOUT,
            })
            .collect()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Pending receive on a [`RayonComm`]; polls the mailbox on `wait`.
pub struct LocalHandle {
    key: Key,
    mailbox: Arc<Mailbox>,
    timeout: Duration,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(mut queue) = self.mailbox.get_mut(&self.key) {
                if let Some(bytes) = queue.pop_front() {
                    return Some(bytes.to_vec());
                }
            }
            if Instant::now() >= deadline {
                log::warn!("receive {:?} timed out after {:?}", self.key, self.timeout);
                return None;
            }
            std::thread::yield_now();
        }
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        self.mailbox
            .entry((self.rank, peer, tag))
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16) -> LocalHandle {
        LocalHandle {
            key: (peer, self.rank, tag),
            mailbox: self.mailbox.clone(),
            timeout: self.timeout,
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// MPI world communicator. Requires `mpi::initialize()` to have been
    /// called before use.
    ///
    /// Sends are eager and blocking; callers order pairwise exchanges by rank
    /// (see `algs::exchange`) so that a send always meets a posted receive.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MpiComm;

    impl MpiComm {
        pub fn new() -> Self {
            Self
        }
    }

    /// Deferred blocking receive.
    pub struct MpiRecv {
        peer: i32,
        tag: i32,
    }

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            let world = SimpleCommunicator::world();
            let (data, _status) = world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            Some(data)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecv;

        fn rank(&self) -> usize {
            SimpleCommunicator::world().rank() as usize
        }

        fn size(&self) -> usize {
            SimpleCommunicator::world().size() as usize
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
            let world = SimpleCommunicator::world();
            world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, i32::from(tag));
        }

        fn irecv(&self, peer: usize, tag: u16) -> MpiRecv {
            MpiRecv {
                peer: peer as i32,
                tag: i32::from(tag),
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
