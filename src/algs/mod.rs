//! Algorithms that run over the mesh: neighbour layers and message passing.

pub mod communicator;
pub mod exchange;
pub mod lattice;
pub mod wire;

pub use communicator::{Communicator, NoComm, RayonComm, Wait};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
pub use exchange::{exchange_all, CommTag};
pub use lattice::{neighbor_layers, AdjacencyKind};
