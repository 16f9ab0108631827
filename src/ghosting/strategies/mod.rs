//! Concrete ghosting strategies.
//!
//! Each strategy knows how to compute its raw adjacency for a range of
//! elements and how to compare itself with another instance of the same
//! family. Class, target and binding live on the
//! [`RelationshipManager`](crate::ghosting::manager::RelationshipManager)
//! that wraps it.

pub mod layered;
pub mod mortar;
pub mod periodic;
pub mod proxy;
pub mod redistribute;
pub mod table;

pub use layered::{LayeredNeighbors, MAX_LAYERS};
pub use mortar::{MortarInterface, MortarNames};
pub use periodic::PeriodicImages;
pub use proxy::ProxyMirror;
pub use redistribute::{ElementDataStore, RedistributeProperties, SharedElementData};
pub use table::{CustomTopology, ExplicitGhosting};
