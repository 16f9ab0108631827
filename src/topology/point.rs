//! Strong, zero-cost handles for mesh entities.
//!
//! Elements, nodes, boundaries and subdomains are addressed by opaque
//! integer ids. Wrapping each in its own `repr(transparent)` newtype keeps
//! them from being mixed up at compile time while keeping the memory layout
//! (and MPI datatype) of the underlying integer.
//!
//! - [`ElemId`]: per-mesh element identity (stable across repartitioning).
//! - [`UniqueId`]: immutable cross-reference id shared by topologically
//!   identical meshes (e.g. a mesh and its displaced copy).
//! - [`NodeId`]: vertex identity.
//! - [`BoundaryId`], [`SubdomainId`]: numeric ids that names resolve to.

use std::fmt;

macro_rules! mesh_id {
    ($(#[$meta:meta])* $name:ident($raw:ty)) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name($raw);

        impl $name {
            /// Wrap a raw id.
            #[inline]
            pub const fn new(raw: $raw) -> Self {
                $name(raw)
            }

            /// Returns the inner integer.
            #[inline]
            pub const fn get(self) -> $raw {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        /// Prints only the raw integer.
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$raw> for $name {
            fn from(raw: $raw) -> Self {
                $name(raw)
            }
        }

        // Travels over MPI with the datatype of the raw integer.
        #[cfg(feature = "mpi-support")]
        unsafe impl mpi::datatype::Equivalence for $name {
            type Out = <$raw as mpi::datatype::Equivalence>::Out;

            fn equivalent_datatype() -> Self::Out {
                <$raw as mpi::datatype::Equivalence>::equivalent_datatype()
            }
        }
    };
}

mesh_id!(
    /// Identity of an element on one mesh.
    ElemId(u64)
);
mesh_id!(
    /// Cross-reference id shared by every copy of the same element.
    UniqueId(u64)
);
mesh_id!(
    /// Identity of a vertex.
    NodeId(u64)
);
mesh_id!(
    /// Numeric boundary id.
    BoundaryId(u16)
);
mesh_id!(
    /// Numeric subdomain (block) id.
    SubdomainId(u16)
);

/// Rank of a process in the communicator.
pub type Rank = usize;

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    // If this fails, our repr(transparent) guarantee is broken!
    assert_eq_size!(ElemId, u64);
    assert_eq_align!(ElemId, u64);
    assert_eq_size!(UniqueId, u64);
    assert_eq_size!(BoundaryId, u16);
    assert_eq_size!(SubdomainId, u16);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display() {
        let e = ElemId::new(7);
        assert_eq!(format!("{:?}", e), "ElemId(7)");
        assert_eq!(format!("{}", e), "7");
        assert_eq!(format!("{:?}", BoundaryId::new(3)), "BoundaryId(3)");
    }

    #[test]
    fn zero_is_a_valid_element() {
        let e = ElemId::new(0);
        assert_eq!(e.get(), 0);
        assert!(e < ElemId::new(1));
    }

    #[test]
    fn json_roundtrip() {
        let e = ElemId::new(123);
        let s = serde_json::to_string(&e).unwrap();
        assert_eq!(s, "123");
        let back: ElemId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn bincode_roundtrip() {
        let u = UniqueId::new(456);
        let bytes = bincode::serialize(&u).unwrap();
        let back: UniqueId = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, u);
    }
}
