//! Structured mesh generators with boundary naming, block ownership and
//! periodic node identification.
//!
//! Every generator produces one rank's view of a fully replicated mesh: all
//! elements are present, each carries the owner given by a contiguous block
//! partition of the element index range. Call
//! [`DistributedMesh::prepare_for_use`] before querying adjacency.

use crate::mesh_error::GhostingError;
use crate::topology::mesh::{DistributedMesh, Elem, ElemType};
use crate::topology::point::{BoundaryId, ElemId, NodeId, Rank, SubdomainId};

/// Boundary name for the minimum-x side.
pub const BOUNDARY_X_MIN: &str = "boundary_x_min";
/// Boundary name for the maximum-x side.
pub const BOUNDARY_X_MAX: &str = "boundary_x_max";
/// Boundary name for the minimum-y side.
pub const BOUNDARY_Y_MIN: &str = "boundary_y_min";
/// Boundary name for the maximum-y side.
pub const BOUNDARY_Y_MAX: &str = "boundary_y_max";
/// Interface sides of the left block of [`two_block_mesh`].
pub const LEFT_INTERFACE: &str = "left_interface";
/// Interface sides of the right block of [`two_block_mesh`].
pub const RIGHT_INTERFACE: &str = "right_interface";

const X_MIN_ID: BoundaryId = BoundaryId::new(0);
const X_MAX_ID: BoundaryId = BoundaryId::new(1);
const Y_MIN_ID: BoundaryId = BoundaryId::new(2);
const Y_MAX_ID: BoundaryId = BoundaryId::new(3);
const LEFT_INTERFACE_ID: BoundaryId = BoundaryId::new(4);
const RIGHT_INTERFACE_ID: BoundaryId = BoundaryId::new(5);

/// Optional periodic identification for structured meshes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Periodicity {
    pub x: bool,
    pub y: bool,
}

impl Periodicity {
    /// No periodic directions.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Configuration for mesh generation.
#[derive(Clone, Copy, Debug)]
pub struct MeshGenerationOptions {
    pub periodic: Periodicity,
    /// Rank whose view is produced.
    pub my_rank: Rank,
    /// Ranks the elements are block-partitioned over.
    pub n_ranks: usize,
}

impl Default for MeshGenerationOptions {
    fn default() -> Self {
        Self {
            periodic: Periodicity::none(),
            my_rank: 0,
            n_ranks: 1,
        }
    }
}

impl MeshGenerationOptions {
    pub fn on_rank(my_rank: Rank, n_ranks: usize) -> Self {
        Self {
            my_rank,
            n_ranks,
            ..Self::default()
        }
    }

    pub fn with_periodic(mut self, periodic: Periodicity) -> Self {
        self.periodic = periodic;
        self
    }
}

fn invalid_geometry(message: impl Into<String>) -> GhostingError {
    GhostingError::InvalidConfiguration {
        manager: "mesh_generation".into(),
        reason: message.into(),
    }
}

/// Owner of element `i` of `n` under a contiguous block partition.
pub fn block_owner(i: usize, n: usize, n_ranks: usize) -> Rank {
    if n == 0 {
        return 0;
    }
    i * n_ranks.max(1) / n
}

fn name_boundaries(mesh: &mut DistributedMesh) {
    mesh.set_boundary_name(X_MIN_ID, BOUNDARY_X_MIN);
    mesh.set_boundary_name(X_MAX_ID, BOUNDARY_X_MAX);
    mesh.set_boundary_name(Y_MIN_ID, BOUNDARY_Y_MIN);
    mesh.set_boundary_name(Y_MAX_ID, BOUNDARY_Y_MAX);
}

/// Generate a 1D interval mesh with `n` segments over `[min, max]`.
///
/// Element `i` spans nodes `i` and `i + 1`. With `periodic.x` the end nodes
/// are identified; declare the pair with
/// [`DistributedMesh::add_periodic_boundary`] after preparing.
pub fn interval_mesh(
    n: usize,
    min: f64,
    max: f64,
    options: MeshGenerationOptions,
) -> Result<DistributedMesh, GhostingError> {
    if n == 0 {
        return Err(invalid_geometry("n must be positive"));
    }
    let mut mesh = DistributedMesh::new(options.my_rank, options.n_ranks);
    let dx = (max - min) / n as f64;
    for i in 0..=n {
        mesh.set_node_coords(NodeId::new(i as u64), [min + dx * i as f64, 0.0, 0.0]);
    }
    for i in 0..n {
        let nodes = vec![NodeId::new(i as u64), NodeId::new(i as u64 + 1)];
        mesh.add_elem(
            Elem::new(ElemId::new(i as u64), ElemType::Edge2, nodes)
                .with_owner(block_owner(i, n, options.n_ranks)),
        )?;
    }
    mesh.add_boundary_side(ElemId::new(0), 0, X_MIN_ID);
    mesh.add_boundary_side(ElemId::new(n as u64 - 1), 1, X_MAX_ID);
    mesh.set_boundary_name(X_MIN_ID, BOUNDARY_X_MIN);
    mesh.set_boundary_name(X_MAX_ID, BOUNDARY_X_MAX);
    if options.periodic.x {
        mesh.add_node_equivalence(NodeId::new(0), NodeId::new(n as u64));
    }
    Ok(mesh)
}

struct QuadBlock {
    nx: usize,
    ny: usize,
    min: [f64; 2],
    max: [f64; 2],
    first_node: u64,
    first_elem: u64,
    subdomain: SubdomainId,
}

impl QuadBlock {
    fn node(&self, i: usize, j: usize) -> NodeId {
        NodeId::new(self.first_node + (j * (self.nx + 1) + i) as u64)
    }

    fn elem(&self, i: usize, j: usize) -> ElemId {
        ElemId::new(self.first_elem + (j * self.nx + i) as u64)
    }

    fn n_elems(&self) -> usize {
        self.nx * self.ny
    }

    /// Add nodes and cells; `owner(k)` gives the owner of local cell `k`.
    fn emit(
        &self,
        mesh: &mut DistributedMesh,
        owner: impl Fn(usize) -> Rank,
    ) -> Result<(), GhostingError> {
        let dx = (self.max[0] - self.min[0]) / self.nx as f64;
        let dy = (self.max[1] - self.min[1]) / self.ny as f64;
        for j in 0..=self.ny {
            for i in 0..=self.nx {
                let xyz = [self.min[0] + dx * i as f64, self.min[1] + dy * j as f64, 0.0];
                mesh.set_node_coords(self.node(i, j), xyz);
            }
        }
        for j in 0..self.ny {
            for i in 0..self.nx {
                let nodes = vec![
                    self.node(i, j),
                    self.node(i + 1, j),
                    self.node(i + 1, j + 1),
                    self.node(i, j + 1),
                ];
                mesh.add_elem(
                    Elem::new(self.elem(i, j), ElemType::Quad4, nodes)
                        .with_owner(owner(j * self.nx + i))
                        .with_subdomain(self.subdomain),
                )?;
            }
        }
        Ok(())
    }

    /// Tag outer sides. Quad side 0 is bottom, 1 right, 2 top, 3 left.
    fn tag_sides(
        &self,
        mesh: &mut DistributedMesh,
        x_min: BoundaryId,
        x_max: BoundaryId,
        y_min: BoundaryId,
        y_max: BoundaryId,
    ) {
        for j in 0..self.ny {
            mesh.add_boundary_side(self.elem(0, j), 3, x_min);
            mesh.add_boundary_side(self.elem(self.nx - 1, j), 1, x_max);
        }
        for i in 0..self.nx {
            mesh.add_boundary_side(self.elem(i, 0), 0, y_min);
            mesh.add_boundary_side(self.elem(i, self.ny - 1), 2, y_max);
        }
    }
}

/// Generate a structured quadrilateral mesh over `[min, max]` with `nx`×`ny`
/// cells, numbered row by row.
pub fn quad_mesh(
    nx: usize,
    ny: usize,
    min: [f64; 2],
    max: [f64; 2],
    options: MeshGenerationOptions,
) -> Result<DistributedMesh, GhostingError> {
    if nx == 0 || ny == 0 {
        return Err(invalid_geometry("nx and ny must be positive"));
    }
    let mut mesh = DistributedMesh::new(options.my_rank, options.n_ranks);
    let block = QuadBlock {
        nx,
        ny,
        min,
        max,
        first_node: 0,
        first_elem: 0,
        subdomain: SubdomainId::new(0),
    };
    let n = block.n_elems();
    block.emit(&mut mesh, |k| block_owner(k, n, options.n_ranks))?;
    block.tag_sides(&mut mesh, X_MIN_ID, X_MAX_ID, Y_MIN_ID, Y_MAX_ID);
    name_boundaries(&mut mesh);

    if options.periodic.x {
        for j in 0..=ny {
            mesh.add_node_equivalence(block.node(0, j), block.node(nx, j));
        }
    }
    if options.periodic.y {
        for i in 0..=nx {
            mesh.add_node_equivalence(block.node(i, 0), block.node(i, ny));
        }
    }
    Ok(mesh)
}

/// Two non-conforming quad blocks side by side on `[0,1]×[0,1]`, split at
/// `x = 0.5`.
///
/// The left block (subdomain 1, `"left_block"`) has `left.0 × left.1` cells,
/// the right block (subdomain 2, `"right_block"`) `right.0 × right.1`. The
/// blocks share no nodes; their facing sides are tagged
/// [`LEFT_INTERFACE`] and [`RIGHT_INTERFACE`]. Elements are block-partitioned
/// in id order, left block first.
pub fn two_block_mesh(
    left: (usize, usize),
    right: (usize, usize),
    options: MeshGenerationOptions,
) -> Result<DistributedMesh, GhostingError> {
    if left.0 == 0 || left.1 == 0 || right.0 == 0 || right.1 == 0 {
        return Err(invalid_geometry("block sizes must be positive"));
    }
    let mut mesh = DistributedMesh::new(options.my_rank, options.n_ranks);
    let lb = QuadBlock {
        nx: left.0,
        ny: left.1,
        min: [0.0, 0.0],
        max: [0.5, 1.0],
        first_node: 0,
        first_elem: 0,
        subdomain: SubdomainId::new(1),
    };
    let rb = QuadBlock {
        nx: right.0,
        ny: right.1,
        min: [0.5, 0.0],
        max: [1.0, 1.0],
        first_node: ((left.0 + 1) * (left.1 + 1)) as u64,
        first_elem: lb.n_elems() as u64,
        subdomain: SubdomainId::new(2),
    };
    let total = lb.n_elems() + rb.n_elems();
    let offset = lb.n_elems();
    lb.emit(&mut mesh, |k| block_owner(k, total, options.n_ranks))?;
    rb.emit(&mut mesh, |k| block_owner(offset + k, total, options.n_ranks))?;
    lb.tag_sides(&mut mesh, X_MIN_ID, LEFT_INTERFACE_ID, Y_MIN_ID, Y_MAX_ID);
    rb.tag_sides(&mut mesh, RIGHT_INTERFACE_ID, X_MAX_ID, Y_MIN_ID, Y_MAX_ID);
    name_boundaries(&mut mesh);
    mesh.set_boundary_name(LEFT_INTERFACE_ID, LEFT_INTERFACE);
    mesh.set_boundary_name(RIGHT_INTERFACE_ID, RIGHT_INTERFACE);
    mesh.set_subdomain_name(SubdomainId::new(1), "left_block");
    mesh.set_subdomain_name(SubdomainId::new(2), "right_block");
    Ok(mesh)
}

/// Create lower-dimensional elements on every side of `boundary`.
///
/// Each new element takes the side's nodes, the owner of its interior parent,
/// and subdomain `sid` (named `name`). Ids continue after the largest
/// existing element id. Returns the new ids in creation order.
pub fn add_lower_d_block(
    mesh: &mut DistributedMesh,
    boundary: &str,
    sid: SubdomainId,
    name: &str,
) -> Result<Vec<ElemId>, GhostingError> {
    let bid = mesh
        .lookup_boundary(boundary)
        .ok_or_else(|| GhostingError::UnknownBoundary(boundary.to_string()))?;
    let mut next = mesh
        .elements()
        .map(|e| e.id.get() + 1)
        .max()
        .unwrap_or(0);
    let mut sides = Vec::new();
    for parent in mesh.active_elements() {
        for s in 0..parent.n_sides() {
            if mesh.boundary_ids(parent.id, s as u16).any(|b| b == bid) {
                sides.push((parent.id, parent.processor_id, parent.elem_type, parent.side_nodes(s)));
            }
        }
    }
    let mut created = Vec::with_capacity(sides.len());
    for (parent, owner, parent_type, nodes) in sides {
        let lower_type = match parent_type {
            ElemType::Tri3 | ElemType::Quad4 => ElemType::Edge2,
            ElemType::Edge2 => ElemType::NodeElem,
            ElemType::NodeElem => {
                return Err(invalid_geometry("point elements have no sides"));
            }
        };
        let id = ElemId::new(next);
        next += 1;
        mesh.add_elem(
            Elem::new(id, lower_type, nodes)
                .with_owner(owner)
                .with_subdomain(sid)
                .with_interior_parent(parent),
        )?;
        created.push(id);
    }
    mesh.set_subdomain_name(sid, name);
    log::debug!(
        "lower-d block `{name}` on `{boundary}`: {} elements",
        created.len()
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_owners_are_contiguous() {
        let m = interval_mesh(10, 0.0, 1.0, MeshGenerationOptions::on_rank(0, 2)).unwrap();
        assert_eq!(m.active_elements_owned_by(0), (0..5).map(ElemId::new).collect::<Vec<_>>());
        assert_eq!(m.owner(ElemId::new(5)), Some(1));
    }

    #[test]
    fn quad_mesh_neighbors_and_boundaries() {
        let mut m = quad_mesh(3, 2, [0.0, 0.0], [1.0, 1.0], Default::default()).unwrap();
        m.prepare_for_use().unwrap();
        // element 1 is the bottom-middle cell
        assert_eq!(
            m.side_neighbors(ElemId::new(1)),
            &[None, Some(ElemId::new(2)), Some(ElemId::new(4)), Some(ElemId::new(0))]
        );
        let left = m.boundary_id(BOUNDARY_X_MIN).unwrap();
        assert_eq!(m.active_elements_on_boundary(left).len(), 2);
        assert_eq!(m.point_neighbors(ElemId::new(0)).len(), 3);
    }

    #[test]
    fn periodic_quad_wraps_in_x() {
        let opts = MeshGenerationOptions::default()
            .with_periodic(Periodicity { x: true, y: false });
        let mut m = quad_mesh(4, 1, [0.0, 0.0], [1.0, 1.0], opts).unwrap();
        m.prepare_for_use().unwrap();
        m.add_periodic_boundary(BOUNDARY_X_MIN, BOUNDARY_X_MAX).unwrap();
        assert_eq!(m.periodic_neighbor(ElemId::new(0), 3), Some(ElemId::new(3)));
    }

    #[test]
    fn lower_d_block_follows_parent_owner() {
        let mut m = two_block_mesh((2, 2), (3, 3), MeshGenerationOptions::on_rank(0, 2)).unwrap();
        let created = add_lower_d_block(&mut m, LEFT_INTERFACE, SubdomainId::new(10), "secondary").unwrap();
        assert_eq!(created.len(), 2);
        for id in created {
            let e = m.elem(id).unwrap();
            let parent = m.elem(e.interior_parent.unwrap()).unwrap();
            assert_eq!(e.elem_type, ElemType::Edge2);
            assert_eq!(e.processor_id, parent.processor_id);
        }
    }
}
