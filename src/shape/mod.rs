//! Geometry indexed by the BVHs of this crate.

pub use self::primitive_set::{Primitive, PrimitiveSet};
pub use self::triangle::Triangle;
pub use self::trimesh::{MeshBvh, TriMesh, TriMeshBuilderError};

mod primitive_set;
mod triangle;
mod trimesh;
