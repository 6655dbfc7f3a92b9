//! Two-level acceleration structure over the objects of a scene.
//!
//! The [`Scene`] BVH indexes the world-space AABB of every object. Objects backed by a
//! [`TriMesh`](crate::shape::TriMesh) refine their hits with the mesh BVH, queried in the mesh
//! local-space.

pub use self::scene::{RayHit, Scene, SceneConfig, SceneError};
pub use self::scene_object::{ObjectHandle, SceneObject};

mod scene;
mod scene_object;
