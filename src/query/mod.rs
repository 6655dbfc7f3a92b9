//! Ray casts and frustum tests against individual shapes.
//!
//! The BVH-accelerated versions of these queries live in [`crate::partitioning`] (for any set of
//! primitives), on [`crate::shape::TriMesh`] (for triangles) and on [`crate::scene::Scene`] (for
//! whole objects).

pub use self::frustum::{AabbClassification, Frustum, Plane};
pub use self::ray::{Ray, RayCast, RayIntersection};

pub mod frustum;
pub mod ray;
