//! Frustum culling: classification of bounding volumes against a convex set of planes.

pub use self::frustum::{AabbClassification, Frustum};
pub use self::plane::Plane;

mod frustum;
mod plane;
