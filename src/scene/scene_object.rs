use crate::bounding_volume::Aabb;
use crate::math::{Matrix, Real, Transform};
use crate::query::{Ray, RayCast, RayIntersection};
use crate::shape::TriMesh;
use alloc::sync::Arc;

/// A handle to an object of a [`Scene`](super::Scene).
///
/// Handles carry a generation number: once an object is removed, its handle stays invalid even
/// if its slot is reused by a new object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle {
    pub(super) index: u32,
    pub(super) generation: u32,
}

impl ObjectHandle {
    /// The index of the slot occupied by this object.
    ///
    /// This is also the primitive id of the object in the scene BVH.
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    /// The generation of this handle.
    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// A mesh placed in the world by an affine transform.
#[derive(Clone, Debug)]
pub(super) struct MeshInstance {
    pub mesh: Arc<TriMesh>,
    pub transform: Transform<Real>,
    pub inverse: Transform<Real>,
    // Transforms local normals into world normals (inverse transpose of the linear part).
    pub normal_matrix: Matrix<Real>,
}

impl MeshInstance {
    /// Returns `None` if `transform` isn't invertible.
    pub fn new(mesh: Arc<TriMesh>, transform: Transform<Real>) -> Option<Self> {
        let inverse = transform.try_inverse()?;
        let normal_matrix = inverse.matrix().fixed_view::<3, 3>(0, 0).transpose();

        Some(Self {
            mesh,
            transform,
            inverse,
            normal_matrix,
        })
    }

    pub fn world_aabb(&self) -> Aabb {
        if self.mesh.local_aabb().is_valid() {
            self.mesh.aabb(&self.transform)
        } else {
            Aabb::new_invalid()
        }
    }

    /// Casts a world-space ray on the mesh.
    ///
    /// The ray is brought into the mesh local-space without renormalization, so local times of
    /// impact are world times of impact.
    pub fn cast_ray(&self, ray: &Ray, max_time_of_impact: Real) -> Option<RayIntersection> {
        let local_ray = ray.transform_by(&self.inverse);
        let mut hit = self
            .mesh
            .cast_local_ray_and_get_normal(&local_ray, max_time_of_impact)?;

        hit.point = ray.point_at(hit.time_of_impact);
        if let Some(normal) = (self.normal_matrix * hit.normal).try_normalize(0.0) {
            hit.normal = normal;
        }

        Some(hit)
    }

    pub fn intersects_ray(&self, ray: &Ray, max_time_of_impact: Real) -> bool {
        let local_ray = ray.transform_by(&self.inverse);
        self.mesh
            .intersects_local_ray(&local_ray, max_time_of_impact)
    }
}

/// An object stored in a [`Scene`](super::Scene).
///
/// Objects are either bare world-space AABBs, hit on their boundary, or triangle meshes placed
/// in the world by an affine transform.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub(super) aabb: Aabb,
    pub(super) mesh: Option<MeshInstance>,
    pub(super) generation: u32,
}

impl SceneObject {
    /// The world-space AABB of this object, as indexed by the scene BVH.
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// The mesh of this object, if any.
    #[inline]
    pub fn mesh(&self) -> Option<&Arc<TriMesh>> {
        self.mesh.as_ref().map(|instance| &instance.mesh)
    }

    /// The world transform of this object’s mesh, if any.
    #[inline]
    pub fn transform(&self) -> Option<&Transform<Real>> {
        self.mesh.as_ref().map(|instance| &instance.transform)
    }

    pub(super) fn cast_ray(&self, ray: &Ray, max_time_of_impact: Real) -> Option<RayIntersection> {
        match &self.mesh {
            Some(instance) => instance.cast_ray(ray, max_time_of_impact),
            None => self
                .aabb
                .cast_local_ray_and_get_normal(ray, max_time_of_impact),
        }
    }

    pub(super) fn intersects_ray(&self, ray: &Ray, max_time_of_impact: Real) -> bool {
        match &self.mesh {
            Some(instance) => instance.intersects_ray(ray, max_time_of_impact),
            None => self.aabb.intersects_local_ray(ray, max_time_of_impact),
        }
    }
}
