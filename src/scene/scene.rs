use super::scene_object::MeshInstance;
use super::{ObjectHandle, SceneObject};
use crate::bounding_volume::Aabb;
use crate::math::{Real, Transform};
use crate::partitioning::{Bvh, BvhBuildParams, BvhLeafCost, BvhUpdate, BvhWorkspace, RebuildPolicy};
use crate::query::{Frustum, Ray, RayIntersection};
use crate::shape::{PrimitiveSet, TriMesh};
use alloc::sync::Arc;
use alloc::vec::Vec;
use slab::Slab;

/// Errors returned by the object management methods of a [`Scene`].
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum SceneError {
    /// The handle doesn’t designate an object of the scene (it was removed, or it comes from
    /// another scene).
    #[error("the object handle {0:?} is invalid or stale.")]
    InvalidHandle(ObjectHandle),
    /// The object has no mesh, so it has no pose.
    #[error("the object {0:?} has no mesh.")]
    MissingMesh(ObjectHandle),
    /// The object transform can’t be inverted, so rays can’t be brought into mesh space.
    #[error("the object transform isn’t invertible.")]
    NonInvertibleTransform,
}

/// Configuration of a [`Scene`].
///
/// The build parameters of each mesh BVH are set on the mesh itself, with
/// [`TriMesh::with_build_params`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SceneConfig {
    /// The parameters used to build the scene BVH over object AABBs.
    pub build_params: BvhBuildParams,
    /// Decides when [`Scene::maintain`] rebuilds the scene BVH instead of refitting it.
    pub rebuild_policy: RebuildPolicy,
}

/// The hit of a ray on an object of a [`Scene`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// The object that was hit.
    pub object: ObjectHandle,
    /// The world-space intersection.
    ///
    /// Its `primitive` is the triangle index for mesh objects, and `0` for bare AABBs.
    pub intersection: RayIntersection,
}

impl BvhLeafCost for RayHit {
    #[inline]
    fn cost(&self) -> Real {
        self.intersection.time_of_impact
    }
}

/// A set of objects indexed by a BVH over their world-space AABBs.
///
/// The scene BVH is rebuilt whenever objects are added or removed. Moving objects (with
/// [`Scene::set_object_pose`] or [`Scene::set_object_aabb`]) only updates their AABB: call
/// [`Scene::maintain`] once per frame afterward so the BVH bounds follow.
///
/// All the queries take `&self` and can run concurrently from several threads.
///
/// # Example
///
/// ```
/// use raypick3d::bounding_volume::Aabb;
/// use raypick3d::math::{Point, Real, Vector};
/// use raypick3d::query::Ray;
/// use raypick3d::scene::Scene;
///
/// let mut scene = Scene::new();
/// let cube = scene.add_object(Aabb::new(
///     Point::new(-0.5, -0.5, -0.5),
///     Point::new(0.5, 0.5, 0.5),
/// ));
///
/// let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::z());
/// let hit = scene.cast_ray(&ray, Real::MAX).unwrap();
/// assert_eq!(hit.object, cube);
/// assert_eq!(hit.intersection.time_of_impact, 4.5);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Scene {
    objects: Slab<SceneObject>,
    bvh: Bvh,
    workspace: BvhWorkspace,
    config: SceneConfig,
    next_generation: u32,
}

impl Scene {
    /// Creates an empty scene with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scene with the given configuration.
    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The configuration of this scene.
    #[inline]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The BVH over the object AABBs.
    ///
    /// Its primitive ids are the [indices](ObjectHandle::index) of the object handles.
    #[inline]
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// The number of objects in this scene.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Does this scene contain no object?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates through all the objects of this scene.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectHandle, &SceneObject)> {
        self.objects
            .iter()
            .map(|(index, object)| (Self::handle(index, object), object))
    }

    /// The object designated by `handle`, if it exists.
    pub fn get(&self, handle: ObjectHandle) -> Option<&SceneObject> {
        self.objects
            .get(handle.index as usize)
            .filter(|object| object.generation == handle.generation)
    }

    /// Adds an object bounded by a world-space AABB.
    ///
    /// Rays hit the boundary of the AABB itself. An AABB with non-finite coordinates is kept
    /// in the scene but can’t be hit until it is replaced with [`Scene::set_object_aabb`] and
    /// the BVH is rebuilt.
    pub fn add_object(&mut self, aabb: Aabb) -> ObjectHandle {
        let handle = self.insert_object(aabb, None);
        self.rebuild();
        handle
    }

    /// Adds several objects bounded by world-space AABBs, rebuilding the BVH only once.
    ///
    /// The handles are returned in the order of `aabbs`.
    pub fn add_objects(&mut self, aabbs: impl IntoIterator<Item = Aabb>) -> Vec<ObjectHandle> {
        let handles: Vec<_> = aabbs
            .into_iter()
            .map(|aabb| self.insert_object(aabb, None))
            .collect();

        if !handles.is_empty() {
            self.rebuild();
        }

        handles
    }

    /// Adds a triangle mesh placed in the world by `transform`.
    ///
    /// The same mesh can be shared by several objects. Its BVH is built on the first ray cast
    /// reaching one of them, or ahead of time with [`TriMesh::bvh`].
    pub fn add_mesh_object(
        &mut self,
        mesh: Arc<TriMesh>,
        transform: Transform<Real>,
    ) -> Result<ObjectHandle, SceneError> {
        let instance =
            MeshInstance::new(mesh, transform).ok_or(SceneError::NonInvertibleTransform)?;
        let handle = self.insert_object(instance.world_aabb(), Some(instance));
        self.rebuild();
        Ok(handle)
    }

    fn insert_object(&mut self, aabb: Aabb, mesh: Option<MeshInstance>) -> ObjectHandle {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let index = self.objects.insert(SceneObject {
            aabb,
            mesh,
            generation,
        });

        ObjectHandle {
            index: index as u32,
            generation,
        }
    }

    /// Removes an object from this scene.
    pub fn remove_object(&mut self, handle: ObjectHandle) -> Result<SceneObject, SceneError> {
        if self.get(handle).is_none() {
            return Err(SceneError::InvalidHandle(handle));
        }

        let object = self.objects.remove(handle.index as usize);
        self.rebuild();
        Ok(object)
    }

    /// Replaces the world-space AABB of an object.
    ///
    /// For mesh objects, this AABB is used by the scene BVH until the next
    /// [`Scene::set_object_pose`]. The BVH bounds are updated by the next [`Scene::maintain`].
    pub fn set_object_aabb(&mut self, handle: ObjectHandle, aabb: Aabb) -> Result<(), SceneError> {
        let object = self.get_mut(handle)?;
        object.aabb = aabb;
        Ok(())
    }

    /// Moves a mesh object.
    ///
    /// Its world AABB is recomputed from the mesh local AABB. The BVH bounds are updated by the
    /// next [`Scene::maintain`].
    pub fn set_object_pose(
        &mut self,
        handle: ObjectHandle,
        transform: Transform<Real>,
    ) -> Result<(), SceneError> {
        let object = self.get_mut(handle)?;
        let mesh = match &object.mesh {
            Some(instance) => instance.mesh.clone(),
            None => return Err(SceneError::MissingMesh(handle)),
        };

        let instance =
            MeshInstance::new(mesh, transform).ok_or(SceneError::NonInvertibleTransform)?;
        object.aabb = instance.world_aabb();
        object.mesh = Some(instance);
        Ok(())
    }

    fn get_mut(&mut self, handle: ObjectHandle) -> Result<&mut SceneObject, SceneError> {
        self.objects
            .get_mut(handle.index as usize)
            .filter(|object| object.generation == handle.generation)
            .ok_or(SceneError::InvalidHandle(handle))
    }

    fn handle(index: usize, object: &SceneObject) -> ObjectHandle {
        ObjectHandle {
            index: index as u32,
            generation: object.generation,
        }
    }

    fn handle_at(&self, id: u32) -> ObjectHandle {
        Self::handle(id as usize, &self.objects[id as usize])
    }

    /// Refits the scene BVH to the current object AABBs, then rebuilds it if the rebuild
    /// policy says so.
    ///
    /// Call this once per frame after moving objects.
    pub fn maintain(&mut self) -> BvhUpdate {
        let objects = &self.objects;
        self.bvh.maintain(
            &self.config.rebuild_policy,
            &self.config.build_params,
            &mut self.workspace,
            |id| objects[id as usize].aabb,
        )
    }

    /// Refits the scene BVH to the current object AABBs, without ever rebuilding it.
    pub fn refit(&mut self) {
        let objects = &self.objects;
        self.bvh.refit(|id| objects[id as usize].aabb);
    }

    /// Rebuilds the scene BVH from scratch.
    pub fn rebuild(&mut self) {
        let primitives = PrimitiveSet::from_aabbs(
            self.objects
                .iter()
                .map(|(index, object)| (index as u32, object.aabb)),
        );
        self.bvh
            .rebuild(&primitives, &self.config.build_params, &mut self.workspace);
    }

    /// Builds the BVH of every mesh of this scene that doesn’t have one yet, in parallel.
    #[cfg(feature = "parallel")]
    pub fn build_mesh_bvhs(&self) {
        use rayon::prelude::*;

        let mut meshes: Vec<&Arc<TriMesh>> = self
            .objects
            .iter()
            .filter_map(|(_, object)| object.mesh())
            .filter(|mesh| mesh.cached_bvh().is_none())
            .collect();
        meshes.sort_unstable_by_key(|mesh| Arc::as_ptr(mesh));
        meshes.dedup_by_key(|mesh| Arc::as_ptr(mesh));

        meshes.par_iter().for_each(|mesh| {
            let _ = mesh.bvh();
        });
    }

    /// Finds the closest object hit by `ray`, in world-space.
    pub fn cast_ray(&self, ray: &Ray, max_time_of_impact: Real) -> Option<RayHit> {
        self.bvh
            .cast_ray(ray, max_time_of_impact, |id, best| {
                self.cast_ray_on_object(id, ray, best)
            })
            .map(|(_, hit)| hit)
    }

    /// Tests whether `ray` hits any object.
    pub fn intersects_ray(&self, ray: &Ray, max_time_of_impact: Real) -> bool {
        self.bvh
            .intersects_ray(ray, max_time_of_impact, |id, max_toi| {
                self.objects[id as usize].intersects_ray(ray, max_toi)
            })
    }

    /// Finds every object hit by `ray`, sorted by increasing time of impact.
    ///
    /// Each object appears once, with its hit closest to the ray origin.
    pub fn cast_ray_all(&self, ray: &Ray, max_time_of_impact: Real) -> Vec<RayHit> {
        self.bvh
            .cast_ray_all(ray, max_time_of_impact, |id, max_toi| {
                self.cast_ray_on_object(id, ray, max_toi)
            })
            .into_iter()
            .map(|(_, hit)| hit)
            .collect()
    }

    /// The handles of the objects whose AABB is inside of, or intersects, `frustum`.
    pub fn frustum_query(&self, frustum: &Frustum) -> Vec<ObjectHandle> {
        self.bvh
            .frustum_query(frustum, |id| self.objects[id as usize].aabb)
            .into_iter()
            .map(|id| self.handle_at(id))
            .collect()
    }

    fn cast_ray_on_object(&self, id: u32, ray: &Ray, max_time_of_impact: Real) -> Option<RayHit> {
        let intersection = self.objects[id as usize].cast_ray(ray, max_time_of_impact)?;
        Some(RayHit {
            object: self.handle_at(id),
            intersection,
        })
    }
}
