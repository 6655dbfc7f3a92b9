use crate::math::Real;
use crate::query::ray::local_ray_intersection_with_triangle;
use crate::query::{Frustum, Ray, RayCast, RayIntersection};
use crate::shape::TriMesh;
use alloc::vec::Vec;

impl RayCast for TriMesh {
    /// Finds the closest triangle hit by `ray`, building the mesh BVH first if needed.
    #[inline]
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
    ) -> Option<RayIntersection> {
        self.bvh()
            .bvh()
            .cast_ray(ray, max_time_of_impact, |id, best| {
                self.cast_ray_on_triangle(id, ray, best)
            })
            .map(|(_, hit)| hit)
    }

    #[inline]
    fn intersects_local_ray(&self, ray: &Ray, max_time_of_impact: Real) -> bool {
        self.bvh()
            .bvh()
            .intersects_ray(ray, max_time_of_impact, |id, max_toi| {
                let tri = self.triangle(id);
                local_ray_intersection_with_triangle(&tri.a, &tri.b, &tri.c, ray)
                    .is_some_and(|(toi, _, _)| toi <= max_toi)
            })
    }
}

impl TriMesh {
    /// Computes every intersection between `ray` and the triangles of this mesh.
    ///
    /// The hits are sorted by increasing time of impact, with at most one hit per triangle.
    pub fn cast_local_ray_all(&self, ray: &Ray, max_time_of_impact: Real) -> Vec<RayIntersection> {
        self.bvh()
            .bvh()
            .cast_ray_all(ray, max_time_of_impact, |id, max_toi| {
                self.cast_ray_on_triangle(id, ray, max_toi)
            })
            .into_iter()
            .map(|(_, hit)| hit)
            .collect()
    }

    /// The indices of the triangles inside of, or intersecting, `frustum`.
    ///
    /// The frustum is expressed in the local-space of the mesh. Triangles of leaves straddling
    /// a frustum plane are tested through their AABB, so a triangle whose AABB touches the
    /// frustum while the triangle itself doesn’t may be reported.
    pub fn frustum_query(&self, frustum: &Frustum) -> Vec<u32> {
        self.bvh()
            .bvh()
            .frustum_query(frustum, |id| self.triangle(id).local_aabb())
    }

    /// Casts `ray` on the triangle `id`, filling the intersection with the interpolated vertex
    /// attributes.
    pub(crate) fn cast_ray_on_triangle(
        &self,
        id: u32,
        ray: &Ray,
        max_time_of_impact: Real,
    ) -> Option<RayIntersection> {
        let tri = self.triangle(id);
        let (toi, u, v) = local_ray_intersection_with_triangle(&tri.a, &tri.b, &tri.c, ray)?;

        if toi > max_time_of_impact {
            return None;
        }

        let normal = match self.interpolated_normal(id, u, v) {
            Some(normal) => normal,
            None => {
                let normal = tri.scaled_normal().try_normalize(0.0)?;
                if normal.dot(&ray.dir) > 0.0 {
                    -normal
                } else {
                    normal
                }
            }
        };

        Some(RayIntersection {
            time_of_impact: toi,
            point: ray.point_at(toi),
            normal,
            uv: self.interpolated_uv(id, u, v),
            primitive: id,
        })
    }
}
