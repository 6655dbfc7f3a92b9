//! Traits and structure needed to cast rays.

use crate::math::{Point, Real, TexCoord, Transform, Vector};
use crate::partitioning::BvhLeafCost;

/// A ray that can be cast against a shape or a BVH.
///
/// The reciprocal of the direction is computed once at construction and reused by every slab
/// test performed by the query. A zero direction component yields an infinite reciprocal, which
/// the slab test handles without special-casing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Ray {
    /// Starting point of the ray.
    pub origin: Point<Real>,
    /// Direction of the ray.
    ///
    /// It does not have to be normalized. Times of impact are expressed in multiples of its
    /// length.
    pub dir: Vector<Real>,
    /// The component-wise reciprocal of `dir`.
    pub inv_dir: Vector<Real>,
}

impl Ray {
    /// Creates a new ray starting from `origin` and with the direction `dir`.
    pub fn new(origin: Point<Real>, dir: Vector<Real>) -> Ray {
        Ray {
            origin,
            dir,
            inv_dir: dir.map(|x| 1.0 / x),
        }
    }

    /// Transforms this ray by the given affine transformation.
    ///
    /// The transformed direction is not renormalized, so a time of impact computed against the
    /// transformed ray is valid for the original ray too.
    #[inline]
    pub fn transform_by(&self, m: &Transform<Real>) -> Self {
        Self::new(m * self.origin, m * self.dir)
    }

    /// Translates this ray by the given vector.
    #[inline]
    pub fn translate_by(&self, v: Vector<Real>) -> Self {
        Self {
            origin: self.origin + v,
            ..*self
        }
    }

    /// Computes the point at the given parameter on this ray.
    ///
    /// This computes `self.origin + self.dir * t`.
    #[inline]
    pub fn point_at(&self, t: Real) -> Point<Real> {
        self.origin + self.dir * t
    }
}

/// Structure containing the result of a successful ray cast.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayIntersection {
    /// The time of impact of the ray with the object.
    ///
    /// The exact contact point can be computed with `ray.point_at(time_of_impact)`.
    pub time_of_impact: Real,

    /// The contact point, in the same space as the ray that was cast.
    pub point: Point<Real>,

    /// The unit normal at the intersection point.
    ///
    /// For triangle meshes with vertex normals this is the interpolated vertex normal. Otherwise
    /// it is the geometric normal of the face that was hit, oriented toward the ray origin.
    pub normal: Vector<Real>,

    /// The interpolated texture coordinates at the intersection point, if the shape has any.
    pub uv: Option<TexCoord<Real>>,

    /// The index of the primitive that was hit (e.g. the triangle index of a mesh).
    pub primitive: u32,
}

impl RayIntersection {
    /// Creates a new `RayIntersection` without texture coordinates.
    #[inline]
    pub fn new(
        time_of_impact: Real,
        point: Point<Real>,
        normal: Vector<Real>,
        primitive: u32,
    ) -> RayIntersection {
        RayIntersection {
            time_of_impact,
            point,
            normal,
            uv: None,
            primitive,
        }
    }
}

impl BvhLeafCost for RayIntersection {
    #[inline]
    fn cost(&self) -> Real {
        self.time_of_impact
    }
}

/// Traits of objects which can be intersected by a ray.
///
/// All the methods of this trait operate in the local space of the shape.
pub trait RayCast {
    /// Computes the time of impact between this shape and a ray.
    fn cast_local_ray(&self, ray: &Ray, max_time_of_impact: Real) -> Option<Real> {
        self.cast_local_ray_and_get_normal(ray, max_time_of_impact)
            .map(|inter| inter.time_of_impact)
    }

    /// Computes the time of impact, contact point and normal between this shape and a ray.
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
    ) -> Option<RayIntersection>;

    /// Tests whether a ray intersects this shape.
    #[inline]
    fn intersects_local_ray(&self, ray: &Ray, max_time_of_impact: Real) -> bool {
        self.cast_local_ray(ray, max_time_of_impact).is_some()
    }
}
