use crate::math::{Point, Real};
use crate::query::{Ray, RayCast, RayIntersection};
use crate::shape::Triangle;

/// Determinants smaller than this (in absolute value) mean the ray is parallel to the triangle.
const PARALLEL_EPSILON: Real = 1.0e-8;
/// Hits closer than this to the ray origin are ignored to avoid self-intersections.
const MIN_TIME_OF_IMPACT: Real = 1.0e-6;

impl RayCast for Triangle {
    #[inline]
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
    ) -> Option<RayIntersection> {
        let (toi, _, _) = local_ray_intersection_with_triangle(&self.a, &self.b, &self.c, ray)?;

        if toi > max_time_of_impact {
            return None;
        }

        let mut normal = self.scaled_normal().try_normalize(0.0)?;
        if normal.dot(&ray.dir) > 0.0 {
            normal = -normal;
        }

        Some(RayIntersection::new(toi, ray.point_at(toi), normal, 0))
    }
}

/// Computes the intersection between a triangle and a ray with the Möller–Trumbore algorithm.
///
/// Both sides of the triangle can be hit. If an intersection is found, the time of impact `t`
/// and the barycentric coordinates `(u, v)` of the intersection point are returned, i.e., the
/// intersection point is `(1 - u - v) * a + u * b + v * c`.
pub fn local_ray_intersection_with_triangle(
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
    ray: &Ray,
) -> Option<(Real, Real, Real)> {
    let ab = *b - *a;
    let ac = *c - *a;

    let p = ray.dir.cross(&ac);
    let det = ab.dot(&p);

    if det.abs() < PARALLEL_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - *a;
    let u = s.dot(&p) * inv_det;

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&ab);
    let v = ray.dir.dot(&q) * inv_det;

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let toi = ac.dot(&q) * inv_det;

    if toi < MIN_TIME_OF_IMPACT {
        return None;
    }

    Some((toi, u, v))
}
