use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, Vector, DIM};
use crate::query::{Ray, RayCast, RayIntersection};

/// The portion of a ray inside an AABB, as computed by [`ray_aabb_interval`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayAabbInterval {
    /// The parameter at which the ray enters the AABB (zero if the origin is inside).
    pub tmin: Real,
    /// The parameter at which the ray leaves the AABB (clamped to the maximum time of impact).
    pub tmax: Real,
    /// The axis of the slab that determined `tmin`, if any.
    pub entry_axis: Option<usize>,
    /// The axis of the slab that determined `tmax`, if any.
    pub exit_axis: Option<usize>,
}

/// Clips a ray against the AABB `[mins, maxs]` with the slab method.
///
/// Only the part of the ray within `[0, max_time_of_impact]` is considered. Returns `None` if
/// that part doesn't touch the AABB. The test is inclusive: a ray grazing a face or an edge
/// hits, including when the ray lies in the plane of a face. In that case `0 * inf` produces a
/// NaN slab parameter, and the slab is then treated as unconstrained.
///
/// An AABB with `mins > maxs` or a NaN bound on some axis (e.g. [`Aabb::new_invalid`]) contains
/// nothing and is never hit.
#[inline]
pub fn ray_aabb_interval(
    mins: &Point<Real>,
    maxs: &Point<Real>,
    ray: &Ray,
    max_time_of_impact: Real,
) -> Option<RayAabbInterval> {
    let mut result = RayAabbInterval {
        tmin: 0.0,
        tmax: max_time_of_impact,
        entry_axis: None,
        exit_axis: None,
    };

    for i in 0..DIM {
        if mins[i] > maxs[i] || mins[i].is_nan() || maxs[i].is_nan() {
            return None;
        }

        let t1 = (mins[i] - ray.origin[i]) * ray.inv_dir[i];
        let t2 = (maxs[i] - ray.origin[i]) * ray.inv_dir[i];

        if t1.is_nan() || t2.is_nan() {
            continue;
        }

        let (near, far) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };

        if near >= result.tmin {
            result.tmin = near;
            result.entry_axis = Some(i);
        }

        if far <= result.tmax {
            result.tmax = far;
            result.exit_axis = Some(i);
        }

        if result.tmin > result.tmax {
            return None;
        }
    }

    Some(result)
}

/// The boundary of an AABB, as hit by a ray.
///
/// A ray starting inside of the AABB hits it where it leaves it.
impl RayCast for Aabb {
    /// Computes the entry point and outward normal of the face hit first by `ray`.
    ///
    /// If the ray starts inside of the AABB, the exit point is reported instead, with the face
    /// normal flipped so it points toward the ray origin.
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
    ) -> Option<RayIntersection> {
        let interval = ray_aabb_interval(&self.mins, &self.maxs, ray, max_time_of_impact)?;

        let (toi, normal) = match (interval.entry_axis, interval.exit_axis) {
            (Some(axis), _) => {
                let mut normal = Vector::zeros();
                normal[axis] = if ray.dir[axis] > 0.0 { -1.0 } else { 1.0 };
                (interval.tmin, normal)
            }
            (None, Some(axis)) => {
                let mut normal = Vector::zeros();
                normal[axis] = if ray.dir[axis] > 0.0 { -1.0 } else { 1.0 };
                (interval.tmax, normal)
            }
            // The ray doesn't leave the AABB before `max_time_of_impact`.
            (None, None) => return None,
        };

        Some(RayIntersection::new(toi, ray.point_at(toi), normal, 0))
    }
}

#[cfg(test)]
mod test {
    use crate::bounding_volume::Aabb;
    use crate::math::{Point, Real, Vector};
    use crate::query::{Ray, RayCast};

    fn unit_cube() -> Aabb {
        Aabb::new(Point::new(-0.5, -0.5, -0.5), Point::new(0.5, 0.5, 0.5))
    }

    #[test]
    fn ray_hits_unit_cube_front_face() {
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        let hit = unit_cube()
            .cast_local_ray_and_get_normal(&ray, Real::MAX)
            .unwrap();
        assert_eq!(hit.time_of_impact, 4.5);
        assert_eq!(hit.point, Point::new(0.0, 0.0, -0.5));
        assert_eq!(hit.normal, Vector::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn ray_in_face_plane_grazes_the_box() {
        // The origin lies on the plane `x = 0.5` and the ray travels within it.
        let ray = Ray::new(Point::new(0.5, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        assert_eq!(unit_cube().cast_local_ray(&ray, Real::MAX), Some(4.5));

        let ray = Ray::new(Point::new(0.5001, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        assert_eq!(unit_cube().cast_local_ray(&ray, Real::MAX), None);
    }

    #[test]
    fn ray_respects_max_time_of_impact() {
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        assert_eq!(unit_cube().cast_local_ray(&ray, 4.0), None);
        assert_eq!(unit_cube().cast_local_ray(&ray, 4.5), Some(4.5));
    }

    #[test]
    fn ray_pointing_away_misses() {
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, -1.0));
        assert_eq!(unit_cube().cast_local_ray(&ray, Real::MAX), None);
    }

    #[test]
    fn ray_starting_inside_reports_exit_face() {
        let ray = Ray::new(Point::origin(), Vector::new(2.0, 0.0, 0.0));
        assert_eq!(unit_cube().cast_local_ray(&ray, Real::MAX), Some(0.25));
        assert_eq!(unit_cube().cast_local_ray(&ray, 0.2), None);

        let hit = unit_cube()
            .cast_local_ray_and_get_normal(&ray, Real::MAX)
            .unwrap();
        assert_eq!(hit.time_of_impact, 0.25);
        assert_eq!(hit.normal, Vector::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn inverted_boxes_are_never_hit() {
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        assert_eq!(Aabb::new_invalid().cast_local_ray(&ray, Real::MAX), None);
        assert!(!Aabb::new_invalid().intersects_local_ray(&ray, Real::MAX));

        // Inverted along the ray's own axis, then along an axis the ray doesn't move on.
        let flat_z = Aabb::new(Point::new(-0.5, -0.5, 0.5), Point::new(0.5, 0.5, -0.5));
        assert_eq!(flat_z.cast_local_ray(&ray, Real::MAX), None);
        let flat_x = Aabb::new(Point::new(0.5, -0.5, -0.5), Point::new(-0.5, 0.5, 0.5));
        assert_eq!(flat_x.cast_local_ray(&ray, Real::MAX), None);

        let nan = Aabb::new(Point::new(Real::NAN, -0.5, -0.5), Point::new(0.5, 0.5, 0.5));
        assert_eq!(nan.cast_local_ray(&ray, Real::MAX), None);

        let point = Aabb::new(Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 0.0));
        assert_eq!(point.cast_local_ray(&ray, Real::MAX), Some(5.0));
    }
}
