use core::iter::IntoIterator;

use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, Transform};

/// Computes the AABB of a set of points transformed by `m`.
///
/// Returns an invalid AABB (see [`Aabb::new_invalid`]) if the iterator is empty.
pub fn point_cloud_aabb<'a, I>(m: &Transform<Real>, pts: I) -> Aabb
where
    I: IntoIterator<Item = &'a Point<Real>>,
{
    local_point_cloud_aabb(pts.into_iter().map(|pt| m * pt))
}

/// Computes the AABB of a set of points.
///
/// Returns an invalid AABB (see [`Aabb::new_invalid`]) if the iterator is empty.
pub fn local_point_cloud_aabb<I>(pts: I) -> Aabb
where
    I: IntoIterator<Item = Point<Real>>,
{
    let mut result = Aabb::new_invalid();

    for pt in pts {
        result.take_point(pt);
    }

    result
}
