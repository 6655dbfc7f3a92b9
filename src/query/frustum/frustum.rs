use super::Plane;
use crate::bounding_volume::Aabb;
use crate::math::{Matrix4, Point, Real, Vector};

/// The position of an AABB relative to a [`Frustum`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AabbClassification {
    /// The AABB is entirely inside of the frustum.
    Inside,
    /// The AABB is entirely outside of at least one plane of the frustum.
    Outside,
    /// The AABB straddles at least one plane of the frustum.
    Intersecting,
}

/// A convex volume bounded by six planes with outward normals.
///
/// A point is inside of the frustum if its signed distance to every plane is non-positive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum {
    /// The planes bounding this frustum.
    ///
    /// [`Frustum::from_view_projection`] orders them as left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Creates a frustum from its six bounding planes.
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// The frustum whose planes are the faces of `aabb`.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self {
            planes: [
                Plane::new(-Vector::x(), aabb.mins.x),
                Plane::new(Vector::x(), -aabb.maxs.x),
                Plane::new(-Vector::y(), aabb.mins.y),
                Plane::new(Vector::y(), -aabb.maxs.y),
                Plane::new(-Vector::z(), aabb.mins.z),
                Plane::new(Vector::z(), -aabb.maxs.z),
            ],
        }
    }

    /// Extracts the frustum planes of a combined view-projection matrix.
    ///
    /// The matrix maps world-space points (as column vectors) to clip space, with the OpenGL
    /// depth convention: the visible volume is `-w <= x, y, z <= w`. This is the convention of
    /// `nalgebra::Perspective3` and `nalgebra::Orthographic3`.
    ///
    /// Returns `None` if one of the extracted planes is degenerate.
    pub fn from_view_projection(view_projection: &Matrix4<Real>) -> Option<Self> {
        let m = view_projection;
        let row = |i: usize| m.row(i).transpose();
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        // Each combination `c` satisfies `c · (x, y, z, 1) >= 0` inside of the frustum.
        let inner = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2];
        let mut planes = [Plane::new(Vector::zeros(), 0.0); 6];

        for (plane, coeffs) in planes.iter_mut().zip(inner.iter()) {
            *plane = Plane::new(-coeffs.xyz(), -coeffs.w).normalized()?;
        }

        Some(Self { planes })
    }

    /// Classifies an AABB against this frustum.
    ///
    /// The test compares, for each plane, the signed distance of the AABB center with the
    /// projected radius of the AABB on the plane normal. It is conservative: an AABB close to
    /// a frustum corner may be reported as [`AabbClassification::Intersecting`] even if it is
    /// actually outside.
    pub fn classify_aabb(&self, aabb: &Aabb) -> AabbClassification {
        let center = aabb.center();
        let half_extents = aabb.half_extents();
        let mut intersecting = false;

        for plane in &self.planes {
            let dist = plane.signed_distance(&center);
            let radius = plane.normal.abs().dot(&half_extents);

            if dist - radius > 0.0 {
                return AabbClassification::Outside;
            }

            if dist + radius > 0.0 {
                intersecting = true;
            }
        }

        if intersecting {
            AabbClassification::Intersecting
        } else {
            AabbClassification::Inside
        }
    }

    /// Does `aabb` intersect or lie inside of this frustum?
    #[inline]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.classify_aabb(aabb) != AabbClassification::Outside
    }

    /// Is `point` inside of this frustum (boundary included)?
    pub fn contains_point(&self, point: &Point<Real>) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) <= 0.0)
    }
}
