use crate::math::{Point, Real, Vector};

/// A plane with an outward-facing normal.
///
/// The signed distance of a point `p` to this plane is `normal · p + bias`. Points with a
/// positive signed distance are on the outer side of the plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    /// The outward normal of the plane. Signed distances are only Euclidean distances if it has
    /// unit length.
    pub normal: Vector<Real>,
    /// The offset of the plane along its normal.
    pub bias: Real,
}

impl Plane {
    /// Creates a plane from its outward normal and its bias.
    #[inline]
    pub fn new(normal: Vector<Real>, bias: Real) -> Self {
        Self { normal, bias }
    }

    /// Creates the plane passing through `point` with the outward normal `normal`.
    #[inline]
    pub fn from_point_and_normal(point: &Point<Real>, normal: Vector<Real>) -> Self {
        Self {
            normal,
            bias: -normal.dot(&point.coords),
        }
    }

    /// The signed distance from this plane to `point`, positive on the outer side.
    #[inline]
    pub fn signed_distance(&self, point: &Point<Real>) -> Real {
        self.normal.dot(&point.coords) + self.bias
    }

    /// This plane rescaled so its normal has unit length.
    ///
    /// Returns `None` if the normal is zero or not finite.
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.normal.norm();

        if norm > 0.0 && norm.is_finite() {
            Some(Self {
                normal: self.normal / norm,
                bias: self.bias / norm,
            })
        } else {
            None
        }
    }
}
