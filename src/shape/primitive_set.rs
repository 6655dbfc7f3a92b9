use crate::bounding_volume::Aabb;
use crate::math::{Point, Real};
use crate::shape::Triangle;
use alloc::vec::Vec;

/// A single item indexed by a [`Bvh`](crate::partitioning::Bvh).
///
/// The `id` is the index the caller uses to identify this primitive (a triangle index, a scene
/// object key, etc.). It is what BVH queries report back.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Primitive {
    /// The caller-provided identifier of this primitive.
    pub id: u32,
    /// The bounds of this primitive.
    pub aabb: Aabb,
    /// The center of `aabb`, cached for BVH construction.
    pub centroid: Point<Real>,
}

impl Primitive {
    /// Creates a primitive from its identifier and bounds.
    #[inline]
    pub fn new(id: u32, aabb: Aabb) -> Self {
        Self {
            id,
            aabb,
            centroid: aabb.center(),
        }
    }
}

/// A validated snapshot of primitives ready to be fed to the BVH builder.
///
/// This is the only place where input geometry is validated: primitives with non-finite
/// coordinates, inverted bounds, or (for triangles) a zero area are skipped instead of being
/// inserted. Skipping is not an error, the number of skipped primitives is available through
/// [`PrimitiveSet::skipped_count`].
#[derive(Clone, Debug, Default)]
pub struct PrimitiveSet {
    primitives: Vec<Primitive>,
    skipped: usize,
}

impl PrimitiveSet {
    /// An empty primitive set.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty primitive set with room for `capacity` primitives.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            primitives: Vec::with_capacity(capacity),
            skipped: 0,
        }
    }

    /// Builds a primitive set from `(id, aabb)` pairs.
    ///
    /// Invalid AABBs are skipped and counted.
    pub fn from_aabbs<It>(aabbs: It) -> Self
    where
        It: IntoIterator<Item = (u32, Aabb)>,
    {
        let aabbs = aabbs.into_iter();
        let (capacity_lo, capacity_up) = aabbs.size_hint();
        let mut result = Self::with_capacity(capacity_up.unwrap_or(capacity_lo));

        for (id, aabb) in aabbs {
            let _ = result.push_aabb(id, aabb);
        }

        result.report_skipped("AABBs");
        result
    }

    /// Builds a primitive set from the triangles of an indexed mesh.
    ///
    /// The id of each primitive is the index of its triangle in `indices`. Degenerate
    /// triangles and triangles referencing out-of-bounds vertices are skipped and counted.
    pub fn from_triangles(vertices: &[Point<Real>], indices: &[[u32; 3]]) -> Self {
        let mut result = Self::with_capacity(indices.len());

        for (id, idx) in indices.iter().enumerate() {
            let triangle = match (
                vertices.get(idx[0] as usize),
                vertices.get(idx[1] as usize),
                vertices.get(idx[2] as usize),
            ) {
                (Some(a), Some(b), Some(c)) => Triangle::new(*a, *b, *c),
                _ => {
                    result.skipped += 1;
                    continue;
                }
            };

            let _ = result.push_triangle(id as u32, &triangle);
        }

        result.report_skipped("triangles");
        result
    }

    /// Adds a primitive bounded by `aabb`.
    ///
    /// Returns `false` (and counts the primitive as skipped) if `aabb` has non-finite
    /// coordinates or is inverted.
    pub fn push_aabb(&mut self, id: u32, aabb: Aabb) -> bool {
        if !aabb.is_finite() || !aabb.is_valid() {
            self.skipped += 1;
            return false;
        }

        self.primitives.push(Primitive::new(id, aabb));
        true
    }

    /// Adds a triangle primitive.
    ///
    /// Returns `false` (and counts the primitive as skipped) if the triangle is degenerate.
    pub fn push_triangle(&mut self, id: u32, triangle: &Triangle) -> bool {
        if triangle.is_degenerate() {
            self.skipped += 1;
            return false;
        }

        self.primitives.push(Primitive::new(id, triangle.local_aabb()));
        true
    }

    /// The number of valid primitives in this set.
    #[inline]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Does this set contain no valid primitive?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// The number of primitives rejected while filling this set.
    #[inline]
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    /// The valid primitives of this set.
    #[inline]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// The AABB enclosing every primitive of this set.
    pub fn aabb(&self) -> Aabb {
        let mut result = Aabb::new_invalid();
        for primitive in &self.primitives {
            result.mins = result.mins.inf(&primitive.aabb.mins);
            result.maxs = result.maxs.sup(&primitive.aabb.maxs);
        }
        result
    }

    fn report_skipped(&self, kind: &str) {
        if self.skipped > 0 {
            log::warn!(
                "{} {} with non-finite coordinates or degenerate bounds were excluded from the BVH.",
                self.skipped,
                kind
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::PrimitiveSet;
    use crate::bounding_volume::Aabb;
    use crate::math::{Point, Real};

    #[test]
    fn invalid_aabbs_are_skipped_and_counted() {
        let good = Aabb::new(Point::origin(), Point::new(1.0, 1.0, 1.0));
        let nan = Aabb::new(Point::new(Real::NAN, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
        let inf = Aabb::new(Point::origin(), Point::new(Real::INFINITY, 1.0, 1.0));
        let inverted = Aabb::new(Point::new(1.0, 1.0, 1.0), Point::origin());

        let set = PrimitiveSet::from_aabbs([(0, good), (1, nan), (2, inf), (3, inverted)]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.skipped_count(), 3);
        assert_eq!(set.primitives()[0].id, 0);
        assert_eq!(set.primitives()[0].centroid, Point::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn degenerate_triangles_are_skipped_and_counted() {
        let vertices = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(Real::NAN, 0.0, 0.0),
        ];
        let indices = [
            [0, 1, 2], // Valid.
            [0, 1, 3], // Collinear.
            [0, 0, 2], // Repeated vertex.
            [0, 1, 4], // NaN.
            [0, 1, 9], // Out of bounds.
            [2, 1, 0], // Valid, reversed.
        ];

        let set = PrimitiveSet::from_triangles(&vertices, &indices);
        assert_eq!(set.skipped_count(), 4);
        let ids: Vec<_> = set.primitives().iter().map(|p| p.id).collect();
        assert_eq!(ids, [0, 5]);
    }
}
