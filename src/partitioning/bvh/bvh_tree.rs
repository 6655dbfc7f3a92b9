use crate::bounding_volume::Aabb;
use crate::math::{Point, Real};
use crate::query::ray::ray_aabb_interval;
use crate::query::Ray;
use crate::shape::{Primitive, PrimitiveSet};
use alloc::vec::Vec;

/// The maximum depth of a traversal stack, and thus of a [`Bvh`].
///
/// The builder switches to object-median splits deep in the tree so this bound is never
/// reached, whatever the input distribution.
pub const TRAVERSAL_STACK_SIZE: usize = 64;

/// Parameters of the binned SAH builder.
///
/// The defaults (leaves of up to 4 primitives, 12 bins, traversal cost 1.0, intersection cost
/// 1.5, leaves never larger than 16 primitives) work well for both scene objects and triangle
/// meshes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BvhBuildParams {
    /// Ranges with at most this many primitives always become leaves.
    pub leaf_size: usize,
    /// The number of centroid bins evaluated per axis.
    pub bin_count: usize,
    /// The SAH cost of traversing an internal node.
    pub traversal_cost: Real,
    /// The SAH cost of intersecting a single primitive.
    pub intersection_cost: Real,
    /// Leaves never contain more than this many primitives, even when splitting is more
    /// expensive according to the SAH.
    pub max_leaf_size: usize,
}

impl Default for BvhBuildParams {
    fn default() -> Self {
        Self {
            leaf_size: 4,
            bin_count: 12,
            traversal_cost: 1.0,
            intersection_cost: 1.5,
            max_leaf_size: 16,
        }
    }
}

impl BvhBuildParams {
    /// These parameters with their counts clamped to usable values.
    pub(super) fn sanitized(&self) -> Self {
        let leaf_size = self.leaf_size.max(1);
        Self {
            leaf_size,
            bin_count: self.bin_count.max(2),
            traversal_cost: self.traversal_cost,
            intersection_cost: self.intersection_cost,
            max_leaf_size: self.max_leaf_size.max(leaf_size),
        }
    }
}

/// Workspace for BVH construction.
///
/// Holds the scratch buffers of the builder so repeated rebuilds (e.g. of a scene BVH) don't
/// reallocate them. Each workspace must be used by a single build at a time; create one per
/// thread when building several BVHs in parallel.
#[derive(Clone, Debug, Default)]
pub struct BvhWorkspace {
    pub(super) build_primitives: Vec<Primitive>,
    pub(super) bins: Vec<BvhBin>,
    pub(super) right_bins: Vec<BvhBin>,
}

/// A centroid bin of the binned SAH builder.
#[derive(Copy, Clone, Debug)]
pub(super) struct BvhBin {
    pub aabb: Aabb,
    pub count: u32,
}

impl Default for BvhBin {
    fn default() -> Self {
        Self {
            aabb: Aabb::new_invalid(),
            count: 0,
        }
    }
}

const LEAF_FLAG: u32 = 1 << 31;
const AXIS_SHIFT: u32 = 29;
const AXIS_MASK: u32 = 0b11;
const RIGHT_CHILD_MASK: u32 = (1 << AXIS_SHIFT) - 1;
const PRIMITIVE_COUNT_MASK: u32 = !LEAF_FLAG;

/// The packed flags of a [`BvhNode`].
///
/// Bit 31 is set for leaves. The other bits hold the primitive count of a leaf, or the split
/// axis (bits 29 and 30) and the right child index (bits 0 to 28) of an internal node.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct BvhNodeData(u32);

impl BvhNodeData {
    #[inline(always)]
    pub(super) fn leaf(primitive_count: u32) -> Self {
        assert!(primitive_count <= PRIMITIVE_COUNT_MASK);
        Self(LEAF_FLAG | primitive_count)
    }

    #[inline(always)]
    pub(super) fn internal(split_axis: usize, right_child: u32) -> Self {
        assert!(split_axis < 3 && right_child <= RIGHT_CHILD_MASK);
        Self(((split_axis as u32) << AXIS_SHIFT) | right_child)
    }

    /// Is this the data of a leaf node?
    #[inline(always)]
    pub fn is_leaf(self) -> bool {
        self.0 & LEAF_FLAG != 0
    }

    /// The number of primitives of a leaf. Meaningless for internal nodes.
    #[inline(always)]
    pub fn primitive_count(self) -> u32 {
        self.0 & PRIMITIVE_COUNT_MASK
    }

    /// The split axis of an internal node. Meaningless for leaves.
    #[inline(always)]
    pub fn split_axis(self) -> usize {
        ((self.0 >> AXIS_SHIFT) & AXIS_MASK) as usize
    }

    /// The index of the right child of an internal node. Meaningless for leaves.
    #[inline(always)]
    pub fn right_child(self) -> u32 {
        self.0 & RIGHT_CHILD_MASK
    }
}

/// A node of a [`Bvh`].
///
/// Nodes are stored in a single array in depth-first pre-order: the left child of an internal
/// node `i` is always `i + 1`, and its right child index is stored in its [`BvhNodeData`]. A leaf
/// references the range `children..children + primitive_count` of the BVH primitive indices.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
#[cfg_attr(not(feature = "f64"), repr(align(16)))]
pub struct BvhNode {
    pub(super) mins: Point<Real>,
    /// First primitive offset for leaves, left child index for internal nodes.
    pub(super) children: u32,
    pub(super) maxs: Point<Real>,
    pub(super) data: BvhNodeData,
}

#[cfg(not(feature = "f64"))]
static_assertions::assert_eq_size!(BvhNode, [u8; 32]);

impl BvhNode {
    #[inline(always)]
    pub(super) fn leaf(aabb: Aabb, first_primitive: u32, primitive_count: u32) -> Self {
        Self {
            mins: aabb.mins,
            children: first_primitive,
            maxs: aabb.maxs,
            data: BvhNodeData::leaf(primitive_count),
        }
    }

    #[inline(always)]
    pub(super) fn internal(aabb: Aabb, split_axis: usize, left: u32, right: u32) -> Self {
        Self {
            mins: aabb.mins,
            children: left,
            maxs: aabb.maxs,
            data: BvhNodeData::internal(split_axis, right),
        }
    }

    /// Is this node a leaf?
    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.data.is_leaf()
    }

    /// The packed flags of this node.
    #[inline(always)]
    pub fn data(&self) -> BvhNodeData {
        self.data
    }

    /// The range of primitive offsets referenced by this node, if it is a leaf.
    #[inline]
    pub fn primitive_range(&self) -> Option<core::ops::Range<usize>> {
        self.is_leaf().then(|| {
            let first = self.children as usize;
            first..first + self.data.primitive_count() as usize
        })
    }

    /// The indices of the left and right children of this node, if it is internal.
    #[inline]
    pub fn children(&self) -> Option<[u32; 2]> {
        (!self.is_leaf()).then_some([self.children, self.data.right_child()])
    }

    /// The minimum corner of this node’s AABB.
    #[inline]
    pub fn mins(&self) -> Point<Real> {
        self.mins
    }

    /// The maximum corner of this node’s AABB.
    #[inline]
    pub fn maxs(&self) -> Point<Real> {
        self.maxs
    }

    /// The AABB bounding everything contained by this node.
    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb {
            mins: self.mins,
            maxs: self.maxs,
        }
    }

    #[inline(always)]
    pub(super) fn set_aabb(&mut self, aabb: Aabb) {
        self.mins = aabb.mins;
        self.maxs = aabb.maxs;
    }

    /// The center of this node’s AABB.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        na::center(&self.mins, &self.maxs)
    }

    /// Does this node’s AABB contain `other`?
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.mins) && na::partial_ge(&self.maxs, &other.maxs)
    }

    /// Casts a ray on this node’s AABB.
    ///
    /// Returns the time of impact at which the ray enters the AABB (zero if it starts inside),
    /// or `None` if it doesn’t reach the AABB within `max_toi`.
    #[inline]
    pub fn cast_ray(&self, ray: &Ray, max_toi: Real) -> Option<Real> {
        ray_aabb_interval(&self.mins, &self.maxs, ray, max_toi).map(|interval| interval.tmin)
    }
}

/// A Bounding Volume Hierarchy built with the binned surface area heuristic.
///
/// The tree is a flat array of [`BvhNode`]s rooted at index 0, plus the array of primitive ids
/// the leaves point into. The ids are the ones given at construction (e.g. through
/// [`PrimitiveSet`]) and are what every query reports.
///
/// Queries only take `&self`, so a `Bvh` can be queried from any number of threads at once.
/// [`Bvh::refit`] and [`Bvh::rebuild`] need exclusive access.
///
/// An empty BVH consists of a single empty leaf with an invalid AABB.
#[derive(Clone, Debug)]
pub struct Bvh {
    pub(super) nodes: Vec<BvhNode>,
    pub(super) primitive_indices: Vec<u32>,
    /// Half-area of each node at the last (re)build, for the rebuild policy.
    pub(super) baseline_half_areas: Vec<Real>,
}

impl Default for Bvh {
    fn default() -> Self {
        Self::new()
    }
}

impl Bvh {
    /// An empty BVH.
    pub fn new() -> Self {
        Self {
            nodes: alloc::vec![BvhNode::leaf(Aabb::new_invalid(), 0, 0)],
            primitive_indices: Vec::new(),
            baseline_half_areas: alloc::vec![0.0],
        }
    }

    /// Builds a BVH over validated primitives.
    pub fn from_primitive_set(primitives: &PrimitiveSet, params: &BvhBuildParams) -> Self {
        let mut result = Self::new();
        let mut workspace = BvhWorkspace::default();
        result.rebuild(primitives, params, &mut workspace);
        result
    }

    /// Builds a BVH whose primitive ids are the positions of the AABBs in `leaves`.
    ///
    /// AABBs with non-finite coordinates or inverted bounds are skipped.
    pub fn from_leaves(params: &BvhBuildParams, leaves: &[Aabb]) -> Self {
        Self::from_iter(
            params,
            leaves.iter().enumerate().map(|(i, aabb)| (i as u32, *aabb)),
        )
    }

    /// Builds a BVH from `(primitive id, aabb)` pairs.
    ///
    /// AABBs with non-finite coordinates or inverted bounds are skipped.
    pub fn from_iter<It>(params: &BvhBuildParams, leaves: It) -> Self
    where
        It: IntoIterator<Item = (u32, Aabb)>,
    {
        Self::from_primitive_set(&PrimitiveSet::from_aabbs(leaves), params)
    }

    /// Does this BVH contain no primitive?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primitive_indices.is_empty()
    }

    /// The number of primitives indexed by this BVH.
    #[inline]
    pub fn primitive_count(&self) -> usize {
        self.primitive_indices.len()
    }

    /// The nodes of this BVH, in depth-first pre-order.
    #[inline]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// The primitive ids referenced by the leaves, grouped so each leaf (and each subtree) owns
    /// a contiguous range.
    #[inline]
    pub fn primitive_indices(&self) -> &[u32] {
        &self.primitive_indices
    }

    /// The root node.
    #[inline]
    pub fn root(&self) -> &BvhNode {
        &self.nodes[0]
    }

    /// The AABB bounding everything contained by this BVH.
    ///
    /// This is an invalid AABB if the BVH is empty.
    pub fn root_aabb(&self) -> Aabb {
        self.nodes[0].aabb()
    }

    /// The primitive ids referenced by `node`, if it is a leaf of this BVH.
    #[inline]
    pub fn leaf_primitives(&self, node: &BvhNode) -> &[u32] {
        match node.primitive_range() {
            Some(range) => &self.primitive_indices[range],
            None => &[],
        }
    }

    /// The primitive ids of every leaf of the subtree rooted at `node_id`.
    ///
    /// Subtrees own contiguous ranges of the primitive index array, so this doesn’t need to
    /// visit the subtree: the range runs from its leftmost leaf to its rightmost leaf.
    pub fn subtree_primitives(&self, node_id: u32) -> &[u32] {
        let mut leftmost = &self.nodes[node_id as usize];
        let mut leftmost_id = node_id;
        while !leftmost.is_leaf() {
            leftmost_id += 1;
            leftmost = &self.nodes[leftmost_id as usize];
        }

        let mut rightmost = &self.nodes[node_id as usize];
        while !rightmost.is_leaf() {
            rightmost = &self.nodes[rightmost.data.right_child() as usize];
        }

        let start = leftmost.children as usize;
        let end = rightmost.children as usize + rightmost.data.primitive_count() as usize;
        &self.primitive_indices[start..end]
    }

    /// The number of leaves of this BVH.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// The number of nodes on the longest path from `node_id` to one of its leaves, both
    /// included.
    pub fn subtree_depth(&self, node_id: u32) -> u32 {
        let node = &self.nodes[node_id as usize];

        match node.children() {
            None => 1,
            Some([left, right]) => self.subtree_depth(left).max(self.subtree_depth(right)) + 1,
        }
    }

    /// The depth of this BVH.
    pub fn depth(&self) -> u32 {
        self.subtree_depth(0)
    }

    /// The memory usage of this BVH, in bytes.
    pub fn total_memory_size(&self) -> usize {
        size_of::<Self>() + self.heap_memory_size()
    }

    /// The heap memory usage of this BVH, in bytes.
    pub fn heap_memory_size(&self) -> usize {
        let Self {
            nodes,
            primitive_indices,
            baseline_half_areas,
        } = self;
        nodes.capacity() * size_of::<BvhNode>()
            + primitive_indices.capacity() * size_of::<u32>()
            + baseline_half_areas.capacity() * size_of::<Real>()
    }
}
