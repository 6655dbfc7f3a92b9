use super::bvh_tree::{BvhBin, BvhBuildParams, BvhNode};
use super::{Bvh, BvhWorkspace};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Real, DEFAULT_EPSILON};
use crate::shape::{Primitive, PrimitiveSet};
use alloc::vec::Vec;

/// Below this depth, splits are chosen with the SAH. Deeper nodes are split at the object
/// median, which halves the primitive count at each level and bounds the total depth well
/// below [`TRAVERSAL_STACK_SIZE`](super::TRAVERSAL_STACK_SIZE).
const MAX_SAH_DEPTH: u32 = 24;
const BIN_EPSILON: Real = 1.0e-5;

enum Split {
    Leaf,
    Binned { axis: usize, boundary: usize },
    Median,
}

struct BuildContext<'a> {
    nodes: &'a mut Vec<BvhNode>,
    bins: &'a mut Vec<BvhBin>,
    right_bins: &'a mut Vec<BvhBin>,
    params: BvhBuildParams,
}

impl Bvh {
    /// Replaces the content of this BVH with a fresh build over `primitives`.
    ///
    /// Primitives are assumed to be valid, which [`PrimitiveSet`] guarantees. The previous
    /// node array is reused as storage, and the scratch buffers of `workspace` are reused
    /// across calls.
    pub fn rebuild(
        &mut self,
        primitives: &PrimitiveSet,
        params: &BvhBuildParams,
        workspace: &mut BvhWorkspace,
    ) {
        let BvhWorkspace {
            build_primitives,
            bins,
            right_bins,
        } = workspace;

        let num_primitives = primitives.len();
        assert!(
            num_primitives < (1 << 28),
            "Too many primitives for a single BVH."
        );

        self.nodes.clear();
        self.primitive_indices.clear();
        self.baseline_half_areas.clear();

        if num_primitives == 0 {
            self.nodes.push(BvhNode::leaf(Aabb::new_invalid(), 0, 0));
            self.baseline_half_areas.push(0.0);
            self.nodes.shrink_to_fit();
            return;
        }

        build_primitives.clear();
        build_primitives.extend_from_slice(primitives.primitives());

        self.nodes.reserve(2 * num_primitives - 1);

        let mut ctx = BuildContext {
            nodes: &mut self.nodes,
            bins,
            right_bins,
            params: params.sanitized(),
        };
        ctx.build_recurse(build_primitives, 0, 0);

        self.nodes.shrink_to_fit();
        self.primitive_indices
            .extend(build_primitives.iter().map(|primitive| primitive.id));
        self.baseline_half_areas
            .extend(self.nodes.iter().map(|node| node.aabb().half_area()));

        log::debug!(
            "Built BVH over {} primitives: {} nodes, {} skipped.",
            num_primitives,
            self.nodes.len(),
            primitives.skipped_count()
        );
    }
}

impl BuildContext<'_> {
    /// Builds the subtree over `primitives`, whose first element has the offset `first` in the
    /// final primitive index array. The subtree root is appended to the node array.
    fn build_recurse(&mut self, primitives: &mut [Primitive], first: u32, depth: u32) {
        let node_id = self.nodes.len() as u32;
        let aabb = primitives
            .iter()
            .fold(Aabb::new_invalid(), |acc, primitive| acc.merged(&primitive.aabb));
        let count = primitives.len() as u32;

        // Reserve the slot. It is overwritten below if this node ends up being split.
        self.nodes.push(BvhNode::leaf(aabb, first, count));

        if primitives.len() <= self.params.leaf_size {
            return;
        }

        let centroid_aabb = Aabb::from_points(primitives.iter().map(|p| p.centroid));
        let split = if depth < MAX_SAH_DEPTH {
            self.find_sah_split(primitives, &aabb, &centroid_aabb)
        } else {
            Split::Median
        };

        let (axis, mut mid) = match split {
            Split::Leaf => return,
            Split::Binned { axis, boundary } => {
                let k0 = centroid_aabb.mins[axis];
                let k1 = self.bin_scale(&centroid_aabb, axis);
                let bin_count = self.params.bin_count;
                let mid = partition_in_place(primitives, |p| {
                    bin_index(p.centroid[axis], k0, k1, bin_count) <= boundary
                });
                (axis, mid)
            }
            Split::Median => (centroid_aabb.extents().imax(), 0),
        };

        if mid == 0 || mid == primitives.len() {
            // Degenerate centroid distribution, split at the object median instead.
            mid = primitives.len() / 2;
            let _ = primitives.select_nth_unstable_by(mid, |a, b| {
                a.centroid[axis].total_cmp(&b.centroid[axis])
            });
        }

        let (left, right) = primitives.split_at_mut(mid);
        self.build_recurse(left, first, depth + 1);
        let right_id = self.nodes.len() as u32;
        self.build_recurse(right, first + mid as u32, depth + 1);

        self.nodes[node_id as usize] = BvhNode::internal(aabb, axis, node_id + 1, right_id);
    }

    fn bin_scale(&self, centroid_aabb: &Aabb, axis: usize) -> Real {
        let extent = centroid_aabb.maxs[axis] - centroid_aabb.mins[axis];
        self.params.bin_count as Real * (1.0 - BIN_EPSILON) / extent
    }

    /// Evaluates the SAH cost of every bin boundary along every axis.
    fn find_sah_split(
        &mut self,
        primitives: &[Primitive],
        aabb: &Aabb,
        centroid_aabb: &Aabb,
    ) -> Split {
        let params = self.params;
        let bin_count = params.bin_count;
        let parent_area = aabb.half_area().max(DEFAULT_EPSILON);
        let mut best: Option<(Real, usize, usize)> = None;

        for axis in 0..3 {
            let extent = centroid_aabb.maxs[axis] - centroid_aabb.mins[axis];
            if extent <= DEFAULT_EPSILON || !extent.is_finite() {
                continue;
            }

            let k0 = centroid_aabb.mins[axis];
            let k1 = self.bin_scale(centroid_aabb, axis);

            self.bins.clear();
            self.bins.resize(bin_count, BvhBin::default());
            for primitive in primitives {
                let bin = &mut self.bins[bin_index(primitive.centroid[axis], k0, k1, bin_count)];
                bin.aabb.merge(&primitive.aabb);
                bin.count += 1;
            }

            // right_bins[i] accumulates the bins i..bin_count.
            self.right_bins.clear();
            self.right_bins.resize(bin_count, BvhBin::default());
            let mut right_acc = BvhBin::default();
            for i in (0..bin_count).rev() {
                right_acc.aabb.merge(&self.bins[i].aabb);
                right_acc.count += self.bins[i].count;
                self.right_bins[i] = right_acc;
            }

            let mut left_acc = BvhBin::default();
            for boundary in 0..bin_count - 1 {
                left_acc.aabb.merge(&self.bins[boundary].aabb);
                left_acc.count += self.bins[boundary].count;
                let right = &self.right_bins[boundary + 1];

                if left_acc.count == 0 || right.count == 0 {
                    continue;
                }

                let cost = params.traversal_cost
                    + params.intersection_cost
                        * (left_acc.aabb.half_area() * left_acc.count as Real
                            + right.aabb.half_area() * right.count as Real)
                        / parent_area;

                if best.map(|(best_cost, _, _)| cost < best_cost).unwrap_or(true) {
                    best = Some((cost, axis, boundary));
                }
            }
        }

        let leaf_cost = params.intersection_cost * primitives.len() as Real;
        let fits_in_leaf = primitives.len() <= params.max_leaf_size;

        match best {
            Some((cost, _, _)) if cost >= leaf_cost && fits_in_leaf => Split::Leaf,
            Some((_, axis, boundary)) => Split::Binned { axis, boundary },
            None => Split::Median,
        }
    }
}

#[inline]
fn bin_index(centroid: Real, k0: Real, k1: Real, bin_count: usize) -> usize {
    (((centroid - k0) * k1) as usize).min(bin_count - 1)
}

/// Moves the elements satisfying `pred` to the front of `elts`, and returns how many they are.
fn partition_in_place<T>(elts: &mut [T], mut pred: impl FnMut(&T) -> bool) -> usize {
    let mut mid = 0;

    for i in 0..elts.len() {
        if pred(&elts[i]) {
            elts.swap(i, mid);
            mid += 1;
        }
    }

    mid
}
