use super::{BvhNode, TRAVERSAL_STACK_SIZE};
use crate::math::Real;
use crate::partitioning::Bvh;
use crate::query::Ray;
use alloc::vec::Vec;
use arrayvec::ArrayVec;
use ordered_float::OrderedFloat;
use smallvec::SmallVec;

/// The per-call stack of node indices used by the BVH traversals.
pub(super) type TraversalStack = ArrayVec<u32, TRAVERSAL_STACK_SIZE>;

#[inline(always)]
pub(super) fn push_node(stack: &mut TraversalStack, node_id: u32) {
    if stack.try_push(node_id).is_err() {
        panic!(
            "BVH traversal stack overflow: the tree is deeper than {} levels.",
            TRAVERSAL_STACK_SIZE
        );
    }
}

/// Iterator over the primitives of the leaves whose nodes satisfy a predicate.
///
/// Created by [`Bvh::leaves`].
pub struct Leaves<'a, Check: Fn(&BvhNode) -> bool> {
    tree: &'a Bvh,
    current: core::slice::Iter<'a, u32>,
    stack: SmallVec<[u32; 32]>,
    check: Check,
}

impl<'a, Check: Fn(&BvhNode) -> bool> Leaves<'a, Check> {
    fn new(tree: &'a Bvh, check: Check) -> Leaves<'a, Check> {
        let mut stack = SmallVec::new();

        if !tree.is_empty() {
            stack.push(0);
        }

        Leaves {
            tree,
            current: [].iter(),
            stack,
            check,
        }
    }
}

impl<Check: Fn(&BvhNode) -> bool> Iterator for Leaves<'_, Check> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(primitive) = self.current.next() {
                return Some(*primitive);
            }

            let node_id = self.stack.pop()?;
            let node = &self.tree.nodes[node_id as usize];

            if !(self.check)(node) {
                continue;
            }

            match node.children() {
                None => self.current = self.tree.leaf_primitives(node).iter(),
                Some([left, right]) => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
    }
}

/// Cost associated to a primitive hit during a closest-hit search.
pub trait BvhLeafCost {
    /// The cost value associated to the primitive.
    ///
    /// [`Bvh::cast_ray`] searches for the primitive with the lowest cost.
    fn cost(&self) -> Real;
}

impl BvhLeafCost for Real {
    #[inline(always)]
    fn cost(&self) -> Real {
        *self
    }
}

impl<T> BvhLeafCost for (Real, T) {
    #[inline(always)]
    fn cost(&self) -> Real {
        self.0
    }
}

/// Controls the execution flow of [`Bvh::traverse`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraversalAction {
    /// The traversal will continue on the children of the tested node.
    Continue,
    /// The traversal will skip all descendants of the tested node.
    Prune,
    /// The traversal will exit immediately.
    EarlyExit,
}

impl Bvh {
    /// Iterates through the primitives of the leaves, in depth-first order.
    ///
    /// The `check_node` closure is called on every traversed node. If it returns `false` then the
    /// node and all its descendants won’t be iterated on. This is useful for pruning whole
    /// sub-trees based on a geometric predicate on the node’s AABB.
    pub fn leaves<F: Fn(&BvhNode) -> bool>(&self, check_node: F) -> Leaves<'_, F> {
        Leaves::new(self, check_node)
    }

    /// Traverses the BVH in depth-first order with full control over traversal.
    ///
    /// The closure is called on every visited node with its index, and decides whether the
    /// traversal continues into its children, skips them, or stops altogether. Use
    /// [`Bvh::leaf_primitives`] to access the primitives of a leaf.
    pub fn traverse(&self, mut check_node: impl FnMut(u32, &BvhNode) -> TraversalAction) {
        if self.is_empty() {
            return;
        }

        let mut stack = TraversalStack::new();
        push_node(&mut stack, 0);

        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id as usize];

            match check_node(node_id, node) {
                TraversalAction::Continue => {
                    if let Some([left, right]) = node.children() {
                        push_node(&mut stack, right);
                        push_node(&mut stack, left);
                    }
                }
                TraversalAction::Prune => {}
                TraversalAction::EarlyExit => return,
            }
        }
    }

    /// Finds the closest primitive hit by `ray`.
    ///
    /// `primitive_check(id, best_so_far)` casts the ray on the primitive `id` and returns its
    /// hit, if any, with a cost not larger than `best_so_far`. The traversal visits the near
    /// child of every node first (according to the split axis and the ray direction) and skips
    /// nodes entered farther than the best hit found so far.
    ///
    /// Returns the id and hit of the primitive with the smallest cost, if any is hit within
    /// `max_time_of_impact`.
    pub fn cast_ray<L: BvhLeafCost>(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
        mut primitive_check: impl FnMut(u32, Real) -> Option<L>,
    ) -> Option<(u32, L)> {
        if self.is_empty() {
            return None;
        }

        let mut stack = TraversalStack::new();
        let mut best: Option<(u32, L)> = None;
        let mut best_toi = max_time_of_impact;
        push_node(&mut stack, 0);

        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id as usize];

            if node.cast_ray(ray, best_toi).is_none() {
                continue;
            }

            match node.children() {
                None => {
                    for primitive in self.leaf_primitives(node) {
                        if let Some(hit) = primitive_check(*primitive, best_toi) {
                            let toi = hit.cost();
                            if toi < best_toi || (best.is_none() && toi <= best_toi) {
                                best_toi = toi;
                                best = Some((*primitive, hit));
                            }
                        }
                    }
                }
                Some([left, right]) => {
                    let (near, far) = if ray.dir[node.data.split_axis()] < 0.0 {
                        (right, left)
                    } else {
                        (left, right)
                    };
                    push_node(&mut stack, far);
                    push_node(&mut stack, near);
                }
            }
        }

        best
    }

    /// Tests whether `ray` hits any primitive.
    ///
    /// `primitive_check(id, max_time_of_impact)` tests the ray against the primitive `id`. The
    /// traversal stops at the first primitive hit, which isn’t necessarily the closest.
    pub fn intersects_ray(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
        mut primitive_check: impl FnMut(u32, Real) -> bool,
    ) -> bool {
        let mut found = false;

        self.traverse(|_, node| {
            if node.cast_ray(ray, max_time_of_impact).is_none() {
                return TraversalAction::Prune;
            }

            for primitive in self.leaf_primitives(node) {
                if primitive_check(*primitive, max_time_of_impact) {
                    found = true;
                    return TraversalAction::EarlyExit;
                }
            }

            TraversalAction::Continue
        });

        found
    }

    /// Finds every primitive hit by `ray`, sorted by increasing cost.
    ///
    /// `primitive_check(id, max_time_of_impact)` casts the ray on the primitive `id`. Unlike
    /// [`Bvh::cast_ray`], no node is pruned because of a previous hit. Each primitive appears at
    /// most once since it belongs to a single leaf.
    pub fn cast_ray_all<L: BvhLeafCost>(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
        mut primitive_check: impl FnMut(u32, Real) -> Option<L>,
    ) -> Vec<(u32, L)> {
        let mut hits = Vec::new();

        self.traverse(|_, node| {
            if node.cast_ray(ray, max_time_of_impact).is_none() {
                return TraversalAction::Prune;
            }

            for primitive in self.leaf_primitives(node) {
                if let Some(hit) = primitive_check(*primitive, max_time_of_impact) {
                    hits.push((*primitive, hit));
                }
            }

            TraversalAction::Continue
        });

        hits.sort_by_key(|(_, hit)| OrderedFloat(hit.cost()));
        hits
    }
}
