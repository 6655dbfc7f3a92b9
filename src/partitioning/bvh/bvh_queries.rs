use super::bvh_traverse::{push_node, TraversalStack};
use super::{Bvh, BvhNode};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::query::{AabbClassification, Frustum};
use alloc::vec::Vec;

impl Bvh {
    /// Iterates through all the primitives of the leaves intersecting the given AABB.
    ///
    /// Only node AABBs are tested: primitives of a leaf touching `aabb` are all reported.
    pub fn intersect_aabb<'a>(&'a self, aabb: &'a Aabb) -> impl Iterator<Item = u32> + 'a {
        self.leaves(|node: &BvhNode| node.aabb().intersects(aabb))
    }

    /// Collects the ids of the primitives inside of, or intersecting, `frustum`.
    ///
    /// See [`Bvh::frustum_query_into`] for details.
    pub fn frustum_query(
        &self,
        frustum: &Frustum,
        primitive_aabb: impl FnMut(u32) -> Aabb,
    ) -> Vec<u32> {
        let mut result = Vec::new();
        self.frustum_query_into(frustum, primitive_aabb, &mut result);
        result
    }

    /// Appends to `out` the ids of the primitives inside of, or intersecting, `frustum`.
    ///
    /// Every node is classified against the frustum planes:
    /// - nodes entirely outside are skipped with their whole subtree,
    /// - nodes entirely inside contribute all their primitives without further tests,
    /// - leaves straddling a plane test each of their primitives individually, using the AABB
    ///   returned by `primitive_aabb`.
    ///
    /// Each primitive is reported at most once.
    pub fn frustum_query_into(
        &self,
        frustum: &Frustum,
        mut primitive_aabb: impl FnMut(u32) -> Aabb,
        out: &mut Vec<u32>,
    ) {
        if self.is_empty() {
            return;
        }

        let mut stack = TraversalStack::new();
        push_node(&mut stack, 0);

        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id as usize];

            match frustum.classify_aabb(&node.aabb()) {
                AabbClassification::Outside => {}
                AabbClassification::Inside => {
                    out.extend_from_slice(self.subtree_primitives(node_id));
                }
                AabbClassification::Intersecting => match node.children() {
                    None => out.extend(
                        self.leaf_primitives(node)
                            .iter()
                            .copied()
                            .filter(|id| frustum.intersects_aabb(&primitive_aabb(*id))),
                    ),
                    Some([left, right]) => {
                        push_node(&mut stack, right);
                        push_node(&mut stack, left);
                    }
                },
            }
        }
    }
}
