use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::partitioning::Bvh;
use alloc::vec::Vec;

impl Bvh {
    /// The number of primitives reachable from the node `id`.
    pub fn reachable_primitive_count(&self, id: u32) -> usize {
        let node = &self.nodes[id as usize];

        match node.children() {
            None => node.data.primitive_count() as usize,
            Some([left, right]) => {
                self.reachable_primitive_count(left) + self.reachable_primitive_count(right)
            }
        }
    }

    /// Panics if this BVH doesn't satisfy its structural invariants.
    ///
    /// This checks that:
    /// - every node is reached exactly once, and the left child of node `i` is `i + 1`,
    /// - leaves reference non-overlapping ranges covering the whole primitive index array,
    /// - every internal node’s AABB is exactly the union of the AABBs of its children.
    ///
    /// The bounds of the leaves are checked by [`Bvh::assert_contains_primitives`].
    pub fn assert_well_formed(&self) {
        assert!(!self.nodes.is_empty(), "A BVH always has a root.");
        assert_eq!(self.nodes.len(), self.baseline_half_areas.len());

        if self.is_empty() {
            assert_eq!(self.nodes.len(), 1);
            assert!(self.nodes[0].is_leaf());
            assert_eq!(self.nodes[0].data.primitive_count(), 0);
            return;
        }

        let mut visited = alloc::vec![false; self.nodes.len()];
        let mut next_primitive = 0;
        self.assert_well_formed_recurse(0, &mut visited, &mut next_primitive);

        assert!(visited.iter().all(|v| *v), "Found unreachable nodes.");
        assert_eq!(next_primitive, self.primitive_indices.len());
        assert_eq!(self.reachable_primitive_count(0), self.primitive_indices.len());
    }

    fn assert_well_formed_recurse(
        &self,
        node_id: u32,
        visited: &mut [bool],
        next_primitive: &mut usize,
    ) {
        if visited[node_id as usize] {
            panic!("Detected loop. Node {} visited twice.", node_id);
        }
        visited[node_id as usize] = true;

        let node = &self.nodes[node_id as usize];

        match (node.primitive_range(), node.children()) {
            (Some(range), _) => {
                assert!(!range.is_empty(), "Leaf {} is empty.", node_id);
                assert_eq!(range.start, *next_primitive, "Leaf ranges aren't contiguous.");
                *next_primitive = range.end;
            }
            (None, Some([left, right])) => {
                assert_eq!(left, node_id + 1, "Nodes aren't in depth-first order.");
                assert!(right > left);
                let left_aabb = self.nodes[left as usize].aabb();
                let right_aabb = self.nodes[right as usize].aabb();
                assert!(node.contains_aabb(&left_aabb));
                assert!(node.contains_aabb(&right_aabb));
                assert_eq!(
                    node.aabb(),
                    left_aabb.merged(&right_aabb),
                    "Node {} isn’t the union of its children.",
                    node_id
                );
                self.assert_well_formed_recurse(left, visited, next_primitive);
                self.assert_well_formed_recurse(right, visited, next_primitive);
            }
            (None, None) => unreachable!(),
        }
    }

    /// Panics if a leaf AABB isn’t exactly the union of the current AABBs of its primitives, or
    /// if a primitive id appears more than once.
    pub fn assert_contains_primitives(&self, primitive_aabb: impl Fn(u32) -> Aabb) {
        let mut seen: Vec<u32> = self.primitive_indices.clone();
        seen.sort_unstable();
        assert!(
            seen.windows(2).all(|w| w[0] != w[1]),
            "A primitive is referenced by several leaves."
        );

        if self.is_empty() {
            return;
        }

        for (id, node) in self.nodes.iter().enumerate().filter(|(_, node)| node.is_leaf()) {
            let mut union = Aabb::new_invalid();

            for primitive in self.leaf_primitives(node) {
                let aabb = primitive_aabb(*primitive);
                assert!(
                    node.contains_aabb(&aabb),
                    "Primitive {} isn’t contained by its leaf.",
                    primitive
                );
                union.merge(&aabb);
            }

            assert_eq!(node.aabb(), union, "Leaf {} isn’t tight.", id);
        }
    }

    /// Panics if the nodes aren’t stored in depth-first pre-order.
    pub fn assert_is_depth_first(&self) {
        let mut stack = alloc::vec![0];
        let mut loop_id = 0;

        while let Some(id) = stack.pop() {
            assert_eq!(loop_id, id);
            loop_id += 1;

            if let Some([left, right]) = self.nodes[id as usize].children() {
                stack.push(right);
                stack.push(left);
            }
        }

        assert_eq!(loop_id as usize, self.nodes.len());
    }
}
