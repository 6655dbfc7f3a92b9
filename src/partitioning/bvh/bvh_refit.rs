use super::Bvh;
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Real, DEFAULT_EPSILON};

impl Bvh {
    /// Updates the AABB of every node from the current bounds of the primitives.
    ///
    /// The topology is left untouched: leaves keep their primitives, so the tree quality
    /// degrades as primitives move away from their original neighbors. See
    /// [`Bvh::average_growth`] and [`Bvh::maintain`] to decide when a rebuild is worth it.
    ///
    /// `primitive_aabb` returns the current AABB of the primitive with the given id. Returning
    /// an invalid AABB (see [`Aabb::new_invalid`]) for a primitive that no longer exists keeps
    /// it out of the bounds.
    ///
    /// Nodes are laid out in depth-first pre-order, so children always have larger indices than
    /// their parent. Iterating backward is therefore a post-order traversal.
    pub fn refit(&mut self, mut primitive_aabb: impl FnMut(u32) -> Aabb) {
        if self.is_empty() {
            return;
        }

        let Self {
            nodes,
            primitive_indices,
            ..
        } = self;

        for id in (0..nodes.len()).rev() {
            let node = nodes[id];
            let aabb = match (node.primitive_range(), node.children()) {
                (Some(range), _) => primitive_indices[range]
                    .iter()
                    .fold(Aabb::new_invalid(), |acc, primitive| {
                        acc.merged(&primitive_aabb(*primitive))
                    }),
                (None, Some([left, right])) => nodes[left as usize]
                    .aabb()
                    .merged(&nodes[right as usize].aabb()),
                (None, None) => unreachable!(),
            };
            nodes[id].set_aabb(aabb);
        }
    }

    /// The average ratio between the current half-area of the nodes and their half-area at the
    /// last (re)build.
    ///
    /// This is `1.0` right after a build, and grows as refits loosen the tree. Nodes that had
    /// no area at the last build are ignored.
    pub fn average_growth(&self) -> Real {
        let mut total = 0.0;
        let mut count = 0usize;

        for (node, baseline) in self.nodes.iter().zip(self.baseline_half_areas.iter()) {
            if *baseline > DEFAULT_EPSILON {
                let area = node.aabb().half_area();
                if area.is_finite() {
                    total += area / *baseline;
                    count += 1;
                }
            }
        }

        if count == 0 {
            1.0
        } else {
            total / count as Real
        }
    }
}
