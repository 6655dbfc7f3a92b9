use super::{Bvh, BvhBuildParams, BvhWorkspace};
use crate::bounding_volume::Aabb;
use crate::math::Real;
use crate::shape::PrimitiveSet;
use alloc::vec::Vec;

/// Decides when a refitted BVH should be rebuilt from scratch.
///
/// Refitting is cheap but lets the tree degrade as primitives move. A rebuild restores the
/// tree quality and is triggered once [`Bvh::average_growth`] exceeds `growth_threshold`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RebuildPolicy {
    /// The average node half-area growth since the last rebuild above which the BVH is rebuilt.
    pub growth_threshold: Real,
}

impl Default for RebuildPolicy {
    fn default() -> Self {
        Self {
            growth_threshold: 2.0,
        }
    }
}

impl RebuildPolicy {
    /// Should `bvh` be rebuilt?
    pub fn needs_rebuild(&self, bvh: &Bvh) -> bool {
        !bvh.is_empty() && bvh.average_growth() > self.growth_threshold
    }
}

/// The operation applied by [`Bvh::maintain`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BvhUpdate {
    /// The BVH is empty, nothing was done.
    Unchanged,
    /// The node bounds were refitted.
    Refitted,
    /// The bounds were refitted, then the tree was rebuilt.
    Rebuilt,
}

impl Bvh {
    /// Refits this BVH, then rebuilds it if `policy` says so.
    ///
    /// This is meant to be called once per frame on BVHs whose primitives move. A rebuild keeps
    /// the same primitive ids, with their current AABBs. Primitives whose AABB became invalid
    /// (e.g. non-finite) are dropped by the rebuild.
    pub fn maintain(
        &mut self,
        policy: &RebuildPolicy,
        params: &BvhBuildParams,
        workspace: &mut BvhWorkspace,
        mut primitive_aabb: impl FnMut(u32) -> Aabb,
    ) -> BvhUpdate {
        if self.is_empty() {
            return BvhUpdate::Unchanged;
        }

        self.refit(&mut primitive_aabb);
        let growth = self.average_growth();

        if growth > policy.growth_threshold {
            log::trace!(
                "BVH growth {:.3} exceeds {:.3}: rebuilding {} primitives.",
                growth,
                policy.growth_threshold,
                self.primitive_count()
            );
            let ids: Vec<u32> = self.primitive_indices.clone();
            let primitives =
                PrimitiveSet::from_aabbs(ids.into_iter().map(|id| (id, primitive_aabb(id))));
            self.rebuild(&primitives, params, workspace);
            BvhUpdate::Rebuilt
        } else {
            log::trace!(
                "BVH growth {:.3} within {:.3}: refit only.",
                growth,
                policy.growth_threshold
            );
            BvhUpdate::Refitted
        }
    }
}
