//! A bounding volume hierarchy built with the binned surface area heuristic.

pub use bvh_traverse::{BvhLeafCost, Leaves, TraversalAction};
pub use bvh_tree::{
    Bvh, BvhBuildParams, BvhNode, BvhNodeData, BvhWorkspace, TRAVERSAL_STACK_SIZE,
};
pub use bvh_update_policy::{BvhUpdate, RebuildPolicy};

mod bvh_binned_build;
mod bvh_queries;
mod bvh_refit;
mod bvh_traverse;
mod bvh_tree;
mod bvh_update_policy;
mod bvh_validation;
