//! Spatial partitioning tools.

pub use self::bvh::{
    Bvh, BvhBuildParams, BvhLeafCost, BvhNode, BvhUpdate, BvhWorkspace, RebuildPolicy,
    TraversalAction,
};

pub mod bvh;
