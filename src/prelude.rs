//! Crate's core types reimports.

pub use crate::{
    bounding::{OcTreeVolume, Point3d},
    config::TreeConfig,
    key::{KeySpace, OcTreeKey, TREE_DEPTH, TREE_MAX_VAL},
    node::Node,
    occupancy::{Classification, LogOddsNode, Occupancy, Regime},
    ray::{HitResult, KeyRay},
    tree::OcTree,
    NodeId, TreeError,
};
