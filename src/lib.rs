//! Probabilistic occupancy [`octree`](tree::OcTree) for 3D mapping.
//!
//! Fuses range sensor measurements (rays from a sensor origin to a measured
//! endpoint) into a sparse volumetric map that knows which parts of space are
//! occupied, free or still unknown.
//!
//! ## Available methods:
//!
//! - ### Updates
//!
//!   - [`Point update`](tree::OcTree::update_node)
//!   - [`Ray insertion`](tree::OcTree::insert_ray)
//!   - [`Point cloud insertion`](tree::OcTree::insert_point_cloud)
//!   - [`Pruning`](tree::OcTree::prune)
//!
//! - ### Queries
//!
//!   - [`Searching`](tree::OcTree::search)
//!   - [`Ray traversal`](tree::OcTree::compute_ray)
//!   - [`Ray casting`](tree::OcTree::cast_ray)
//!   - [`Occupied`](tree::OcTree::get_occupied), [`free`](tree::OcTree::get_freespace),
//!     [`leaf`](tree::OcTree::get_leaf_nodes) and [`all`](tree::OcTree::get_voxels) volumes
//!   - [`Metric bounds`](tree::OcTree::metric_size) and
//!     [`memory estimates`](tree::OcTree::memory_full_grid)
//!
//! ## Addressing
//!
//! The tree has a fixed depth of [`16`](key::TREE_DEPTH). Coordinates are
//! quantized to one 16 bit [`key`](key::OcTreeKey) per axis, so at a resolution
//! of 1 cm the tree covers +/- 327.68 meters around the origin. Keys are exact,
//! repeated updates of the same point always reach the same leaf.
//!
//! ## Occupancy
//!
//! Nodes carry any [`Occupancy`](occupancy::Occupancy) implementation. The default
//! [`LogOddsNode`](occupancy::LogOddsNode) keeps a clamped log-odds estimate.
//!
//! ## Example
//!
//! ```rust
//! use occtree::prelude::*;
//!
//! fn main() -> Result<(), TreeError> {
//!     let mut tree: OcTree = OcTree::new(0.1)?;
//!
//!     // One measurement from the sensor at the origin to a wall 1 meter away
//!     tree.insert_ray(Point3d::ZERO, Point3d::new(0.0, 0.0, 1.0))?;
//!
//!     let wall = tree.search(Point3d::new(0.0, 0.0, 1.0)).unwrap();
//!     assert!(tree[wall].occupancy.is_occupied());
//!
//!     let free = tree.search(Point3d::new(0.0, 0.0, 0.5)).unwrap();
//!     assert!(tree[free].occupancy.is_free());
//!
//!     // Never observed
//!     assert_eq!(tree.search(Point3d::new(5.0, 5.0, 5.0)), None);
//!
//!     let hit = tree.cast_ray(Point3d::ZERO, Point3d::new(0.0, 0.0, 1.0), false, -1.0)?;
//!     assert!(hit.hit);
//!     assert!((hit.end.z - 1.05).abs() < 1e-9);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Check yourself list:
//!
//! - tests
//!
//!   ```sh
//!   cargo test --all-targets --all-features --release
//!   ```
//!
//! - benchmark
//!
//!   ```sh
//!   cargo bench
//!   ```

#[cfg(feature = "bevy")]
pub mod bevy_integration;
pub mod bounding;
pub mod config;
pub mod key;
mod metrics;
pub mod node;
pub mod occupancy;
pub mod pool;
pub mod prelude;
pub mod ray;
mod traverse;
pub mod tree;

use std::fmt;

use thiserror::Error;

/// Index [`tree.nodes`](pool::Pool) with it.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u32);

impl From<NodeId> for usize {
    fn from(value: NodeId) -> Self {
        value.0 as usize
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        NodeId(value as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId {}", self.0)
    }
}

/// Enum of all possible errors of the octree's operations.
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    /// Coordinate quantizes outside of the key range of the tree.
    #[error("Out of tree bounds. {0}")]
    OutOfTreeBounds(String),

    /// Ray direction has no length.
    #[error("Ray direction should be finite and non zero. {0}")]
    DegenerateDirection(String),

    /// Resolution is not a positive finite number.
    #[error("Resolution should be positive and finite. {0}")]
    InvalidResolution(String),
}
