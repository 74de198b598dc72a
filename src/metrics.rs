//! Lazily recomputed extent of the mapped area and memory estimates.

use std::mem::size_of;

use tracing::trace;

use crate::{
    bounding::Point3d,
    key::{TREE_DEPTH, TREE_MAX_VAL},
    node::Node,
    occupancy::Occupancy,
    pool::PoolItem,
    tree::OcTree,
};

/// Bytes of one cell of a dense occupancy grid.
const GRID_CELL_BYTES: u64 = size_of::<f32>() as u64;

/// Cached bounds of all leaves.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct MetricBounds {
    pub(crate) min: Point3d,
    pub(crate) max: Point3d,
    /// Extent in resolution cells per axis.
    pub(crate) cells: [u64; 3],
}

impl<O: Occupancy> OcTree<O> {
    /// Recomputes the cached bounds if the structure changed since the last call.
    fn calc_min_max(&mut self) {
        if !self.size_changed {
            return;
        }

        let mut lo = [u32::MAX; 3];
        let mut hi = [0u32; 3];
        let mut leaves = 0usize;
        let root = self.root;

        self.walk(0, |cell, node| {
            if node.is_leaf() && cell.node != root {
                let span = 1u32 << (TREE_DEPTH - cell.depth);
                for axis in 0..3 {
                    let corner = u32::from(cell.corner[axis]);
                    lo[axis] = lo[axis].min(corner);
                    hi[axis] = hi[axis].max(corner + span);
                }
                leaves += 1;
            }
            true
        });

        self.bounds = if leaves == 0 {
            MetricBounds::default()
        } else {
            let resolution = self.keys.resolution();
            let metric = |key: u32| (f64::from(key) - f64::from(TREE_MAX_VAL)) * resolution;
            MetricBounds {
                min: Point3d::new(metric(lo[0]), metric(lo[1]), metric(lo[2])),
                max: Point3d::new(metric(hi[0]), metric(hi[1]), metric(hi[2])),
                cells: [0, 1, 2].map(|axis| u64::from(hi[axis] - lo[axis])),
            }
        };
        self.size_changed = false;

        trace!(leaves, min = %self.bounds.min, max = %self.bounds.max, "bounds recomputed");
    }

    /// Edge lengths of the box around all leaves, in meters.
    pub fn metric_size(&mut self) -> Point3d {
        self.calc_min_max();
        self.bounds.max - self.bounds.min
    }

    /// Lower corner of the box around all leaves.
    pub fn metric_min(&mut self) -> Point3d {
        self.calc_min_max();
        self.bounds.min
    }

    /// Upper corner of the box around all leaves.
    pub fn metric_max(&mut self) -> Point3d {
        self.calc_min_max();
        self.bounds.max
    }

    /// Bytes a dense grid of `f32` cells covering the same box would take.
    ///
    /// Nothing is allocated. Saturates at [`usize::MAX`].
    ///
    /// ```rust
    /// use occtree::prelude::*;
    ///
    /// let mut tree: OcTree = OcTree::new(1.0).unwrap();
    /// assert_eq!(tree.memory_full_grid(), 0);
    ///
    /// tree.update_node(Point3d::new(0.5, 0.5, 0.5), true).unwrap();
    /// tree.update_node(Point3d::new(3.5, 1.5, 0.5), true).unwrap();
    /// assert_eq!(tree.memory_full_grid(), 4 * 2 * 1 * 4);
    /// ```
    pub fn memory_full_grid(&mut self) -> usize {
        self.calc_min_max();
        let bytes = self
            .bounds
            .cells
            .iter()
            .try_fold(GRID_CELL_BYTES, |acc, &cells| acc.checked_mul(cells));
        bytes
            .and_then(|bytes| usize::try_from(bytes).ok())
            .unwrap_or(usize::MAX)
    }

    /// Bytes held by the tree, free pool slots included.
    pub fn memory_usage(&self) -> usize {
        size_of::<Self>() + self.nodes.capacity_used() * size_of::<PoolItem<Node<O>>>()
    }

    /// Number of childless nodes.
    pub fn leaf_count(&self) -> usize {
        let mut leaves = 0;
        self.walk(0, |_, node| {
            if node.is_leaf() {
                leaves += 1;
            }
            true
        });
        leaves
    }
}
