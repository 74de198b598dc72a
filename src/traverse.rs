//! Depth limited walks collecting node volumes.

use heapless::Vec as HVec;

use crate::{
    bounding::OcTreeVolume,
    key::{OcTreeKey, TREE_DEPTH},
    node::Node,
    occupancy::{Classification, Occupancy, Regime},
    tree::OcTree,
    NodeId,
};

/// Node visited by a walk, with its position in the tree.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cell {
    pub(crate) node: NodeId,
    pub(crate) depth: u8,
    /// Key of the node's first cell.
    pub(crate) corner: OcTreeKey,
}

/// `0` is the whole tree.
fn effective_depth(max_depth: u8) -> u8 {
    if max_depth == 0 || max_depth > TREE_DEPTH {
        TREE_DEPTH
    } else {
        max_depth
    }
}

impl<O: Occupancy> OcTree<O> {
    /// Visits nodes top down, down to `max_depth`.
    ///
    /// Children of a node are visited only if `visit` returns `true` for it.
    pub(crate) fn walk<F>(&self, max_depth: u8, mut visit: F)
    where
        F: FnMut(&Cell, &Node<O>) -> bool,
    {
        let root = Cell {
            node: self.root,
            depth: 0,
            corner: OcTreeKey::default(),
        };
        self.rwalk(root, effective_depth(max_depth), &mut visit);
    }

    fn rwalk<F>(&self, start: Cell, max_depth: u8, visit: &mut F)
    where
        F: FnMut(&Cell, &Node<O>) -> bool,
    {
        // Heapless stack first, recursion once it is full.
        let mut stack = HVec::<Cell, 32>::new();
        let mut next = Some(start);
        loop {
            let Some(cell) = next.take().or_else(|| stack.pop()) else {
                break;
            };
            let node = &self.nodes[cell.node];
            if !visit(&cell, node) || cell.depth >= max_depth {
                continue;
            }

            let mut children = node.children().map(|(octant, child)| Cell {
                node: child,
                depth: cell.depth + 1,
                corner: cell.corner.child_corner(octant, cell.depth),
            });
            while let Some(child) = children.next() {
                if let Err(child) = stack.push(child) {
                    self.rwalk(child, max_depth, visit);
                    for child in children.by_ref() {
                        self.rwalk(child, max_depth, visit);
                    }
                }
            }
        }
    }

    /// Volumes of the childless nodes down to `max_depth`, `0` for the whole tree.
    pub fn get_leaf_nodes(&self, max_depth: u8) -> Vec<OcTreeVolume> {
        let mut volumes = Vec::new();
        self.walk(max_depth, |cell, node| {
            if node.is_leaf() {
                volumes.push(self.keys.volume(cell.corner, cell.depth));
            }
            true
        });
        volumes
    }

    /// Volumes of every node down to `max_depth`, `0` for the whole tree.
    pub fn get_voxels(&self, max_depth: u8) -> Vec<OcTreeVolume> {
        let mut volumes = Vec::with_capacity(self.size());
        self.walk(max_depth, |cell, _| {
            volumes.push(self.keys.volume(cell.corner, cell.depth));
            true
        });
        volumes
    }

    /// Occupied volumes down to `max_depth`, `0` for the whole tree.
    ///
    /// An inner node whose children are both occupied and free is reported
    /// as one occupied volume. Settled volumes come first.
    ///
    /// ```rust
    /// use occtree::prelude::*;
    ///
    /// let mut tree: OcTree = OcTree::new(0.1).unwrap();
    /// tree.update_node(Point3d::new(1.0, 1.0, 1.0), true).unwrap();
    ///
    /// let occupied = tree.get_occupied(0);
    /// assert_eq!(occupied.len(), 1);
    /// assert_eq!(occupied[0].size, 0.1);
    /// ```
    pub fn get_occupied(&self, max_depth: u8) -> Vec<OcTreeVolume> {
        let (mut binary, delta) = self.get_occupied_split(max_depth);
        binary.extend(delta);
        binary
    }

    /// Occupied volumes, split by the [`Regime`] of their node: `(binary, delta)`.
    pub fn get_occupied_split(&self, max_depth: u8) -> (Vec<OcTreeVolume>, Vec<OcTreeVolume>) {
        self.collect_classified(max_depth, Classification::Occupied)
    }

    /// Free volumes down to `max_depth`, `0` for the whole tree. Settled volumes come first.
    ///
    /// Inner nodes with both occupied and free children are never reported as free.
    pub fn get_freespace(&self, max_depth: u8) -> Vec<OcTreeVolume> {
        let (mut binary, delta) = self.get_freespace_split(max_depth);
        binary.extend(delta);
        binary
    }

    /// Free volumes, split by the [`Regime`] of their node: `(binary, delta)`.
    pub fn get_freespace_split(&self, max_depth: u8) -> (Vec<OcTreeVolume>, Vec<OcTreeVolume>) {
        self.collect_classified(max_depth, Classification::Free)
    }

    fn collect_classified(
        &self,
        max_depth: u8,
        wanted: Classification,
    ) -> (Vec<OcTreeVolume>, Vec<OcTreeVolume>) {
        let max_depth = effective_depth(max_depth);
        let mut binary = Vec::new();
        let mut delta = Vec::new();

        self.walk(max_depth, |cell, node| {
            let state = if node.is_leaf() || cell.depth >= max_depth {
                node.occupancy.classify()
            } else if self.has_mixed_children(node) {
                Classification::Occupied
            } else {
                return true;
            };

            if state == wanted {
                let volume = self.keys.volume(cell.corner, cell.depth);
                match node.occupancy.regime() {
                    Regime::Binary => binary.push(volume),
                    Regime::Delta => delta.push(volume),
                }
            }
            false
        });

        (binary, delta)
    }

    fn has_mixed_children(&self, node: &Node<O>) -> bool {
        let mut occupied = false;
        let mut free = false;
        for (_, child) in node.children() {
            match self.nodes[child].occupancy.classify() {
                Classification::Occupied => occupied = true,
                Classification::Free => free = true,
                Classification::Unknown => {}
            }
        }
        occupied && free
    }
}

#[cfg(test)]
mod tests {
    use crate::{bounding::Point3d, key::TREE_DEPTH, tree::OcTree};

    #[test]
    fn test_fresh_tree() {
        let tree: OcTree = OcTree::new(0.1).unwrap();

        let leaves = tree.get_leaf_nodes(0);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].center, Point3d::ZERO);
        assert_eq!(leaves[0].size, 0.1 * 65536.0);

        assert_eq!(tree.get_voxels(0).len(), 1);
        assert!(tree.get_occupied(0).is_empty());
        assert!(tree.get_freespace(0).is_empty());
    }

    #[test]
    fn test_single_leaf() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();
        let point = Point3d::new(-2.33, 1.04, 0.49);
        tree.update_node(point, true).unwrap();

        let voxels = tree.get_voxels(0);
        assert_eq!(voxels.len(), 1 + TREE_DEPTH as usize);
        for voxel in voxels {
            assert!(voxel.contains(point));
        }

        let leaves = tree.get_leaf_nodes(0);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].size, 0.1);
        assert!(leaves[0].contains(point));
    }

    #[test]
    fn test_max_depth() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();
        tree.update_node(Point3d::splat(1.0), true).unwrap();

        assert_eq!(tree.get_voxels(1).len(), 2);
        assert!(tree.get_leaf_nodes(1).is_empty());

        let occupied = tree.get_occupied(1);
        assert_eq!(occupied.len(), 1);
        assert_eq!(occupied[0].size, tree.key_space().node_size(1));
        assert!(occupied[0].contains(Point3d::splat(1.0)));

        // Deeper than the tree is the whole tree
        assert_eq!(tree.get_voxels(40).len(), tree.size());
    }

    #[test]
    fn test_split_regimes() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();
        tree.update_node(Point3d::splat(1.0), true).unwrap();

        let (binary, delta) = tree.get_occupied_split(0);
        assert!(binary.is_empty());
        assert_eq!(delta.len(), 1);

        for _ in 0..4 {
            tree.update_node(Point3d::splat(1.0), true).unwrap();
        }
        let (binary, delta) = tree.get_occupied_split(0);
        assert_eq!(binary.len(), 1);
        assert!(delta.is_empty());

        // Occupied and free below the root would make it a mixed node
        let mut tree: OcTree = OcTree::new(0.1).unwrap();
        for _ in 0..10 {
            tree.update_node(Point3d::splat(-1.0), false).unwrap();
        }
        let (binary, delta) = tree.get_freespace_split(0);
        assert_eq!(binary.len(), 1);
        assert!(delta.is_empty());
        assert_eq!(tree.get_freespace(0), binary);
    }

    #[test]
    fn test_mixed_children() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();
        tree.insert_ray(Point3d::ZERO, Point3d::new(0.0, 0.0, 1.0))
            .unwrap();

        // Free and occupied cells meet below one node at depth 12
        let occupied = tree.get_occupied(0);
        assert_eq!(occupied.len(), 1);
        assert!((occupied[0].size - 1.6).abs() < 1e-9);
        assert!(occupied[0].contains(Point3d::new(0.0, 0.0, 1.0)));
        assert!(occupied[0].contains(Point3d::ZERO));

        assert!(tree.get_freespace(0).is_empty());

        // All cells are still distinct leaves
        assert_eq!(tree.get_leaf_nodes(0).len(), 11);
    }

    #[test]
    fn test_free_siblings() {
        let mut tree: OcTree = OcTree::new(1.0).unwrap();
        tree.update_node(Point3d::new(0.5, 0.5, 0.5), false).unwrap();
        tree.update_node(Point3d::new(1.5, 0.5, 0.5), false).unwrap();

        let free = tree.get_freespace(0);
        assert_eq!(free.len(), 2);
        assert!(free.iter().all(|volume| volume.size == 1.0));
        assert!(tree.get_occupied(0).is_empty());
    }
}
