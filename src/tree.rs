use std::{array::from_fn, ops::Index};

use tracing::{debug, trace};

use crate::{
    bounding::Point3d,
    config::TreeConfig,
    key::{child_index, KeySpace, OcTreeKey, TREE_DEPTH},
    metrics::MetricBounds,
    node::{Branch, Node},
    occupancy::{LogOddsNode, Occupancy},
    pool::Pool,
    NodeId, TreeError,
};

/// Occupancy octree of fixed depth [`TREE_DEPTH`].
///
/// Nodes are created on demand along the key path of every update,
/// the root always exists.
pub struct OcTree<O = LogOddsNode>
where
    O: Occupancy,
{
    pub(crate) nodes: Pool<Node<O>>,
    pub(crate) root: NodeId,
    pub(crate) keys: KeySpace,
    pub(crate) bounds: MetricBounds,
    pub(crate) size_changed: bool,
}

impl<O: Occupancy> OcTree<O> {
    pub fn new(resolution: f64) -> Result<Self, TreeError> {
        Self::with_config(TreeConfig::new(resolution))
    }

    pub fn with_config(config: TreeConfig) -> Result<Self, TreeError> {
        let keys = config.key_space()?;
        let mut nodes = Pool::with_capacity(config.capacity);
        let root = nodes.insert(Node::default());

        Ok(OcTree {
            nodes,
            root,
            keys,
            bounds: MetricBounds::default(),
            size_changed: true,
        })
    }

    /// Number of nodes in the tree, root included.
    #[inline]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn resolution(&self) -> f64 {
        self.keys.resolution()
    }

    /// Changes the resolution. The tree is rebuilt empty.
    pub fn set_resolution(&mut self, resolution: f64) -> Result<(), TreeError> {
        self.keys = KeySpace::new(resolution)?;
        debug!(resolution, dropped = self.size(), "resolution changed, tree rebuilt");
        self.clear();
        Ok(())
    }

    #[inline]
    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, node: NodeId) -> Option<&Node<O>> {
        self.nodes.get(node)
    }

    /// Drops every node except an empty root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.insert(Node::default());
        self.size_changed = true;
    }

    /// Finds the node covering `point`.
    ///
    /// Returns the leaf at full depth, or a pruned leaf above it.
    /// [`None`] if the point is out of bounds or was never observed.
    pub fn search(&self, point: Point3d) -> Option<NodeId> {
        let key = self.keys.gen_keys(point).ok()?;
        self.search_key(key)
    }

    pub fn search_key(&self, key: OcTreeKey) -> Option<NodeId> {
        let mut node = self.root;
        for depth in 0..TREE_DEPTH {
            let n = &self.nodes[node];
            match n.child(child_index(&key, depth)) {
                Some(child) => node = child,
                None if n.is_leaf() => return Some(node),
                None => return None,
            }
        }
        Some(node)
    }

    /// Integrates one observation of `point`.
    ///
    /// Creates the missing nodes down to full depth and returns the leaf.
    pub fn update_node(&mut self, point: Point3d, occupied: bool) -> Result<NodeId, TreeError> {
        let key = self.keys.gen_keys(point)?;
        Ok(self.update_node_key(key, occupied))
    }

    pub fn update_node_key(&mut self, key: OcTreeKey, occupied: bool) -> NodeId {
        let mut path = [self.root; TREE_DEPTH as usize];
        let mut node = self.root;
        for depth in 0..TREE_DEPTH {
            path[depth as usize] = node;
            node = self.ensure_child(node, child_index(&key, depth));
        }

        self.nodes[node].occupancy.integrate(occupied);

        for &ancestor in path.iter().rev() {
            self.update_inner(ancestor);
        }
        node
    }

    /// Integrates one range measurement.
    ///
    /// Every cell between `origin` and `end` is updated as free,
    /// the cell of `end` as occupied. Nothing changes if either point is out of bounds.
    pub fn insert_ray(&mut self, origin: Point3d, end: Point3d) -> Result<(), TreeError> {
        let end_key = self.keys.gen_keys(end)?;
        self.integrate_miss_on_ray(origin, end)?;
        self.update_node_key(end_key, true);
        Ok(())
    }

    /// Updates every cell between `origin` and `end` as free. The cell of `end` is not updated.
    pub fn integrate_miss_on_ray(&mut self, origin: Point3d, end: Point3d) -> Result<(), TreeError> {
        for key in self.compute_ray_keys(origin, end)? {
            self.update_node_key(key, false);
        }
        Ok(())
    }

    /// Inserts a ray from `origin` to every point.
    ///
    /// With a positive `max_range` farther points only clear space up to `max_range`.
    /// Points out of bounds are skipped. Returns the number of integrated rays.
    pub fn insert_point_cloud<I>(
        &mut self,
        origin: Point3d,
        points: I,
        max_range: f64,
    ) -> Result<usize, TreeError>
    where
        I: IntoIterator<Item = Point3d>,
    {
        self.keys.gen_keys(origin)?;

        let mut inserted = 0;
        let mut skipped = 0;
        for point in points {
            let result = match (point - origin).normalized() {
                Some(direction) if max_range > 0.0 && origin.distance(point) > max_range => {
                    self.integrate_miss_on_ray(origin, origin + direction * max_range)
                }
                _ => self.insert_ray(origin, point),
            };

            match result {
                Ok(()) => inserted += 1,
                Err(err) => {
                    trace!(%point, %err, "skipping ray");
                    skipped += 1;
                }
            }
        }

        debug!(inserted, skipped, size = self.size(), "point cloud integrated");
        Ok(inserted)
    }

    /// Folds every node whose eight children are equal leaves into a single leaf.
    ///
    /// Returns the number of removed nodes.
    pub fn prune(&mut self) -> usize {
        let pruned = self.prune_recurs(self.root);
        if pruned > 0 {
            self.size_changed = true;
            debug!(pruned, size = self.size(), "tree pruned");
        }
        pruned
    }

    fn prune_recurs(&mut self, node: NodeId) -> usize {
        let Some(branch) = self.nodes[node].branch else {
            return 0;
        };

        let mut pruned = 0;
        for (_, child) in branch.iter() {
            pruned += self.prune_recurs(child);
        }

        if branch.is_full() && self.collapsible(&branch) {
            let mut occupancy = O::default();
            for (_, child) in branch.iter() {
                if let Some(child) = self.nodes.remove(child) {
                    occupancy = child.occupancy;
                }
            }
            let n = &mut self.nodes[node];
            n.branch = None;
            n.occupancy = occupancy;
            pruned += 8;
        }
        pruned
    }

    fn collapsible(&self, branch: &Branch) -> bool {
        let mut children = branch.iter().map(|(_, child)| &self.nodes[child]);
        match children.next() {
            Some(first) => {
                first.is_leaf()
                    && children.all(|child| child.is_leaf() && child.occupancy == first.occupancy)
            }
            None => false,
        }
    }

    /// Child of `node` at `octant`, created if missing.
    ///
    /// A pruned leaf is expanded first so its children keep its evidence.
    fn ensure_child(&mut self, node: NodeId, octant: usize) -> NodeId {
        let n = &self.nodes[node];
        if let Some(child) = n.child(octant) {
            return child;
        }

        if n.is_leaf() && n.occupancy != O::default() {
            return self.expand(node)[octant];
        }

        let child = self.nodes.insert(Node::default());
        self.nodes[node]
            .branch
            .get_or_insert_with(Branch::default)
            .set(octant, child);
        self.size_changed = true;
        child
    }

    fn expand(&mut self, node: NodeId) -> [NodeId; 8] {
        let occupancy = self.nodes[node].occupancy.clone();
        let children = from_fn(|_| self.nodes.insert(Node::from_occupancy(occupancy.clone())));
        self.nodes[node].branch = Some(Branch::from_children(children));
        self.size_changed = true;
        children
    }

    fn update_inner(&mut self, node: NodeId) {
        let n = &self.nodes[node];
        let mut occupancy = n.occupancy.clone();
        occupancy.update_from_children(n.children().map(|(_, child)| &self.nodes[child].occupancy));
        self.nodes[node].occupancy = occupancy;
    }
}

impl<O: Occupancy> Index<NodeId> for OcTree<O> {
    type Output = Node<O>;

    fn index(&self, node: NodeId) -> &Node<O> {
        &self.nodes[node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::{Classification, Regime};

    fn saturated_hit<O: Occupancy>(tree: &mut OcTree<O>, point: Point3d) {
        for _ in 0..5 {
            tree.update_node(point, true).unwrap();
        }
    }

    #[test]
    fn test_new() {
        let tree: OcTree = OcTree::new(0.1).unwrap();
        assert_eq!(tree.size(), 1);
        assert_eq!(tree.resolution(), 0.1);
        assert!(tree[tree.root()].is_leaf());

        assert!(matches!(
            OcTree::<LogOddsNode>::new(-1.0),
            Err(TreeError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_search() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();

        // Fresh root is a leaf covering everything
        assert_eq!(tree.search(Point3d::new(1.0, 1.0, 1.0)), Some(tree.root()));
        assert_eq!(tree.search(Point3d::splat(1e6)), None);

        let p = Point3d::new(0.33, -1.27, 4.05);
        let leaf = tree.update_node(p, true).unwrap();
        assert_eq!(tree.search(p), Some(leaf));
        assert!(tree[leaf].occupancy.is_occupied());

        // Neighbour cell below an existing inner node
        assert_eq!(tree.search(p + Point3d::new(0.1, 0.0, 0.0)), None);
        // Other half of the tree
        assert_eq!(tree.search(-p), None);
    }

    #[test]
    fn test_update_aggregates() {
        let mut tree: OcTree = OcTree::new(1.0).unwrap();

        tree.update_node(Point3d::new(0.5, 0.5, 0.5), false).unwrap();
        assert!(tree[tree.root()].occupancy.is_free());

        tree.update_node(Point3d::new(10.5, 0.5, 0.5), true).unwrap();
        assert!(tree[tree.root()].occupancy.is_occupied());
        assert_eq!(tree[tree.root()].child_count(), 1);
    }

    #[test]
    fn test_set_resolution() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();
        tree.update_node(Point3d::splat(1.0), true).unwrap();
        assert_eq!(tree.size(), 17);

        tree.set_resolution(0.5).unwrap();
        assert_eq!(tree.size(), 1);
        assert_eq!(tree.resolution(), 0.5);
        assert_eq!(tree.search(Point3d::splat(1.0)), Some(tree.root()));

        assert!(tree.set_resolution(0.0).is_err());
        assert_eq!(tree.resolution(), 0.5);
    }

    #[test]
    fn test_clear() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();
        tree.insert_ray(Point3d::ZERO, Point3d::splat(2.0)).unwrap();
        assert!(tree.size() > 17);

        tree.clear();
        assert_eq!(tree.size(), 1);
        assert!(tree[tree.root()].occupancy.is_unknown());
    }

    #[test]
    fn test_insert_ray() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();
        let origin = Point3d::ZERO;
        let end = Point3d::new(0.0, 0.0, 1.0);

        tree.insert_ray(origin, end).unwrap();

        let leaf = tree.search(end).unwrap();
        assert!(tree[leaf].occupancy.is_occupied());

        for cell in tree.compute_ray(origin, end).unwrap() {
            let leaf = tree.search(cell).unwrap();
            assert_eq!(tree[leaf].occupancy.classify(), Classification::Free);
        }
    }

    #[test]
    fn test_insert_ray_out_of_bounds() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();

        assert!(tree
            .insert_ray(Point3d::ZERO, Point3d::new(0.0, 5000.0, 0.0))
            .is_err());
        assert!(tree
            .insert_ray(Point3d::new(0.0, -5000.0, 0.0), Point3d::ZERO)
            .is_err());
        assert_eq!(tree.size(), 1);
    }

    #[test]
    fn test_insert_point_cloud() {
        let mut tree: OcTree = OcTree::new(0.1).unwrap();
        let origin = Point3d::ZERO;
        let points = [
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
            Point3d::new(0.0, 0.0, 5.0),
            Point3d::new(9000.0, 0.0, 0.0),
        ];

        assert_eq!(tree.insert_point_cloud(origin, points, 2.0), Ok(4));

        let near = tree.search(points[0]).unwrap();
        assert!(tree[near].occupancy.is_occupied());
        let near = tree.search(points[1]).unwrap();
        assert!(tree[near].occupancy.is_occupied());

        // Truncated at max range: free up to 2 meters, nothing behind
        let truncated = tree.search(Point3d::new(0.0, 0.0, 1.5)).unwrap();
        assert!(tree[truncated].occupancy.is_free());
        assert_eq!(tree.search(points[2]), None);

        // Without max range the far point is out of bounds and skipped
        assert_eq!(tree.insert_point_cloud(origin, [points[3]], -1.0), Ok(0));

        assert!(tree
            .insert_point_cloud(Point3d::splat(9000.0), points, -1.0)
            .is_err());
    }

    #[test]
    fn test_prune() {
        let mut tree: OcTree = OcTree::new(1.0).unwrap();

        // The 8 cells of one node at depth 15
        for octant in 0..8 {
            let x = (octant & 1) as f64;
            let y = ((octant >> 1) & 1) as f64;
            let z = ((octant >> 2) & 1) as f64;
            saturated_hit(&mut tree, Point3d::new(x + 0.5, y + 0.5, z + 0.5));
        }
        assert_eq!(tree.size(), 16 + 8);

        assert_eq!(tree.prune(), 8);
        assert_eq!(tree.size(), 16);
        assert_eq!(tree.prune(), 0);

        // Every cell now resolves to the pruned leaf at depth 15
        let pruned = tree.search(Point3d::splat(0.5)).unwrap();
        assert_eq!(tree.search(Point3d::splat(1.5)), Some(pruned));
        assert!(tree[pruned].is_leaf());
        assert!(tree[pruned].occupancy.is_occupied());
        assert_eq!(tree[pruned].occupancy.regime(), Regime::Binary);
    }

    #[test]
    fn test_update_expands_pruned_leaf() {
        let mut tree: OcTree = OcTree::new(1.0).unwrap();
        for octant in 0..8 {
            let x = (octant & 1) as f64;
            let y = ((octant >> 1) & 1) as f64;
            let z = ((octant >> 2) & 1) as f64;
            saturated_hit(&mut tree, Point3d::new(x + 0.5, y + 0.5, z + 0.5));
        }
        tree.prune();
        assert_eq!(tree.size(), 16);

        let leaf = tree.update_node(Point3d::splat(0.5), false).unwrap();
        assert_eq!(tree.size(), 24);
        assert!(tree[leaf].occupancy.is_occupied());
        assert_eq!(tree[leaf].occupancy.regime(), Regime::Delta);

        // Siblings kept the evidence of the pruned leaf
        let sibling = tree.search(Point3d::splat(1.5)).unwrap();
        assert_ne!(sibling, leaf);
        assert_eq!(tree[sibling].occupancy.regime(), Regime::Binary);

        // Siblings differ now, nothing to prune
        assert_eq!(tree.prune(), 0);
    }

    #[test]
    fn test_pool_reuse_after_prune() {
        let mut tree: OcTree = OcTree::new(1.0).unwrap();
        for octant in 0..8 {
            let x = (octant & 1) as f64;
            let y = ((octant >> 1) & 1) as f64;
            let z = ((octant >> 2) & 1) as f64;
            saturated_hit(&mut tree, Point3d::new(x + 0.5, y + 0.5, z + 0.5));
        }
        tree.prune();
        assert_eq!(tree.nodes.garbage_len(), 8);

        tree.update_node(Point3d::splat(0.5), true).unwrap();
        assert_eq!(tree.nodes.garbage_len(), 0);
        assert_eq!(tree.nodes.capacity_used(), tree.size());
    }
}
