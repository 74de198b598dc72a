use core::fmt;

use crate::{occupancy::Occupancy, NodeId};

/// A node of the [`tree`](crate::tree::OcTree).
///
/// Leaves have no [`Branch`]. Inner nodes always have at least one child.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Node<O> {
    pub occupancy: O,
    pub(crate) branch: Option<Branch>,
}

impl<O: Occupancy> Node<O> {
    pub(crate) fn from_occupancy(occupancy: O) -> Self {
        Node {
            occupancy,
            branch: None,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.branch.is_none()
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.branch.is_some()
    }

    /// Child at `octant`, if it was ever observed.
    #[inline]
    pub fn child(&self, octant: usize) -> Option<NodeId> {
        self.branch.as_ref().and_then(|branch| branch.children[octant])
    }

    pub fn child_count(&self) -> u8 {
        self.branch.as_ref().map_or(0, |branch| branch.filled)
    }

    /// Existing children with their octant.
    pub fn children(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.branch.iter().flat_map(|branch| branch.iter())
    }
}

impl<O: fmt::Display> fmt::Display for Node<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.branch {
            None => write!(f, "Leaf({})", self.occupancy),
            Some(branch) => write!(f, "Branch({}, {} children)", self.occupancy, branch.filled),
        }
    }
}

/// Sparse children of an inner node.
#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct Branch {
    pub children: [Option<NodeId>; 8],
    pub filled: u8,
}

impl Branch {
    pub(crate) fn from_children(children: [NodeId; 8]) -> Self {
        Branch {
            children: children.map(Some),
            filled: 8,
        }
    }

    pub(crate) fn set(&mut self, octant: usize, child: NodeId) {
        debug_assert!(self.children[octant].is_none());
        self.children[octant] = Some(child);
        self.filled += 1;
        debug_assert!(self.filled <= 8);
    }

    pub fn is_full(&self) -> bool {
        self.filled == 8
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(octant, child)| child.map(|child| (octant, child)))
    }
}
