//! [`Pool`] implementation.

use std::ops::{Index, IndexMut};

use crate::NodeId;

/// [`PoolItem`] slot, either holding an item or free for reuse.
#[derive(Clone)]
pub(crate) enum PoolItem<T> {
    Filled(T),
    Empty,
}

impl<T> From<T> for PoolItem<T> {
    fn from(item: T) -> Self {
        PoolItem::Filled(item)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PoolItem<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolItem::Filled(item) => write!(f, "Filled({:?})", item),
            PoolItem::Empty => write!(f, "Empty"),
        }
    }
}

/// Flat arena of tree nodes.
///
/// Removed slots are remembered and handed out again on the next insertion,
/// so pruning and re-expanding a region does not grow the backing vector.
#[derive(Clone)]
pub struct Pool<T> {
    pub(crate) vec: Vec<PoolItem<T>>,
    pub(crate) garbage: Vec<usize>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Pool {
            vec: Default::default(),
            garbage: Default::default(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("vec", &self.vec)
            .field("garbage", &self.garbage)
            .finish()
    }
}

/// Indexing a [`pool`](Pool) with [`NodeId`]
///
/// ```ignore
/// let node = &tree.nodes[NodeId(42)];
/// ```
impl<T> Index<NodeId> for Pool<T> {
    type Output = T;

    fn index(&self, index: NodeId) -> &Self::Output {
        debug_assert!(!self.is_garbage(index), "Indexing garbage node: {index}");
        self.get_unchecked(index)
    }
}

/// Mutable Indexing a [`pool`](Pool) with [`NodeId`]
///
/// ```ignore
/// let mut node = &mut tree.nodes[NodeId(42)];
/// ```
impl<T> IndexMut<NodeId> for Pool<T> {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        debug_assert!(
            !self.is_garbage(index),
            "Mut Indexing garbaged node: {index}"
        );
        self.get_mut_unchecked(index)
    }
}

impl<T> Pool<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Pool {
            vec: Vec::with_capacity(capacity),
            garbage: Default::default(),
        }
    }

    #[inline(always)]
    pub(crate) fn insert(&mut self, t: T) -> NodeId {
        if let Some(idx) = self.garbage.pop() {
            self.vec[idx] = PoolItem::Filled(t);
            idx.into()
        } else {
            self.vec.push(PoolItem::Filled(t));
            (self.vec.len() - 1).into()
        }
    }

    #[inline(always)]
    pub(crate) fn remove(&mut self, node: NodeId) -> Option<T> {
        let index: usize = node.into();
        match std::mem::replace(&mut self.vec[index], PoolItem::Empty) {
            PoolItem::Filled(item) => {
                self.garbage.push(index);
                Some(item)
            }
            PoolItem::Empty => None,
        }
    }

    /// Drops every item, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        self.vec.clear();
        self.garbage.clear();
    }

    /// Returns the number of actual items.
    ///
    /// Free slots are not counted.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.vec.len() - self.garbage_len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of free slots.
    #[inline(always)]
    pub fn garbage_len(&self) -> usize {
        self.garbage.len()
    }

    /// Number of slots, filled or free.
    #[inline(always)]
    pub fn capacity_used(&self) -> usize {
        self.vec.len()
    }

    #[inline(always)]
    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.vec.get(node.0 as usize).and_then(|item| {
            if let PoolItem::Filled(ref item) = item {
                Some(item)
            } else {
                None
            }
        })
    }

    #[inline(always)]
    pub fn get_unchecked(&self, node: NodeId) -> &T {
        if let PoolItem::Filled(ref item) = self.vec[node.0 as usize] {
            item
        } else {
            unreachable!("Accessing garbaged node: {node}")
        }
    }

    #[inline(always)]
    pub fn get_mut_unchecked(&mut self, node: NodeId) -> &mut T {
        if let PoolItem::Filled(ref mut item) = self.vec[node.0 as usize] {
            item
        } else {
            unreachable!("Accessing garbaged node: {node}")
        }
    }

    #[inline(always)]
    pub fn is_garbage(&self, node: NodeId) -> bool {
        match self.vec.get(node.0 as usize) {
            Some(PoolItem::Filled(_)) => false,
            Some(PoolItem::Empty) | None => true,
        }
    }
}
