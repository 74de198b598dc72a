//! Construction parameters of a [`tree`](crate::tree::OcTree).

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::{key::KeySpace, TreeError};

/// Resolution and preallocation of a [`tree`](crate::tree::OcTree).
///
/// ```rust
/// use occtree::prelude::*;
///
/// let config = TreeConfig::new(0.05).with_capacity(1 << 16);
/// let tree: OcTree = OcTree::with_config(config).unwrap();
/// assert_eq!(tree.resolution(), 0.05);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct TreeConfig {
    /// Edge of a leaf cell in meters.
    pub resolution: f64,
    /// Number of nodes to preallocate.
    pub capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            resolution: 0.1,
            capacity: 0,
        }
    }
}

impl TreeConfig {
    pub fn new(resolution: f64) -> Self {
        TreeConfig {
            resolution,
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Checks the config and builds the key space it describes.
    pub fn key_space(&self) -> Result<KeySpace, TreeError> {
        KeySpace::new(self.resolution)
    }
}
