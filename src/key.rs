//! Fixed point addressing of the tree volume.
//!
//! Every coordinate maps to a [`OcTreeKey`]: one 16 bit cell index per axis.
//! Keys are exact, so repeated insertions never accumulate floating point drift.

use std::{
    fmt::Display,
    ops::{Index, IndexMut},
};

use num::cast;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::{
    bounding::{OcTreeVolume, Point3d},
    TreeError,
};

/// Maximum depth of the tree, leaves at this depth are one resolution cell.
pub const TREE_DEPTH: u8 = 16;

/// Half of the key range, the key of the first cell with a non negative coordinate.
pub const TREE_MAX_VAL: u32 = 1 << (TREE_DEPTH - 1);

/// Number of cells along each axis.
pub const TREE_CELLS: u32 = 1 << TREE_DEPTH;

/// Discrete address of a cell, one key per axis.
#[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct OcTreeKey(pub [u16; 3]);

impl OcTreeKey {
    pub fn new(x: u16, y: u16, z: u16) -> Self {
        OcTreeKey([x, y, z])
    }

    /// Key of the first cell of the child `octant` of a node at `depth`
    /// whose first cell is `self`.
    pub(crate) fn child_corner(&self, octant: usize, depth: u8) -> Self {
        debug_assert!(depth < TREE_DEPTH);
        let offset = 1u16 << (TREE_DEPTH - depth - 1);
        let mut key = *self;
        for axis in 0..3 {
            if octant & (1 << axis) != 0 {
                key[axis] += offset;
            }
        }
        key
    }
}

impl Index<usize> for OcTreeKey {
    type Output = u16;

    fn index(&self, axis: usize) -> &u16 {
        &self.0[axis]
    }
}

impl IndexMut<usize> for OcTreeKey {
    fn index_mut(&mut self, axis: usize) -> &mut u16 {
        &mut self.0[axis]
    }
}

impl Display for OcTreeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OcTreeKey: [{}, {}, {}]", self.0[0], self.0[1], self.0[2])
    }
}

/// Index of the child to descend into at `depth` on the way to `key`.
///
/// Packs bit `TREE_DEPTH - 1 - depth` of every axis as `x | y << 1 | z << 2`.
#[inline]
pub fn child_index(key: &OcTreeKey, depth: u8) -> usize {
    debug_assert!(depth < TREE_DEPTH);
    let bit = TREE_DEPTH - 1 - depth;
    let x = ((key[0] >> bit) & 1) as usize;
    let y = ((key[1] >> bit) & 1) as usize;
    let z = ((key[2] >> bit) & 1) as usize;

    x | y << 1 | z << 2
}

/// Conversion between metric coordinates and [`keys`](OcTreeKey) at a given resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySpace {
    resolution: f64,
}

impl KeySpace {
    pub fn new(resolution: f64) -> Result<Self, TreeError> {
        if resolution > 0.0 && resolution.is_finite() {
            Ok(KeySpace { resolution })
        } else {
            Err(TreeError::InvalidResolution(format!(
                "resolution: {resolution}"
            )))
        }
    }

    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Half of the metric edge of the whole tree volume.
    pub fn half_extent(&self) -> f64 {
        self.resolution * TREE_MAX_VAL as f64
    }

    /// Key of one coordinate.
    pub fn gen_key(&self, value: f64) -> Result<u16, TreeError> {
        cast::<f64, i64>((value / self.resolution).floor())
            .and_then(|cell| cell.checked_add(TREE_MAX_VAL as i64))
            .and_then(|idx| u16::try_from(idx).ok())
            .ok_or_else(|| {
                TreeError::OutOfTreeBounds(format!(
                    "{value} is outside of +/- {}",
                    self.half_extent()
                ))
            })
    }

    /// Keys of all three coordinates, fails if any of them is out of bounds.
    pub fn gen_keys(&self, point: Point3d) -> Result<OcTreeKey, TreeError> {
        Ok(OcTreeKey([
            self.gen_key(point.x)?,
            self.gen_key(point.y)?,
            self.gen_key(point.z)?,
        ]))
    }

    /// Center coordinate of the cell addressed by `key`.
    #[inline]
    pub fn gen_val(&self, key: u16) -> f64 {
        (key as f64 - TREE_MAX_VAL as f64 + 0.5) * self.resolution
    }

    pub fn key_to_coord(&self, key: OcTreeKey) -> Point3d {
        Point3d::new(self.gen_val(key[0]), self.gen_val(key[1]), self.gen_val(key[2]))
    }

    /// Edge length of a node at `depth`.
    #[inline]
    pub fn node_size(&self, depth: u8) -> f64 {
        debug_assert!(depth <= TREE_DEPTH);
        self.resolution * (1u32 << (TREE_DEPTH - depth)) as f64
    }

    /// Volume of the node at `depth` whose first cell is `corner`.
    pub fn volume(&self, corner: OcTreeKey, depth: u8) -> OcTreeVolume {
        let half_span = (1u32 << (TREE_DEPTH - depth)) as f64 * 0.5;
        let center = |key: u16| (key as f64 + half_span - TREE_MAX_VAL as f64) * self.resolution;
        OcTreeVolume::new(
            Point3d::new(center(corner[0]), center(corner[1]), center(corner[2])),
            self.node_size(depth),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_key() {
        let keys = KeySpace::new(0.1).unwrap();

        assert_eq!(keys.gen_key(0.0), Ok(32768));
        assert_eq!(keys.gen_key(0.05), Ok(32768));
        assert_eq!(keys.gen_key(-0.05), Ok(32767));
        assert_eq!(keys.gen_key(1.0), Ok(32778));
        assert_eq!(keys.gen_key(-3276.75), Ok(0));
        assert_eq!(keys.gen_key(3276.75), Ok(65535));
    }

    #[test]
    fn test_gen_key_bounds() {
        let keys = KeySpace::new(0.1).unwrap();

        assert!(keys.gen_key(3276.7).is_ok());
        assert!(keys.gen_key(-3276.7).is_ok());
        assert!(keys.gen_key(3276.81).is_err());
        assert!(keys.gen_key(-3276.9).is_err());
        assert!(keys.gen_key(1e300).is_err());
        assert!(keys.gen_key(f64::NAN).is_err());
        assert!(keys.gen_key(f64::NEG_INFINITY).is_err());

        assert!(keys.gen_keys(Point3d::new(1.0, 1.0, 1.0)).is_ok());
        assert!(keys.gen_keys(Point3d::new(1.0, 5000.0, 1.0)).is_err());
    }

    #[test]
    fn test_quantization_idempotent() {
        for resolution in [0.01, 0.05, 0.1, 0.25, 1.0] {
            let keys = KeySpace::new(resolution).unwrap();
            let limit = keys.half_extent() * 0.999;
            let mut value = -limit;
            let step = limit / 997.0;

            while value < limit {
                let key = keys.gen_key(value).unwrap();
                let center = keys.gen_val(key);

                assert_eq!(keys.gen_key(center), Ok(key));
                assert!((center - value).abs() <= resolution * 0.5 + 1e-9);

                value += step;
            }
        }
    }

    #[test]
    fn test_child_index() {
        let key = OcTreeKey::new(0b1000_0000_0000_0000, 0, 0b1000_0000_0000_0001);
        assert_eq!(child_index(&key, 0), 0b101);
        assert_eq!(child_index(&key, 1), 0);
        assert_eq!(child_index(&key, 15), 0b100);

        let key = OcTreeKey::new(0, 0xffff, 0);
        for depth in 0..TREE_DEPTH {
            assert_eq!(child_index(&key, depth), 0b010);
        }
    }

    #[test]
    fn test_child_corner() {
        let root = OcTreeKey::default();
        assert_eq!(root.child_corner(0b111, 0), OcTreeKey::new(32768, 32768, 32768));
        assert_eq!(root.child_corner(0b001, 15), OcTreeKey::new(1, 0, 0));

        let key = OcTreeKey::new(12345, 54321, 777);
        let mut corner = OcTreeKey::default();
        for depth in 0..TREE_DEPTH {
            corner = corner.child_corner(child_index(&key, depth), depth);
        }
        assert_eq!(corner, key);
    }

    #[test]
    fn test_volume() {
        let keys = KeySpace::new(0.5).unwrap();

        let root = keys.volume(OcTreeKey::default(), 0);
        assert_eq!(root.center, Point3d::ZERO);
        assert_eq!(root.size, 0.5 * 65536.0);

        let key = keys.gen_keys(Point3d::new(0.3, -0.3, 10.1)).unwrap();
        let leaf = keys.volume(key, TREE_DEPTH);
        assert_eq!(leaf.center, keys.key_to_coord(key));
        assert_eq!(leaf.size, 0.5);
    }

    #[test]
    fn test_invalid_resolution() {
        assert!(KeySpace::new(0.0).is_err());
        assert!(KeySpace::new(-0.1).is_err());
        assert!(KeySpace::new(f64::INFINITY).is_err());
    }
}
