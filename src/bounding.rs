//! Bounding primitives.
//!
//! [`Point3d`], [`OcTreeVolume`]

use std::{
    fmt::Display,
    ops::{Add, AddAssign, Div, Index, Mul, Neg, Sub, SubAssign},
};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Metric 3D coordinate or vector, in meters.
#[derive(Default, Debug, PartialEq, PartialOrd, Clone, Copy)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Add for Point3d {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Point3d {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Point3d {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Point3d {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl AddAssign for Point3d {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl SubAssign for Point3d {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
        self.z -= other.z;
    }
}

impl Mul<f64> for Point3d {
    type Output = Self;

    fn mul(self, scale: f64) -> Self {
        Point3d::new(self.x * scale, self.y * scale, self.z * scale)
    }
}

impl Div<f64> for Point3d {
    type Output = Self;

    fn div(self, scale: f64) -> Self {
        Point3d::new(self.x / scale, self.y / scale, self.z / scale)
    }
}

impl Neg for Point3d {
    type Output = Self;

    fn neg(self) -> Self {
        Point3d::new(-self.x, -self.y, -self.z)
    }
}

/// Axis access, `0` is x, `1` is y, `2` is z.
impl Index<usize> for Point3d {
    type Output = f64;

    fn index(&self, axis: usize) -> &f64 {
        match axis {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Point3d axis out of range: {axis}"),
        }
    }
}

impl From<[f64; 3]> for Point3d {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Point3d { x, y, z }
    }
}

impl From<Point3d> for [f64; 3] {
    fn from(value: Point3d) -> Self {
        [value.x, value.y, value.z]
    }
}

impl Display for Point3d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Point3d: x: {}, y: {}, z: {}", self.x, self.y, self.z)
    }
}

impl Point3d {
    pub const ZERO: Point3d = Point3d {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point3d { x, y, z }
    }

    pub fn splat(value: f64) -> Self {
        Point3d {
            x: value,
            y: value,
            z: value,
        }
    }

    pub fn dot(&self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    pub fn distance(&self, other: Self) -> f64 {
        (*self - other).norm()
    }

    /// Unit vector with the same direction.
    ///
    /// Returns [`None`] for zero-length or non finite vectors.
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.norm();
        if norm > 0.0 && norm.is_finite() {
            Some(*self / norm)
        } else {
            None
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn min(&self, other: Self) -> Self {
        Point3d::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    pub fn max(&self, other: Self) -> Self {
        Point3d::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }
}

/// Cubic volume covered by a node of the [`tree`](crate::tree::OcTree).
///
/// Only produced by queries, never stored in the tree.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct OcTreeVolume {
    pub center: Point3d,
    /// Edge length in meters.
    pub size: f64,
}

impl Display for OcTreeVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OcTreeVolume(center: {}, size: {})", self.center, self.size)
    }
}

impl OcTreeVolume {
    pub fn new(center: Point3d, size: f64) -> Self {
        OcTreeVolume { center, size }
    }

    pub fn half_size(&self) -> f64 {
        self.size * 0.5
    }

    pub fn min(&self) -> Point3d {
        self.center - Point3d::splat(self.half_size())
    }

    pub fn max(&self) -> Point3d {
        self.center + Point3d::splat(self.half_size())
    }

    /// Checks if the volume contains a point.
    ///
    /// Lower faces are inclusive, upper faces exclusive, the same way keys quantize.
    pub fn contains(&self, point: Point3d) -> bool {
        let min = self.min();
        let max = self.max();
        (0..3).all(|axis| min[axis] <= point[axis] && point[axis] < max[axis])
    }
}

#[cfg(test)]
mod tests {
    use super::{OcTreeVolume, Point3d};

    #[test]
    fn test_point_ops() {
        let a = Point3d::new(1.0, 2.0, 3.0);
        let b = Point3d::splat(1.0);

        assert_eq!(a + b, Point3d::new(2.0, 3.0, 4.0));
        assert_eq!(a - b, Point3d::new(0.0, 1.0, 2.0));
        assert_eq!(a * 2.0, Point3d::new(2.0, 4.0, 6.0));
        assert_eq!(-b, Point3d::splat(-1.0));
        assert_eq!(a[2], 3.0);
        assert_eq!(a.dot(b), 6.0);
        assert_eq!(Point3d::new(3.0, 4.0, 0.0).norm(), 5.0);
    }

    #[test]
    fn test_normalized() {
        let dir = Point3d::new(0.0, 0.0, 4.0).normalized();
        assert_eq!(dir, Some(Point3d::new(0.0, 0.0, 1.0)));

        assert_eq!(Point3d::ZERO.normalized(), None);
        assert_eq!(Point3d::new(f64::NAN, 0.0, 1.0).normalized(), None);
    }

    #[test]
    fn test_volume_contains() {
        let volume = OcTreeVolume::new(Point3d::splat(0.5), 1.0);
        assert_eq!(volume.min(), Point3d::ZERO);
        assert_eq!(volume.max(), Point3d::splat(1.0));

        assert!(volume.contains(Point3d::ZERO));
        assert!(volume.contains(Point3d::splat(0.99)));
        assert!(!volume.contains(Point3d::splat(1.0)));
        assert!(!volume.contains(Point3d::new(0.5, -0.1, 0.5)));
    }
}
