//! [Bevy](https://docs.rs/bevy/) game engine integrations.
//!
//! Adds the [Bevy](https://docs.rs/bevy/) game engine as a dependency.
//!
//! ### Conversions:
//! - [`Point3d`] from and into [`Vec3`] and [`Vec3A`]
//! - [`OcTreeVolume`] into [`Aabb3d`]
//!
//! ### Intersections:
//! - [ray](RayCast3d) [cast](OcTree::ray_cast)
//!
//! ```no_run
//! let ray = RayCast3d::new(Vec3A::ZERO, Dir3A::Z, 10.0);
//! let hit = tree.ray_cast(&ray, false).unwrap();
//! assert!(hit.hit);
//! ```

use bevy::math::{
    bounding::{Aabb3d, BoundingSphere, IntersectsVolume, RayCast3d},
    Vec3, Vec3A,
};

use crate::{
    bounding::{OcTreeVolume, Point3d},
    occupancy::Occupancy,
    ray::HitResult,
    tree::OcTree,
    TreeError,
};

impl<O: Occupancy> OcTree<O> {
    /// Casts a [`RayCast3d`] through the map.
    ///
    /// Same as [`cast_ray`](OcTree::cast_ray) with the ray's origin,
    /// direction and maximum distance.
    pub fn ray_cast(&self, ray: &RayCast3d, ignore_unknown: bool) -> Result<HitResult, TreeError> {
        self.cast_ray(
            ray.origin.into(),
            Point3d::from(*ray.direction),
            ignore_unknown,
            f64::from(ray.max),
        )
    }

    /// Whole addressable volume of the tree.
    fn aabb(&self) -> Aabb3d {
        let half = self.key_space().half_extent() as f32;
        Aabb3d {
            min: Vec3A::splat(-half),
            max: Vec3A::splat(half),
        }
    }
}

impl<O: Occupancy> IntersectsVolume<Aabb3d> for OcTree<O> {
    /// Check if a [Aabb3d] volume intersects with the addressable volume of the [OcTree].
    fn intersects(&self, volume: &Aabb3d) -> bool {
        volume.intersects(&self.aabb())
    }
}

impl<O: Occupancy> IntersectsVolume<BoundingSphere> for OcTree<O> {
    /// Check if a [BoundingSphere] volume intersects with the addressable volume of the [OcTree].
    fn intersects(&self, volume: &BoundingSphere) -> bool {
        volume.intersects(&self.aabb())
    }
}

impl From<OcTreeVolume> for Aabb3d {
    fn from(value: OcTreeVolume) -> Self {
        Aabb3d {
            min: value.min().into(),
            max: value.max().into(),
        }
    }
}

impl From<Point3d> for Vec3A {
    fn from(value: Point3d) -> Self {
        Vec3A::new(value.x as f32, value.y as f32, value.z as f32)
    }
}

impl From<Point3d> for Vec3 {
    fn from(value: Point3d) -> Self {
        Vec3::new(value.x as f32, value.y as f32, value.z as f32)
    }
}

impl From<Vec3A> for Point3d {
    fn from(value: Vec3A) -> Self {
        Point3d::new(value.x.into(), value.y.into(), value.z.into())
    }
}

impl From<Vec3> for Point3d {
    fn from(value: Vec3) -> Self {
        Point3d::new(value.x.into(), value.y.into(), value.z.into())
    }
}
