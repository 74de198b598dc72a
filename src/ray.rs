//! Ray geometry: cell traversal and first hit casting.

use smallvec::SmallVec;

use crate::{
    bounding::Point3d,
    key::{KeySpace, OcTreeKey},
    occupancy::{Classification, Occupancy},
    tree::OcTree,
    TreeError,
};

/// Ordered cells crossed by a ray.
pub type KeyRay = SmallVec<[OcTreeKey; 64]>;

/// Outcome of [`cast_ray`](OcTree::cast_ray).
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HitResult {
    /// An occupied cell was found.
    pub hit: bool,
    /// Center of the hit cell, or of the last examined cell on a miss.
    pub end: Point3d,
    /// Distance along the ray at which `end`'s cell was entered.
    pub distance: f64,
}

/// Incremental grid walk along a ray.
struct RayWalk {
    key: OcTreeKey,
    step: [i8; 3],
    // Ray parameter of the next border crossing per axis
    t_max: [f64; 3],
    // Ray parameter between two border crossings per axis
    t_delta: [f64; 3],
}

impl RayWalk {
    /// `direction` must be normalized, `key` is the cell of `origin`.
    fn new(keys: &KeySpace, origin: Point3d, key: OcTreeKey, direction: Point3d) -> Self {
        let resolution = keys.resolution();
        let mut step = [0; 3];
        let mut t_max = [f64::INFINITY; 3];
        let mut t_delta = [f64::INFINITY; 3];

        for axis in 0..3 {
            let d = direction[axis];
            if d > 0.0 {
                step[axis] = 1;
            } else if d < 0.0 {
                step[axis] = -1;
            } else {
                continue;
            }

            let border = keys.gen_val(key[axis]) + f64::from(step[axis]) * resolution * 0.5;
            t_max[axis] = (border - origin[axis]) / d;
            t_delta[axis] = resolution / d.abs();
        }

        RayWalk {
            key,
            step,
            t_max,
            t_delta,
        }
    }

    /// Steps into the next cell and returns the ray parameter it was entered at.
    ///
    /// Axes crossing their border at the same parameter step together.
    /// [`None`] once the walk leaves the key range.
    fn advance(&mut self) -> Option<f64> {
        let t = self.t_max.iter().copied().fold(f64::INFINITY, f64::min);
        if !t.is_finite() {
            return None;
        }

        for axis in 0..3 {
            if self.t_max[axis] == t {
                self.key[axis] = if self.step[axis] > 0 {
                    self.key[axis].checked_add(1)?
                } else {
                    self.key[axis].checked_sub(1)?
                };
                self.t_max[axis] += self.t_delta[axis];
            }
        }
        Some(t)
    }
}

impl<O: Occupancy> OcTree<O> {
    /// Keys of the cells from `origin` towards `end`.
    ///
    /// The cell of `origin` comes first, the cell of `end` is never included,
    /// so both points in one cell give an empty ray.
    pub fn compute_ray_keys(&self, origin: Point3d, end: Point3d) -> Result<KeyRay, TreeError> {
        let key_origin = self.keys.gen_keys(origin)?;
        let key_end = self.keys.gen_keys(end)?;

        let mut ray = KeyRay::new();
        if key_origin == key_end {
            return Ok(ray);
        }

        let segment = end - origin;
        let length = segment.norm();
        let Some(direction) = segment.normalized() else {
            return Ok(ray);
        };

        let mut walk = RayWalk::new(&self.keys, origin, key_origin, direction);
        loop {
            ray.push(walk.key);
            match walk.advance() {
                Some(t) if t <= length && walk.key != key_end => continue,
                _ => break,
            }
        }
        Ok(ray)
    }

    /// Centers of the cells from `origin` towards `end`, see [`compute_ray_keys`](OcTree::compute_ray_keys).
    ///
    /// ```rust
    /// use occtree::prelude::*;
    ///
    /// let tree: OcTree = OcTree::new(0.1).unwrap();
    /// let cells = tree
    ///     .compute_ray(Point3d::ZERO, Point3d::new(0.0, 0.0, 1.0))
    ///     .unwrap();
    ///
    /// assert_eq!(cells.len(), 10);
    /// assert!((cells[0].z - 0.05).abs() < 1e-9);
    /// assert!((cells[9].z - 0.95).abs() < 1e-9);
    /// ```
    pub fn compute_ray(&self, origin: Point3d, end: Point3d) -> Result<Vec<Point3d>, TreeError> {
        Ok(self
            .compute_ray_keys(origin, end)?
            .into_iter()
            .map(|key| self.keys.key_to_coord(key))
            .collect())
    }

    /// Marches from `origin` along `direction` until the first occupied cell.
    ///
    /// An unknown cell ends the march unless `ignore_unknown` is set.
    /// A positive `max_range` ends it at cells whose center is farther than `max_range`.
    /// Leaving the tree volume is a miss, not an error.
    pub fn cast_ray(
        &self,
        origin: Point3d,
        direction: Point3d,
        ignore_unknown: bool,
        max_range: f64,
    ) -> Result<HitResult, TreeError> {
        let unit = direction.normalized().ok_or_else(|| {
            TreeError::DegenerateDirection(format!("direction: {direction}"))
        })?;
        let key = self.keys.gen_keys(origin)?;

        let mut result = HitResult {
            hit: false,
            end: self.keys.key_to_coord(key),
            distance: 0.0,
        };

        if self.classify_key(key) == Classification::Occupied {
            result.hit = true;
            return Ok(result);
        }

        let mut walk = RayWalk::new(&self.keys, origin, key, unit);
        while let Some(t) = walk.advance() {
            let center = self.keys.key_to_coord(walk.key);
            if max_range > 0.0 && origin.distance(center) > max_range {
                break;
            }

            result.end = center;
            result.distance = t;

            match self.classify_key(walk.key) {
                Classification::Occupied => {
                    result.hit = true;
                    break;
                }
                Classification::Unknown if !ignore_unknown => break,
                _ => {}
            }
        }
        Ok(result)
    }

    fn classify_key(&self, key: OcTreeKey) -> Classification {
        self.search_key(key)
            .map_or(Classification::Unknown, |node| self.nodes[node].occupancy.classify())
    }
}
