//! Math type re-exports and archive-specific math utilities.

pub use glam::{DVec3, Vec2, Vec3};

use std::fmt;

/// 3D bounding box with double precision.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox3d {
    pub min: DVec3,
    pub max: DVec3,
}

impl BBox3d {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Bounding box of a set of single precision points.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::EMPTY;
        for p in points {
            bounds.expand_by_point(p.as_dvec3());
        }
        bounds
    }

    /// Check if this box is empty (has no volume).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand this box to include another box.
    #[inline]
    pub fn expand_by_box(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Check whether a point lies inside the box (inclusive).
    #[inline]
    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Alembic `.selfBnds` layout: min xyz followed by max xyz.
    ///
    /// An empty box is written as all zeros, the same as the
    /// C++ writer does for a mesh without points.
    pub fn to_array(&self) -> [f64; 6] {
        if self.is_empty() {
            return [0.0; 6];
        }
        [self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z]
    }
}

impl Default for BBox3d {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for BBox3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox3d({:?} - {:?})", self.min, self.max)
    }
}

/// Chrono type - time value (seconds).
pub type Chrono = f64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox3d() {
        let mut b = BBox3d::EMPTY;
        assert!(b.is_empty());

        b.expand_by_point(DVec3::new(-1.0, -1.0, -1.0));
        b.expand_by_point(DVec3::new(1.0, 1.0, 1.0));

        assert!(!b.is_empty());
        assert!(b.contains(DVec3::ZERO));
        assert!(!b.contains(DVec3::splat(1.5)));
    }

    #[test]
    fn test_bbox_from_points() {
        let b = BBox3d::from_points(&[Vec3::new(0.0, 2.0, -1.0), Vec3::new(1.0, -2.0, 3.0)]);
        assert_eq!(b.to_array(), [0.0, -2.0, -1.0, 1.0, 2.0, 3.0]);
        assert_eq!(BBox3d::from_points(&[]).to_array(), [0.0; 6]);

        let mut c = BBox3d::EMPTY;
        c.expand_by_box(&b);
        c.expand_by_box(&BBox3d::EMPTY);
        assert_eq!(c, b);
    }
}
