//! Geometry: points, sizes, and the affine transform every entity carries.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A point (or displacement) in either parent or local space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Width and height of a rectangle, named `x`/`y` like the positions they pair with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub x: f64,
    pub y: f64,
}

impl Size {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Multiply both extents by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Size {
        Size::new(self.x * factor, self.y * factor)
    }
}

impl Default for Size {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

/// Placement of a rectangular entity inside its parent's coordinate space.
///
/// `x` / `y` are the parent-space position of the entity's top-left corner.
/// `scale` is uniform and must stay positive. `size` is intrinsic: the
/// rendered footprint is `size * scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineState {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub size: Size,
}

impl Default for AffineState {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, scale: 1.0, size: Size::default() }
    }
}

impl AffineState {
    #[must_use]
    pub fn new(x: f64, y: f64, scale: f64, size: Size) -> Self {
        Self { x, y, scale, size }
    }

    /// Parent-space position of the top-left corner.
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Rendered size in parent space.
    #[must_use]
    pub fn footprint(&self) -> Size {
        self.size.scaled(self.scale)
    }

    /// Convert a local (intrinsic) point to parent coordinates.
    #[must_use]
    pub fn to_parent(&self, local: Point) -> Point {
        Point::new(self.x + local.x * self.scale, self.y + local.y * self.scale)
    }

    /// Convert a parent-space point to local (intrinsic) coordinates.
    #[must_use]
    pub fn to_local(&self, parent: Point) -> Point {
        Point::new((parent.x - self.x) / self.scale, (parent.y - self.y) / self.scale)
    }

    /// Whether `parent` lies inside the scaled footprint (edges inclusive).
    #[must_use]
    pub fn contains(&self, parent: Point) -> bool {
        let f = self.footprint();
        parent.x >= self.x && parent.x <= self.x + f.x && parent.y >= self.y && parent.y <= self.y + f.y
    }

    /// Footprint corners in parent space: top-left, top-right, bottom-left, bottom-right.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        let f = self.footprint();
        [
            Point::new(self.x, self.y),
            Point::new(self.x + f.x, self.y),
            Point::new(self.x, self.y + f.y),
            Point::new(self.x + f.x, self.y + f.y),
        ]
    }
}
