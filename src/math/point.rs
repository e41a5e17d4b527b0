use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// 2D point in a map's local coordinate space.
///
/// Plain `i32` fields rather than an `amethyst::core::math::Point2<u32>`:
/// that dependency is gone along with the renderer, and coordinates are
/// signed so that deltas (`target - origin`, step vectors) don't need a
/// separate type.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    /// `(row, col)` pair, i.e. `(y, x)` — the index order a row-major grid
    /// indexes with.
    pub fn ij(&self) -> (i32, i32) {
        (self.y, self.x)
    }

    /// Chebyshev (8-directional / "king move") distance, the metric the
    /// scheduler and AI use for adjacency and line-of-sight range checks.
    pub fn chebyshev_distance(&self, other: Point) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Euclidean distance, floored, used only for the FOV falloff check.
    pub fn distance_2d(&self, other: Point) -> f32 {
        let dx2 = (self.x - other.x).pow(2);
        let dy2 = (self.y - other.y).pow(2);
        f32::sqrt((dx2 + dy2) as f32)
    }
}

impl From<(i32, i32)> for Point {
    fn from(p: (i32, i32)) -> Self {
        Point::new(p.0, p.1)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}
