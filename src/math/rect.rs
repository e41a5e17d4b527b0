use super::Point;

/// Axis-aligned room rectangle used by the dungeon generator.
#[derive(Clone, Copy)]
pub struct Rect {
    bl: Point,
    tr: Point,
}

impl Rect {
    /// Builds a new `Rect` given the bottom-left corner and its width and height.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect {
            bl: Point::new(x, y),
            tr: Point::new(x + w - 1, y + h - 1),
        }
    }

    pub fn left(&self) -> i32 {
        self.bl.x()
    }

    pub fn right(&self) -> i32 {
        self.tr.x()
    }

    pub fn bottom(&self) -> i32 {
        self.bl.y()
    }

    pub fn top(&self) -> i32 {
        self.tr.y()
    }

    /// Returns true if `self` intersects with `other` (used to reject
    /// overlapping rooms during generation).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && self.right() >= other.left()
            && self.bottom() <= other.top()
            && self.top() >= other.bottom()
    }

    pub fn center(&self) -> Point {
        Point::new((self.left() + self.right()) / 2, (self.bottom() + self.top()) / 2)
    }

    /// Iterates every interior point (excluding the outer wall ring).
    pub fn interior(&self) -> impl Iterator<Item = Point> + '_ {
        ((self.bottom() + 1)..self.top())
            .flat_map(move |y| ((self.left() + 1)..self.right()).map(move |x| Point::new(x, y)))
    }
}
