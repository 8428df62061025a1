//! Geometric primitives.

use serde::{Deserialize, Serialize};

/// A 2D point in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A 2D size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A 2D rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width: size.width,
            height: size.height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Strip along the top edge.
    pub fn top_strip(&self, height: f32) -> Rect {
        Rect::new(self.x, self.y, self.width, height.min(self.height))
    }

    /// Strip along the bottom edge.
    pub fn bottom_strip(&self, height: f32) -> Rect {
        let height = height.min(self.height);
        Rect::new(self.x, self.bottom() - height, self.width, height)
    }

    /// Box anchored to the bottom-right corner.
    pub fn bottom_right_corner(&self, size: Size) -> Rect {
        let width = size.width.min(self.width);
        let height = size.height.min(self.height);
        Rect::new(self.right() - width, self.bottom() - height, width, height)
    }
}
