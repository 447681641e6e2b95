//! Axis-aligned rectangles in screen space.
//!
//! A `Rect` stores its four corners only; `width` and `height` are derived and
//! can never drift from them. Construction normalises inverted corners, and
//! clamping always yields a rectangle of non-negative size.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RectRepr", into = "RectRepr")]
pub struct Rect {
    x: f64,
    y: f64,
    right: f64,
    bottom: f64,
}

#[derive(Serialize, Deserialize)]
struct RectRepr {
    x: f64,
    y: f64,
    right: f64,
    bottom: f64,
    #[serde(default, skip_deserializing)]
    width: f64,
    #[serde(default, skip_deserializing)]
    height: f64,
}

impl From<RectRepr> for Rect {
    fn from(repr: RectRepr) -> Self {
        Self::new(repr.x, repr.y, repr.right, repr.bottom)
    }
}

impl From<Rect> for RectRepr {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            right: rect.right,
            bottom: rect.bottom,
            width: rect.width(),
            height: rect.height(),
        }
    }
}

/// Padding applied around a rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Padding {
    /// Same amount on every side
    Uniform(f64),
    /// Vertical amount for top/bottom, horizontal for left/right
    Axes {
        /// Top and bottom
        vertical: f64,
        /// Left and right
        horizontal: f64,
    },
    /// Individual amount per side
    Sides {
        /// Top side
        top: f64,
        /// Right side
        right: f64,
        /// Bottom side
        bottom: f64,
        /// Left side
        left: f64,
    },
}

impl Padding {
    /// Amounts as `(top, right, bottom, left)`
    #[must_use]
    pub const fn sides(&self) -> (f64, f64, f64, f64) {
        match *self {
            Self::Uniform(v) => (v, v, v, v),
            Self::Axes {
                vertical,
                horizontal,
            } => (vertical, horizontal, vertical, horizontal),
            Self::Sides {
                top,
                right,
                bottom,
                left,
            } => (top, right, bottom, left),
        }
    }
}

/// Translation applied to a rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Offset {
    /// Same shift on both axes
    Uniform(f64),
    /// Per-axis shift
    Xy {
        /// Horizontal shift
        x: f64,
        /// Vertical shift
        y: f64,
    },
}

impl Offset {
    /// Shift as a vector
    #[must_use]
    pub const fn vector(&self) -> Point {
        match *self {
            Self::Uniform(v) => Point::new(v, v),
            Self::Xy { x, y } => Point::new(x, y),
        }
    }
}

impl Rect {
    /// Create a rectangle from its corners (inverted corners are swapped)
    #[must_use]
    pub fn new(x: f64, y: f64, right: f64, bottom: f64) -> Self {
        Self {
            x: x.min(right),
            y: y.min(bottom),
            right: x.max(right),
            bottom: y.max(bottom),
        }
    }

    /// Create a rectangle from origin and size
    #[must_use]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Square of half-size `radius` centred on a point
    #[must_use]
    pub fn around(center: Point, radius: f64) -> Self {
        Self::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        )
    }

    /// Envelope of a point set, `None` when the set is empty
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Self>, p| {
            Some(match acc {
                None => Self::new(p.x, p.y, p.x, p.y),
                Some(r) => Self::new(
                    r.x.min(p.x),
                    r.y.min(p.y),
                    r.right.max(p.x),
                    r.bottom.max(p.y),
                ),
            })
        })
    }

    /// Left edge
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Top edge
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Right edge
    #[must_use]
    pub const fn right(&self) -> f64 {
        self.right
    }

    /// Bottom edge
    #[must_use]
    pub const fn bottom(&self) -> f64 {
        self.bottom
    }

    /// Width (`right - x`)
    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.x
    }

    /// Height (`bottom - y`)
    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.y
    }

    /// Check for a zero-area rectangle
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.x + self.right) / 2.0, (self.y + self.bottom) / 2.0)
    }

    /// Union of two rectangles
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Grow every side by its padding amount
    #[must_use]
    pub fn apply_padding(&self, padding: Padding) -> Self {
        let (top, right, bottom, left) = padding.sides();
        Self::new(
            self.x - left,
            self.y - top,
            self.right + right,
            self.bottom + bottom,
        )
    }

    /// Move the rectangle
    #[must_use]
    pub fn apply_offset(&self, offset: Offset) -> Self {
        let v = offset.vector();
        Self {
            x: self.x + v.x,
            y: self.y + v.y,
            right: self.right + v.x,
            bottom: self.bottom + v.y,
        }
    }

    /// Restrict the rectangle to a container.
    ///
    /// A rectangle lying outside collapses onto the nearest container edge
    /// with zero width or height.
    #[must_use]
    pub fn clamp_to(&self, container: &Self) -> Self {
        let x = self.x.clamp(container.x, container.right);
        let y = self.y.clamp(container.y, container.bottom);
        Self {
            x,
            y,
            right: self.right.clamp(x, container.right),
            bottom: self.bottom.clamp(y, container.bottom),
        }
    }

    /// Round all corners to whole pixels
    #[must_use]
    pub fn round(&self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
            right: self.right.round(),
            bottom: self.bottom.round(),
        }
    }

    /// Check if a point is inside (edges included)
    #[must_use]
    pub fn contains_point(&self, point: &Point) -> bool {
        point.x >= self.x && point.x <= self.right && point.y >= self.y && point.y <= self.bottom
    }

    /// Check if another rectangle lies fully inside this one
    #[must_use]
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    /// Check if the rectangles overlap or touch
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x <= other.right
            && other.x <= self.right
            && self.y <= other.bottom
            && other.y <= self.bottom
    }
}
