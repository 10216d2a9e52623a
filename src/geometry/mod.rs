//! Corner-form boxes, overlap measures, and the anchor offset codec.

pub mod codec;

use crate::util::math::overlap_1d;

/// Axis-aligned box in corner form.
///
/// Coordinates are in whatever units the priors use (normalized or pixels).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    /// Creates a box from its corners.
    pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Width, which may be negative for inverted boxes.
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    /// Height, which may be negative for inverted boxes.
    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Area with each side clamped to zero, so inverted boxes report an
    /// empty area.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Returns true when the box has no positive area.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Returns true when every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.x_min.is_finite()
            && self.y_min.is_finite()
            && self.x_max.is_finite()
            && self.y_max.is_finite()
    }

    /// Area of the intersection with `other`, clamped to zero.
    pub fn intersection(&self, other: &BBox) -> f32 {
        let w = overlap_1d(self.x_min, self.x_max, other.x_min, other.x_max);
        let h = overlap_1d(self.y_min, self.y_max, other.y_min, other.y_max);
        w * h
    }

    /// Returns `[x_min, y_min, x_max, y_max]`.
    pub fn to_array(self) -> [f32; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    /// Builds a box from `[x_min, y_min, x_max, y_max]`.
    pub fn from_array(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// Intersection-over-union of two corner-form boxes.
///
/// Degenerate boxes yield `0.0` against everything, including themselves.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    iou_with_areas(a, a.area(), b, b.area())
}

/// IoU with areas supplied by the caller, used by the suppressor's hot loop.
#[inline]
pub(crate) fn iou_with_areas(a: &BBox, area_a: f32, b: &BBox, area_b: f32) -> f32 {
    if area_a <= 0.0 || area_b <= 0.0 {
        return 0.0;
    }
    let inter = a.intersection(b);
    if inter <= 0.0 {
        return 0.0;
    }
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}
