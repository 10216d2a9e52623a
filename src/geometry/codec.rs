//! Anchor-relative offset codec.
//!
//! Location predictions are offsets relative to a prior in center form:
//! the center shift is scaled by the prior size and `variance.center`, and the
//! log-size delta is scaled by `variance.size`. Decoding yields corner-form
//! boxes index-aligned with the prior set.

use crate::geometry::BBox;
use crate::prior::{PriorBox, PriorSet};
use crate::util::math::{center_to_extent, is_positive_finite};
use crate::util::{DetPostError, DetPostResult};

/// Scale factors applied to center and size offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Variance {
    /// Multiplier for the center offsets (`v0`).
    pub center: f32,
    /// Multiplier for the log-size offsets (`v1`).
    pub size: f32,
}

impl Variance {
    /// Creates a variance pair.
    pub const fn new(center: f32, size: f32) -> Self {
        Self { center, size }
    }

    /// Checks that both scalars are positive and finite.
    pub fn validate(&self) -> DetPostResult<()> {
        if !is_positive_finite(self.center) || !is_positive_finite(self.size) {
            return Err(DetPostError::InvalidConfig {
                reason: "variance values must be positive and finite",
            });
        }
        Ok(())
    }
}

impl Default for Variance {
    fn default() -> Self {
        Self::new(0.1, 0.2)
    }
}

/// Decodes one `[dx, dy, dw, dh]` offset against its prior.
#[inline]
pub fn decode_box(offset: [f32; 4], prior: &PriorBox, variance: Variance) -> BBox {
    let [dx, dy, dw, dh] = offset;
    let cx = prior.cx + dx * variance.center * prior.w;
    let cy = prior.cy + dy * variance.center * prior.h;
    let w = prior.w * (dw * variance.size).exp();
    let h = prior.h * (dh * variance.size).exp();
    let (x_min, x_max) = center_to_extent(cx, w);
    let (y_min, y_max) = center_to_extent(cy, h);
    BBox::new(x_min, y_min, x_max, y_max)
}

/// Encodes a corner-form box as offsets relative to `prior`.
///
/// Inverse of [`decode_box`] for boxes and priors with positive size.
pub fn encode_box(bbox: &BBox, prior: &PriorBox, variance: Variance) -> [f32; 4] {
    let cx = (bbox.x_min + bbox.x_max) * 0.5;
    let cy = (bbox.y_min + bbox.y_max) * 0.5;
    [
        (cx - prior.cx) / (variance.center * prior.w),
        (cy - prior.cy) / (variance.center * prior.h),
        (bbox.width() / prior.w).ln() / variance.size,
        (bbox.height() / prior.h).ln() / variance.size,
    ]
}

/// Decodes flat `[num_priors * 4]` location predictions into boxes.
pub fn decode(loc: &[f32], priors: &PriorSet, variance: Variance) -> DetPostResult<Vec<BBox>> {
    let mut out = Vec::with_capacity(priors.len());
    decode_into(loc, priors, variance, &mut out)?;
    Ok(out)
}

/// Decodes into `out`, reusing its allocation.
///
/// `out` is cleared first; on error it is left empty.
pub fn decode_into(
    loc: &[f32],
    priors: &PriorSet,
    variance: Variance,
    out: &mut Vec<BBox>,
) -> DetPostResult<()> {
    out.clear();
    let expected = priors.len() * 4;
    if loc.len() != expected {
        return Err(DetPostError::ShapeMismatch {
            what: "location predictions",
            expected,
            got: loc.len(),
        });
    }
    variance.validate()?;

    out.reserve(priors.len());
    for (offset, prior) in loc.chunks_exact(4).zip(priors.iter()) {
        let offset = [offset[0], offset[1], offset[2], offset[3]];
        out.push(decode_box(offset, prior, variance));
    }
    Ok(())
}

/// Encodes one box per prior into a flat `[num_priors * 4]` offset buffer.
pub fn encode(boxes: &[BBox], priors: &PriorSet, variance: Variance) -> DetPostResult<Vec<f32>> {
    if boxes.len() != priors.len() {
        return Err(DetPostError::ShapeMismatch {
            what: "encoded boxes",
            expected: priors.len(),
            got: boxes.len(),
        });
    }
    variance.validate()?;

    let mut out = Vec::with_capacity(boxes.len() * 4);
    for (bbox, prior) in boxes.iter().zip(priors.iter()) {
        out.extend_from_slice(&encode_box(bbox, prior, variance));
    }
    Ok(out)
}
