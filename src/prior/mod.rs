//! Prior (anchor) boxes shared by every image in a batch.
//!
//! A `PriorSet` is built once and borrowed by decoding; it never changes
//! afterwards, so parallel workers read it without synchronization.

mod generate;

pub use generate::{FeatureMapSpec, PriorConfig};

use crate::util::{DetPostError, DetPostResult};

/// Reference box in center form.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PriorBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl PriorBox {
    /// Creates a prior from center and size.
    pub const fn new(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self { cx, cy, w, h }
    }

    fn is_finite(&self) -> bool {
        self.cx.is_finite() && self.cy.is_finite() && self.w.is_finite() && self.h.is_finite()
    }
}

/// Immutable, non-empty collection of priors.
#[derive(Clone, Debug, PartialEq)]
pub struct PriorSet {
    boxes: Vec<PriorBox>,
}

impl PriorSet {
    /// Builds a set from owned priors.
    pub fn new(boxes: Vec<PriorBox>) -> DetPostResult<Self> {
        if boxes.is_empty() {
            return Err(DetPostError::InvalidConfig {
                reason: "prior set must not be empty",
            });
        }
        if boxes.iter().any(|b| !b.is_finite()) {
            return Err(DetPostError::InvalidConfig {
                reason: "prior coordinates must be finite",
            });
        }
        Ok(Self { boxes })
    }

    /// Builds a set from a flat `[num_priors * 4]` buffer of `(cx, cy, w, h)`.
    pub fn from_flat(data: &[f32]) -> DetPostResult<Self> {
        if data.len() % 4 != 0 {
            return Err(DetPostError::ShapeMismatch {
                what: "prior buffer",
                expected: data.len() / 4 * 4,
                got: data.len(),
            });
        }
        let boxes = data
            .chunks_exact(4)
            .map(|c| PriorBox::new(c[0], c[1], c[2], c[3]))
            .collect();
        Self::new(boxes)
    }

    /// Generates SSD-style priors from feature map specs.
    pub fn generate(cfg: &PriorConfig) -> DetPostResult<Self> {
        Self::new(generate::generate_priors(cfg)?)
    }

    /// Number of priors.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PriorBox> {
        self.boxes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriorBox> {
        self.boxes.iter()
    }

    pub fn as_slice(&self) -> &[PriorBox] {
        &self.boxes
    }

    /// Flattens to `[num_priors * 4]` in `(cx, cy, w, h)` order.
    pub fn to_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.boxes.len() * 4);
        for b in &self.boxes {
            out.extend_from_slice(&[b.cx, b.cy, b.w, b.h]);
        }
        out
    }
}
