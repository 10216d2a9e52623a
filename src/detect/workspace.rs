//! Reusable scratch buffers for the detection pipeline.

use crate::candidate::nms::Suppressor;
use crate::geometry::BBox;

/// Per-worker scratch storage.
///
/// Holding one `Workspace` across calls keeps the pipeline allocation-free
/// once the buffers have grown to the working size. Sequential detection uses
/// the top-level buffers; parallel detection keeps one nested workspace per
/// image in `images`, grown to the largest batch seen.
#[derive(Debug, Default)]
pub struct Workspace {
    pub(crate) decoded: Vec<BBox>,
    pub(crate) column: Vec<f32>,
    pub(crate) selected: Vec<usize>,
    pub(crate) boxes: Vec<BBox>,
    pub(crate) scores: Vec<f32>,
    pub(crate) keep: Vec<usize>,
    pub(crate) suppressor: Suppressor,
    #[cfg(feature = "rayon")]
    pub(crate) images: Vec<Workspace>,
}

impl Workspace {
    /// Creates an empty workspace; buffers grow on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes the buffers for `num_priors` anchors.
    pub fn with_capacity(num_priors: usize) -> Self {
        Self {
            decoded: Vec::with_capacity(num_priors),
            column: Vec::with_capacity(num_priors),
            selected: Vec::with_capacity(num_priors),
            boxes: Vec::with_capacity(num_priors),
            scores: Vec::with_capacity(num_priors),
            keep: Vec::new(),
            suppressor: Suppressor::new(),
            #[cfg(feature = "rayon")]
            images: Vec::new(),
        }
    }
}
