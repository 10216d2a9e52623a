//! Detector configuration.

use crate::geometry::codec::Variance;
use crate::util::{DetPostError, DetPostResult};

/// Construction-time settings for [`Detector`](crate::Detector).
#[derive(Clone, Debug, PartialEq)]
pub struct DetectConfig {
    /// Number of classes including background.
    pub num_classes: usize,
    /// Class index that never produces detections.
    pub background_label: usize,
    /// Anchors must score strictly above this to be considered.
    pub conf_thresh: f32,
    /// Suppression overlap threshold in `[0, 1]`.
    pub iou_thresh: f32,
    /// Maximum detections kept per class per image.
    pub top_k: usize,
    /// Offset scales used when decoding.
    pub variance: Variance,
    /// Process images in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            num_classes: 21,
            background_label: 0,
            conf_thresh: 0.01,
            iou_thresh: 0.45,
            top_k: 200,
            variance: Variance::default(),
            parallel: false,
        }
    }
}

impl DetectConfig {
    /// Checks ranges of every field.
    pub fn validate(&self) -> DetPostResult<()> {
        if self.num_classes < 2 {
            return Err(DetPostError::InvalidConfig {
                reason: "num_classes must be at least 2",
            });
        }
        if self.background_label >= self.num_classes {
            return Err(DetPostError::InvalidConfig {
                reason: "background_label must be below num_classes",
            });
        }
        if self.conf_thresh.is_nan() {
            return Err(DetPostError::InvalidConfig {
                reason: "conf_thresh must not be NaN",
            });
        }
        if !(0.0..=1.0).contains(&self.iou_thresh) {
            return Err(DetPostError::InvalidConfig {
                reason: "iou_thresh must lie in [0, 1]",
            });
        }
        self.variance.validate()
    }
}
