//! detpost turns raw anchor-based detector outputs into ranked detections.
//!
//! The pipeline decodes per-anchor offsets against a fixed prior set,
//! thresholds per-class confidences, runs greedy IoU non-maximum suppression
//! per class, and writes at most `top_k` detections per class into a dense
//! `[batch, num_classes, top_k, 5]` buffer. Parallelism across images is
//! available through the `rayon` feature.

mod candidate;
pub mod detect;
pub mod geometry;
pub mod instrument;
pub mod layout;
pub mod lowlevel;
pub mod prior;
mod trace;
pub mod util;

pub use detect::{Detection, DetectConfig, DetectionOutput, Detector, Workspace};
pub use geometry::codec::Variance;
pub use geometry::{iou, BBox};
pub use instrument::{Counter, Instrument, NoopInstrument, Stage, StageTimings};
pub use layout::{ConfLayout, MatrixView, Predictions};
pub use prior::{FeatureMapSpec, PriorBox, PriorConfig, PriorSet};
pub use util::{DetPostError, DetPostResult};

pub use candidate::filter::select_above;
pub use candidate::nms::nms;
