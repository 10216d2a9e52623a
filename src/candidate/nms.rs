//! Greedy IoU non-maximum suppression.

use std::cmp::Ordering;

use crate::geometry::{iou_with_areas, BBox};
use crate::util::{DetPostError, DetPostResult};

fn validate_iou_thresh(iou_thresh: f32) -> DetPostResult<()> {
    if !(0.0..=1.0).contains(&iou_thresh) {
        return Err(DetPostError::InvalidConfig {
            reason: "iou_thresh must lie in [0, 1]",
        });
    }
    Ok(())
}

/// Descending score with ascending index as the tie-break.
///
/// Adding `0.0` folds `-0.0` into `0.0` so equal scores tie under `total_cmp`.
fn score_cmp_desc(scores: &[f32], a: usize, b: usize) -> Ordering {
    (scores[b] + 0.0)
        .total_cmp(&(scores[a] + 0.0))
        .then_with(|| a.cmp(&b))
}

/// Reusable scratch for repeated suppression calls.
#[derive(Debug, Default)]
pub struct Suppressor {
    order: Vec<usize>,
    areas: Vec<f32>,
    suppressed: Vec<bool>,
}

impl Suppressor {
    /// Creates a suppressor with empty scratch buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs NMS and writes kept indices into `keep`, returning their count.
    ///
    /// Indices refer to positions in `boxes`/`scores` and are written in
    /// selection order (descending score, lower index first on ties). A box
    /// is dropped when its IoU with an already kept box exceeds `iou_thresh`.
    pub fn run(
        &mut self,
        boxes: &[BBox],
        scores: &[f32],
        iou_thresh: f32,
        top_k: usize,
        keep: &mut Vec<usize>,
    ) -> DetPostResult<usize> {
        keep.clear();
        if boxes.len() != scores.len() {
            return Err(DetPostError::ShapeMismatch {
                what: "nms scores",
                expected: boxes.len(),
                got: scores.len(),
            });
        }
        validate_iou_thresh(iou_thresh)?;

        let n = boxes.len();
        if n == 0 || top_k == 0 {
            return Ok(0);
        }

        self.areas.clear();
        self.areas.extend(boxes.iter().map(BBox::area));
        self.order.clear();
        self.order.extend(0..n);
        self.order.sort_by(|&a, &b| score_cmp_desc(scores, a, b));
        self.suppressed.clear();
        self.suppressed.resize(n, false);

        for (rank, &i) in self.order.iter().enumerate() {
            if self.suppressed[i] {
                continue;
            }
            keep.push(i);
            if keep.len() == top_k {
                break;
            }

            let area_i = self.areas[i];
            if area_i <= 0.0 {
                continue;
            }
            let box_i = &boxes[i];
            for &j in &self.order[rank + 1..] {
                if self.suppressed[j] {
                    continue;
                }
                if iou_with_areas(box_i, area_i, &boxes[j], self.areas[j]) > iou_thresh {
                    self.suppressed[j] = true;
                }
            }
        }

        Ok(keep.len())
    }
}

/// Runs greedy NMS, returning kept indices in selection order.
///
/// The kept count is the length of the returned vector and never exceeds
/// `top_k` or `boxes.len()`.
pub fn nms(
    boxes: &[BBox],
    scores: &[f32],
    iou_thresh: f32,
    top_k: usize,
) -> DetPostResult<Vec<usize>> {
    let mut keep = Vec::new();
    Suppressor::new().run(boxes, scores, iou_thresh, top_k, &mut keep)?;
    Ok(keep)
}
