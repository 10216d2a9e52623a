//! Confidence threshold filter.

use crate::geometry::BBox;
use crate::util::{DetPostError, DetPostResult};

/// Returns the indices `i` with `scores[i] > conf_thresh`, ascending.
///
/// NaN scores never pass.
pub fn select_above(scores: &[f32], conf_thresh: f32) -> Vec<usize> {
    let mut out = Vec::new();
    select_above_into(scores, conf_thresh, &mut out);
    out
}

/// Same as [`select_above`], writing into a reusable buffer.
pub fn select_above_into(scores: &[f32], conf_thresh: f32, out: &mut Vec<usize>) {
    out.clear();
    out.extend(
        scores
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s > conf_thresh)
            .map(|(i, _)| i),
    );
}

/// Gathers the boxes and scores at `indices`, keeping them aligned.
pub fn gather_candidates(
    indices: &[usize],
    boxes: &[BBox],
    scores: &[f32],
    out_boxes: &mut Vec<BBox>,
    out_scores: &mut Vec<f32>,
) -> DetPostResult<()> {
    if boxes.len() != scores.len() {
        return Err(DetPostError::ShapeMismatch {
            what: "class scores",
            expected: boxes.len(),
            got: scores.len(),
        });
    }
    out_boxes.clear();
    out_scores.clear();
    for &idx in indices {
        let (bbox, score) = boxes
            .get(idx)
            .zip(scores.get(idx))
            .ok_or(DetPostError::IndexOutOfBounds {
                index: idx,
                len: boxes.len(),
                context: "anchor",
            })?;
        out_boxes.push(*bbox);
        out_scores.push(*score);
    }
    Ok(())
}
