//! Dense detection output buffer.
//!
//! Layout is `[batch, num_classes, top_k, 5]` with rows
//! `[score, x_min, y_min, x_max, y_max]`. Unused slots stay zero. A per-cell
//! count records how many leading slots are populated, so rows with a zero
//! score are still distinguishable from empty slots.

use crate::geometry::BBox;
use crate::util::{DetPostError, DetPostResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Scalars per output row.
pub const ROW_LEN: usize = 5;

/// One populated output row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub class: usize,
    pub score: f32,
    pub bbox: BBox,
}

/// Zero-initialised `[batch, num_classes, top_k, 5]` detection tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionOutput {
    data: Vec<f32>,
    counts: Vec<usize>,
    batch: usize,
    num_classes: usize,
    top_k: usize,
}

impl DetectionOutput {
    /// Allocates an all-zero buffer.
    pub fn zeros(batch: usize, num_classes: usize, top_k: usize) -> Self {
        Self {
            data: vec![0.0; batch * num_classes * top_k * ROW_LEN],
            counts: vec![0; batch * num_classes],
            batch,
            num_classes,
            top_k,
        }
    }

    /// Reshapes if needed and zeroes every slot, keeping the allocation.
    pub fn reset(&mut self, batch: usize, num_classes: usize, top_k: usize) {
        self.batch = batch;
        self.num_classes = num_classes;
        self.top_k = top_k;
        self.data.clear();
        self.data.resize(batch * num_classes * top_k * ROW_LEN, 0.0);
        self.counts.clear();
        self.counts.resize(batch * num_classes, 0);
    }

    /// `[batch, num_classes, top_k, 5]`.
    pub fn shape(&self) -> [usize; 4] {
        [self.batch, self.num_classes, self.top_k, ROW_LEN]
    }

    /// Number of images.
    pub fn batch(&self) -> usize {
        self.batch
    }

    /// Number of classes, background included.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Slots per `(image, class)` cell.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Flat row-major data.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the buffer, returning the flat data.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    fn cell_index(&self, image: usize, class: usize) -> DetPostResult<usize> {
        if image >= self.batch {
            return Err(DetPostError::IndexOutOfBounds {
                index: image,
                len: self.batch,
                context: "image",
            });
        }
        if class >= self.num_classes {
            return Err(DetPostError::IndexOutOfBounds {
                index: class,
                len: self.num_classes,
                context: "class",
            });
        }
        Ok(image * self.num_classes + class)
    }

    /// Number of populated slots for `(image, class)`.
    pub fn count(&self, image: usize, class: usize) -> DetPostResult<usize> {
        Ok(self.counts[self.cell_index(image, class)?])
    }

    /// All `top_k` rows of one cell, flattened.
    pub fn cell(&self, image: usize, class: usize) -> DetPostResult<&[f32]> {
        let cell = self.cell_index(image, class)?;
        let len = self.top_k * ROW_LEN;
        Ok(&self.data[cell * len..(cell + 1) * len])
    }

    /// Row `slot` of one cell, populated or not.
    pub fn row(&self, image: usize, class: usize, slot: usize) -> DetPostResult<&[f32]> {
        if slot >= self.top_k {
            return Err(DetPostError::IndexOutOfBounds {
                index: slot,
                len: self.top_k,
                context: "slot",
            });
        }
        let cell = self.cell(image, class)?;
        Ok(&cell[slot * ROW_LEN..(slot + 1) * ROW_LEN])
    }

    /// Populated detections of one image, class by class in slot order.
    pub fn detections(&self, image: usize) -> DetPostResult<Vec<Detection>> {
        let mut out = Vec::new();
        for class in 0..self.num_classes {
            let count = self.count(image, class)?;
            let cell = self.cell(image, class)?;
            for row in cell.chunks_exact(ROW_LEN).take(count) {
                out.push(Detection {
                    class,
                    score: row[0],
                    bbox: BBox::from_array([row[1], row[2], row[3], row[4]]),
                });
            }
        }
        Ok(out)
    }

    /// The `k` best detections of one image across classes.
    ///
    /// Ordered by descending score; ties keep class then slot order.
    pub fn top_detections(&self, image: usize, k: usize) -> DetPostResult<Vec<Detection>> {
        let mut all = self.detections(image)?;
        all.sort_by(|a, b| b.score.total_cmp(&a.score));
        all.truncate(k);
        Ok(all)
    }

    /// Disjoint writable regions, one per image.
    ///
    /// Yields nothing when `top_k` is zero, since there is nothing to write.
    pub(crate) fn image_slots(&mut self) -> impl Iterator<Item = ImageSlot<'_>> {
        let data_len = (self.num_classes * self.top_k * ROW_LEN).max(1);
        let classes = self.num_classes.max(1);
        let top_k = self.top_k;
        self.data
            .chunks_mut(data_len)
            .zip(self.counts.chunks_mut(classes))
            .map(move |(data, counts)| ImageSlot {
                data,
                counts,
                top_k,
            })
    }

    /// Parallel counterpart of [`image_slots`](Self::image_slots).
    #[cfg(feature = "rayon")]
    pub(crate) fn par_image_slots(
        &mut self,
    ) -> impl IndexedParallelIterator<Item = ImageSlot<'_>> {
        let data_len = (self.num_classes * self.top_k * ROW_LEN).max(1);
        let classes = self.num_classes.max(1);
        let top_k = self.top_k;
        self.data
            .par_chunks_mut(data_len)
            .zip(self.counts.par_chunks_mut(classes))
            .map(move |(data, counts)| ImageSlot {
                data,
                counts,
                top_k,
            })
    }
}

/// Writable view of one image's `[num_classes, top_k, 5]` region.
pub(crate) struct ImageSlot<'a> {
    pub(crate) data: &'a mut [f32],
    pub(crate) counts: &'a mut [usize],
    pub(crate) top_k: usize,
}

impl ImageSlot<'_> {
    /// Writes the kept rows of `class` in order.
    pub(crate) fn write_class(
        &mut self,
        class: usize,
        kept: &[usize],
        boxes: &[BBox],
        scores: &[f32],
    ) -> DetPostResult<()> {
        let cell_len = self.top_k * ROW_LEN;
        let start = class * cell_len;
        let cell = self
            .data
            .get_mut(start..start + cell_len)
            .ok_or(DetPostError::IndexOutOfBounds {
                index: class,
                len: self.counts.len(),
                context: "class",
            })?;
        let count = kept.len().min(self.top_k);
        for (row, &idx) in cell.chunks_exact_mut(ROW_LEN).zip(&kept[..count]) {
            let b = boxes[idx];
            row.copy_from_slice(&[scores[idx], b.x_min, b.y_min, b.x_max, b.y_max]);
        }
        self.counts[class] = count;
        Ok(())
    }
}
