//! Borrowed views over flat prediction tensors.
//!
//! `MatrixView` is a row-major 2D view into a 1D buffer with an explicit
//! stride (elements between row starts). `Predictions` wraps the batch-level
//! location and confidence buffers and hands out per-image views.

use crate::util::{DetPostError, DetPostResult};

/// Borrowed row-major 2D view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct MatrixView<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    stride: usize,
}

impl<'a, T: Copy> MatrixView<'a, T> {
    /// Creates a contiguous view with `stride == cols`.
    pub fn from_slice(data: &'a [T], rows: usize, cols: usize) -> DetPostResult<Self> {
        Self::new(data, rows, cols, cols)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], rows: usize, cols: usize, stride: usize) -> DetPostResult<Self> {
        let needed = required_len(rows, cols, stride)?;
        if data.len() < needed {
            return Err(DetPostError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            rows,
            cols,
            stride,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Elements between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(row, col)` if it is within bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let idx = row.checked_mul(self.stride)?.checked_add(col)?;
        self.data.get(idx).copied()
    }

    /// Returns row `row` as a contiguous slice of length `cols`.
    pub fn row(&self, row: usize) -> Option<&'a [T]> {
        if row >= self.rows {
            return None;
        }
        let start = row.checked_mul(self.stride)?;
        let end = start.checked_add(self.cols)?;
        self.data.get(start..end)
    }

    /// Copies column `col` into `out`, replacing its contents.
    pub fn column_into(&self, col: usize, out: &mut Vec<T>) -> DetPostResult<()> {
        if col >= self.cols {
            return Err(DetPostError::IndexOutOfBounds {
                index: col,
                len: self.cols,
                context: "column",
            });
        }
        out.clear();
        out.extend(
            self.data
                .iter()
                .skip(col)
                .step_by(self.stride)
                .take(self.rows)
                .copied(),
        );
        Ok(())
    }
}

fn required_len(rows: usize, cols: usize, stride: usize) -> DetPostResult<usize> {
    if rows == 0 || cols == 0 {
        return Err(DetPostError::InvalidDimensions { rows, cols });
    }
    if stride < cols {
        return Err(DetPostError::InvalidStride { cols, stride });
    }
    (rows - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(cols))
        .ok_or(DetPostError::InvalidDimensions { rows, cols })
}

/// Memory order of the per-image confidence tensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfLayout {
    /// `[num_anchors, num_classes]`, as a detection head emits it.
    #[default]
    AnchorMajor,
    /// `[num_classes, num_anchors]`, already transposed.
    ClassMajor,
}

impl ConfLayout {
    /// Per-image `[rows, cols]` of the confidence tensor in this layout.
    pub fn conf_dims(self, num_anchors: usize, num_classes: usize) -> [usize; 2] {
        match self {
            ConfLayout::AnchorMajor => [num_anchors, num_classes],
            ConfLayout::ClassMajor => [num_classes, num_anchors],
        }
    }
}

/// Batch of raw network outputs.
#[derive(Copy, Clone, Debug)]
pub struct Predictions<'a> {
    /// `[batch, num_anchors, 4]` offsets.
    pub loc: &'a [f32],
    /// `[batch, num_anchors, num_classes]` or `[batch, num_classes, num_anchors]`.
    pub conf: &'a [f32],
    pub batch: usize,
    pub layout: ConfLayout,
}

impl<'a> Predictions<'a> {
    /// Wraps anchor-major buffers.
    pub fn new(loc: &'a [f32], conf: &'a [f32], batch: usize) -> Self {
        Self {
            loc,
            conf,
            batch,
            layout: ConfLayout::AnchorMajor,
        }
    }

    /// Overrides the confidence layout.
    pub fn with_layout(mut self, layout: ConfLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Checks both buffer lengths against the expected shape.
    pub fn validate(&self, num_anchors: usize, num_classes: usize) -> DetPostResult<()> {
        let loc_expected = self.batch * num_anchors * 4;
        if self.loc.len() != loc_expected {
            return Err(DetPostError::ShapeMismatch {
                what: "location predictions",
                expected: loc_expected,
                got: self.loc.len(),
            });
        }
        let conf_expected = self.batch * num_anchors * num_classes;
        if self.conf.len() != conf_expected {
            return Err(DetPostError::ShapeMismatch {
                what: "confidence predictions",
                expected: conf_expected,
                got: self.conf.len(),
            });
        }
        Ok(())
    }

    /// Returns the location and confidence views for image `index`.
    pub fn image(
        &self,
        index: usize,
        num_anchors: usize,
        num_classes: usize,
    ) -> DetPostResult<ImagePredictions<'a>> {
        if index >= self.batch {
            return Err(DetPostError::IndexOutOfBounds {
                index,
                len: self.batch,
                context: "image",
            });
        }
        let loc_len = num_anchors * 4;
        let conf_len = num_anchors * num_classes;
        let loc = self
            .loc
            .get(index * loc_len..(index + 1) * loc_len)
            .ok_or(DetPostError::BufferTooSmall {
                needed: (index + 1) * loc_len,
                got: self.loc.len(),
            })?;
        let conf = self
            .conf
            .get(index * conf_len..(index + 1) * conf_len)
            .ok_or(DetPostError::BufferTooSmall {
                needed: (index + 1) * conf_len,
                got: self.conf.len(),
            })?;
        let [rows, cols] = self.layout.conf_dims(num_anchors, num_classes);
        let conf = MatrixView::from_slice(conf, rows, cols)?;
        Ok(ImagePredictions {
            loc,
            conf,
            layout: self.layout,
        })
    }
}

/// Location and confidence data for a single image.
#[derive(Copy, Clone, Debug)]
pub struct ImagePredictions<'a> {
    /// `[num_anchors * 4]` offsets.
    pub loc: &'a [f32],
    pub conf: MatrixView<'a, f32>,
    pub layout: ConfLayout,
}

impl<'a> ImagePredictions<'a> {
    /// Returns the scores of `class` across all anchors.
    ///
    /// Class-major data is borrowed directly; anchor-major data is gathered
    /// into `scratch`.
    pub fn class_scores<'s>(
        &self,
        class: usize,
        scratch: &'s mut Vec<f32>,
    ) -> DetPostResult<&'s [f32]>
    where
        'a: 's,
    {
        match self.layout {
            ConfLayout::ClassMajor => self.conf.row(class).ok_or(DetPostError::IndexOutOfBounds {
                index: class,
                len: self.conf.rows(),
                context: "class",
            }),
            ConfLayout::AnchorMajor => {
                self.conf.column_into(class, scratch)?;
                Ok(scratch.as_slice())
            }
        }
    }
}
