//! Error types for detpost.

use thiserror::Error;

/// Result alias for detpost operations.
pub type Result<T> = std::result::Result<T, DetPostError>;

/// Errors reported for malformed inputs or out-of-range configuration.
///
/// Empty results (no anchor above threshold, nothing kept by NMS) are never
/// errors; only contract violations end up here.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DetPostError {
    /// A buffer length does not match the shape implied by the other inputs.
    #[error("shape mismatch for {what}: expected {expected} elements, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// A configuration value is outside its valid range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// An index is outside the valid range of a container.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// A matrix view was requested with a zero dimension.
    #[error("invalid dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
    /// The row stride is smaller than the row length.
    #[error("invalid stride {stride} for {cols} columns")]
    InvalidStride { cols: usize, stride: usize },
    /// The backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
}
