//! Candidate selection and pruning.
//!
//! Includes the per-class confidence filter and greedy IoU suppression.

pub(crate) mod filter;
pub(crate) mod nms;
