//! Individual pipeline stages for custom post-processing.
//!
//! Most users only need [`Detector`](crate::Detector); these building blocks
//! let callers decode, filter, and suppress on their own data layouts.

pub use crate::candidate::filter::{gather_candidates, select_above, select_above_into};
pub use crate::candidate::nms::{nms, Suppressor};
pub use crate::geometry::codec::{decode, decode_box, decode_into, encode, encode_box};
pub use crate::geometry::iou;
pub use crate::layout::ImagePredictions;
