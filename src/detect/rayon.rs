//! Image-parallel detection (feature-gated).
//!
//! Each worker owns a disjoint `[image]` region of the output and the nested
//! [`Workspace`] pooled for that image; the prior set and predictions are
//! shared read-only.

use crate::detect::{detect_image, DetectionOutput, Detector, Workspace};
use crate::instrument::Instrument;
use crate::layout::Predictions;
use crate::trace::trace_event;
use crate::util::DetPostResult;
use rayon::prelude::*;

pub(crate) fn detect_batch_par<I>(
    det: &Detector,
    preds: Predictions<'_>,
    ws: &mut Workspace,
    out: &mut DetectionOutput,
    inst: &I,
) -> DetPostResult<()>
where
    I: Instrument + ?Sized,
{
    let cfg = det.config();
    let priors = det.priors();
    let num_priors = priors.len();
    let num_classes = cfg.num_classes;

    if ws.images.len() < preds.batch {
        ws.images
            .resize_with(preds.batch, || Workspace::with_capacity(num_priors));
    }

    out.par_image_slots()
        .zip(ws.images.par_iter_mut())
        .enumerate()
        .try_for_each(|(index, (mut slot, image_ws))| {
            let image = preds.image(index, num_priors, num_classes)?;
            let kept = detect_image(cfg, priors, image, image_ws, &mut slot, inst)?;
            trace_event!("image_detections", image = index, kept = kept);
            Ok(())
        })
}
