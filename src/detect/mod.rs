//! Decode → threshold → NMS → top-k detection pipeline.
//!
//! A [`Detector`] pairs an immutable [`DetectConfig`] with the prior set it
//! decodes against. Each image is decoded once; every non-background class is
//! then filtered, suppressed, and written into its own `[image][class]` cell of
//! a [`DetectionOutput`]. Images never share mutable state, which is what the
//! `rayon` path relies on.

mod config;
mod output;
#[cfg(feature = "rayon")]
mod rayon;
mod workspace;

pub use config::DetectConfig;
pub use output::{Detection, DetectionOutput, ROW_LEN};
pub use workspace::Workspace;

use crate::candidate::filter::{gather_candidates, select_above_into};
use crate::geometry::codec::decode_into;
use crate::instrument::{timed, Counter, Instrument, NoopInstrument, Stage};
use crate::layout::{ConfLayout, ImagePredictions, Predictions};
use crate::prior::PriorSet;
use crate::trace::{trace_event, trace_span};
use crate::util::DetPostResult;
use output::ImageSlot;

/// Detection post-processor bound to one prior set.
#[derive(Clone, Debug)]
pub struct Detector {
    priors: PriorSet,
    cfg: DetectConfig,
}

impl Detector {
    /// Validates `cfg` and binds it to `priors`.
    pub fn new(priors: PriorSet, cfg: DetectConfig) -> DetPostResult<Self> {
        cfg.validate()?;
        Ok(Self { priors, cfg })
    }

    /// Returns the validated configuration.
    pub fn config(&self) -> &DetectConfig {
        &self.cfg
    }

    /// Returns the prior set shared by every image.
    pub fn priors(&self) -> &PriorSet {
        &self.priors
    }

    /// Per-image `[num_priors, 4]` shape of the location tensor.
    pub fn loc_dims(&self) -> [usize; 2] {
        [self.priors.len(), 4]
    }

    /// Per-image shape of the confidence tensor in `layout`.
    pub fn conf_dims(&self, layout: ConfLayout) -> [usize; 2] {
        layout.conf_dims(self.priors.len(), self.cfg.num_classes)
    }

    /// Allocates an output buffer shaped for `batch` images.
    pub fn output_buffer(&self, batch: usize) -> DetectionOutput {
        DetectionOutput::zeros(batch, self.cfg.num_classes, self.cfg.top_k)
    }

    /// Runs the pipeline into a freshly allocated output.
    pub fn detect(&self, preds: Predictions<'_>) -> DetPostResult<DetectionOutput> {
        let mut out = self.output_buffer(preds.batch);
        let mut ws = Workspace::with_capacity(self.priors.len());
        self.detect_into(preds, &mut ws, &mut out)?;
        Ok(out)
    }

    /// Runs the pipeline reusing caller-owned scratch and output storage.
    ///
    /// `out` is reshaped and zeroed before anything is written. The parallel
    /// path keeps one nested workspace per image inside `ws`, so repeated
    /// batches reuse those buffers as well.
    pub fn detect_into(
        &self,
        preds: Predictions<'_>,
        ws: &mut Workspace,
        out: &mut DetectionOutput,
    ) -> DetPostResult<()> {
        self.detect_instrumented(preds, ws, out, &NoopInstrument)
    }

    /// Same as [`detect_into`](Self::detect_into), reporting stage timings and
    /// counters to `inst`.
    pub fn detect_instrumented<I>(
        &self,
        preds: Predictions<'_>,
        ws: &mut Workspace,
        out: &mut DetectionOutput,
        inst: &I,
    ) -> DetPostResult<()>
    where
        I: Instrument + ?Sized,
    {
        let num_priors = self.priors.len();
        let num_classes = self.cfg.num_classes;
        preds.validate(num_priors, num_classes)?;
        out.reset(preds.batch, num_classes, self.cfg.top_k);

        let _span = trace_span!(
            "detect",
            batch = preds.batch,
            priors = num_priors,
            classes = num_classes,
            parallel = self.cfg.parallel
        )
        .entered();

        #[cfg(feature = "rayon")]
        if self.cfg.parallel {
            return rayon::detect_batch_par(self, preds, ws, out, inst);
        }

        for (index, mut slot) in out.image_slots().enumerate() {
            let image = preds.image(index, num_priors, num_classes)?;
            let kept = detect_image(&self.cfg, &self.priors, image, ws, &mut slot, inst)?;
            trace_event!("image_detections", image = index, kept = kept);
        }
        Ok(())
    }
}

/// Processes one image, returning the number of detections written.
pub(crate) fn detect_image<I>(
    cfg: &DetectConfig,
    priors: &PriorSet,
    image: ImagePredictions<'_>,
    ws: &mut Workspace,
    slot: &mut ImageSlot<'_>,
    inst: &I,
) -> DetPostResult<usize>
where
    I: Instrument + ?Sized,
{
    let Workspace {
        decoded,
        column,
        selected,
        boxes,
        scores,
        keep,
        suppressor,
        ..
    } = ws;

    {
        let _span = trace_span!("decode", priors = priors.len()).entered();
        timed(inst, Stage::Decode, || {
            decode_into(image.loc, priors, cfg.variance, decoded)
        })?;
    }

    let mut total = 0;
    for class in 0..cfg.num_classes {
        if class == cfg.background_label {
            continue;
        }

        timed(inst, Stage::Filter, || -> DetPostResult<()> {
            let class_scores = image.class_scores(class, column)?;
            select_above_into(class_scores, cfg.conf_thresh, selected);
            gather_candidates(selected, decoded, class_scores, boxes, scores)
        })?;
        if selected.is_empty() {
            continue;
        }
        inst.count(Counter::Candidates, selected.len());
        let _span = trace_span!("class_nms", class = class, candidates = selected.len()).entered();

        let count = timed(inst, Stage::Suppress, || {
            suppressor.run(boxes, scores, cfg.iou_thresh, cfg.top_k, keep)
        })?;
        timed(inst, Stage::Write, || {
            slot.write_class(class, keep, boxes, scores)
        })?;
        inst.count(Counter::Kept, count);
        total += count;
    }
    Ok(total)
}
