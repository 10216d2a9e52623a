#![cfg(feature = "rayon")]

use detpost::{
    ConfLayout, Counter, DetectConfig, Detector, Predictions, PriorConfig, PriorSet, StageTimings,
    Workspace,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_batch(rng: &mut StdRng, batch: usize, priors: usize, classes: usize) -> (Vec<f32>, Vec<f32>) {
    let loc = (0..batch * priors * 4)
        .map(|_| rng.random_range(-1.5..1.5f32))
        .collect();
    let conf = (0..batch * priors * classes)
        .map(|_| {
            let v: f32 = rng.random_range(0.0..1.0);
            v * v * v
        })
        .collect();
    (loc, conf)
}

#[test]
fn parallel_matches_sequential() {
    let priors = PriorSet::generate(&PriorConfig::ssd300()).unwrap();
    let classes = 6;
    let batch = 5;
    let mut rng = StdRng::seed_from_u64(2024);
    let (loc, conf) = random_batch(&mut rng, batch, priors.len(), classes);

    let base = DetectConfig {
        num_classes: classes,
        conf_thresh: 0.3,
        iou_thresh: 0.45,
        top_k: 50,
        ..DetectConfig::default()
    };
    let seq = Detector::new(
        priors.clone(),
        DetectConfig {
            parallel: false,
            ..base.clone()
        },
    )
    .unwrap();
    let par = Detector::new(
        priors,
        DetectConfig {
            parallel: true,
            ..base
        },
    )
    .unwrap();

    let preds = Predictions::new(&loc, &conf, batch);
    let a = seq.detect(preds).unwrap();
    let b = par.detect(preds).unwrap();
    assert_eq!(a, b);
    assert!((0..batch).any(|i| !a.detections(i).unwrap().is_empty()));
}

#[test]
fn parallel_reuses_workspace_across_batches() {
    let priors = PriorSet::generate(&PriorConfig::ssd300()).unwrap();
    let classes = 3;
    let mut rng = StdRng::seed_from_u64(9);
    let det = Detector::new(
        priors.clone(),
        DetectConfig {
            num_classes: classes,
            conf_thresh: 0.4,
            top_k: 30,
            parallel: true,
            ..DetectConfig::default()
        },
    )
    .unwrap();

    let mut ws = Workspace::new();
    let mut out = det.output_buffer(1);
    for batch in [4, 2, 5] {
        let (loc, conf) = random_batch(&mut rng, batch, priors.len(), classes);
        let preds = Predictions::new(&loc, &conf, batch);
        det.detect_into(preds, &mut ws, &mut out).unwrap();
        assert_eq!(out, det.detect(preds).unwrap());
    }
}

#[test]
fn parallel_class_major_and_instrumentation() {
    let priors = PriorSet::generate(&PriorConfig::ssd300()).unwrap();
    let classes = 4;
    let batch = 3;
    let num_priors = priors.len();
    let mut rng = StdRng::seed_from_u64(77);
    let (loc, conf) = random_batch(&mut rng, batch, num_priors, classes);

    let mut transposed = vec![0.0; conf.len()];
    for img in 0..batch {
        let base = img * num_priors * classes;
        for a in 0..num_priors {
            for c in 0..classes {
                transposed[base + c * num_priors + a] = conf[base + a * classes + c];
            }
        }
    }

    let det = Detector::new(
        priors,
        DetectConfig {
            num_classes: classes,
            conf_thresh: 0.5,
            top_k: 20,
            parallel: true,
            ..DetectConfig::default()
        },
    )
    .unwrap();

    let timings = StageTimings::new();
    let mut ws = Workspace::new();
    let mut out = det.output_buffer(batch);
    det.detect_instrumented(
        Predictions::new(&loc, &transposed, batch).with_layout(ConfLayout::ClassMajor),
        &mut ws,
        &mut out,
        &timings,
    )
    .unwrap();

    let anchor_major = det.detect(Predictions::new(&loc, &conf, batch)).unwrap();
    assert_eq!(out, anchor_major);

    let kept: usize = (0..batch).map(|i| out.detections(i).unwrap().len()).sum();
    assert_eq!(timings.counter(Counter::Kept), kept as u64);
}
