use detpost::lowlevel::{decode, decode_into, encode};
use detpost::{BBox, DetPostError, PriorBox, PriorSet, Variance};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn assert_box_close(actual: &BBox, expected: [f32; 4], tol: f32) {
    for (a, e) in actual.to_array().iter().zip(expected.iter()) {
        assert!((a - e).abs() <= tol, "{actual:?} vs {expected:?}");
    }
}

#[test]
fn zero_offsets_decode_to_prior_corners() {
    let priors = PriorSet::new(vec![PriorBox::new(0.5, 0.5, 0.2, 0.2)]).unwrap();
    let boxes = decode(&[0.0; 4], &priors, Variance::new(0.1, 0.2)).unwrap();
    assert_eq!(boxes.len(), 1);
    assert_box_close(&boxes[0], [0.4, 0.4, 0.6, 0.6], 1e-6);
}

#[test]
fn offsets_shift_and_scale_prior() {
    let priors = PriorSet::new(vec![PriorBox::new(0.5, 0.5, 0.2, 0.4)]).unwrap();
    // center moves by 1.0 * 0.1 * size, size scales by exp(ln(2) / 0.2 * 0.2)
    let ln2 = std::f32::consts::LN_2;
    let loc = [1.0, -1.0, ln2 / 0.2, 0.0];
    let boxes = decode(&loc, &priors, Variance::new(0.1, 0.2)).unwrap();
    // cx = 0.52, w = 0.4; cy = 0.46, h = 0.4
    assert_box_close(&boxes[0], [0.32, 0.26, 0.72, 0.66], 1e-5);
}

#[test]
fn decode_preserves_prior_order() {
    let priors = PriorSet::new(vec![
        PriorBox::new(0.1, 0.1, 0.1, 0.1),
        PriorBox::new(0.9, 0.9, 0.1, 0.1),
        PriorBox::new(0.5, 0.2, 0.3, 0.1),
    ])
    .unwrap();
    let boxes = decode(&[0.0; 12], &priors, Variance::default()).unwrap();
    for (b, p) in boxes.iter().zip(priors.iter()) {
        let cx = (b.x_min + b.x_max) * 0.5;
        let cy = (b.y_min + b.y_max) * 0.5;
        assert!((cx - p.cx).abs() < 1e-6);
        assert!((cy - p.cy).abs() < 1e-6);
    }
}

#[test]
fn decode_rejects_length_mismatch() {
    let priors = PriorSet::new(vec![PriorBox::new(0.5, 0.5, 0.2, 0.2); 2]).unwrap();
    let err = decode(&[0.0; 4], &priors, Variance::default()).err().unwrap();
    assert_eq!(
        err,
        DetPostError::ShapeMismatch {
            what: "location predictions",
            expected: 8,
            got: 4,
        }
    );

    let mut out = vec![BBox::default(); 3];
    assert!(decode_into(&[0.0; 5], &priors, Variance::default(), &mut out).is_err());
    assert!(out.is_empty());
}

#[test]
fn decode_rejects_invalid_variance() {
    let priors = PriorSet::new(vec![PriorBox::new(0.5, 0.5, 0.2, 0.2)]).unwrap();
    let err = decode(&[0.0; 4], &priors, Variance::new(-0.1, 0.2)).err().unwrap();
    assert!(matches!(err, DetPostError::InvalidConfig { .. }));
}

#[test]
fn random_offsets_round_trip_and_stay_finite() {
    let mut rng = StdRng::seed_from_u64(7);
    let n = 256;
    let priors: Vec<PriorBox> = (0..n)
        .map(|_| {
            PriorBox::new(
                rng.random_range(0.0..1.0),
                rng.random_range(0.0..1.0),
                rng.random_range(0.01..0.9),
                rng.random_range(0.01..0.9),
            )
        })
        .collect();
    let priors = PriorSet::new(priors).unwrap();
    let loc: Vec<f32> = (0..n * 4).map(|_| rng.random_range(-2.0..2.0)).collect();

    let var = Variance::default();
    let boxes = decode(&loc, &priors, var).unwrap();
    assert!(boxes.iter().all(BBox::is_finite));
    assert!(boxes.iter().all(|b| b.width() > 0.0 && b.height() > 0.0));

    let back = encode(&boxes, &priors, var).unwrap();
    for (a, e) in back.iter().zip(loc.iter()) {
        assert!((a - e).abs() < 1e-3, "{a} vs {e}");
    }
}
