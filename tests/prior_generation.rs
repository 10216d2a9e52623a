use detpost::{DetPostError, FeatureMapSpec, PriorConfig, PriorSet};

fn single_map(spec: FeatureMapSpec, clip: bool) -> PriorConfig {
    PriorConfig {
        image_size: 100.0,
        feature_maps: vec![spec],
        clip,
    }
}

#[test]
fn ssd300_layout_has_8732_priors() {
    let cfg = PriorConfig::ssd300();
    assert_eq!(cfg.num_priors(), 8732);
    let priors = PriorSet::generate(&cfg).unwrap();
    assert_eq!(priors.len(), 8732);
    for p in priors.iter() {
        assert!((0.0..=1.0).contains(&p.cx));
        assert!((0.0..=1.0).contains(&p.cy));
        assert!(p.w > 0.0 && p.w <= 1.0);
        assert!(p.h > 0.0 && p.h <= 1.0);
    }
}

#[test]
fn per_cell_order_and_sizes() {
    let cfg = single_map(
        FeatureMapSpec {
            size: 2,
            step: 50.0,
            min_size: 20.0,
            max_size: Some(45.0),
            aspect_ratios: vec![4.0],
        },
        false,
    );
    let priors = PriorSet::generate(&cfg).unwrap();
    assert_eq!(priors.len(), 2 * 2 * 4);

    let cell: Vec<_> = priors.iter().take(4).collect();
    for p in &cell {
        assert!((p.cx - 0.25).abs() < 1e-6);
        assert!((p.cy - 0.25).abs() < 1e-6);
    }
    assert!((cell[0].w - 0.2).abs() < 1e-6 && (cell[0].h - 0.2).abs() < 1e-6);
    // sqrt(20 * 45) = 30
    assert!((cell[1].w - 0.3).abs() < 1e-6 && (cell[1].h - 0.3).abs() < 1e-6);
    assert!((cell[2].w - 0.4).abs() < 1e-6 && (cell[2].h - 0.1).abs() < 1e-6);
    assert!((cell[3].w - 0.1).abs() < 1e-6 && (cell[3].h - 0.4).abs() < 1e-6);

    // Second cell advances along x first.
    let next = priors.get(4).unwrap();
    assert!((next.cx - 0.75).abs() < 1e-6);
    assert!((next.cy - 0.25).abs() < 1e-6);
}

#[test]
fn clip_limits_oversized_priors() {
    let spec = FeatureMapSpec {
        size: 1,
        step: 100.0,
        min_size: 150.0,
        max_size: None,
        aspect_ratios: Vec::new(),
    };
    let unclipped = PriorSet::generate(&single_map(spec.clone(), false)).unwrap();
    assert!((unclipped.get(0).unwrap().w - 1.5).abs() < 1e-6);

    let clipped = PriorSet::generate(&single_map(spec, true)).unwrap();
    assert_eq!(clipped.len(), 1);
    assert_eq!(clipped.get(0).unwrap().w, 1.0);
}

#[test]
fn invalid_specs_are_rejected() {
    let base = FeatureMapSpec {
        size: 3,
        step: 10.0,
        min_size: 10.0,
        max_size: Some(20.0),
        aspect_ratios: vec![2.0],
    };
    let bad = [
        FeatureMapSpec {
            size: 0,
            ..base.clone()
        },
        FeatureMapSpec {
            step: 0.0,
            ..base.clone()
        },
        FeatureMapSpec {
            max_size: Some(5.0),
            ..base.clone()
        },
        FeatureMapSpec {
            aspect_ratios: vec![-1.0],
            ..base.clone()
        },
    ];
    for spec in bad {
        let err = PriorSet::generate(&single_map(spec, true)).err().unwrap();
        assert!(matches!(err, DetPostError::InvalidConfig { .. }));
    }

    let empty = PriorConfig {
        image_size: 300.0,
        feature_maps: Vec::new(),
        clip: true,
    };
    assert!(PriorSet::generate(&empty).is_err());
}
