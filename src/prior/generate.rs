//! SSD-style default box generation.
//!
//! Every feature map cell receives, in order: a square box of `min_size`, a
//! square box of `sqrt(min_size * max_size)` when a max size is configured,
//! then a landscape/portrait pair for each extra aspect ratio. Cells are
//! visited row-major and maps in the order given.

use crate::prior::PriorBox;
use crate::util::math::{clamp_unit, is_positive_finite};
use crate::util::{DetPostError, DetPostResult};

/// One square feature map of the detection head.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMapSpec {
    /// Cells per side.
    pub size: usize,
    /// Input pixels per cell.
    pub step: f32,
    /// Smallest box side in input pixels.
    pub min_size: f32,
    /// Optional larger box side; adds a `sqrt(min * max)` square.
    pub max_size: Option<f32>,
    /// Extra aspect ratios (`1.0` is implicit).
    pub aspect_ratios: Vec<f32>,
}

impl FeatureMapSpec {
    /// Priors emitted per cell of this map.
    pub fn priors_per_cell(&self) -> usize {
        1 + usize::from(self.max_size.is_some()) + 2 * self.aspect_ratios.len()
    }

    fn validate(&self) -> DetPostResult<()> {
        if self.size == 0 {
            return Err(DetPostError::InvalidConfig {
                reason: "feature map size must be at least 1",
            });
        }
        if !is_positive_finite(self.step) {
            return Err(DetPostError::InvalidConfig {
                reason: "feature map step must be positive",
            });
        }
        if !is_positive_finite(self.min_size) {
            return Err(DetPostError::InvalidConfig {
                reason: "min_size must be positive",
            });
        }
        if let Some(max) = self.max_size {
            if !max.is_finite() || max < self.min_size {
                return Err(DetPostError::InvalidConfig {
                    reason: "max_size must be finite and not below min_size",
                });
            }
        }
        if self.aspect_ratios.iter().any(|&ar| !is_positive_finite(ar)) {
            return Err(DetPostError::InvalidConfig {
                reason: "aspect ratios must be positive",
            });
        }
        Ok(())
    }
}

/// Prior generation parameters for a square input.
#[derive(Clone, Debug, PartialEq)]
pub struct PriorConfig {
    /// Input side length in pixels.
    pub image_size: f32,
    pub feature_maps: Vec<FeatureMapSpec>,
    /// Clamp every coordinate to `[0, 1]`.
    pub clip: bool,
}

impl PriorConfig {
    /// The classic SSD300 layout (8732 priors).
    pub fn ssd300() -> Self {
        let maps = [
            (38, 8.0, 30.0, 60.0, vec![2.0]),
            (19, 16.0, 60.0, 111.0, vec![2.0, 3.0]),
            (10, 32.0, 111.0, 162.0, vec![2.0, 3.0]),
            (5, 64.0, 162.0, 213.0, vec![2.0, 3.0]),
            (3, 100.0, 213.0, 264.0, vec![2.0]),
            (1, 300.0, 264.0, 315.0, vec![2.0]),
        ];
        Self {
            image_size: 300.0,
            feature_maps: maps
                .into_iter()
                .map(|(size, step, min_size, max_size, aspect_ratios)| FeatureMapSpec {
                    size,
                    step,
                    min_size,
                    max_size: Some(max_size),
                    aspect_ratios,
                })
                .collect(),
            clip: true,
        }
    }

    /// Total number of priors this config produces.
    pub fn num_priors(&self) -> usize {
        self.feature_maps
            .iter()
            .map(|m| m.size * m.size * m.priors_per_cell())
            .sum()
    }

    /// Checks image size and every feature map.
    pub fn validate(&self) -> DetPostResult<()> {
        if !is_positive_finite(self.image_size) {
            return Err(DetPostError::InvalidConfig {
                reason: "image_size must be positive",
            });
        }
        if self.feature_maps.is_empty() {
            return Err(DetPostError::InvalidConfig {
                reason: "at least one feature map is required",
            });
        }
        self.feature_maps.iter().try_for_each(FeatureMapSpec::validate)
    }
}

pub(crate) fn generate_priors(cfg: &PriorConfig) -> DetPostResult<Vec<PriorBox>> {
    cfg.validate()?;

    let inv = 1.0 / cfg.image_size;
    let mut out = Vec::with_capacity(cfg.num_priors());
    for map in &cfg.feature_maps {
        let step = map.step * inv;
        let s_min = map.min_size * inv;
        let s_max = map.max_size.map(|max| (map.min_size * max).sqrt() * inv);
        for i in 0..map.size {
            let cy = (i as f32 + 0.5) * step;
            for j in 0..map.size {
                let cx = (j as f32 + 0.5) * step;
                out.push(PriorBox::new(cx, cy, s_min, s_min));
                if let Some(s) = s_max {
                    out.push(PriorBox::new(cx, cy, s, s));
                }
                for &ar in &map.aspect_ratios {
                    let r = ar.sqrt();
                    out.push(PriorBox::new(cx, cy, s_min * r, s_min / r));
                    out.push(PriorBox::new(cx, cy, s_min / r, s_min * r));
                }
            }
        }
    }

    if cfg.clip {
        for p in &mut out {
            p.cx = clamp_unit(p.cx);
            p.cy = clamp_unit(p.cy);
            p.w = clamp_unit(p.w);
            p.h = clamp_unit(p.h);
        }
    }
    Ok(out)
}
