//! Scalar helpers shared by box geometry and prior generation.

/// Returns true when `value` is finite and strictly positive.
pub(crate) fn is_positive_finite(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Clamps a coordinate to the unit interval `[0, 1]`.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Converts a 1D center/size pair into `(min, max)` extents.
pub(crate) fn center_to_extent(center: f32, size: f32) -> (f32, f32) {
    let half = size * 0.5;
    (center - half, center + half)
}

/// Length of the overlap of `[a0, a1]` and `[b0, b1]`, clamped to zero.
pub(crate) fn overlap_1d(a0: f32, a1: f32, b0: f32, b1: f32) -> f32 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::{center_to_extent, clamp_unit, is_positive_finite, overlap_1d};

    #[test]
    fn positive_finite_rejects_zero_nan_and_inf() {
        assert!(is_positive_finite(0.1));
        assert!(!is_positive_finite(0.0));
        assert!(!is_positive_finite(-1.0));
        assert!(!is_positive_finite(f32::NAN));
        assert!(!is_positive_finite(f32::INFINITY));
    }

    #[test]
    fn clamp_unit_limits_range() {
        assert_eq!(clamp_unit(-0.25), 0.0);
        assert_eq!(clamp_unit(0.5), 0.5);
        assert_eq!(clamp_unit(1.5), 1.0);
    }

    #[test]
    fn center_to_extent_is_symmetric() {
        let (lo, hi) = center_to_extent(0.5, 0.2);
        assert!((lo - 0.4).abs() < 1e-6);
        assert!((hi - 0.6).abs() < 1e-6);
    }

    #[test]
    fn overlap_is_zero_for_disjoint_ranges() {
        assert_eq!(overlap_1d(0.0, 1.0, 2.0, 3.0), 0.0);
        assert!((overlap_1d(0.0, 2.0, 1.0, 3.0) - 1.0).abs() < 1e-6);
    }
}
