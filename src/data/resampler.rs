// ============================================================
// Layer 4 — Series Resampler
// ============================================================
// Maps a numeric sequence of any length n onto exactly L points
// ("anchor resampling"):
//
//   n = 0   → L zeros
//   n = 1   → L copies of the single value
//   n ≥ 2   → the input is treated as samples at positions
//             0..n-1; L evenly spaced positions are placed over
//             [0, n-1] and each is linearly interpolated from its
//             two nearest neighbours
//
// The target range never leaves the input range, so there is no
// extrapolation and the first and last values are preserved.

/// Resample `values` to exactly `len` points.
pub fn resample(values: &[f64], len: usize) -> Vec<f64> {
    match values {
        [] => vec![0.0; len],
        [only] => vec![*only; len],
        _ => {
            let last = (values.len() - 1) as f64;
            (0..len)
                .map(|i| {
                    let pos = if len == 1 {
                        0.0
                    } else {
                        last * i as f64 / (len - 1) as f64
                    };
                    interpolate(values, pos)
                })
                .collect()
        }
    }
}

/// Linear interpolation at fractional position `pos` in [0, n-1].
fn interpolate(values: &[f64], pos: f64) -> f64 {
    let lo = (pos.floor() as usize).min(values.len() - 1);
    let hi = (lo + 1).min(values.len() - 1);
    let frac = pos - lo as f64;
    if frac <= 0.0 || lo == hi {
        values[lo]
    } else {
        values[lo] + (values[hi] - values[lo]) * frac
    }
}

/// `len` evenly spaced values covering [0, 1].
pub fn unit_ramp(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..len).map(|i| i as f64 / (len - 1) as f64).collect(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_gives_zeros() {
        assert_eq!(resample(&[], 4), vec![0.0; 4]);
    }

    #[test]
    fn test_singleton_gives_constant() {
        assert_eq!(resample(&[3.5], 3), vec![3.5, 3.5, 3.5]);
    }

    #[test]
    fn test_upsample_interpolates() {
        assert_eq!(resample(&[0.0, 10.0], 5), vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn test_downsample_picks_anchors() {
        let out = resample(&[0.0, 1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_zero_target_length() {
        assert!(resample(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_unit_ramp() {
        assert_eq!(unit_ramp(3), vec![0.0, 0.5, 1.0]);
        assert!(unit_ramp(0).is_empty());
    }

    proptest! {
        #[test]
        fn prop_endpoints_preserved(
            values in prop::collection::vec(-1e3f64..1e3, 1..200),
            len in 2usize..300,
        ) {
            let out = resample(&values, len);
            prop_assert_eq!(out.len(), len);
            prop_assert_eq!(out[0], values[0]);
            prop_assert_eq!(out[len - 1], values[values.len() - 1]);
        }

        #[test]
        fn prop_stays_within_input_range(
            values in prop::collection::vec(-1e3f64..1e3, 2..100),
            len in 1usize..200,
        ) {
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            for v in resample(&values, len) {
                prop_assert!(v >= min - 1e-9 && v <= max + 1e-9);
            }
        }
    }
}
