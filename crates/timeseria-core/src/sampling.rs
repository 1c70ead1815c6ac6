//! Dependency-free primitives shared by the series container, the
//! resampler and the periodic-average model: sampling-interval inference
//! and phase indexing. Kept separate from both `series` and `model` to
//! break the cyclic dependency the source's `source -> model -> utilities
//! -> source` arrangement had (Design Notes §9).

/// Bound on how many leading deltas are scanned for mode inference
/// (spec §4.C step 5).
const MAX_SAMPLES: usize = 10_000;

/// Infer the sampling interval of a sequence of ascending timestamps as
/// the mode of consecutive deltas over a bounded prefix, ignoring deltas
/// more than 10x the median (spec §4.C step 5).
pub fn infer_sampling_interval(ts: &[f64]) -> f64 {
    if ts.len() < 2 {
        return 1.0;
    }
    let bound = ts.len().min(MAX_SAMPLES + 1);
    let mut deltas: Vec<f64> = ts[..bound].windows(2).map(|w| w[1] - w[0]).collect();
    if deltas.is_empty() {
        return 1.0;
    }

    let median = median_of(&deltas);
    if median > 0.0 {
        deltas.retain(|&d| d <= median * 10.0);
    }
    if deltas.is_empty() {
        return median;
    }

    mode_of(&deltas)
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Most frequent value, quantized to a relative tolerance so that
/// floating-point jitter doesn't split one true mode into many bins.
fn mode_of(values: &[f64]) -> f64 {
    use std::collections::HashMap;

    let mut bins: HashMap<i64, (f64, usize)> = HashMap::new();
    for &v in values {
        let key = (v * 1e6).round() as i64;
        let entry = bins.entry(key).or_insert((v, 0));
        entry.1 += 1;
    }
    bins.into_values()
        .max_by_key(|&(_, count)| count)
        .map(|(v, _)| v)
        .unwrap_or(1.0)
}

/// Phase index for periodic-average models (spec §4.E).
///
/// `dst_offset_s` is the DST offset in effect at `t`, or `0` when the
/// model is not DST-aware; callers must refuse `resolution_s > 3600` with
/// a non-zero DST offset upstream (spec's `UnsupportedError`).
pub fn phase_index(t: f64, resolution_s: f64, period: usize, dst_offset_s: f64) -> usize {
    let shifted = t + dst_offset_s;
    let bucket = (shifted / resolution_s).floor() as i64;
    bucket.rem_euclid(period as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_regular_interval() {
        let ts: Vec<f64> = (0..100).map(|i| i as f64 * 60.0).collect();
        assert_eq!(infer_sampling_interval(&ts), 60.0);
    }

    #[test]
    fn ignores_large_outlier_gaps() {
        let mut ts: Vec<f64> = (0..50).map(|i| i as f64 * 60.0).collect();
        // One huge gap shouldn't move the inferred interval away from the mode.
        let last = *ts.last().unwrap();
        ts.push(last + 100_000.0);
        ts.push(last + 100_060.0);
        assert_eq!(infer_sampling_interval(&ts), 60.0);
    }

    #[test]
    fn phase_index_is_always_in_range() {
        for i in 0..1000 {
            let t = i as f64 * 137.0 - 50_000.0;
            let p = phase_index(t, 60.0, 24, 0.0);
            assert!(p < 24);
        }
    }

    #[test]
    fn phase_index_shifts_with_dst_offset() {
        let without_dst = phase_index(3600.0, 60.0, 24, 0.0);
        let with_dst = phase_index(3600.0, 60.0, 24, 3600.0);
        assert_ne!(without_dst, with_dst);
    }
}
