//! FFT-based periodicity detection (spec §4.D).

use crate::element::{HasData, SeriesElement};
use crate::error::{Result, TimeseriaError};
use crate::series::Series;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Detect the dominant period of a uniform-resolution numeric series,
/// expressed in units of the series' resolution.
///
/// Detrends by subtracting the mean, takes the FFT of the first data
/// label, and returns `round(len / argmax)` over bins whose implied period
/// falls in `[2, len/2]`. Returns `1` when no bin stands out clearly above
/// the noise floor (largest candidate magnitude <= 2x the median).
pub fn detect_periodicity<T>(series: &Series<T>) -> Result<usize>
where
    T: SeriesElement + HasData,
{
    let n = series.len();
    if n < 4 {
        return Err(TimeseriaError::InsufficientData { needed: 4, got: n });
    }
    let label = series
        .data_labels()
        .into_iter()
        .next()
        .ok_or_else(|| TimeseriaError::EmptySeries("series carries no data label".into()))?;

    let values: Vec<f64> = series.iter().map(|e| e.data().get(&label).unwrap_or(0.0)).collect();
    let mean = values.iter().sum::<f64>() / n as f64;

    let mut buffer: Vec<Complex<f64>> = values.iter().map(|v| Complex::new(v - mean, 0.0)).collect();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let half = n / 2;
    let mut best_k: Option<usize> = None;
    let mut best_mag = f64::NEG_INFINITY;
    let mut candidate_mags = Vec::with_capacity(half);

    for k in 1..=half {
        let period = n as f64 / k as f64;
        if period < 2.0 || period > n as f64 / 2.0 {
            continue;
        }
        let mag = buffer[k].norm();
        candidate_mags.push(mag);
        if mag > best_mag {
            best_mag = mag;
            best_k = Some(k);
        }
    }

    let Some(k) = best_k else {
        return Ok(1);
    };
    let median = median_of(&candidate_mags);
    if best_mag <= 2.0 * median {
        return Ok(1);
    }

    Ok(((n as f64 / k as f64).round() as usize).max(1))
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let len = sorted.len();
    if len == 0 {
        return 0.0;
    }
    if len % 2 == 1 {
        sorted[len / 2]
    } else {
        (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{DataTimePoint, TimePoint};
    use crate::payload::DataPayload;
    use chrono_tz::Tz;
    use std::f64::consts::PI;

    #[test]
    fn detects_period_24_from_a_sine_wave() {
        let mut s: Series<DataTimePoint> = Series::new();
        for i in 0..240 {
            let v = (2.0 * PI * i as f64 / 24.0).sin();
            s.append(DataTimePoint::new(
                TimePoint::new(i as f64 * 3600.0, Tz::UTC),
                DataPayload::scalar(v),
            ))
            .unwrap();
        }
        assert_eq!(detect_periodicity(&s).unwrap(), 24);
    }

    #[test]
    fn flat_series_reports_no_periodicity() {
        let mut s: Series<DataTimePoint> = Series::new();
        for i in 0..64 {
            s.append(DataTimePoint::new(
                TimePoint::new(i as f64 * 60.0, Tz::UTC),
                DataPayload::scalar(1.0),
            ))
            .unwrap();
        }
        assert_eq!(detect_periodicity(&s).unwrap(), 1);
    }

    #[test]
    fn too_short_a_series_is_rejected() {
        let mut s: Series<DataTimePoint> = Series::new();
        s.append(DataTimePoint::new(TimePoint::new(0.0, Tz::UTC), DataPayload::scalar(1.0)))
            .unwrap();
        assert_eq!(detect_periodicity(&s).unwrap_err().kind(), "InsufficientDataError");
    }
}
