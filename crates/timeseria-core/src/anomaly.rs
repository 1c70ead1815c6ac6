//! Residual-based anomaly detection on top of a fitted forecaster
//! (spec §4.G).

use crate::element::DataTimePoint;
use crate::error::{Result, TimeseriaError};
use crate::model::PeriodicAverageModel;
use crate::series::Series;
use statrs::distribution::{Continuous, Normal};
use statrs::statistics::Statistics;

/// Options for `detect_anomalies`/`AnomalyDetector::apply`.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyOptions {
    /// Multiplier on the fitted residual stdev defining the anomaly
    /// threshold (spec §4.G step 3).
    pub k: f64,
    /// When true, each element's data gains `<label>_predicted` and
    /// `<label>_ae` entries.
    pub details: bool,
}

impl Default for AnomalyOptions {
    fn default() -> Self {
        Self { k: 3.0, details: false }
    }
}

/// A one-step-ahead residual anomaly detector wrapping a fitted forecaster.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    forecaster: PeriodicAverageModel,
    mean: f64,
    stdev: f64,
    threshold: f64,
}

impl AnomalyDetector {
    /// Compute one-step residuals over `series` using `forecaster`'s
    /// window, fit a Normal distribution to them, and derive the anomaly
    /// threshold `T = stdev * k`.
    pub fn fit(forecaster: PeriodicAverageModel, series: &Series<DataTimePoint>, k: f64) -> Result<Self> {
        let window = forecaster.window();
        let n = series.len();
        if n <= window {
            return Err(TimeseriaError::InsufficientData { needed: window + 1, got: n });
        }
        let label = forecaster.label().to_string();
        let mut residuals = Vec::with_capacity(n - window);
        for i in (window + 1)..=n {
            let context = series.slice_by_index(i - 1 - window, i - 1);
            let predicted = forecaster.predict(&context, 1)?;
            let predicted_value = predicted.get(0).unwrap().data.get(&label).unwrap_or(0.0);
            let actual_value = series.get(i - 1).unwrap().data.get(&label).unwrap_or(0.0);
            residuals.push((actual_value - predicted_value).abs());
        }

        let mean = residuals.clone().mean();
        let stdev = if residuals.len() > 1 { residuals.clone().std_dev() } else { 0.0 };
        let threshold = stdev * k;

        Ok(Self {
            forecaster,
            mean,
            stdev,
            threshold,
        })
    }

    /// Rebuild a detector directly from a persisted bundle: the wrapped
    /// forecaster plus its own fitted residual statistics.
    pub fn from_parts(forecaster: PeriodicAverageModel, mean: f64, stdev: f64, threshold: f64) -> Self {
        Self {
            forecaster,
            mean,
            stdev,
            threshold,
        }
    }

    pub fn forecaster(&self) -> &PeriodicAverageModel {
        &self.forecaster
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn stdev(&self) -> f64 {
        self.stdev
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Normal(mean, stdev) density of a residual magnitude, mostly useful
    /// for diagnostics/plots rather than the pass/fail decision itself.
    pub fn residual_density(&self, r: f64) -> f64 {
        let sigma = self.stdev.max(1e-12);
        Normal::new(self.mean, sigma)
            .map(|dist| dist.pdf(r))
            .unwrap_or(0.0)
    }

    /// Annotate a copy of `series` with `data_indexes.anomaly` for every
    /// element past the forecaster's window (spec §4.G step 4). Never
    /// mutates the input.
    pub fn apply(&self, series: &Series<DataTimePoint>, opts: AnomalyOptions) -> Result<Series<DataTimePoint>> {
        let window = self.forecaster.window();
        let n = series.len();
        let label = self.forecaster.label().to_string();
        let mut elements: Vec<DataTimePoint> = series.iter().cloned().collect();

        for i in (window + 1)..=n {
            let context = series.slice_by_index(i - 1 - window, i - 1);
            let predicted = self.forecaster.predict(&context, 1)?;
            let predicted_value = predicted.get(0).unwrap().data.get(&label).unwrap_or(0.0);
            let actual_value = elements[i - 1].data.get(&label).unwrap_or(0.0);
            let residual = (actual_value - predicted_value).abs();
            let is_anomaly = residual > self.threshold;
            elements[i - 1].indexes.anomaly = Some(if is_anomaly { 1.0 } else { 0.0 });

            if opts.details {
                let predicted_label = format!("{label}_predicted");
                let ae_label = format!("{label}_ae");
                elements[i - 1].data = to_map_with(&elements[i - 1].data, &label, &[
                    (predicted_label.as_str(), predicted_value),
                    (ae_label.as_str(), residual),
                ]);
            }
        }

        Ok(Series::from_validated(elements))
    }
}

fn to_map_with(original: &crate::payload::DataPayload, label: &str, extra: &[(&str, f64)]) -> crate::payload::DataPayload {
    let mut entries: Vec<(String, f64)> = original
        .labels()
        .into_iter()
        .map(|l| (l.clone(), original.get(&l).unwrap_or(0.0)))
        .collect();
    if entries.iter().all(|(l, _)| l != label) {
        entries.push((label.to_string(), original.get(label).unwrap_or(0.0)));
    }
    for (l, v) in extra {
        entries.push((l.to_string(), *v));
    }
    crate::payload::DataPayload::map(entries)
}

/// One-shot convenience wrapping `PeriodicAverageModel::fit` +
/// `AnomalyDetector::fit` + `AnomalyDetector::apply`.
pub fn detect_anomalies(
    forecaster: PeriodicAverageModel,
    series: &Series<DataTimePoint>,
    opts: AnomalyOptions,
) -> Result<Series<DataTimePoint>> {
    let detector = AnomalyDetector::fit(forecaster, series, opts.k)?;
    detector.apply(series, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::TimePoint;
    use crate::model::FitOptions;
    use crate::payload::DataPayload;
    use chrono_tz::Tz;

    fn modulo_series(n: usize, modulus: i64) -> Series<DataTimePoint> {
        let mut s = Series::new();
        for i in 0..n {
            let v = (i as i64 % modulus) as f64;
            s.append(DataTimePoint::new(TimePoint::new(i as f64, Tz::UTC), DataPayload::scalar(v)))
                .unwrap();
        }
        s
    }

    #[test]
    fn injected_outlier_is_flagged_and_nothing_else_is() {
        let mut s = modulo_series(80, 4);
        let mut elements: Vec<DataTimePoint> = s.iter().cloned().collect();
        elements[50].data = DataPayload::scalar(999.0);
        s = Series::from_validated(elements);

        let model = PeriodicAverageModel::fit(
            &s,
            FitOptions {
                periodicity: 4,
                window: Some(4),
                ..Default::default()
            },
        )
        .unwrap();
        let annotated = detect_anomalies(model, &s, AnomalyOptions::default()).unwrap();

        assert_eq!(annotated.get(50).unwrap().indexes.anomaly, Some(1.0));
        for i in 0..annotated.len() {
            if i != 50 {
                if let Some(flag) = annotated.get(i).unwrap().indexes.anomaly {
                    assert_eq!(flag, 0.0, "unexpected flag at index {i}");
                }
            }
        }
    }
}
