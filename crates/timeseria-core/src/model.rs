//! The periodic-average model: fit, reconstruction and forecasting
//! (spec §4.E).

use crate::element::{DataTimePoint, HasTimezone, TimePoint};
use crate::error::{Result, TimeseriaError};
use crate::payload::{DataPayload, DataShape};
use crate::sampling::phase_index;
use crate::series::{Resolution, Series};
use crate::tz::dst_offset_s;
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Strategy for estimating the reconstruction offset of a gap (spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetMethod {
    /// Mean residual over every element in the gap.
    Average,
    /// Mean residual at the two elements flanking the gap, falling back to
    /// `0` for a gap that touches a series boundary.
    Extremes,
}

impl Default for OffsetMethod {
    fn default() -> Self {
        OffsetMethod::Average
    }
}

/// Options controlling `PeriodicAverageModel::fit`.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub periodicity: usize,
    pub dst_affected: bool,
    pub theta_loss: f64,
    pub window: Option<usize>,
    pub offset_method: OffsetMethod,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            periodicity: 1,
            dst_affected: false,
            theta_loss: 0.5,
            window: None,
            offset_method: OffsetMethod::default(),
        }
    }
}

/// A fitted periodic-average model: a per-phase mean, with enough metadata
/// to index phases consistently and to extend the timestamp grid.
#[derive(Debug, Clone)]
pub struct PeriodicAverageModel {
    periodicity: usize,
    resolution_s: f64,
    dst_affected: bool,
    averages: BTreeMap<usize, f64>,
    window: usize,
    offset_method: OffsetMethod,
    label: String,
    shape: DataShape,
    stdev: Option<f64>,
    ae_threshold: Option<f64>,
}

impl PeriodicAverageModel {
    pub fn periodicity(&self) -> usize {
        self.periodicity
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn averages(&self) -> &BTreeMap<usize, f64> {
        &self.averages
    }

    pub fn resolution_s(&self) -> f64 {
        self.resolution_s
    }

    pub fn dst_affected(&self) -> bool {
        self.dst_affected
    }

    pub fn stdev(&self) -> Option<f64> {
        self.stdev
    }

    pub(crate) fn set_stdev(&mut self, stdev: f64) {
        self.stdev = Some(stdev);
    }

    pub fn ae_threshold(&self) -> Option<f64> {
        self.ae_threshold
    }

    pub(crate) fn set_ae_threshold(&mut self, threshold: f64) {
        self.ae_threshold = Some(threshold);
    }

    pub fn shape(&self) -> &DataShape {
        &self.shape
    }

    /// Rebuild a model directly from its persisted parameter bundle
    /// (used by the persistence layer on load; `fit` is the only other way
    /// to produce a `PeriodicAverageModel`).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        periodicity: usize,
        resolution_s: f64,
        dst_affected: bool,
        averages: BTreeMap<usize, f64>,
        window: usize,
        offset_method: OffsetMethod,
        label: String,
        shape: DataShape,
        stdev: Option<f64>,
        ae_threshold: Option<f64>,
    ) -> Self {
        Self {
            periodicity,
            resolution_s,
            dst_affected,
            averages,
            window,
            offset_method,
            label,
            shape,
            stdev,
            ae_threshold,
        }
    }

    pub fn offset_method(&self) -> OffsetMethod {
        self.offset_method
    }

    /// Fit per-phase averages over elements whose `data_loss` is below
    /// `theta_loss` (spec §4.E Fit). Multivariate input is rejected: the
    /// model tracks exactly one data label.
    pub fn fit(series: &Series<DataTimePoint>, opts: FitOptions) -> Result<Self> {
        if series.is_empty() {
            return Err(TimeseriaError::EmptySeries("cannot fit on an empty series".into()));
        }
        if opts.periodicity == 0 {
            return Err(TimeseriaError::Unsupported("periodicity must be >= 1".into()));
        }
        let first = series.first().unwrap();
        let labels = first.data.labels();
        if labels.len() != 1 {
            return Err(TimeseriaError::Unsupported(
                "multivariate fit is not supported; fit one label at a time".into(),
            ));
        }
        let label = labels[0].clone();
        let shape = first.data.shape();

        let resolution_s = match series.point_resolution() {
            Resolution::Uniform(d) => d,
            Resolution::Variable { inferred } => inferred,
        };
        if opts.dst_affected && resolution_s > 3600.0 {
            return Err(TimeseriaError::Unsupported(
                "DST-aware phase indexing requires a resolution of at most one hour".into(),
            ));
        }

        let mut sums: BTreeMap<usize, f64> = BTreeMap::new();
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for e in series.iter() {
            let loss = e.indexes.data_loss.unwrap_or(0.0);
            if loss >= opts.theta_loss {
                continue;
            }
            let phase = phase_for(e.t(), e.tz(), resolution_s, opts.periodicity, opts.dst_affected);
            let value = e.data.get(&label).unwrap_or(0.0);
            *sums.entry(phase).or_insert(0.0) += value;
            *counts.entry(phase).or_insert(0) += 1;
        }
        let averages = sums
            .into_iter()
            .map(|(phase, sum)| (phase, sum / counts[&phase] as f64))
            .collect();

        Ok(Self {
            periodicity: opts.periodicity,
            resolution_s,
            dst_affected: opts.dst_affected,
            averages,
            window: opts.window.unwrap_or(opts.periodicity),
            offset_method: opts.offset_method,
            label,
            shape,
            stdev: None,
            ae_threshold: None,
        })
    }

    fn phase_of(&self, t: f64, tz: Tz) -> usize {
        phase_for(t, tz, self.resolution_s, self.periodicity, self.dst_affected)
    }

    fn average_at(&self, phase: usize) -> f64 {
        self.averages.get(&phase).copied().unwrap_or(0.0)
    }

    fn payload_of(&self, value: f64) -> DataPayload {
        match &self.shape {
            DataShape::Vector(_) => DataPayload::scalar(value),
            DataShape::Map(_) => DataPayload::map(vec![(self.label.clone(), value)]),
        }
    }

    /// Fill every maximal run of elements with `data_loss >= theta_threshold`
    /// using the fitted per-phase average plus a gap offset (spec §4.E
    /// Reconstruction). Returns a new series; the input is untouched.
    pub fn reconstruct(&self, series: &Series<DataTimePoint>, theta_threshold: f64) -> Result<Series<DataTimePoint>> {
        let mut elements: Vec<DataTimePoint> = series.iter().cloned().collect();
        let n = elements.len();
        let mut i = 0;
        while i < n {
            let loss = elements[i].indexes.data_loss.unwrap_or(0.0);
            if loss >= theta_threshold {
                let lo = i;
                let mut hi = i + 1;
                while hi < n && elements[hi].indexes.data_loss.unwrap_or(0.0) >= theta_threshold {
                    hi += 1;
                }
                self.reconstruct_gap(&mut elements, lo, hi);
                i = hi;
            } else {
                i += 1;
            }
        }
        Ok(Series::from_validated(elements))
    }

    fn residual_at(&self, elements: &[DataTimePoint], idx: usize) -> f64 {
        let e = &elements[idx];
        let phase = self.phase_of(e.t(), e.tz());
        e.data.get(&self.label).unwrap_or(0.0) - self.average_at(phase)
    }

    fn reconstruct_gap(&self, elements: &mut [DataTimePoint], lo: usize, hi: usize) {
        let offset = match self.offset_method {
            OffsetMethod::Average => {
                let residuals: Vec<f64> = (lo..hi).map(|j| self.residual_at(elements, j)).collect();
                mean(&residuals)
            }
            OffsetMethod::Extremes => {
                let mut residuals = Vec::with_capacity(2);
                if lo > 0 {
                    residuals.push(self.residual_at(elements, lo - 1));
                }
                if hi < elements.len() {
                    residuals.push(self.residual_at(elements, hi));
                }
                if residuals.is_empty() {
                    0.0
                } else {
                    mean(&residuals)
                }
            }
        };
        for j in lo..hi {
            let t = elements[j].t();
            let tz = elements[j].tz();
            let phase = self.phase_of(t, tz);
            let value = self.average_at(phase) + offset;
            let payload = self.payload_of(value);
            elements[j].data = payload;
            elements[j].indexes.data_reconstructed = Some(1.0);
        }
    }

    /// Extend the grid by `n` steps of `resolution_s` seconds past the
    /// series' last element, offsetting by the mean residual over the last
    /// `window` elements (spec §4.E Forecasting).
    pub fn predict(&self, series: &Series<DataTimePoint>, n: usize) -> Result<Series<DataTimePoint>> {
        if series.is_empty() {
            return Err(TimeseriaError::EmptySeries("cannot predict from an empty series".into()));
        }
        let elements = series.as_slice();
        let last = elements.last().unwrap();
        let tz = last.tz();
        let tail_len = self.window.min(elements.len());
        let tail = &elements[elements.len() - tail_len..];
        let residuals: Vec<f64> = (0..tail.len())
            .map(|j| self.residual_at(tail, j))
            .collect();
        let offset = mean(&residuals);

        let mut out: Series<DataTimePoint> = Series::new();
        let mut t = last.t();
        for _ in 0..n {
            t += self.resolution_s;
            let phase = self.phase_of(t, tz);
            let value = self.average_at(phase) + offset;
            let point = TimePoint::new(t, tz);
            out.append(DataTimePoint::new(point, self.payload_of(value)))?;
        }
        Ok(out)
    }
}

fn phase_for(t: f64, tz: Tz, resolution_s: f64, periodicity: usize, dst_affected: bool) -> usize {
    let offset = if dst_affected { dst_offset_s(t, tz) as f64 } else { 0.0 };
    phase_index(t, resolution_s, periodicity, offset)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
