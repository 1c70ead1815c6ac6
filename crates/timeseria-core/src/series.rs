//! The typed, succession-checked series container (spec §4.B).

use crate::element::{HasData, HasTimezone, SeriesElement, Spanned, Timed};
use crate::error::{Result, TimeseriaError};
use crate::sampling::infer_sampling_interval;
use chrono_tz::Tz;

/// The resolution of a series: a common delta/span, or a non-uniform
/// series with a cached inferred sampling interval (spec §4.B, §4.C step 5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Uniform(f64),
    Variable { inferred: f64 },
}

/// An ordered, succession-checked sequence of elements of exactly one type.
#[derive(Debug, Clone)]
pub struct Series<T: SeriesElement> {
    elements: Vec<T>,
}

impl<T: SeriesElement> Default for Series<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SeriesElement> Series<T> {
    pub fn new() -> Self {
        Self { elements: Vec::new() }
    }

    /// Construct directly from an already-validated vector (used by
    /// `slice`/internal transforms that preserve invariants by
    /// construction and don't need to re-check them).
    pub(crate) fn from_validated(elements: Vec<T>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    pub fn first(&self) -> Option<&T> {
        self.elements.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.elements.last()
    }

    /// Append an element, enforcing I1 (via the type system), I2 (via
    /// `succeeds`) and any further per-kind invariant (I3–I5, via
    /// `validate_against`). I6 (no duplicate timestamps) follows from I2's
    /// strict inequality for point series.
    pub fn append(&mut self, x: T) -> Result<()> {
        if let Some(last) = self.elements.last() {
            if !x.succeeds(last) {
                return Err(TimeseriaError::Order(
                    "element does not succeed the series' last element".into(),
                ));
            }
        }
        if let Some(first) = self.elements.first() {
            x.validate_against(first)?;
        }
        self.elements.push(x);
        Ok(())
    }

    /// Deep copy preserving indexes; mutations to one do not affect the
    /// other (spec P2).
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Half-open `[lo, hi)` window by index.
    pub fn slice_by_index(&self, lo: usize, hi: usize) -> Series<T> {
        let hi = hi.min(self.elements.len());
        let lo = lo.min(hi);
        Series::from_validated(self.elements[lo..hi].to_vec())
    }
}

impl<T: SeriesElement + Timed> Series<T> {
    /// Half-open `[lo, hi)` window by the series' ordering axis (epoch
    /// seconds for time series, first coordinate otherwise).
    pub fn slice_by_value(&self, lo: f64, hi: f64) -> Series<T> {
        let filtered: Vec<T> = self
            .elements
            .iter()
            .filter(|e| e.axis() >= lo && e.axis() < hi)
            .cloned()
            .collect();
        Series::from_validated(filtered)
    }
}

impl<T: SeriesElement + HasData> Series<T> {
    /// Canonical ordered labels of the series' data shape (spec §4.B).
    pub fn data_labels(&self) -> Vec<String> {
        self.elements
            .first()
            .map(|e| e.data().labels())
            .unwrap_or_default()
    }
}

impl<T: SeriesElement + HasTimezone> Series<T> {
    pub fn tz(&self) -> Option<Tz> {
        self.elements.first().map(|e| e.tz())
    }

    /// Rebind the presentational timezone of every element without
    /// modifying any `t` (spec §4.B).
    pub fn change_timezone(&mut self, tz: Tz) {
        for e in self.elements.iter_mut() {
            e.set_tz(tz);
        }
    }
}

impl<T: SeriesElement + Timed> Series<T> {
    /// Resolution for a point-shaped series: uniform if every consecutive
    /// delta matches the first (within tolerance), else variable with a
    /// cached inferred sampling interval.
    pub fn point_resolution(&self) -> Resolution {
        if self.elements.len() < 2 {
            return Resolution::Uniform(0.0);
        }
        let ts: Vec<f64> = self.elements.iter().map(|e| e.axis()).collect();
        let first_delta = ts[1] - ts[0];
        let scale = first_delta.abs().max(1.0);
        let uniform = ts
            .windows(2)
            .all(|w| (w[1] - w[0] - first_delta).abs() <= 1e-9 * scale);
        if uniform {
            Resolution::Uniform(first_delta)
        } else {
            Resolution::Variable {
                inferred: infer_sampling_interval(&ts),
            }
        }
    }
}

impl<T: SeriesElement + Spanned> Series<T> {
    /// Resolution for a slot-shaped series: I4 already guarantees every
    /// slot shares the first slot's span.
    pub fn slot_resolution(&self) -> Resolution {
        match self.elements.first() {
            Some(e) => Resolution::Uniform(e.span()),
            None => Resolution::Uniform(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{DataTimePoint, DataTimeSlot, TimePoint, TimeSlot};
    use crate::payload::DataPayload;
    use chrono_tz::Tz;

    fn dtp(t: f64, v: f64) -> DataTimePoint {
        DataTimePoint::new(TimePoint::new(t, Tz::UTC), DataPayload::scalar(v))
    }

    #[test]
    fn append_enforces_strict_succession() {
        let mut s: Series<DataTimePoint> = Series::new();
        s.append(dtp(0.0, 1.0)).unwrap();
        s.append(dtp(60.0, 2.0)).unwrap();
        let err = s.append(dtp(60.0, 3.0)).unwrap_err();
        assert_eq!(err.kind(), "OrderError");
    }

    #[test]
    fn append_enforces_shape_uniformity() {
        let mut s: Series<DataTimePoint> = Series::new();
        s.append(dtp(0.0, 1.0)).unwrap();
        let bad = DataTimePoint::new(
            TimePoint::new(60.0, Tz::UTC),
            DataPayload::vector(vec![1.0, 2.0]),
        );
        let err = s.append(bad).unwrap_err();
        assert_eq!(err.kind(), "ShapeError");
    }

    #[test]
    fn duplicate_is_independent() {
        let mut s: Series<DataTimePoint> = Series::new();
        s.append(dtp(0.0, 1.0)).unwrap();
        let mut dup = s.duplicate();
        dup.append(dtp(60.0, 2.0)).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(dup.len(), 2);
    }

    #[test]
    fn point_resolution_detects_uniform_and_variable() {
        let mut uniform: Series<DataTimePoint> = Series::new();
        for i in 0..5 {
            uniform.append(dtp(i as f64 * 60.0, i as f64)).unwrap();
        }
        assert_eq!(uniform.point_resolution(), Resolution::Uniform(60.0));

        let mut variable: Series<DataTimePoint> = Series::new();
        variable.append(dtp(0.0, 0.0)).unwrap();
        variable.append(dtp(60.0, 1.0)).unwrap();
        variable.append(dtp(200.0, 2.0)).unwrap();
        match variable.point_resolution() {
            Resolution::Variable { .. } => {}
            Resolution::Uniform(_) => panic!("expected variable resolution"),
        }
    }

    #[test]
    fn slot_series_enforces_span_uniformity() {
        let mut s: Series<DataTimeSlot> = Series::new();
        let slot_a = TimeSlot::new(TimePoint::new(0.0, Tz::UTC), TimePoint::new(60.0, Tz::UTC)).unwrap();
        s.append(DataTimeSlot::new(slot_a, DataPayload::scalar(1.0), Some(1.0)))
            .unwrap();
        let slot_b =
            TimeSlot::new(TimePoint::new(60.0, Tz::UTC), TimePoint::new(150.0, Tz::UTC)).unwrap();
        let err = s
            .append(DataTimeSlot::new(slot_b, DataPayload::scalar(2.0), Some(1.0)))
            .unwrap_err();
        assert_eq!(err.kind(), "SpanError");
    }

    #[test]
    fn change_timezone_rebinds_without_changing_t() {
        let mut s: Series<DataTimePoint> = Series::new();
        s.append(dtp(0.0, 1.0)).unwrap();
        s.change_timezone(Tz::Europe__Rome);
        assert_eq!(s.get(0).unwrap().t(), 0.0);
        assert_eq!(s.tz(), Some(Tz::Europe__Rome));
    }

    #[test]
    fn slice_by_value_is_half_open() {
        let mut s: Series<DataTimePoint> = Series::new();
        for i in 0..5 {
            s.append(dtp(i as f64 * 60.0, i as f64)).unwrap();
        }
        let sliced = s.slice_by_value(60.0, 180.0);
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.get(0).unwrap().t(), 60.0);
        assert_eq!(sliced.get(1).unwrap().t(), 120.0);
    }
}
