//! Resampling/aggregation: variable-resolution point series -> uniform
//! slot series, with per-slot coverage and data-loss (spec §4.C).

use crate::element::{DataTimePoint, DataTimeSlot, TimePoint, TimeSlot};
use crate::error::{Result, TimeseriaError};
use crate::payload::DataPayload;
use crate::series::{Resolution, Series};
use crate::tz::{to_datetime, to_epoch_s};
use crate::units::{CalendarKind, CalendarUnit, Unit};
use chrono::{Datelike, NaiveDate, TimeZone, Timelike};
use chrono_tz::Tz;

/// Relative tolerance for collapsing floating-point overlap slivers
/// (spec §4.C numerical edge case).
const EPS: f64 = 1e-9;

/// Resample an irregular (or uniform) point series onto a fixed grid of
/// slots spanning `unit`, using overlap-integral coverage and weighted
/// averaging (spec §4.C).
pub fn resample(input: &Series<DataTimePoint>, unit: Unit) -> Result<Series<DataTimeSlot>> {
    let points = input.as_slice();
    if points.is_empty() {
        return Err(TimeseriaError::EmptySeries(
            "cannot resample an empty series".into(),
        ));
    }
    let tz = input.tz().expect("non-empty TimePointSeries has a timezone");
    let n = points.len();

    let interval = match input.point_resolution() {
        Resolution::Uniform(d) => d,
        Resolution::Variable { inferred } => inferred,
    };
    if interval <= 0.0 {
        return Err(TimeseriaError::InsufficientData { needed: 2, got: n });
    }

    // A point's validity region runs from its own timestamp up to the next
    // point's (zero-order hold), so adjacent regions tile the axis without
    // overlap and a point is never double-counted across the boundary it
    // sits on. Only the two ends extend past the data by a full inferred
    // interval, giving the edge slots something to integrate against.
    // Bounds are read straight off the borrowed points (at most a
    // one-element lookback/lookahead each), never materialized into an
    // auxiliary timestamp buffer, so a long series resamples in O(1)
    // auxiliary state beyond the output itself (spec §5).
    let validity_lo = |idx: usize| -> f64 {
        if idx == 0 {
            points[0].t() - interval
        } else {
            points[idx].t()
        }
    };
    let validity_hi = |idx: usize| -> f64 {
        if idx == n - 1 {
            points[n - 1].t() + interval
        } else {
            points[idx + 1].t()
        }
    };
    // Slots are only emitted up to the last *observed* instant; the last
    // point's forward extension still feeds overlap into whichever slot
    // straddles it, but never seeds a slot of its own beyond the data.
    let data_range_end = points[n - 1].t();

    let target_seconds = unit.duration_s(points[0].t(), tz);
    if target_seconds < interval {
        log::warn!(
            "resample: target unit ({target_seconds}s) is shorter than the inferred \
             sampling interval ({interval}s); upsampling"
        );
    }

    let first_shape = points[0].data.zero_like();
    let mut out: Series<DataTimeSlot> = Series::new();

    let mut slot_start = floor_align(points[0].t(), &unit, tz);
    let mut window_start = 0usize;

    while slot_start < data_range_end {
        let slot_end = unit.add_to(slot_start, tz);
        if slot_end <= slot_start {
            return Err(TimeseriaError::UnitIncompatible(
                "resampling unit did not advance the slot grid".into(),
            ));
        }
        let slot_duration = slot_end - slot_start;
        let tol = EPS * slot_duration.abs().max(1.0);

        while window_start < n && validity_hi(window_start) <= slot_start + tol {
            window_start += 1;
        }

        let mut total_overlap = 0.0;
        let mut weighted: Option<DataPayload> = None;
        let mut j = window_start;
        while j < n && validity_lo(j) < slot_end - tol {
            let lo = validity_lo(j).max(slot_start);
            let hi = validity_hi(j).min(slot_end);
            let overlap = (hi - lo).max(0.0);
            if overlap > tol {
                total_overlap += overlap;
                weighted = Some(match weighted {
                    None => scale(&points[j].data, overlap),
                    Some(acc) => add(&acc, &scale(&points[j].data, overlap)),
                });
            }
            j += 1;
        }

        let coverage = (total_overlap / slot_duration).clamp(0.0, 1.0);
        let data = match weighted {
            Some(acc) if total_overlap > 0.0 => scale(&acc, 1.0 / total_overlap),
            _ => first_shape.clone(),
        };

        let slot = TimeSlot::new(TimePoint::new(slot_start, tz), TimePoint::new(slot_end, tz))?;
        out.append(DataTimeSlot::new(slot, data, Some(coverage)))?;

        slot_start = slot_end;
    }

    Ok(out)
}

fn scale(payload: &DataPayload, factor: f64) -> DataPayload {
    match payload {
        DataPayload::Vector(v) => DataPayload::Vector(v.iter().map(|x| x * factor).collect()),
        DataPayload::Map(m) => DataPayload::Map(m.iter().map(|(k, v)| (k.clone(), v * factor)).collect()),
    }
}

fn add(a: &DataPayload, b: &DataPayload) -> DataPayload {
    match (a, b) {
        (DataPayload::Vector(va), DataPayload::Vector(vb)) => {
            DataPayload::Vector(va.iter().zip(vb.iter()).map(|(x, y)| x + y).collect())
        }
        (DataPayload::Map(ma), DataPayload::Map(mb)) => DataPayload::Map(
            ma.iter()
                .map(|(k, v)| (k.clone(), v + mb.get(k).copied().unwrap_or(0.0)))
                .collect(),
        ),
        _ => a.clone(),
    }
}

/// Floor-align an instant to the start of the grid period containing it.
///
/// Physical units anchor the grid to the series' own first timestamp rather
/// than absolute epoch zero: the caller always passes `points[0].t()` here,
/// so the first slot starts exactly at `t0` regardless of `U`. Calendar
/// units still align to the timezone's own second/minute/hour/day/etc.
/// boundaries, since those are meaningful independent of where the data
/// happens to start.
fn floor_align(t: f64, unit: &Unit, tz: Tz) -> f64 {
    match unit {
        Unit::Physical(_) => t,
        Unit::Calendar(c) => floor_align_calendar(t, c, tz),
    }
}

fn floor_align_calendar(t: f64, c: &CalendarUnit, tz: Tz) -> f64 {
    let dt = to_datetime(t, tz);
    let truncated = match c.kind {
        CalendarKind::Second => dt
            .date_naive()
            .and_hms_opt(dt.hour(), dt.minute(), dt.second())
            .unwrap(),
        CalendarKind::Minute => dt.date_naive().and_hms_opt(dt.hour(), dt.minute(), 0).unwrap(),
        CalendarKind::Hour => dt.date_naive().and_hms_opt(dt.hour(), 0, 0).unwrap(),
        CalendarKind::Day => dt.date_naive().and_hms_opt(0, 0, 0).unwrap(),
        CalendarKind::Week => {
            let back = dt.weekday().num_days_from_monday() as i64;
            (dt.date_naive() - chrono::Duration::days(back))
                .and_hms_opt(0, 0, 0)
                .unwrap()
        }
        CalendarKind::Month => NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        CalendarKind::Year => NaiveDate::from_ymd_opt(dt.year(), 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    };
    let localized = tz
        .from_local_datetime(&truncated)
        .single()
        .or_else(|| tz.from_local_datetime(&truncated).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&truncated));
    to_epoch_s(localized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(t: f64, v: f64) -> DataTimePoint {
        DataTimePoint::new(TimePoint::new(t, Tz::UTC), DataPayload::scalar(v))
    }

    fn series(pairs: &[(f64, f64)]) -> Series<DataTimePoint> {
        let mut s = Series::new();
        for &(t, v) in pairs {
            s.append(point(t, v)).unwrap();
        }
        s
    }

    #[test]
    fn resample_identity_at_own_resolution() {
        let s = series(&[(60.0, 1.0), (120.0, 2.0), (180.0, 3.0), (240.0, 4.0)]);
        let out = resample(&s, Unit::physical(60.0)).unwrap();
        assert_eq!(out.len(), 3);
        let expected = [(60.0, 120.0, 1.0), (120.0, 180.0, 2.0), (180.0, 240.0, 3.0)];
        for (slot, (start, end, val)) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(slot.slot.start.t, *start, epsilon = 1e-6);
            assert_relative_eq!(slot.slot.end.t, *end, epsilon = 1e-6);
            assert_relative_eq!(slot.data.get("0").unwrap(), *val, epsilon = 1e-6);
            assert_relative_eq!(slot.coverage.unwrap(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn resample_down_by_two() {
        let s = series(&[(60.0, 1.0), (120.0, 2.0), (180.0, 3.0), (240.0, 4.0)]);
        let out = resample(&s, Unit::physical(120.0)).unwrap();
        assert_eq!(out.len(), 2);
        assert_relative_eq!(out.get(0).unwrap().data.get("0").unwrap(), 1.5, epsilon = 1e-6);
        assert_relative_eq!(out.get(0).unwrap().coverage.unwrap(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(out.get(1).unwrap().data.get("0").unwrap(), 3.5, epsilon = 1e-6);
    }

    #[test]
    fn coverage_is_always_within_unit_interval() {
        let s = series(&[(0.0, 1.0), (50.0, 2.0), (130.0, 3.0), (400.0, 4.0)]);
        let out = resample(&s, Unit::physical(60.0)).unwrap();
        for slot in out.iter() {
            let c = slot.coverage.unwrap();
            assert!((0.0..=1.0).contains(&c), "coverage {c} out of range");
        }
    }

    #[test]
    fn empty_series_is_rejected() {
        let s: Series<DataTimePoint> = Series::new();
        assert_eq!(resample(&s, Unit::physical(60.0)).unwrap_err().kind(), "EmptySeriesError");
    }
}
