//! Physical and calendar units, and unit arithmetic on points (spec §4.A).

use crate::error::{Result, TimeseriaError};
use crate::tz::{to_datetime, to_epoch_s};
use chrono::{Datelike, TimeZone};
use chrono_tz::Tz;

/// The seven calendar-unit labels, ordered coarsest-last so that
/// `kind <= Hour` cleanly identifies the "exact duration" group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CalendarKind {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl CalendarKind {
    /// Exact seconds for one unit, valid only for `Second`/`Minute`/`Hour`.
    fn exact_seconds(self) -> Option<f64> {
        match self {
            CalendarKind::Second => Some(1.0),
            CalendarKind::Minute => Some(60.0),
            CalendarKind::Hour => Some(3600.0),
            _ => None,
        }
    }
}

/// A fixed real-valued duration in seconds. Additive, commutes with itself
/// and with any other `PhysicalUnit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalUnit {
    pub seconds: f64,
}

impl PhysicalUnit {
    pub fn new(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Value-tolerant equality, per spec §4.A.
    pub fn approx_eq(&self, other: &PhysicalUnit) -> bool {
        let scale = self.seconds.abs().max(other.seconds.abs()).max(1.0);
        (self.seconds - other.seconds).abs() <= 1e-9 * scale
    }
}

/// A labeled multiple of a calendar kind. `count` may be fractional only
/// for Physical units; calendar counts are always whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarUnit {
    pub kind: CalendarKind,
    pub count: i64,
}

impl CalendarUnit {
    pub fn new(kind: CalendarKind, count: i64) -> Self {
        Self { kind, count }
    }

    /// Canonical-label equality, per spec §4.A: same kind and count.
    pub fn canonical_eq(&self, other: &CalendarUnit) -> bool {
        self.kind == other.kind && self.count == other.count
    }

    /// The local duration in seconds of this unit at instant `at` (epoch
    /// seconds) in timezone `tz`. Exact for kinds <= Hour; for Day/Week it
    /// depends on DST transitions crossed; for Month/Year it depends on
    /// calendar length.
    pub fn duration_s(&self, at: f64, tz: Tz) -> f64 {
        if let Some(exact) = self.kind.exact_seconds() {
            return exact * self.count as f64;
        }
        let start = to_datetime(at, tz);
        let end = self.shift(start);
        to_epoch_s(end) - at
    }

    fn shift(&self, start: chrono::DateTime<Tz>) -> chrono::DateTime<Tz> {
        match self.kind {
            CalendarKind::Second | CalendarKind::Minute | CalendarKind::Hour => {
                start + chrono::Duration::seconds(self.kind.exact_seconds().unwrap() as i64 * self.count)
            }
            CalendarKind::Day => start + chrono::Duration::days(self.count),
            CalendarKind::Week => start + chrono::Duration::weeks(self.count),
            CalendarKind::Month => shift_months(start, self.count),
            CalendarKind::Year => shift_months(start, self.count * 12),
        }
    }
}

/// Add/subtract whole months, clamping the day-of-month into the target
/// month (e.g. Jan 31 + 1 month -> Feb 28/29, not Mar 3).
fn shift_months(start: chrono::DateTime<Tz>, months: i64) -> chrono::DateTime<Tz> {
    let tz = start.timezone();
    let naive = start.naive_local();

    let total = naive.year() as i64 * 12 + (naive.month() as i64 - 1) + months;
    let target_year = total.div_euclid(12) as i32;
    let target_month = (total.rem_euclid(12) + 1) as u32;
    let last_day = days_in_month(target_year, target_month);
    let target_day = naive.day().min(last_day);

    let shifted_date = chrono::NaiveDate::from_ymd_opt(target_year, target_month, target_day)
        .expect("clamped day is always valid for its month");
    let shifted = shifted_date.and_time(naive.time());

    tz.from_local_datetime(&shifted)
        .single()
        .or_else(|| tz.from_local_datetime(&shifted).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&shifted))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("valid first-of-month date");
    let first_of_this = chrono::NaiveDate::from_ymd_opt(year, month, 1)
        .expect("valid first-of-month date");
    (first_of_next - first_of_this).num_days() as u32
}

/// Either kind of unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unit {
    Physical(PhysicalUnit),
    Calendar(CalendarUnit),
}

impl Unit {
    pub fn physical(seconds: f64) -> Self {
        Unit::Physical(PhysicalUnit::new(seconds))
    }

    pub fn calendar(kind: CalendarKind, count: i64) -> Self {
        Unit::Calendar(CalendarUnit::new(kind, count))
    }

    pub fn is_calendar_variable(&self) -> bool {
        matches!(
            self,
            Unit::Calendar(CalendarUnit {
                kind: CalendarKind::Day | CalendarKind::Week | CalendarKind::Month | CalendarKind::Year,
                ..
            })
        )
    }

    /// Local duration in seconds at instant `at` in timezone `tz`.
    pub fn duration_s(&self, at: f64, tz: Tz) -> f64 {
        match self {
            Unit::Physical(p) => p.seconds,
            Unit::Calendar(c) => c.duration_s(at, tz),
        }
    }

    /// `point + unit`: advance an epoch second by this unit, localized in
    /// `tz` for calendar units.
    pub fn add_to(&self, t: f64, tz: Tz) -> f64 {
        match self {
            Unit::Physical(p) => t + p.seconds,
            Unit::Calendar(c) => {
                let start = to_datetime(t, tz);
                to_epoch_s(c.shift(start))
            }
        }
    }

    /// Value/canonical equality per spec §4.A.
    pub fn equal(&self, other: &Unit) -> bool {
        match (self, other) {
            (Unit::Physical(a), Unit::Physical(b)) => a.approx_eq(b),
            (Unit::Calendar(a), Unit::Calendar(b)) => a.canonical_eq(b),
            _ => false,
        }
    }

    /// Combine two units for arithmetic where both must describe the same
    /// kind of duration. Fails when mixing a `PhysicalUnit` with a
    /// variable-length `CalendarUnit` (the combined duration is then
    /// ill-defined without an anchor instant).
    pub fn checked_combine(&self, other: &Unit) -> Result<Unit> {
        match (self, other) {
            (Unit::Physical(a), Unit::Physical(b)) => {
                Ok(Unit::Physical(PhysicalUnit::new(a.seconds + b.seconds)))
            }
            (Unit::Calendar(a), Unit::Calendar(b)) if a.kind == b.kind => {
                Ok(Unit::Calendar(CalendarUnit::new(a.kind, a.count + b.count)))
            }
            (Unit::Physical(_), Unit::Calendar(c)) | (Unit::Calendar(c), Unit::Physical(_))
                if matches!(
                    c.kind,
                    CalendarKind::Day | CalendarKind::Week | CalendarKind::Month | CalendarKind::Year
                ) =>
            {
                Err(TimeseriaError::UnitIncompatible(
                    "cannot combine a physical unit with a variable-length calendar unit".into(),
                ))
            }
            _ => Err(TimeseriaError::UnitIncompatible(
                "units do not describe compatible durations".into(),
            )),
        }
    }
}
