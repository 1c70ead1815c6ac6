//! The element lattice (spec §3, Design Notes §9): a product of two
//! orthogonal capabilities (timed?, carries data?) and one element kind
//! (point vs. half-open interval slot), realized as eight concrete structs
//! rather than a parametrized `Element<Kind, HasTime, HasData>` generic —
//! the capability traits below (`SeriesElement`, `Timed`, `HasData`,
//! `HasTimezone`, `Spanned`) give `Series<T>` the same leverage without
//! the type-level bookkeeping a fully generic element would need.

use crate::error::{Result, TimeseriaError};
use crate::payload::{DataIndexes, DataPayload};
use chrono_tz::Tz;

/// Relative tolerance used when comparing floating-point instants for
/// succession and overlap collapse (spec §3, §4.C).
pub const EPS: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= EPS * scale
}

/// Capability required of every element type stored in a `Series<T>`:
/// the succession check (I2) and any further per-kind invariant (I3–I5),
/// validated against the series' first element.
pub trait SeriesElement: Clone {
    fn succeeds(&self, prev: &Self) -> bool;

    fn validate_against(&self, _first: &Self) -> Result<()> {
        Ok(())
    }
}

/// An element's position on the series' ordering axis, used by
/// `Series::slice` when given a value rather than an index.
pub trait Timed {
    fn axis(&self) -> f64;
}

/// An element that carries a `data` payload and `data_indexes`.
pub trait HasData {
    fn data(&self) -> &DataPayload;
    fn data_mut(&mut self) -> &mut DataPayload;
    fn indexes(&self) -> &DataIndexes;
    fn indexes_mut(&mut self) -> &mut DataIndexes;
}

/// An element that carries a presentational timezone.
pub trait HasTimezone {
    fn tz(&self) -> Tz;
    fn set_tz(&mut self, tz: Tz);
}

/// A slot-shaped element, with a span used for I4.
pub trait Spanned {
    fn span(&self) -> f64;
}

// ---------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------

/// An ordered tuple of real numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub coordinates: Vec<f64>,
}

impl Point {
    pub fn new(coordinates: impl Into<Vec<f64>>) -> Self {
        Self {
            coordinates: coordinates.into(),
        }
    }
}

impl SeriesElement for Point {
    fn succeeds(&self, prev: &Self) -> bool {
        match (self.coordinates.first(), prev.coordinates.first()) {
            (Some(a), Some(b)) => *a > *b,
            _ => false,
        }
    }
}

impl Timed for Point {
    fn axis(&self) -> f64 {
        self.coordinates.first().copied().unwrap_or(f64::NAN)
    }
}

// ---------------------------------------------------------------------
// TimePoint
// ---------------------------------------------------------------------

/// A Point whose single coordinate is an epoch second, with a
/// presentational (non-identity-affecting) timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimePoint {
    pub t: f64,
    pub tz: Tz,
}

impl TimePoint {
    pub fn new(t: f64, tz: Tz) -> Self {
        Self { t, tz }
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.t == other.t
    }
}

impl SeriesElement for TimePoint {
    fn succeeds(&self, prev: &Self) -> bool {
        self.t > prev.t
    }
}

impl Timed for TimePoint {
    fn axis(&self) -> f64 {
        self.t
    }
}

impl HasTimezone for TimePoint {
    fn tz(&self) -> Tz {
        self.tz
    }
    fn set_tz(&mut self, tz: Tz) {
        self.tz = tz;
    }
}

// ---------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------

/// A half-open interval `[start, end)` of two same-arity points.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub start: Point,
    pub end: Point,
}

impl Slot {
    pub fn new(start: Point, end: Point) -> Result<Self> {
        if start.coordinates.len() != end.coordinates.len() {
            return Err(TimeseriaError::Shape(
                "slot endpoints must have the same arity".into(),
            ));
        }
        if !(end.axis() > start.axis()) {
            return Err(TimeseriaError::Order(
                "slot end must be strictly after slot start".into(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Mean per-coordinate delta between end and start.
    pub fn mean_span(&self) -> f64 {
        let n = self.start.coordinates.len().max(1) as f64;
        let sum: f64 = self
            .start
            .coordinates
            .iter()
            .zip(self.end.coordinates.iter())
            .map(|(s, e)| e - s)
            .sum();
        sum / n
    }
}

impl SeriesElement for Slot {
    fn succeeds(&self, prev: &Self) -> bool {
        self.start
            .coordinates
            .iter()
            .zip(prev.end.coordinates.iter())
            .all(|(a, b)| approx_eq(*a, *b))
    }
}

impl Timed for Slot {
    fn axis(&self) -> f64 {
        self.start.axis()
    }
}

impl Spanned for Slot {
    fn span(&self) -> f64 {
        self.mean_span()
    }
}

// ---------------------------------------------------------------------
// TimeSlot
// ---------------------------------------------------------------------

/// A half-open `[start, end)` time interval; both endpoints share a tz.
#[derive(Debug, Clone, Copy)]
pub struct TimeSlot {
    pub start: TimePoint,
    pub end: TimePoint,
}

impl TimeSlot {
    pub fn new(start: TimePoint, end: TimePoint) -> Result<Self> {
        if start.tz != end.tz {
            return Err(TimeseriaError::Timezone(
                "slot endpoints must share a timezone".into(),
            ));
        }
        if !(end.t > start.t) {
            return Err(TimeseriaError::Order(
                "slot end must be strictly after slot start".into(),
            ));
        }
        Ok(Self { start, end })
    }
}

impl PartialEq for TimeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl SeriesElement for TimeSlot {
    fn succeeds(&self, prev: &Self) -> bool {
        approx_eq(self.start.t, prev.end.t)
    }
}

impl Timed for TimeSlot {
    fn axis(&self) -> f64 {
        self.start.t
    }
}

impl Spanned for TimeSlot {
    fn span(&self) -> f64 {
        self.end.t - self.start.t
    }
}

impl HasTimezone for TimeSlot {
    fn tz(&self) -> Tz {
        self.start.tz
    }
    fn set_tz(&mut self, tz: Tz) {
        self.start.tz = tz;
        self.end.tz = tz;
    }
}

// ---------------------------------------------------------------------
// DataPoint / DataTimePoint
// ---------------------------------------------------------------------

/// A Point carrying a `data` payload and quality side-channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub point: Point,
    pub data: DataPayload,
    pub indexes: DataIndexes,
}

impl DataPoint {
    pub fn new(point: Point, data: DataPayload) -> Self {
        Self {
            point,
            data,
            indexes: DataIndexes::default(),
        }
    }
}

impl SeriesElement for DataPoint {
    fn succeeds(&self, prev: &Self) -> bool {
        self.point.succeeds(&prev.point)
    }

    fn validate_against(&self, first: &Self) -> Result<()> {
        if self.data.shape() != first.data.shape() {
            return Err(TimeseriaError::Shape(
                "data shape differs from the series' first element".into(),
            ));
        }
        Ok(())
    }
}

impl Timed for DataPoint {
    fn axis(&self) -> f64 {
        self.point.axis()
    }
}

impl HasData for DataPoint {
    fn data(&self) -> &DataPayload {
        &self.data
    }
    fn data_mut(&mut self) -> &mut DataPayload {
        &mut self.data
    }
    fn indexes(&self) -> &DataIndexes {
        &self.indexes
    }
    fn indexes_mut(&mut self) -> &mut DataIndexes {
        &mut self.indexes
    }
}

/// A TimePoint carrying a `data` payload and quality side-channel.
#[derive(Debug, Clone)]
pub struct DataTimePoint {
    pub point: TimePoint,
    pub data: DataPayload,
    pub indexes: DataIndexes,
}

impl DataTimePoint {
    pub fn new(point: TimePoint, data: DataPayload) -> Self {
        Self {
            point,
            data,
            indexes: DataIndexes::default(),
        }
    }

    pub fn t(&self) -> f64 {
        self.point.t
    }
}

impl PartialEq for DataTimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.point == other.point && self.data == other.data
    }
}

impl SeriesElement for DataTimePoint {
    fn succeeds(&self, prev: &Self) -> bool {
        self.point.succeeds(&prev.point)
    }

    fn validate_against(&self, first: &Self) -> Result<()> {
        if self.data.shape() != first.data.shape() {
            return Err(TimeseriaError::Shape(
                "data shape differs from the series' first element".into(),
            ));
        }
        Ok(())
    }
}

impl Timed for DataTimePoint {
    fn axis(&self) -> f64 {
        self.point.t
    }
}

impl HasData for DataTimePoint {
    fn data(&self) -> &DataPayload {
        &self.data
    }
    fn data_mut(&mut self) -> &mut DataPayload {
        &mut self.data
    }
    fn indexes(&self) -> &DataIndexes {
        &self.indexes
    }
    fn indexes_mut(&mut self) -> &mut DataIndexes {
        &mut self.indexes
    }
}

impl HasTimezone for DataTimePoint {
    fn tz(&self) -> Tz {
        self.point.tz
    }
    fn set_tz(&mut self, tz: Tz) {
        self.point.tz = tz;
    }
}

// ---------------------------------------------------------------------
// DataSlot / DataTimeSlot
// ---------------------------------------------------------------------

/// A Slot carrying `data` plus optional coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSlot {
    pub slot: Slot,
    pub data: DataPayload,
    pub coverage: Option<f64>,
    pub indexes: DataIndexes,
}

impl DataSlot {
    pub fn new(slot: Slot, data: DataPayload, coverage: Option<f64>) -> Self {
        let indexes = coverage
            .map(|c| DataIndexes::with_data_loss(1.0 - c))
            .unwrap_or_default();
        Self {
            slot,
            data,
            coverage,
            indexes,
        }
    }

    pub fn data_loss(&self) -> Option<f64> {
        self.coverage.map(|c| 1.0 - c)
    }
}

impl SeriesElement for DataSlot {
    fn succeeds(&self, prev: &Self) -> bool {
        self.slot.succeeds(&prev.slot)
    }

    fn validate_against(&self, first: &Self) -> Result<()> {
        if self.data.shape() != first.data.shape() {
            return Err(TimeseriaError::Shape(
                "data shape differs from the series' first element".into(),
            ));
        }
        if !approx_eq(self.slot.span(), first.slot.span()) {
            return Err(TimeseriaError::Span(
                "slot span differs from the series' first element".into(),
            ));
        }
        Ok(())
    }
}

impl Timed for DataSlot {
    fn axis(&self) -> f64 {
        self.slot.axis()
    }
}

impl Spanned for DataSlot {
    fn span(&self) -> f64 {
        self.slot.span()
    }
}

impl HasData for DataSlot {
    fn data(&self) -> &DataPayload {
        &self.data
    }
    fn data_mut(&mut self) -> &mut DataPayload {
        &mut self.data
    }
    fn indexes(&self) -> &DataIndexes {
        &self.indexes
    }
    fn indexes_mut(&mut self) -> &mut DataIndexes {
        &mut self.indexes
    }
}

/// A TimeSlot carrying `data` plus optional coverage.
#[derive(Debug, Clone)]
pub struct DataTimeSlot {
    pub slot: TimeSlot,
    pub data: DataPayload,
    pub coverage: Option<f64>,
    pub indexes: DataIndexes,
}

impl DataTimeSlot {
    pub fn new(slot: TimeSlot, data: DataPayload, coverage: Option<f64>) -> Self {
        let indexes = coverage
            .map(|c| DataIndexes::with_data_loss(1.0 - c))
            .unwrap_or_default();
        Self {
            slot,
            data,
            coverage,
            indexes,
        }
    }

    pub fn data_loss(&self) -> Option<f64> {
        self.coverage.map(|c| 1.0 - c)
    }
}

impl PartialEq for DataTimeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.data == other.data
    }
}

impl SeriesElement for DataTimeSlot {
    fn succeeds(&self, prev: &Self) -> bool {
        self.slot.succeeds(&prev.slot)
    }

    fn validate_against(&self, first: &Self) -> Result<()> {
        if self.data.shape() != first.data.shape() {
            return Err(TimeseriaError::Shape(
                "data shape differs from the series' first element".into(),
            ));
        }
        if !approx_eq(self.slot.span(), first.slot.span()) {
            return Err(TimeseriaError::Span(
                "slot span differs from the series' first element".into(),
            ));
        }
        Ok(())
    }
}

impl Timed for DataTimeSlot {
    fn axis(&self) -> f64 {
        self.slot.start.t
    }
}

impl Spanned for DataTimeSlot {
    fn span(&self) -> f64 {
        self.slot.span()
    }
}

impl HasData for DataTimeSlot {
    fn data(&self) -> &DataPayload {
        &self.data
    }
    fn data_mut(&mut self) -> &mut DataPayload {
        &mut self.data
    }
    fn indexes(&self) -> &DataIndexes {
        &self.indexes
    }
    fn indexes_mut(&mut self) -> &mut DataIndexes {
        &mut self.indexes
    }
}

impl HasTimezone for DataTimeSlot {
    fn tz(&self) -> Tz {
        self.slot.start.tz
    }
    fn set_tz(&mut self, tz: Tz) {
        self.slot.start.tz = tz;
        self.slot.end.tz = tz;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    #[test]
    fn time_point_equality_ignores_timezone() {
        let a = TimePoint::new(100.0, Tz::UTC);
        let b = TimePoint::new(100.0, Tz::Europe__Rome);
        assert_eq!(a, b);
    }

    #[test]
    fn time_point_succession_is_strict() {
        let a = TimePoint::new(100.0, Tz::UTC);
        let b = TimePoint::new(100.0, Tz::UTC);
        let c = TimePoint::new(200.0, Tz::UTC);
        assert!(!b.succeeds(&a));
        assert!(c.succeeds(&a));
    }

    #[test]
    fn time_slot_rejects_mismatched_timezones() {
        let start = TimePoint::new(0.0, Tz::Europe__Rome);
        let end = TimePoint::new(60.0, Tz::UTC);
        let err = TimeSlot::new(start, end).unwrap_err();
        assert_eq!(err.kind(), "TimezoneError");
    }

    #[test]
    fn slot_succession_checks_start_equals_prev_end() {
        let a = TimeSlot::new(TimePoint::new(0.0, Tz::UTC), TimePoint::new(60.0, Tz::UTC)).unwrap();
        let b = TimeSlot::new(TimePoint::new(60.0, Tz::UTC), TimePoint::new(120.0, Tz::UTC)).unwrap();
        let c = TimeSlot::new(TimePoint::new(61.0, Tz::UTC), TimePoint::new(121.0, Tz::UTC)).unwrap();
        assert!(b.succeeds(&a));
        assert!(!c.succeeds(&a));
    }

    #[test]
    fn slot_rejects_non_increasing_endpoints() {
        let start = Point::new(vec![10.0]);
        let end = Point::new(vec![5.0]);
        assert!(Slot::new(start, end).is_err());
    }
}
