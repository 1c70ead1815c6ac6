//! Core engine for regular time series analysis: typed, succession-checked
//! series containers; resampling from irregular points to uniform slots;
//! FFT-based periodicity detection; a periodic-average model with fit,
//! reconstruction, and forecasting; a generic evaluation/cross-validation
//! harness; and a residual-based anomaly detector.

pub mod anomaly;
pub mod element;
pub mod error;
pub mod eval;
pub mod model;
pub mod payload;
pub mod periodicity;
pub mod resample;
pub mod sampling;
pub mod series;
pub mod tz;
pub mod units;

pub use anomaly::{detect_anomalies, AnomalyDetector, AnomalyOptions};
pub use element::{
    DataPoint, DataSlot, DataTimePoint, DataTimeSlot, HasData, HasTimezone, Point, SeriesElement,
    Slot, Spanned, TimePoint, TimeSlot, Timed,
};
pub use error::{Result, TimeseriaError};
pub use eval::{
    cross_validate, evaluate, CrossValidationOptions, CrossValidationResult, EvaluationOptions,
    EvaluationResult, Role, StepScores,
};
pub use model::{FitOptions, OffsetMethod, PeriodicAverageModel};
pub use payload::{DataIndexes, DataPayload, DataShape};
pub use periodicity::detect_periodicity;
pub use resample::resample;
pub use series::{Resolution, Series};
pub use tz::timezonize;
pub use units::{CalendarKind, CalendarUnit, PhysicalUnit, Unit};
