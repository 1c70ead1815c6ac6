//! Error types for the timeseria engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, TimeseriaError>;

/// Error taxonomy for the engine (see the error handling design).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeseriaError {
    #[error("type error: {0}")]
    Type(String),

    #[error("shape error: {0}")]
    Shape(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("span error: {0}")]
    Span(String),

    #[error("timezone error: {0}")]
    Timezone(String),

    #[error("unit incompatible: {0}")]
    UnitIncompatible(String),

    #[error("empty series: {0}")]
    EmptySeries(String),

    #[error("model not fitted: {0}")]
    NotFitted(String),

    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl TimeseriaError {
    /// Stable taxonomy label, for the rare caller that dispatches on kind
    /// rather than matching the enum directly.
    pub fn kind(&self) -> &'static str {
        match self {
            TimeseriaError::Type(_) => "TypeError",
            TimeseriaError::Shape(_) => "ShapeError",
            TimeseriaError::Order(_) => "OrderError",
            TimeseriaError::Span(_) => "SpanError",
            TimeseriaError::Timezone(_) => "TimezoneError",
            TimeseriaError::UnitIncompatible(_) => "UnitIncompatibleError",
            TimeseriaError::EmptySeries(_) => "EmptySeriesError",
            TimeseriaError::NotFitted(_) => "NotFittedError",
            TimeseriaError::InsufficientData { .. } => "InsufficientDataError",
            TimeseriaError::Unsupported(_) => "UnsupportedError",
        }
    }
}
