//! External-interface boundary for timeseria: model persistence and the
//! CSV ingest contract (spec §6). Kept separate from `timeseria-core` so
//! the engine itself stays free of filesystem and serialization concerns.

pub mod csv;
pub mod persistence;

pub use csv::{to_series, CsvRecord, RecordValue};
pub use persistence::{
    load_anomaly_detector, load_model, save_anomaly_detector, save_model, PersistenceError, Result,
};
