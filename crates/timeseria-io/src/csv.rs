//! The CSV ingest contract (spec §6): a thin `(t, data)` record shape
//! supplied by an external collaborator. Parsing actual CSV files is out
//! of scope here; this module only adapts the collaborator's already-
//! parsed records into a `Series<DataTimePoint>`, surfacing `OrderError`
//! for the duplicate-timestamp case the contract explicitly allows the
//! source to produce.

use timeseria_core::{DataPayload, DataTimePoint, Result, Series, TimePoint};
use chrono_tz::Tz;

/// One ingested record: a `t` in epoch seconds and a scalar, vector, or
/// labeled-map payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    pub t: f64,
    pub data: RecordValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Map(Vec<(String, f64)>),
}

impl CsvRecord {
    pub fn scalar(t: f64, value: f64) -> Self {
        Self {
            t,
            data: RecordValue::Scalar(value),
        }
    }
}

fn to_payload(value: &RecordValue) -> DataPayload {
    match value {
        RecordValue::Scalar(v) => DataPayload::scalar(*v),
        RecordValue::Vector(v) => DataPayload::vector(v.clone()),
        RecordValue::Map(entries) => DataPayload::map(entries.iter().cloned()),
    }
}

/// Build a `Series<DataTimePoint>` from records assumed sorted ascending
/// by `t`; an out-of-order or duplicate `t` surfaces the engine's own
/// `OrderError` rather than being silently dropped or re-sorted.
pub fn to_series(records: &[CsvRecord], tz: Tz) -> Result<Series<DataTimePoint>> {
    let mut series = Series::new();
    for record in records {
        let point = TimePoint::new(record.t, tz);
        series.append(DataTimePoint::new(point, to_payload(&record.data)))?;
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingests_ascending_scalar_records() {
        let records = vec![CsvRecord::scalar(0.0, 1.0), CsvRecord::scalar(60.0, 2.0)];
        let series = to_series(&records, Tz::UTC).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn duplicate_timestamps_raise_order_error() {
        let records = vec![CsvRecord::scalar(0.0, 1.0), CsvRecord::scalar(0.0, 2.0)];
        let err = to_series(&records, Tz::UTC).unwrap_err();
        assert_eq!(err.kind(), "OrderError");
    }
}
