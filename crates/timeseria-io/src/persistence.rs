//! Model persistence: `<model-id>/data.json` bundles (spec §6).
//!
//! A fitted `PeriodicAverageModel` is persisted as a directory named after
//! a UUIDv4 model id, containing one `data.json` file with the fitted
//! parameter bundle. An `AnomalyDetector` directory additionally contains
//! a nested `<forecaster-id>/` subdirectory holding its wrapped
//! forecaster's own bundle, with `forecaster_id` in the parent JSON
//! locating it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use timeseria_core::{AnomalyDetector, DataShape, OffsetMethod, PeriodicAverageModel, TimeseriaError};
use uuid::Uuid;

/// Errors from the persistence boundary: either an engine error propagated
/// unchanged, or an I/O/serialization failure at the filesystem edge.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Engine(#[from] TimeseriaError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed model bundle: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

#[derive(Debug, Serialize, Deserialize)]
struct ShapeRecord {
    kind: String,
    len: Option<usize>,
    keys: Option<Vec<String>>,
}

impl From<&DataShape> for ShapeRecord {
    fn from(shape: &DataShape) -> Self {
        match shape {
            DataShape::Vector(len) => ShapeRecord {
                kind: "vector".to_string(),
                len: Some(*len),
                keys: None,
            },
            DataShape::Map(keys) => ShapeRecord {
                kind: "map".to_string(),
                len: None,
                keys: Some(keys.clone()),
            },
        }
    }
}

impl ShapeRecord {
    fn into_shape(self) -> Result<DataShape> {
        match self.kind.as_str() {
            "vector" => Ok(DataShape::Vector(self.len.ok_or_else(|| {
                PersistenceError::Malformed("vector shape record is missing 'len'".into())
            })?)),
            "map" => Ok(DataShape::Map(self.keys.ok_or_else(|| {
                PersistenceError::Malformed("map shape record is missing 'keys'".into())
            })?)),
            other => Err(PersistenceError::Malformed(format!("unknown shape kind '{other}'"))),
        }
    }
}

/// The on-disk `data.json` bundle for a fitted `PeriodicAverageModel`
/// (spec §6 Model persistence).
#[derive(Debug, Serialize, Deserialize)]
struct ModelRecord {
    id: String,
    fitted_at: String,
    periodicity: usize,
    resolution_s: f64,
    dst_affected: bool,
    averages: BTreeMap<String, f64>,
    window: usize,
    label: String,
    shape: ShapeRecord,
    stdev: Option<f64>,
    #[serde(rename = "AE_threshold")]
    ae_threshold: Option<f64>,
    offset_method: String,
}

fn offset_method_to_str(m: OffsetMethod) -> &'static str {
    match m {
        OffsetMethod::Average => "average",
        OffsetMethod::Extremes => "extremes",
    }
}

fn offset_method_from_str(s: &str) -> Result<OffsetMethod> {
    match s {
        "average" => Ok(OffsetMethod::Average),
        "extremes" => Ok(OffsetMethod::Extremes),
        other => Err(PersistenceError::Malformed(format!("unknown offset method '{other}'"))),
    }
}

fn to_record(model: &PeriodicAverageModel, id: &str, fitted_at: &str) -> ModelRecord {
    let averages = model
        .averages()
        .iter()
        .map(|(phase, avg)| (phase.to_string(), *avg))
        .collect();
    ModelRecord {
        id: id.to_string(),
        fitted_at: fitted_at.to_string(),
        periodicity: model.periodicity(),
        resolution_s: model.resolution_s(),
        dst_affected: model.dst_affected(),
        averages,
        window: model.window(),
        label: model.label().to_string(),
        shape: ShapeRecord::from(model.shape()),
        stdev: model.stdev(),
        ae_threshold: model.ae_threshold(),
        offset_method: offset_method_to_str(model.offset_method()).to_string(),
    }
}

fn from_record(record: ModelRecord) -> Result<PeriodicAverageModel> {
    let mut averages = BTreeMap::new();
    for (phase_str, avg) in record.averages {
        let phase: usize = phase_str
            .parse()
            .map_err(|_| PersistenceError::Malformed(format!("non-numeric phase key '{phase_str}'")))?;
        averages.insert(phase, avg);
    }
    Ok(PeriodicAverageModel::from_parts(
        record.periodicity,
        record.resolution_s,
        record.dst_affected,
        averages,
        record.window,
        offset_method_from_str(&record.offset_method)?,
        record.label,
        record.shape.into_shape()?,
        record.stdev,
        record.ae_threshold,
    ))
}

fn data_json_path(model_dir: &Path) -> PathBuf {
    model_dir.join("data.json")
}

/// Persist `model` under `base_dir/<new-uuid>/data.json`, returning the
/// generated model id.
pub fn save_model(base_dir: &Path, model: &PeriodicAverageModel, fitted_at: &str) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let dir = base_dir.join(&id);
    fs::create_dir_all(&dir)?;
    let record = to_record(model, &id, fitted_at);
    let json = serde_json::to_string_pretty(&record)?;
    fs::write(data_json_path(&dir), json)?;
    Ok(id)
}

/// Load a model previously persisted by `save_model`.
pub fn load_model(base_dir: &Path, model_id: &str) -> Result<PeriodicAverageModel> {
    let dir = base_dir.join(model_id);
    let json = fs::read_to_string(data_json_path(&dir))?;
    let record: ModelRecord = serde_json::from_str(&json)?;
    from_record(record)
}

#[derive(Debug, Serialize, Deserialize)]
struct AnomalyDetectorRecord {
    id: String,
    fitted_at: String,
    forecaster_id: String,
    mean: f64,
    stdev: f64,
    threshold: f64,
}

/// Persist an `AnomalyDetector` under `base_dir/<new-uuid>/data.json`, with
/// its wrapped forecaster saved alongside in a nested `<forecaster-id>/`
/// directory (spec §6).
pub fn save_anomaly_detector(base_dir: &Path, detector: &AnomalyDetector, fitted_at: &str) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let dir = base_dir.join(&id);
    fs::create_dir_all(&dir)?;

    let forecaster_id = save_model(&dir, detector.forecaster(), fitted_at)?;

    let record = AnomalyDetectorRecord {
        id: id.clone(),
        fitted_at: fitted_at.to_string(),
        forecaster_id,
        mean: detector.mean(),
        stdev: detector.stdev(),
        threshold: detector.threshold(),
    };
    let json = serde_json::to_string_pretty(&record)?;
    fs::write(data_json_path(&dir), json)?;
    Ok(id)
}

/// Load an anomaly detector previously persisted by `save_anomaly_detector`.
pub fn load_anomaly_detector(base_dir: &Path, detector_id: &str) -> Result<AnomalyDetector> {
    let dir = base_dir.join(detector_id);
    let json = fs::read_to_string(data_json_path(&dir))?;
    let record: AnomalyDetectorRecord = serde_json::from_str(&json)?;
    let forecaster = load_model(&dir, &record.forecaster_id)?;
    Ok(AnomalyDetector::from_parts(forecaster, record.mean, record.stdev, record.threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeseria_core::{DataPayload, DataTimePoint, FitOptions, Series, TimePoint};
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
    fn model_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let s = modulo_series(12, 4);
        let model = PeriodicAverageModel::fit(
            &s,
            FitOptions {
                periodicity: 4,
                ..Default::default()
            },
        )
        .unwrap();

        let id = save_model(dir.path(), &model, "2026-01-01T00:00:00Z").unwrap();
        let loaded = load_model(dir.path(), &id).unwrap();

        assert_eq!(loaded.periodicity(), model.periodicity());
        assert_eq!(loaded.averages(), model.averages());
        assert_eq!(loaded.label(), model.label());
    }
}
