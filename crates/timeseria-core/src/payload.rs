//! The `data` payload carried by `DataPoint`/`DataTimePoint`/`DataSlot`/
//! `DataTimeSlot` elements, and the side-channel `data_indexes` (spec §3).

use crate::error::{Result, TimeseriaError};
use indexmap::IndexMap;

/// A data-shape fingerprint, captured at first append and compared cheaply
/// on every subsequent append to enforce I3 (Design Notes §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataShape {
    Vector(usize),
    Map(Vec<String>),
}

/// The element payload: either an ordered vector of reals, or a mapping
/// from string label to real whose keys are kept in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPayload {
    Vector(Vec<f64>),
    Map(IndexMap<String, f64>),
}

impl DataPayload {
    pub fn vector(values: impl Into<Vec<f64>>) -> Self {
        DataPayload::Vector(values.into())
    }

    pub fn scalar(value: f64) -> Self {
        DataPayload::Vector(vec![value])
    }

    pub fn map(entries: impl IntoIterator<Item = (String, f64)>) -> Self {
        DataPayload::Map(entries.into_iter().collect())
    }

    pub fn shape(&self) -> DataShape {
        match self {
            DataPayload::Vector(v) => DataShape::Vector(v.len()),
            DataPayload::Map(m) => DataShape::Map(m.keys().cloned().collect()),
        }
    }

    /// Canonical ordered labels: vector indices as strings, or mapping keys
    /// in insertion order (spec §4.B `data_labels()`).
    pub fn labels(&self) -> Vec<String> {
        match self {
            DataPayload::Vector(v) => (0..v.len()).map(|i| i.to_string()).collect(),
            DataPayload::Map(m) => m.keys().cloned().collect(),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        match self {
            DataPayload::Vector(v) => label.parse::<usize>().ok().and_then(|i| v.get(i)).copied(),
            DataPayload::Map(m) => m.get(label).copied(),
        }
    }

    pub fn set(&mut self, label: &str, value: f64) -> Result<()> {
        match self {
            DataPayload::Vector(v) => {
                let i = label.parse::<usize>().map_err(|_| {
                    TimeseriaError::Shape(format!("'{label}' is not a valid vector index"))
                })?;
                let slot = v.get_mut(i).ok_or_else(|| {
                    TimeseriaError::Shape(format!("index {i} out of range for vector payload"))
                })?;
                *slot = value;
                Ok(())
            }
            DataPayload::Map(m) => {
                if !m.contains_key(label) {
                    return Err(TimeseriaError::Shape(format!(
                        "label '{label}' is not part of this payload's shape"
                    )));
                }
                m.insert(label.to_string(), value);
                Ok(())
            }
        }
    }

    /// A payload of the same shape with every value set to zero, used when
    /// a resampled slot has zero coverage (spec §4.C step 3).
    pub fn zero_like(&self) -> DataPayload {
        match self {
            DataPayload::Vector(v) => DataPayload::Vector(vec![0.0; v.len()]),
            DataPayload::Map(m) => {
                DataPayload::Map(m.keys().map(|k| (k.clone(), 0.0)).collect())
            }
        }
    }
}

/// Per-element quality metadata, kept separate from `data` (spec §3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataIndexes {
    pub data_loss: Option<f64>,
    pub data_reconstructed: Option<f64>,
    pub anomaly: Option<f64>,
}

impl DataIndexes {
    pub fn with_data_loss(data_loss: f64) -> Self {
        Self {
            data_loss: Some(data_loss),
            ..Default::default()
        }
    }

    pub fn coverage(&self) -> Option<f64> {
        self.data_loss.map(|l| 1.0 - l)
    }
}
