//! Persistence round-trip integration tests: fit a model in-core, persist
//! it through `timeseria-io`, reload it, and check fit-time results are
//! reproduced exactly.

use chrono_tz::Tz;
use timeseria_core::{
    AnomalyOptions, DataPayload, DataTimePoint, FitOptions, PeriodicAverageModel, Series, TimePoint,
};
use timeseria_io::{load_anomaly_detector, load_model, save_anomaly_detector, save_model};

fn modulo_series(n: usize, modulus: i64) -> Series<DataTimePoint> {
    modulo_series_with_override(n, modulus, None)
}

fn modulo_series_with_override(n: usize, modulus: i64, over: Option<(usize, f64)>) -> Series<DataTimePoint> {
    let mut s = Series::new();
    for i in 0..n {
        let v = match over {
            Some((idx, value)) if idx == i => value,
            _ => (i as i64 % modulus) as f64,
        };
        s.append(DataTimePoint::new(TimePoint::new(i as f64, Tz::UTC), DataPayload::scalar(v)))
            .unwrap();
    }
    s
}

#[test]
fn forecaster_predictions_match_before_and_after_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let s = modulo_series(20, 4);
    let model = PeriodicAverageModel::fit(
        &s,
        FitOptions {
            periodicity: 4,
            window: Some(4),
            ..Default::default()
        },
    )
    .unwrap();

    let id = save_model(dir.path(), &model, "2026-01-01T00:00:00Z").unwrap();
    let loaded = load_model(dir.path(), &id).unwrap();

    let before = model.predict(&s, 5).unwrap();
    let after = loaded.predict(&s, 5).unwrap();
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.data.get("0"), a.data.get("0"));
        assert_eq!(b.t(), a.t());
    }
}

#[test]
fn anomaly_detector_round_trips_with_nested_forecaster_directory() {
    let dir = tempfile::tempdir().unwrap();
    let s = modulo_series_with_override(80, 4, Some((50, 999.0)));

    let forecaster = PeriodicAverageModel::fit(
        &s,
        FitOptions {
            periodicity: 4,
            window: Some(4),
            ..Default::default()
        },
    )
    .unwrap();
    let detector = timeseria_core::AnomalyDetector::fit(forecaster, &s, 3.0).unwrap();

    let id = save_anomaly_detector(dir.path(), &detector, "2026-01-01T00:00:00Z").unwrap();
    assert!(dir.path().join(&id).join("data.json").exists());

    let loaded = load_anomaly_detector(dir.path(), &id).unwrap();
    assert_eq!(loaded.threshold(), detector.threshold());

    let before = detector.apply(&s, AnomalyOptions::default()).unwrap();
    let after = loaded.apply(&s, AnomalyOptions::default()).unwrap();
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.indexes.anomaly, a.indexes.anomaly);
    }
}
