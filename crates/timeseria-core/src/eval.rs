//! Generic evaluation and cross-validation harness for the periodic-average
//! model (spec §4.F).

use crate::element::DataTimePoint;
use crate::error::{Result, TimeseriaError};
use crate::model::{FitOptions, PeriodicAverageModel};
use crate::series::Series;
use std::collections::BTreeMap;

/// Which of the model's two application modes to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Forecaster,
    Reconstructor,
}

#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    /// Forecast/reconstruction horizons to evaluate, in steps. `None`
    /// defaults to `[1, P]` if the model's periodicity is meaningful, else
    /// `[1, 2, 3]` (spec §4.F).
    pub steps: Option<Vec<usize>>,
    /// Caps the number of evaluated anchors per step.
    pub limit: Option<usize>,
    /// `data_loss` threshold used to select a reconstructor gap; unused for
    /// forecaster evaluation.
    pub theta_threshold: f64,
    /// When false, `per_step` is left empty and only `overall` is filled.
    pub details: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            steps: None,
            limit: None,
            theta_threshold: 1.0,
            details: true,
        }
    }
}

/// RMSE/MAE/MAPE over one step (or the overall pool) (spec §4.F).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepScores {
    pub rmse: f64,
    pub mae: f64,
    pub mape: f64,
}

#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub per_step: BTreeMap<usize, StepScores>,
    pub overall: StepScores,
    pub anchors_evaluated: usize,
}

/// Evaluate a fitted model against `series` over a set of step horizons
/// (spec §4.F `evaluate`).
pub fn evaluate(model: &PeriodicAverageModel, series: &Series<DataTimePoint>, role: Role, opts: &EvaluationOptions) -> Result<EvaluationResult> {
    if series.is_empty() {
        return Err(TimeseriaError::EmptySeries("cannot evaluate against an empty series".into()));
    }
    let steps = opts.steps.clone().unwrap_or_else(|| {
        if model.periodicity() > 1 {
            vec![1, model.periodicity()]
        } else {
            vec![1, 2, 3]
        }
    });

    let n = series.len();
    let window = model.window();
    let mut per_step = BTreeMap::new();
    let mut pool_errors = Vec::new();
    let mut pool_actuals = Vec::new();
    let mut total_anchors = 0usize;

    for &k in &steps {
        if k == 0 {
            continue;
        }
        let mut step_errors = Vec::new();
        let mut step_actuals = Vec::new();
        let mut anchors_used = 0usize;
        let mut anchors_available = 0usize;
        let mut i = if role == Role::Forecaster { window } else { 0 };

        while i + k <= n {
            anchors_available += 1;
            if let Some(limit) = opts.limit {
                if anchors_used >= limit {
                    break;
                }
            }
            let predicted = predict_window(model, series, role, i, k, opts.theta_threshold)?;
            let actual: Vec<f64> = series.as_slice()[i..i + k]
                .iter()
                .map(|e| e.data.get(model.label()).unwrap_or(0.0))
                .collect();
            for (p, a) in predicted.iter().zip(actual.iter()) {
                step_errors.push((p - a).abs());
                step_actuals.push(*a);
            }
            anchors_used += 1;
            i += 1;
        }

        if let Some(limit) = opts.limit {
            if anchors_available < limit {
                log::warn!(
                    "evaluate: only {anchors_available} anchors available for step {k} (limit {limit})"
                );
            }
        }

        total_anchors += anchors_used;
        if opts.details {
            per_step.insert(k, scores_of(&step_errors, &step_actuals));
        }
        pool_errors.extend(step_errors);
        pool_actuals.extend(step_actuals);
    }

    if total_anchors == 0 {
        return Err(TimeseriaError::InsufficientData { needed: 1, got: 0 });
    }

    Ok(EvaluationResult {
        per_step,
        overall: scores_of(&pool_errors, &pool_actuals),
        anchors_evaluated: total_anchors,
    })
}

fn predict_window(
    model: &PeriodicAverageModel,
    series: &Series<DataTimePoint>,
    role: Role,
    anchor: usize,
    k: usize,
    theta_threshold: f64,
) -> Result<Vec<f64>> {
    match role {
        Role::Forecaster => {
            let context = series.slice_by_index(anchor - model.window().min(anchor), anchor);
            let forecast = model.predict(&context, k)?;
            Ok(forecast
                .iter()
                .map(|e| e.data.get(model.label()).unwrap_or(0.0))
                .collect())
        }
        Role::Reconstructor => {
            // Unlike the forecaster branch, `reconstruct_gap` never looks
            // `model.window()` points back: `OffsetMethod::Average` only
            // touches elements inside the gap itself, and `Extremes` reads
            // exactly one neighbor on each side (`elements[lo-1]`,
            // `elements[hi]`). One point of lookback is everything either
            // strategy can use, so padding further out would just carry
            // dead weight through the window.
            let ctx_lo = anchor.saturating_sub(1);
            let ctx_hi = (anchor + k + 1).min(series.len());
            let mut ctx: Vec<DataTimePoint> = series.as_slice()[ctx_lo..ctx_hi].to_vec();
            let gap_lo = anchor - ctx_lo;
            let gap_hi = gap_lo + k;
            for e in ctx[gap_lo..gap_hi].iter_mut() {
                e.indexes.data_loss = Some(1.0);
            }
            let local = Series::from_validated(ctx);
            let reconstructed = model.reconstruct(&local, theta_threshold)?;
            Ok(reconstructed.as_slice()[gap_lo..gap_hi]
                .iter()
                .map(|e| e.data.get(model.label()).unwrap_or(0.0))
                .collect())
        }
    }
}

fn scores_of(abs_errors: &[f64], actuals: &[f64]) -> StepScores {
    if abs_errors.is_empty() {
        return StepScores::default();
    }
    let n = abs_errors.len() as f64;
    let mae = abs_errors.iter().sum::<f64>() / n;
    let rmse = (abs_errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
    let mut mape_sum = 0.0;
    let mut mape_count = 0usize;
    for (e, a) in abs_errors.iter().zip(actuals.iter()) {
        if a.abs() > 1e-12 {
            mape_sum += e / a.abs();
            mape_count += 1;
        }
    }
    let mape = if mape_count > 0 {
        100.0 * mape_sum / mape_count as f64
    } else {
        0.0
    };
    StepScores { rmse, mae, mape }
}

#[derive(Debug, Clone)]
pub struct CrossValidationOptions {
    pub rounds: usize,
    pub fit: FitOptions,
    pub evaluate: EvaluationOptions,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CrossValidationResult {
    pub mean: BTreeMap<&'static str, f64>,
    pub stdev: BTreeMap<&'static str, f64>,
}

/// Partition `series` into `rounds` contiguous folds; for each, fit on the
/// complement and evaluate on the fold; aggregate mean/sample-stdev per
/// metric across rounds (spec §4.F `cross_validate`).
pub fn cross_validate(series: &Series<DataTimePoint>, opts: CrossValidationOptions) -> Result<CrossValidationResult> {
    if opts.rounds == 0 {
        return Err(TimeseriaError::Unsupported("rounds must be >= 1".into()));
    }
    let n = series.len();
    let fold_size = n / opts.rounds;
    if fold_size == 0 {
        return Err(TimeseriaError::InsufficientData { needed: opts.rounds, got: n });
    }

    let mut rmses = Vec::with_capacity(opts.rounds);
    let mut maes = Vec::with_capacity(opts.rounds);
    let mut mapes = Vec::with_capacity(opts.rounds);

    for round in 0..opts.rounds {
        let lo = round * fold_size;
        let hi = if round == opts.rounds - 1 { n } else { lo + fold_size };

        let mut train_elements = series.as_slice()[..lo].to_vec();
        train_elements.extend_from_slice(&series.as_slice()[hi..]);
        let train = Series::from_validated(train_elements);
        let fold = series.slice_by_index(lo, hi);

        let model = PeriodicAverageModel::fit(&train, opts.fit.clone())?;
        let result = evaluate(&model, &fold, opts.role, &opts.evaluate)?;
        if result.anchors_evaluated < 2 {
            return Err(TimeseriaError::InsufficientData {
                needed: 2,
                got: result.anchors_evaluated,
            });
        }
        rmses.push(result.overall.rmse);
        maes.push(result.overall.mae);
        mapes.push(result.overall.mape);
    }

    let mut mean = BTreeMap::new();
    mean.insert("RMSE", mean_of(&rmses));
    mean.insert("MAE", mean_of(&maes));
    mean.insert("MAPE", mean_of(&mapes));

    let mut stdev = BTreeMap::new();
    stdev.insert("RMSE", sample_stdev(&rmses));
    stdev.insert("MAE", sample_stdev(&maes));
    stdev.insert("MAPE", sample_stdev(&mapes));

    Ok(CrossValidationResult { mean, stdev })
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean_of(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::TimePoint;
    use crate::model::FitOptions;
    use crate::payload::DataPayload;
    use approx::assert_relative_eq;
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
    fn forecaster_evaluation_on_an_exact_periodic_series_is_perfect() {
        let s = modulo_series(40, 4);
        let model = PeriodicAverageModel::fit(
            &s,
            FitOptions {
                periodicity: 4,
                window: Some(4),
                ..Default::default()
            },
        )
        .unwrap();
        let result = evaluate(&model, &s, Role::Forecaster, &EvaluationOptions::default()).unwrap();
        assert_relative_eq!(result.overall.rmse, 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.overall.mae, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn cross_validation_on_an_exact_periodic_series_has_zero_spread() {
        let s = modulo_series(40, 4);
        let result = cross_validate(
            &s,
            CrossValidationOptions {
                rounds: 4,
                fit: FitOptions {
                    periodicity: 4,
                    window: Some(4),
                    ..Default::default()
                },
                evaluate: EvaluationOptions::default(),
                role: Role::Forecaster,
            },
        )
        .unwrap();
        assert_relative_eq!(result.mean["RMSE"], 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.stdev["RMSE"], 0.0, epsilon = 1e-9);
    }
}
