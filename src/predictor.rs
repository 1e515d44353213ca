// src/predictor.rs
use crate::config::PredictorSettings;
use crate::error::{AppError, Result};
use crate::models::{LaggedRow, ModelFit, PredictionResult, PriceSeries, Suggestion};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Ordinary least squares line `close = slope * previous_close + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearRegression {
    /// Fits on the centered data. A constant predictor gives slope 0 and the
    /// mean close as intercept.
    pub fn fit(rows: &[LaggedRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(AppError::InsufficientData(
                "cannot fit a regression on zero rows".to_string(),
            ));
        }
        let n = rows.len() as f64;
        let mean_x = rows.iter().map(|r| r.previous_close).sum::<f64>() / n;
        let mean_y = rows.iter().map(|r| r.close).sum::<f64>() / n;

        let (sxx, sxy) = rows.iter().fold((0.0, 0.0), |(sxx, sxy), r| {
            let dx = r.previous_close - mean_x;
            (sxx + dx * dx, sxy + dx * (r.close - mean_y))
        });

        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        Ok(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn predict(&self, previous_close: f64) -> f64 {
        self.slope * previous_close + self.intercept
    }
}

/// Shuffles rows with a seeded RNG and holds out `ceil(len * test_fraction)`
/// of them. Returns `(train, test)`.
pub fn train_test_split(
    rows: &[LaggedRow],
    test_fraction: f64,
    seed: u64,
) -> (Vec<LaggedRow>, Vec<LaggedRow>) {
    let test_len = if test_fraction > 0.0 {
        ((rows.len() as f64 * test_fraction).ceil() as usize).min(rows.len().saturating_sub(1))
    } else {
        0
    };

    let mut shuffled = rows.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let train = shuffled.split_off(test_len);
    (train, shuffled)
}

/// R² and RMSE of `model` on `rows`; `None` when there are fewer than two
/// rows or the closes have no variance.
pub fn score(model: &LinearRegression, rows: &[LaggedRow]) -> (Option<f64>, Option<f64>) {
    if rows.is_empty() {
        return (None, None);
    }
    let n = rows.len() as f64;
    let ss_res: f64 = rows
        .iter()
        .map(|r| (r.close - model.predict(r.previous_close)).powi(2))
        .sum();
    let rmse = Some((ss_res / n).sqrt());

    if rows.len() < 2 {
        return (None, rmse);
    }
    let mean = rows.iter().map(|r| r.close).sum::<f64>() / n;
    let ss_tot: f64 = rows.iter().map(|r| (r.close - mean).powi(2)).sum();
    let r2 = if ss_tot > 0.0 {
        Some(1.0 - ss_res / ss_tot)
    } else {
        None
    };
    (r2, rmse)
}

/// Fits the one-lag regression on `series` and predicts the close after the
/// last observed one.
pub fn predict_next_close(
    series: &PriceSeries,
    settings: &PredictorSettings,
) -> Result<(PredictionResult, ModelFit)> {
    let rows = series.lagged();
    if rows.len() < 2 {
        return Err(AppError::InsufficientData(format!(
            "{} has {} usable rows, need at least 2",
            series.ticker,
            rows.len()
        )));
    }

    let (train, test) = train_test_split(&rows, settings.test_fraction, settings.seed);
    let model = LinearRegression::fit(&train)?;
    let (test_r2, test_rmse) = score(&model, &test);

    let last_close = rows[rows.len() - 1].close;
    let predicted_next_close = model.predict(last_close);
    debug!(
        "{}: slope={:.6} intercept={:.6} train={} test={} next={:.4}",
        series.ticker,
        model.slope,
        model.intercept,
        train.len(),
        test.len(),
        predicted_next_close
    );

    let prediction = PredictionResult {
        last_close,
        predicted_next_close,
        suggestion: Suggestion::from_prediction(predicted_next_close, last_close),
    };
    let fit = ModelFit {
        slope: model.slope,
        intercept: model.intercept,
        train_rows: train.len(),
        test_rows: test.len(),
        test_r2,
        test_rmse,
    };
    Ok((prediction, fit))
}
