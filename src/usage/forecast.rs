//! Daily cost forecasting
//!
//! Two models over a daily credit series:
//!
//! - `Linear`: least-squares line against the day index, with a fixed
//!   relative band around each prediction.
//! - `Seasonal`: the same trend plus additive day-of-week offsets estimated
//!   from the detrended residuals, with a 95 % band from the residual spread.
//!
//! A forecast is only produced from at least a week of history; shorter
//! series yield an empty forecast rather than an error.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Days of history below which no forecast is produced
pub const MIN_HISTORY_DAYS: usize = 7;
/// Days of history the seasonal model needs (two full weeks)
pub const MIN_SEASONAL_DAYS: usize = 14;
/// Trailing window of history that is fitted
pub const FIT_WINDOW_DAYS: i64 = 30;
/// Longest horizon that is predicted
pub const MAX_HORIZON_DAYS: usize = 365;
/// z-score of a two-sided 95 % interval
const Z_95: f64 = 1.96;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMethod {
    #[default]
    Linear,
    Seasonal,
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastMethod::Linear => write!(f, "linear"),
            ForecastMethod::Seasonal => write!(f, "seasonal"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ForecastError {
    #[error("Insufficient history: {days} days, need at least {required}")]
    InsufficientHistory { days: usize, required: usize },

    #[error("Cannot fit model: {0}")]
    Degenerate(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub method_used: ForecastMethod,
    pub points: Vec<ForecastPoint>,
    /// Goodness of fit on the history, 0.0 when nothing was fitted
    pub r_squared: f64,
}

impl Forecast {
    fn empty(method: ForecastMethod) -> Self {
        Self {
            method_used: method,
            points: Vec::new(),
            r_squared: 0.0,
        }
    }

    /// True when history was too short to predict anything
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_predicted(&self) -> f64 {
        self.points.iter().map(|p| p.predicted).sum()
    }
}

/// Least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a first-degree polynomial to `(x, y)` points
pub fn fit_linear(points: &[(f64, f64)]) -> Result<LinearFit, ForecastError> {
    if points.len() < 2 {
        return Err(ForecastError::InsufficientHistory {
            days: points.len(),
            required: 2,
        });
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(ForecastError::Degenerate("non-finite value in series".into()));
    }

    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.0).sum();
    let sum_y: f64 = points.iter().map(|p| p.1).sum();
    let sum_xx: f64 = points.iter().map(|p| p.0 * p.0).sum();
    let sum_xy: f64 = points.iter().map(|p| p.0 * p.1).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return Err(ForecastError::Degenerate("all points share one x value".into()));
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| (p.1 - (slope * p.0 + intercept)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    } else {
        1.0
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Configured forecaster; cheap to build, holds no fitted state
#[derive(Debug, Clone)]
pub struct Forecaster {
    method: ForecastMethod,
    horizon: usize,
    min_history: usize,
    band: f64,
}

impl Forecaster {
    pub fn new(method: ForecastMethod) -> Self {
        Self {
            method,
            horizon: 7,
            min_history: MIN_HISTORY_DAYS,
            band: 0.1,
        }
    }

    /// Number of days to predict, at most `MAX_HORIZON_DAYS`
    pub fn with_horizon(mut self, days: usize) -> Self {
        self.horizon = days.min(MAX_HORIZON_DAYS);
        self
    }

    /// Days of history required before anything is predicted; a line
    /// needs at least two points
    pub fn with_min_history(mut self, days: usize) -> Self {
        self.min_history = days.max(2);
        self
    }

    /// Relative half-width of the linear band (0.1 = ±10 %)
    pub fn with_band(mut self, band: f64) -> Self {
        self.band = band.abs();
        self
    }

    /// Predict the days following the last date of `history`.
    ///
    /// `history` must be date-ordered with one value per day (as produced by
    /// `UsageSummary::daily_series`). Short or unusable history gives an
    /// empty forecast.
    pub fn forecast(&self, history: &[(NaiveDate, f64)]) -> Forecast {
        let window = fit_window(history);
        if window.len() < self.min_history {
            log::warn!(
                "{}",
                ForecastError::InsufficientHistory {
                    days: window.len(),
                    required: self.min_history,
                }
            );
            return Forecast::empty(self.method);
        }

        if self.method == ForecastMethod::Seasonal {
            match self.seasonal(window) {
                Ok(forecast) => return forecast,
                Err(e) => log::debug!("Seasonal model unavailable, using linear trend: {}", e),
            }
        }

        match self.linear(window) {
            Ok(forecast) => forecast,
            Err(e) => {
                log::warn!("Forecast failed: {}", e);
                Forecast::empty(ForecastMethod::Linear)
            }
        }
    }

    fn linear(&self, window: &[(NaiveDate, f64)]) -> Result<Forecast, ForecastError> {
        let origin = window[0].0;
        let fit = fit_linear(&to_points(window, origin))?;
        let last = window[window.len() - 1].0;

        let points = (1..=self.horizon)
            .map(|step| {
                let date = last + Duration::days(step as i64);
                let predicted = fit.predict(day_index(date, origin)).max(0.0);
                ForecastPoint {
                    date,
                    predicted,
                    lower: (predicted * (1.0 - self.band)).max(0.0),
                    upper: predicted * (1.0 + self.band),
                }
            })
            .collect();

        Ok(Forecast {
            method_used: ForecastMethod::Linear,
            points,
            r_squared: fit.r_squared,
        })
    }

    fn seasonal(&self, window: &[(NaiveDate, f64)]) -> Result<Forecast, ForecastError> {
        if window.len() < MIN_SEASONAL_DAYS {
            return Err(ForecastError::InsufficientHistory {
                days: window.len(),
                required: MIN_SEASONAL_DAYS,
            });
        }

        let origin = window[0].0;
        let trend = fit_linear(&to_points(window, origin))?;

        let mut sums = [0.0_f64; 7];
        let mut counts = [0_usize; 7];
        for (date, value) in window {
            let weekday = date.weekday().num_days_from_monday() as usize;
            sums[weekday] += value - trend.predict(day_index(*date, origin));
            counts[weekday] += 1;
        }
        if counts.contains(&0) {
            return Err(ForecastError::Degenerate(
                "history does not cover every weekday".into(),
            ));
        }

        let mut offsets = [0.0_f64; 7];
        for (i, offset) in offsets.iter_mut().enumerate() {
            *offset = sums[i] / counts[i] as f64;
        }
        let mean_offset = offsets.iter().sum::<f64>() / 7.0;
        for offset in &mut offsets {
            *offset -= mean_offset;
        }

        let model = |date: NaiveDate| {
            trend.predict(day_index(date, origin))
                + offsets[date.weekday().num_days_from_monday() as usize]
        };

        let n = window.len() as f64;
        let mean_y = window.iter().map(|(_, v)| v).sum::<f64>() / n;
        let ss_res: f64 = window.iter().map(|(d, v)| (v - model(*d)).powi(2)).sum();
        let ss_tot: f64 = window.iter().map(|(_, v)| (v - mean_y).powi(2)).sum();
        let sigma = (ss_res / n).sqrt();
        let r_squared = if ss_tot > 0.0 {
            (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let last = window[window.len() - 1].0;
        let points = (1..=self.horizon)
            .map(|step| {
                let date = last + Duration::days(step as i64);
                let predicted = model(date).max(0.0);
                ForecastPoint {
                    date,
                    predicted,
                    lower: (predicted - Z_95 * sigma).max(0.0),
                    upper: predicted + Z_95 * sigma,
                }
            })
            .collect();

        Ok(Forecast {
            method_used: ForecastMethod::Seasonal,
            points,
            r_squared,
        })
    }
}

/// Trailing slice of `history` within `FIT_WINDOW_DAYS` of its last date
fn fit_window(history: &[(NaiveDate, f64)]) -> &[(NaiveDate, f64)] {
    let Some((last, _)) = history.last() else {
        return history;
    };
    let cutoff = *last - Duration::days(FIT_WINDOW_DAYS);
    let start = history.partition_point(|(date, _)| *date <= cutoff);
    &history[start..]
}

fn day_index(date: NaiveDate, origin: NaiveDate) -> f64 {
    (date - origin).num_days() as f64
}

fn to_points(window: &[(NaiveDate, f64)], origin: NaiveDate) -> Vec<(f64, f64)> {
    window
        .iter()
        .map(|(date, value)| (day_index(*date, origin), *value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(start: NaiveDate, values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect()
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn test_fit_linear_exact_line() {
        let fit = fit_linear(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_linear_degenerate_inputs() {
        assert!(matches!(
            fit_linear(&[(0.0, 1.0)]),
            Err(ForecastError::InsufficientHistory { .. })
        ));
        assert!(matches!(
            fit_linear(&[(1.0, 1.0), (1.0, 2.0)]),
            Err(ForecastError::Degenerate(_))
        ));
        assert!(matches!(
            fit_linear(&[(0.0, f64::NAN), (1.0, 2.0)]),
            Err(ForecastError::Degenerate(_))
        ));
    }

    #[test]
    fn test_short_history_gives_empty_forecast() {
        let history = series(jan(1), &[10.0; 6]);
        let forecast = Forecaster::new(ForecastMethod::Linear).forecast(&history);
        assert!(forecast.is_empty());
        assert!(Forecaster::new(ForecastMethod::Linear).forecast(&[]).is_empty());

        let relaxed = Forecaster::new(ForecastMethod::Linear)
            .with_min_history(3)
            .forecast(&history);
        assert_eq!(relaxed.points.len(), 7);
    }

    #[test]
    fn test_horizon_is_capped() {
        let history = series(jan(1), &[10.0; 10]);
        let forecast = Forecaster::new(ForecastMethod::Linear)
            .with_horizon(usize::MAX)
            .forecast(&history);
        assert_eq!(forecast.points.len(), MAX_HORIZON_DAYS);
    }

    #[test]
    fn test_linear_forecast_extends_trend() {
        let values: Vec<f64> = (0..10).map(|i| 100.0 + 10.0 * i as f64).collect();
        let history = series(jan(1), &values);

        let forecast = Forecaster::new(ForecastMethod::Linear)
            .with_horizon(3)
            .forecast(&history);

        assert_eq!(forecast.method_used, ForecastMethod::Linear);
        assert_eq!(forecast.points.len(), 3);
        assert_eq!(forecast.points[0].date, jan(11));
        assert!((forecast.points[0].predicted - 200.0).abs() < 1e-6);
        assert!((forecast.points[0].lower - 180.0).abs() < 1e-6);
        assert!((forecast.points[0].upper - 220.0).abs() < 1e-6);
        assert!((forecast.points[2].predicted - 220.0).abs() < 1e-6);
    }

    #[test]
    fn test_default_horizon_is_a_week() {
        let history = series(jan(1), &[5.0; 7]);
        let forecast = Forecaster::new(ForecastMethod::Linear).forecast(&history);
        assert_eq!(forecast.points.len(), 7);
        assert!(forecast.points.iter().all(|p| (p.predicted - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_predictions_never_negative() {
        let values: Vec<f64> = (0..10).map(|i| 90.0 - 10.0 * i as f64).collect();
        let forecast = Forecaster::new(ForecastMethod::Linear)
            .with_horizon(5)
            .forecast(&series(jan(1), &values));
        assert!(forecast.points.iter().all(|p| p.predicted >= 0.0 && p.lower >= 0.0));
    }

    #[test]
    fn test_only_last_thirty_days_are_fitted() {
        // A huge early plateau followed by 30 flat days must not tilt the fit
        let mut values = vec![1000.0; 20];
        values.extend(std::iter::repeat_n(10.0, 30));
        let forecast = Forecaster::new(ForecastMethod::Linear)
            .with_horizon(1)
            .forecast(&series(jan(1), &values));
        assert!((forecast.points[0].predicted - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_seasonal_captures_weekly_pattern() {
        // 2025-01-06 is a Monday; weekends are cheap
        let values: Vec<f64> = (0..28)
            .map(|i| if i % 7 >= 5 { 20.0 } else { 100.0 })
            .collect();
        let history = series(jan(6), &values);

        let forecast = Forecaster::new(ForecastMethod::Seasonal)
            .with_horizon(7)
            .forecast(&history);

        assert_eq!(forecast.method_used, ForecastMethod::Seasonal);
        assert_eq!(forecast.points.len(), 7);
        // Next days are Monday..Sunday
        let weekday = forecast.points[0].predicted;
        let weekend = forecast.points[5].predicted;
        assert!(weekday > weekend + 50.0);
        assert!(forecast.points.iter().all(|p| p.lower <= p.predicted && p.predicted <= p.upper));
    }

    #[test]
    fn test_seasonal_falls_back_to_linear_on_short_history() {
        let history = series(jan(1), &[10.0; 10]);
        let forecast = Forecaster::new(ForecastMethod::Seasonal).forecast(&history);
        assert_eq!(forecast.method_used, ForecastMethod::Linear);
        assert_eq!(forecast.points.len(), 7);
    }

    #[test]
    fn test_method_parses_from_config_text() {
        let method: ForecastMethod = serde_json::from_str("\"seasonal\"").unwrap();
        assert_eq!(method, ForecastMethod::Seasonal);
        assert_eq!(ForecastMethod::Linear.to_string(), "linear");
    }
}
