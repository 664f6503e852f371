//! Portfolio return and risk metrics over a value series.

use crate::domain::error::EngineError;
use crate::domain::numeric::{mean, min_max, round2, round4, stddev};
use chrono::NaiveDate;
use serde::Serialize;

/// Rebalances happen weekly, so returns are annualized over 52 periods by
/// default.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 52.0;

const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    pub periods_per_year: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioMetrics {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub points: usize,
    /// Calendar days between the first and last point.
    pub days: i64,
    pub years: f64,
    /// `None` when the window spans zero days or the annualized growth
    /// overflows.
    pub cagr_pct: Option<f64>,
    pub absolute_return_pct: f64,
    /// Distance between the window's lowest and highest value, relative to
    /// the highest, regardless of which came first.
    pub max_drawdown_pct: f64,
    pub current_drawdown_pct: f64,
    /// Largest decline from a running peak.
    pub running_max_drawdown_pct: f64,
    /// Longest run of periods spent below the running peak.
    pub max_drawdown_duration: usize,
    pub sharpe: f64,
}

fn validate_points(points: &[PortfolioValuePoint]) -> Result<Vec<PortfolioValuePoint>, EngineError> {
    for point in points {
        if !point.value.is_finite() || point.value <= 0.0 {
            return Err(EngineError::invalid(format!(
                "portfolio value on {} must be positive, got {}",
                point.date, point.value
            )));
        }
    }

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.date);
    if let Some(pair) = sorted.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(EngineError::invalid(format!(
            "duplicate portfolio value date {}",
            pair[0].date
        )));
    }
    Ok(sorted)
}

fn period_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

fn running_drawdown(values: &[f64]) -> (f64, usize) {
    let Some(&first) = values.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut duration = 0usize;

    for &value in values {
        if value >= peak {
            peak = value;
            duration = 0;
        } else {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            duration += 1;
            if duration > max_duration {
                max_duration = duration;
            }
        }
    }

    (max_dd * 100.0, max_duration)
}

/// Compute metrics over the points dated within `from..=to`.
pub fn compute_metrics(
    points: &[PortfolioValuePoint],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    config: &MetricsConfig,
) -> Result<PortfolioMetrics, EngineError> {
    if !(config.periods_per_year.is_finite() && config.periods_per_year > 0.0) {
        return Err(EngineError::invalid(format!(
            "periods per year must be positive, got {}",
            config.periods_per_year
        )));
    }

    let window: Vec<PortfolioValuePoint> = validate_points(points)?
        .into_iter()
        .filter(|p| from.is_none_or(|d| p.date >= d) && to.is_none_or(|d| p.date <= d))
        .collect();

    let (first, last) = match (window.first(), window.last()) {
        (Some(first), Some(last)) if window.len() >= 2 => (*first, *last),
        _ => {
            return Err(EngineError::InsufficientData {
                subject: "portfolio value series".to_string(),
                have: window.len(),
                need: 2,
            });
        }
    };

    let values: Vec<f64> = window.iter().map(|p| p.value).collect();
    let days = (last.date - first.date).num_days();
    let years = days as f64 / DAYS_PER_YEAR;

    let cagr_pct = if days == 0 {
        None
    } else {
        Some(((last.value / first.value).powf(1.0 / years) - 1.0) * 100.0)
            .filter(|c| c.is_finite())
            .map(round2)
    };

    let absolute_return_pct = (last.value - first.value) / first.value * 100.0;

    let (low, high) = min_max(values.iter().copied()).unwrap_or((first.value, first.value));
    let max_drawdown_pct = (low - high).abs() / high * 100.0;
    let current_drawdown_pct = (last.value - high).abs() / high * 100.0;
    let (running_max_drawdown_pct, max_drawdown_duration) = running_drawdown(&values);

    let returns = period_returns(&values);
    let sd = stddev(&returns);
    let sharpe = if sd == 0.0 {
        0.0
    } else {
        mean(&returns) * config.periods_per_year / sd
    };

    Ok(PortfolioMetrics {
        start_date: first.date,
        end_date: last.date,
        points: window.len(),
        days,
        years: round4(years),
        cagr_pct,
        absolute_return_pct: round2(absolute_return_pct),
        max_drawdown_pct: round2(max_drawdown_pct),
        current_drawdown_pct: round2(current_drawdown_pct),
        running_max_drawdown_pct: round2(running_max_drawdown_pct),
        max_drawdown_duration,
        sharpe: round2(sharpe),
    })
}
