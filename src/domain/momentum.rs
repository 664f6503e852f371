//! Momentum scoring.
//!
//! Every strategy scores the last 21 bars (about a trading month) and the last
//! 63 bars (about a trading quarter), then blends them:
//!
//! ```text
//! score(w)       = 100 * (value - low) / (high - low)    0 when high == low
//! score_smoothed = 0.6 * score(21) + 0.4 * score(63)
//! ```
//!
//! - Close based: value = last close, range = [min close, max close]
//! - True range: value = last close, range = [min low, max high]
//! - Combined: mean of the close based and true range scores per window
//! - Physics (mass x velocity): mass-weighted mean log return over the window,
//!   `sum(ln(c[i]/c[i-1]) * c[i] * v[i]) / sum(c[i] * v[i])`, unscaled.
//!   Not normalized; do not compare it with the other three on one scale.
//!
//! Window scores keep full precision until they are emitted; emitted scores
//! are rounded to 2 decimals and the trend compares the emitted values.

use crate::domain::error::EngineError;
use crate::domain::numeric::{min_max, round2};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::SymbolSeries;
use crate::domain::strategy::StrategyKind;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const SHORT_WINDOW: usize = 21;
pub const LONG_WINDOW: usize = 63;
pub const SHORT_WEIGHT: f64 = 0.6;
pub const LONG_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn classify(short: f64, long: f64) -> Self {
        if short > long {
            Trend::Up
        } else if short < long {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "Up"),
            Trend::Down => write!(f, "Down"),
            Trend::Flat => write!(f, "Flat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub score_21: f64,
    pub score_63: f64,
    pub score_smoothed: f64,
    pub trend: Trend,
}

/// Score one symbol's bars. Bars may arrive in any order.
pub fn score(
    symbol: &str,
    bars: &[OhlcvBar],
    strategy: StrategyKind,
) -> Result<ScoreResult, EngineError> {
    let series = SymbolSeries::new(symbol, bars)?;
    score_series(&series, strategy)
}

pub fn score_series(
    series: &SymbolSeries<'_>,
    strategy: StrategyKind,
) -> Result<ScoreResult, EngineError> {
    series.require(LONG_WINDOW)?;

    let (raw_short, raw_long) = match strategy {
        StrategyKind::PhysicsMv => {
            let velocity = velocities(series.bars());
            (
                physics_score(series.bars(), &velocity, SHORT_WINDOW),
                physics_score(series.bars(), &velocity, LONG_WINDOW),
            )
        }
        _ => (
            window_score(series.tail(SHORT_WINDOW), strategy),
            window_score(series.tail(LONG_WINDOW), strategy),
        ),
    };

    let score_21 = round2(raw_short);
    let score_63 = round2(raw_long);

    Ok(ScoreResult {
        symbol: series.symbol().to_string(),
        strategy,
        score_21,
        score_63,
        score_smoothed: round2(SHORT_WEIGHT * raw_short + LONG_WEIGHT * raw_long),
        trend: Trend::classify(score_21, score_63),
    })
}

fn normalize(value: f64, low: f64, high: f64) -> f64 {
    if high == low {
        0.0
    } else {
        100.0 * (value - low) / (high - low)
    }
}

fn window_score(window: &[&OhlcvBar], strategy: StrategyKind) -> f64 {
    match strategy {
        StrategyKind::CloseBased => close_score(window),
        StrategyKind::TrueRange => true_range_score(window),
        StrategyKind::Combined => (close_score(window) + true_range_score(window)) / 2.0,
        // Physics needs the bar preceding the window; scored separately.
        StrategyKind::PhysicsMv => 0.0,
    }
}

fn close_score(window: &[&OhlcvBar]) -> f64 {
    let Some(last) = window.last() else {
        return 0.0;
    };
    match min_max(window.iter().map(|b| b.close)) {
        Some((low, high)) => normalize(last.close, low, high),
        None => 0.0,
    }
}

fn true_range_score(window: &[&OhlcvBar]) -> f64 {
    let Some(last) = window.last() else {
        return 0.0;
    };
    let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    normalize(last.close, low, high)
}

/// Log return per bar; the first bar of the series has velocity 0.
fn velocities(bars: &[&OhlcvBar]) -> Vec<f64> {
    let mut velocity = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        if i == 0 {
            velocity.push(0.0);
        } else {
            velocity.push(bars[i].close.ln() - bars[i - 1].close.ln());
        }
    }
    velocity
}

fn physics_score(bars: &[&OhlcvBar], velocity: &[f64], window: usize) -> f64 {
    let start = bars.len().saturating_sub(window);
    let mut momentum = 0.0;
    let mut total_mass = 0.0;
    for i in start..bars.len() {
        let mass = bars[i].mass();
        momentum += velocity[i] * mass;
        total_mass += mass;
    }
    if total_mass == 0.0 {
        0.0
    } else {
        momentum / total_mass
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    InsufficientBars { bars: usize, need: usize },
    InvalidData { reason: String },
    Unavailable { reason: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientBars { bars, need } => {
                write!(f, "insufficient bars ({bars} of {need})")
            }
            SkipReason::InvalidData { reason } => write!(f, "invalid data: {reason}"),
            SkipReason::Unavailable { reason } => write!(f, "unavailable: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

/// Scores for a whole universe plus the symbols that could not be scored.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBoard {
    pub strategy: StrategyKind,
    pub scores: Vec<ScoreResult>,
    pub skipped: Vec<SkippedSymbol>,
}

impl From<EngineError> for SkipReason {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InsufficientData { have, need, .. } => {
                SkipReason::InsufficientBars { bars: have, need }
            }
            EngineError::Unavailable { reason } => SkipReason::Unavailable { reason },
            other => SkipReason::InvalidData {
                reason: other.to_string(),
            },
        }
    }
}

impl ScoreBoard {
    /// Record a symbol that never reached the scorer, e.g. a failed fetch.
    pub fn skip(&mut self, symbol: &str, reason: SkipReason) {
        self.skipped.push(SkippedSymbol {
            symbol: symbol.to_string(),
            reason,
        });
        self.skipped.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    }

    pub fn mark_unavailable(&mut self, symbol: &str, reason: impl Into<String>) {
        self.skip(
            symbol,
            SkipReason::Unavailable {
                reason: reason.into(),
            },
        );
    }
}

/// Score every symbol of an already-fetched universe in parallel.
pub fn score_universe(
    universe: &BTreeMap<String, Vec<OhlcvBar>>,
    strategy: StrategyKind,
) -> ScoreBoard {
    let outcomes: Vec<(&String, Result<ScoreResult, EngineError>)> = universe
        .par_iter()
        .map(|(symbol, bars)| (symbol, score(symbol, bars, strategy)))
        .collect();

    let mut scores = Vec::new();
    let mut skipped = Vec::new();

    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(result) => scores.push(result),
            Err(err) => {
                tracing::debug!(symbol = %symbol, "skipping: {err}");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: err.into(),
                });
            }
        }
    }

    scores.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    skipped.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    ScoreBoard {
        strategy,
        scores,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn make_bars(closes: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                symbol: "TEST".into(),
                date: start + Duration::days(i as i64),
                open: close,
                high: close + 2.0,
                low: close - 2.0,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn rising(count: usize) -> Vec<f64> {
        (0..count).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn insufficient_bars_is_not_a_score() {
        let bars = make_bars(&rising(62));
        match score("TEST", &bars, StrategyKind::CloseBased) {
            Err(EngineError::InsufficientData { have, need, .. }) => {
                assert_eq!(have, 62);
                assert_eq!(need, 63);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn close_based_at_window_high_scores_100() {
        let bars = make_bars(&rising(63));
        let result = score("TEST", &bars, StrategyKind::CloseBased).unwrap();
        assert_eq!(result.score_21, 100.0);
        assert_eq!(result.score_63, 100.0);
        assert_eq!(result.score_smoothed, 100.0);
        assert_eq!(result.trend, Trend::Flat);
    }

    #[test]
    fn close_based_mid_range() {
        // 63 bars: first 62 oscillate 100/200, last close 150.
        let mut closes: Vec<f64> = (0..62)
            .map(|i| if i % 2 == 0 { 100.0 } else { 200.0 })
            .collect();
        closes.push(150.0);
        let bars = make_bars(&closes);
        let result = score("TEST", &bars, StrategyKind::CloseBased).unwrap();
        assert_relative_eq!(result.score_21, 50.0);
        assert_relative_eq!(result.score_63, 50.0);
    }

    #[test]
    fn flat_closes_score_zero_and_flat() {
        let bars = make_bars(&[100.0; 70]);
        let result = score("TEST", &bars, StrategyKind::CloseBased).unwrap();
        assert_eq!(result.score_21, 0.0);
        assert_eq!(result.score_63, 0.0);
        assert_eq!(result.score_smoothed, 0.0);
        assert_eq!(result.trend, Trend::Flat);
    }

    #[test]
    fn true_range_uses_high_low_band() {
        let bars = make_bars(&rising(63));
        let result = score("TEST", &bars, StrategyKind::TrueRange).unwrap();
        // 21 window: low = 142 - 2 = 140, high = 162 + 2 = 164, close 162
        let expected_21 = 100.0 * (162.0 - 140.0) / (164.0 - 140.0);
        // 63 window: low = 98, high = 164
        let expected_63 = 100.0 * (162.0 - 98.0) / (164.0 - 98.0);
        assert_relative_eq!(result.score_21, round2(expected_21));
        assert_relative_eq!(result.score_63, round2(expected_63));
        assert_eq!(result.trend, Trend::Down);
    }

    #[test]
    fn combined_is_mean_of_close_and_true_range() {
        let bars = make_bars(&rising(63));
        let combined = score("TEST", &bars, StrategyKind::Combined).unwrap();
        let tr_21 = 100.0 * 22.0 / 24.0;
        let tr_63 = 100.0 * 64.0 / 66.0;
        assert_relative_eq!(combined.score_21, round2((100.0 + tr_21) / 2.0));
        assert_relative_eq!(combined.score_63, round2((100.0 + tr_63) / 2.0));
    }

    #[test]
    fn smoothed_blend_uses_full_precision() {
        let bars = make_bars(&rising(63));
        let result = score("TEST", &bars, StrategyKind::TrueRange).unwrap();
        let raw_21 = 100.0 * 22.0 / 24.0;
        let raw_63 = 100.0 * 64.0 / 66.0;
        assert_relative_eq!(result.score_smoothed, round2(0.6 * raw_21 + 0.4 * raw_63));
    }

    #[test]
    fn physics_constant_growth_equals_log_return() {
        // Closes grow 1% per bar; every velocity after bar 0 is ln(1.01).
        let closes: Vec<f64> = (0..80).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let bars = make_bars(&closes);
        let result = score("TEST", &bars, StrategyKind::PhysicsMv).unwrap();
        let expected = round2(1.01_f64.ln());
        assert_relative_eq!(result.score_21, expected);
        assert_relative_eq!(result.score_63, expected);
        assert_eq!(result.trend, Trend::Flat);
    }

    #[test]
    fn physics_zero_mass_scores_zero() {
        let mut bars = make_bars(&rising(63));
        for bar in &mut bars {
            bar.volume = 0;
        }
        let result = score("TEST", &bars, StrategyKind::PhysicsMv).unwrap();
        assert_eq!(result.score_21, 0.0);
        assert_eq!(result.score_63, 0.0);
        assert_eq!(result.trend, Trend::Flat);
    }

    #[test]
    fn physics_first_bar_velocity_is_zero() {
        let bars = make_bars(&rising(63));
        let refs: Vec<&OhlcvBar> = bars.iter().collect();
        let velocity = velocities(&refs);
        assert_eq!(velocity[0], 0.0);
        assert_relative_eq!(velocity[1], (101.0_f64).ln() - (100.0_f64).ln());
    }

    #[test]
    fn order_of_input_does_not_matter() {
        let bars = make_bars(&rising(70));
        let mut reversed = bars.clone();
        reversed.reverse();
        for strategy in StrategyKind::ALL {
            assert_eq!(
                score("TEST", &bars, strategy).unwrap(),
                score("TEST", &reversed, strategy).unwrap()
            );
        }
    }

    #[test]
    fn trend_up_when_short_window_stronger() {
        // Long decline then a sharp recovery in the last few bars.
        let mut closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        closes.extend([150.0, 160.0, 170.0]);
        let bars = make_bars(&closes);
        let result = score("TEST", &bars, StrategyKind::CloseBased).unwrap();
        assert!(result.score_21 > result.score_63);
        assert_eq!(result.trend, Trend::Up);
    }

    #[test]
    fn trend_classify_exact_equality_is_flat() {
        assert_eq!(Trend::classify(1.0, 0.5), Trend::Up);
        assert_eq!(Trend::classify(0.5, 1.0), Trend::Down);
        assert_eq!(Trend::classify(0.0, 0.0), Trend::Flat);
    }

    #[test]
    fn score_universe_splits_scored_and_skipped() {
        let mut universe = BTreeMap::new();
        universe.insert("AAA".to_string(), make_bars(&rising(70)));
        universe.insert("BBB".to_string(), make_bars(&rising(10)));
        let mut broken = make_bars(&rising(70));
        broken[5].close = -1.0;
        universe.insert("CCC".to_string(), broken);

        let board = score_universe(&universe, StrategyKind::CloseBased);
        assert_eq!(board.scores.len(), 1);
        assert_eq!(board.scores[0].symbol, "AAA");
        assert_eq!(board.skipped.len(), 2);
        assert_eq!(board.skipped[0].symbol, "BBB");
        assert_eq!(
            board.skipped[0].reason,
            SkipReason::InsufficientBars { bars: 10, need: 63 }
        );
        assert!(matches!(
            board.skipped[1].reason,
            SkipReason::InvalidData { .. }
        ));
    }

    #[test]
    fn mark_unavailable_keeps_skips_sorted() {
        let mut board = score_universe(&BTreeMap::new(), StrategyKind::Combined);
        board.mark_unavailable("ZZZ", "timeout");
        board.mark_unavailable("AAA", "timeout");
        assert_eq!(board.skipped[0].symbol, "AAA");
        assert_eq!(board.skipped[1].reason.to_string(), "unavailable: timeout");
    }
}
