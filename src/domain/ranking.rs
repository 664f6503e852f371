//! Ranking of score results.
//!
//! Results are ordered by descending smoothed score with the symbol as the
//! tie-breaker, then given dense 1-based ranks. Filtering happens after ranks
//! are assigned so a row keeps its rank whatever else is filtered out.

use crate::domain::error::EngineError;
use crate::domain::filter::Filter;
use crate::domain::momentum::{ScoreResult, Trend};
use serde::Serialize;
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedScore {
    pub rank: usize,
    #[serde(flatten)]
    pub score: ScoreResult,
}

fn by_smoothed_desc(a: &ScoreResult, b: &ScoreResult) -> Ordering {
    b.score_smoothed
        .total_cmp(&a.score_smoothed)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Rank `results`; `top_n` of `None` or `Some(0)` keeps every row.
pub fn rank(
    results: Vec<ScoreResult>,
    top_n: Option<usize>,
    filter: Option<&Filter>,
) -> Vec<RankedScore> {
    let mut ordered = results;
    ordered.sort_by(by_smoothed_desc);

    let mut ranked = Vec::with_capacity(ordered.len());
    let mut current_rank = 0;
    let mut previous: Option<f64> = None;
    for score in ordered {
        if previous != Some(score.score_smoothed) {
            current_rank += 1;
            previous = Some(score.score_smoothed);
        }
        ranked.push(RankedScore {
            rank: current_rank,
            score,
        });
    }

    if let Some(filter) = filter {
        ranked.retain(|row| filter.matches(&row.score));
    }

    if let Some(n) = top_n.filter(|n| *n > 0) {
        ranked.truncate(n);
    }

    ranked
}

/// Display sort keys for a ranked table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Symbol,
    Smoothed,
    Score21,
    Score63,
    Trend,
}

impl FromStr for SortKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "symbol" => Ok(SortKey::Symbol),
            "smoothed" => Ok(SortKey::Smoothed),
            "score21" => Ok(SortKey::Score21),
            "score63" => Ok(SortKey::Score63),
            "trend" => Ok(SortKey::Trend),
            other => Err(EngineError::invalid(format!("unknown sort key '{}'", other))),
        }
    }
}

fn trend_order(trend: Trend) -> u8 {
    match trend {
        Trend::Down => 0,
        Trend::Flat => 1,
        Trend::Up => 2,
    }
}

/// Re-sort ranked rows for display. Ranks are not reassigned.
pub fn sort_ranked(rows: &mut [RankedScore], key: SortKey, ascending: bool) {
    rows.sort_by(|a, b| {
        let (a, b) = (&a.score, &b.score);
        let primary = match key {
            SortKey::Symbol => a.symbol.cmp(&b.symbol),
            SortKey::Smoothed => a.score_smoothed.total_cmp(&b.score_smoothed),
            SortKey::Score21 => a.score_21.total_cmp(&b.score_21),
            SortKey::Score63 => a.score_63.total_cmp(&b.score_63),
            SortKey::Trend => trend_order(a.trend).cmp(&trend_order(b.trend)),
        };
        let primary = if ascending { primary } else { primary.reverse() };
        primary.then_with(|| a.symbol.cmp(&b.symbol))
    });
}
