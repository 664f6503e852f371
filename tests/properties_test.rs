//! Property tests for scoring, ranking and analytics invariants.
//!
//! Uses proptest to verify:
//! 1. Normalized scores stay within 0..=100 and trend agrees with the scores
//! 2. Smoothed score is the 60/40 blend of the window scores
//! 3. Close-based and physics scores ignore a constant price rescale, only
//!    the physics score responds to volume, and rescoring is stable
//! 4. Ranking is ordered, dense, truncated and idempotent, and ties stay in
//!    symbol order when truncated
//! 5. Flat portfolio series have no drawdown and no return
//! 6. Rebalance diffs partition the current and previous holdings
//! 7. Open trade holding days count from entry

mod common;

use chrono::Duration;
use common::*;
use momentum_ranker::domain::metrics::{compute_metrics, MetricsConfig, PortfolioValuePoint};
use momentum_ranker::domain::momentum::{score, ScoreResult, Trend};
use momentum_ranker::domain::ranking::rank;
use momentum_ranker::domain::rebalance::{diff_snapshots, RebalanceSnapshot};
use momentum_ranker::domain::strategy::StrategyKind;
use momentum_ranker::domain::trade::evaluate;
use proptest::prelude::*;
use std::collections::BTreeSet;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((5.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0), 63..130)
}

fn bars_from(symbol: &str, closes: &[f64], volume: impl Fn(usize) -> i64) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let mut bar = make_bar(symbol, start + Duration::days(i as i64), close);
            bar.volume = volume(i);
            bar
        })
        .collect()
}

fn arb_score() -> impl Strategy<Value = (String, f64)> {
    ("[A-Z]{3,5}", (-500.0..500.0_f64).prop_map(|v| (v * 100.0).round() / 100.0))
}

fn result(symbol: &str, smoothed: f64) -> ScoreResult {
    ScoreResult {
        symbol: symbol.to_string(),
        strategy: StrategyKind::Combined,
        score_21: smoothed,
        score_63: smoothed,
        score_smoothed: smoothed,
        trend: Trend::Flat,
    }
}

fn snapshot(day: chrono::NaiveDate, symbols: &BTreeSet<String>) -> RebalanceSnapshot {
    RebalanceSnapshot {
        strategy: StrategyKind::TrueRange,
        date: day,
        symbols: symbols.clone(),
    }
}

// ── 1-3. Scores ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn normalized_scores_are_bounded(closes in arb_closes()) {
        let bars = bars_from("PROP", &closes, |_| 1000);
        for strategy in [StrategyKind::CloseBased, StrategyKind::TrueRange, StrategyKind::Combined] {
            let s = score("PROP", &bars, strategy).unwrap();
            prop_assert!((0.0..=100.0).contains(&s.score_21), "{:?}", s);
            prop_assert!((0.0..=100.0).contains(&s.score_63), "{:?}", s);
            prop_assert!((0.0..=100.0).contains(&s.score_smoothed), "{:?}", s);
        }
    }

    #[test]
    fn trend_and_blend_agree_with_window_scores(closes in arb_closes()) {
        let bars = bars_from("PROP", &closes, |i| 500 + (i as i64 % 7) * 100);
        for strategy in StrategyKind::ALL {
            let s = score("PROP", &bars, strategy).unwrap();
            let expected = if s.score_21 > s.score_63 {
                Trend::Up
            } else if s.score_21 < s.score_63 {
                Trend::Down
            } else {
                Trend::Flat
            };
            prop_assert_eq!(s.trend, expected);

            let blend = 0.6 * s.score_21 + 0.4 * s.score_63;
            prop_assert!((s.score_smoothed - blend).abs() <= 0.011, "{:?}", s);
        }
    }

    #[test]
    fn price_rescale_keeps_scores(closes in arb_closes(), factor in 0.5..20.0_f64) {
        let base = bars_from("PROP", &closes, |i| 1000 + i as i64);
        let scaled: Vec<OhlcvBar> = base
            .iter()
            .map(|b| {
                let mut bar = b.clone();
                bar.open *= factor;
                bar.high *= factor;
                bar.low *= factor;
                bar.close *= factor;
                bar
            })
            .collect();

        for strategy in [StrategyKind::CloseBased, StrategyKind::PhysicsMv] {
            let a = score("PROP", &base, strategy).unwrap();
            let b = score("PROP", &scaled, strategy).unwrap();
            prop_assert!((a.score_21 - b.score_21).abs() <= 0.011);
            prop_assert!((a.score_63 - b.score_63).abs() <= 0.011);
            prop_assert!((a.score_smoothed - b.score_smoothed).abs() <= 0.011);
        }
    }
}

proptest! {
    #[test]
    fn rescoring_the_same_bars_is_stable(closes in arb_closes()) {
        let bars = bars_from("PROP", &closes, |i| 700 + (i as i64 % 5) * 150);
        for strategy in StrategyKind::ALL {
            let first = score("PROP", &bars, strategy).unwrap();
            let second = score("PROP", &bars, strategy).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn volume_only_moves_physics(closes in arb_closes(), heavy in 2i64..50) {
        let even = bars_from("PROP", &closes, |i| if i % 2 == 0 { 1000 * heavy } else { 1000 });
        let odd = bars_from("PROP", &closes, |i| if i % 2 == 1 { 1000 * heavy } else { 1000 });
        for strategy in [StrategyKind::CloseBased, StrategyKind::TrueRange, StrategyKind::Combined] {
            prop_assert_eq!(
                score("PROP", &even, strategy).unwrap(),
                score("PROP", &odd, strategy).unwrap()
            );
        }
    }
}

#[test]
fn physics_follows_the_heavy_side() {
    // Closes alternate 100 / 110, so odd bars move up and even bars move down.
    let closes: Vec<f64> = (0..63).map(|i| if i % 2 == 0 { 100.0 } else { 110.0 }).collect();
    let up_heavy = bars_from("ALT", &closes, |i| if i % 2 == 1 { 10_000 } else { 1 });
    let down_heavy = bars_from("ALT", &closes, |i| if i % 2 == 0 { 10_000 } else { 1 });

    let up = score("ALT", &up_heavy, StrategyKind::PhysicsMv).unwrap();
    let down = score("ALT", &down_heavy, StrategyKind::PhysicsMv).unwrap();
    assert!(up.score_21 > 0.0, "{up:?}");
    assert!(down.score_21 < 0.0, "{down:?}");

    let close_up = score("ALT", &up_heavy, StrategyKind::CloseBased).unwrap();
    let close_down = score("ALT", &down_heavy, StrategyKind::CloseBased).unwrap();
    assert_eq!(close_up, close_down);
}

// ── 4. Ranking ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn top_n_is_sorted_dense_and_truncated(
        scores in prop::collection::btree_map("[A-Z]{3,5}", -500.0..500.0_f64, 5..40),
        top_n in 1usize..10,
    ) {
        let results: Vec<ScoreResult> = scores.iter().map(|(s, v)| result(s, *v)).collect();
        let ranked = rank(results, Some(top_n), None);

        prop_assert_eq!(ranked.len(), top_n.min(scores.len()));
        prop_assert_eq!(ranked[0].rank, 1);
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.score.score_smoothed >= b.score.score_smoothed);
            if a.score.score_smoothed == b.score.score_smoothed {
                prop_assert_eq!(a.rank, b.rank);
            } else {
                prop_assert_eq!(a.rank + 1, b.rank);
            }
        }
    }

    #[test]
    fn ties_keep_symbol_order_through_truncation(
        scores in prop::collection::btree_map(
            "[A-Z]{3,5}",
            prop::sample::select(vec![12.5, 40.0, 40.0, 73.25, 90.0]),
            20..=20,
        ),
    ) {
        let results: Vec<ScoreResult> = scores.iter().map(|(s, v)| result(s, *v)).collect();
        let ranked = rank(results, Some(5), None);

        let mut expected: Vec<(String, f64)> =
            scores.iter().map(|(s, v)| (s.clone(), *v)).collect();
        expected.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        expected.truncate(5);

        let got: Vec<(String, f64)> = ranked
            .iter()
            .map(|r| (r.score.symbol.clone(), r.score.score_smoothed))
            .collect();
        prop_assert_eq!(got, expected);
        for pair in ranked.windows(2) {
            if pair[0].score.score_smoothed == pair[1].score.score_smoothed {
                prop_assert!(pair[0].score.symbol < pair[1].score.symbol);
                prop_assert_eq!(pair[0].rank, pair[1].rank);
            }
        }
    }

    #[test]
    fn ranking_is_idempotent(entries in prop::collection::vec(arb_score(), 1..30)) {
        let results: Vec<ScoreResult> = entries.iter().map(|(s, v)| result(s, *v)).collect();
        let once = rank(results, None, None);
        let again = rank(once.iter().map(|r| r.score.clone()).collect(), None, None);
        prop_assert_eq!(once, again);
    }
}

// ── 5. Flat portfolio ────────────────────────────────────────────────

proptest! {
    #[test]
    fn flat_series_has_no_drawdown(value in 1.0..1_000_000.0_f64, count in 2usize..60) {
        let start = date(2023, 1, 6);
        let points: Vec<PortfolioValuePoint> = (0..count)
            .map(|i| PortfolioValuePoint { date: start + Duration::weeks(i as i64), value })
            .collect();
        let m = compute_metrics(&points, None, None, &MetricsConfig::default()).unwrap();

        prop_assert_eq!(m.absolute_return_pct, 0.0);
        prop_assert_eq!(m.max_drawdown_pct, 0.0);
        prop_assert_eq!(m.current_drawdown_pct, 0.0);
        prop_assert_eq!(m.running_max_drawdown_pct, 0.0);
        prop_assert_eq!(m.max_drawdown_duration, 0);
        prop_assert_eq!(m.sharpe, 0.0);
        prop_assert_eq!(m.cagr_pct, Some(0.0));
    }
}

// ── 6. Rebalance diffs ───────────────────────────────────────────────

proptest! {
    #[test]
    fn diff_partitions_holdings(
        current in prop::collection::btree_set("[A-F]", 0..6),
        previous in prop::collection::btree_set("[A-F]", 0..6),
    ) {
        let day = date(2024, 6, 14);
        let cur = snapshot(day, &current);
        let prev = snapshot(date(2024, 6, 7), &previous);
        let d = diff_snapshots(StrategyKind::TrueRange, day, Some(&cur), Some(&prev));

        let added: BTreeSet<String> = d.added.iter().cloned().collect();
        let held: BTreeSet<String> = d.held.iter().cloned().collect();
        let removed: BTreeSet<String> = d.removed.iter().cloned().collect();

        prop_assert!(d.present);
        prop_assert_eq!(added.union(&held).cloned().collect::<BTreeSet<_>>(), current.clone());
        prop_assert_eq!(held.union(&removed).cloned().collect::<BTreeSet<_>>(), previous.clone());
        prop_assert!(added.is_disjoint(&held));
        prop_assert!(added.is_disjoint(&removed));
        prop_assert!(held.is_disjoint(&removed));

        let mut sorted = d.added.clone();
        sorted.sort();
        prop_assert_eq!(sorted, d.added.clone());
    }
}

// ── 7. Trades ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn open_trade_holding_days(offset in 0i64..2000, price in 1.0..5000.0_f64) {
        let entry = date(2022, 3, 1);
        let trade = open_trade("PROP", StrategyKind::CloseBased, entry, price);
        let eval = evaluate(&trade, entry + Duration::days(offset), None).unwrap();
        prop_assert_eq!(eval.holding_days, offset);
        prop_assert_eq!(eval.return_pct, None);
        prop_assert!(!eval.marked_to_market);
    }
}
