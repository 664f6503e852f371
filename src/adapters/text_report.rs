//! Plain-text table reports.

use crate::domain::error::EngineError;
use crate::domain::metrics::PortfolioMetrics;
use crate::domain::momentum::SkippedSymbol;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::ranking::RankedScore;
use crate::domain::rebalance::RebalanceDiff;
use crate::domain::strategy::StrategyKind;
use crate::domain::timeframe::BarSummary;
use crate::domain::trade::{JournalSummary, TradeEvaluation};
use crate::ports::report_port::{Report, ReportPort, SymbolRange};
use chrono::NaiveDate;

pub struct TextReport;

fn format_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}%", v))
}

fn render_ranking(strategy: StrategyKind, rows: &[RankedScore], skipped: &[SkippedSymbol]) -> String {
    let mut output = format!("Momentum ranking: {}\n", strategy);
    if !strategy.is_normalized() {
        output.push_str("(mass-weighted log return, not a 0-100 score)\n");
    }

    if rows.is_empty() {
        output.push_str("No ranked symbols.\n");
    } else {
        output.push_str(&format!(
            "{:>4}  {:<14} {:>10} {:>10} {:>10}  {}\n",
            "Rank", "Symbol", "Smoothed", "21d", "63d", "Trend"
        ));
        for row in rows {
            let s = &row.score;
            output.push_str(&format!(
                "{:>4}  {:<14} {:>10.2} {:>10.2} {:>10.2}  {}\n",
                row.rank, s.symbol, s.score_smoothed, s.score_21, s.score_63, s.trend
            ));
        }
    }

    if !skipped.is_empty() {
        output.push_str(&format!("\nSkipped {} symbol(s):\n", skipped.len()));
        for skip in skipped {
            output.push_str(&format!("  {:<14} {}\n", skip.symbol, skip.reason));
        }
    }
    output
}

fn render_metrics(strategy: StrategyKind, m: &PortfolioMetrics) -> String {
    let mut output = format!(
        "Portfolio metrics: {} ({} to {}, {} points)\n",
        strategy, m.start_date, m.end_date, m.points
    );
    output.push_str(&format!("Days:               {} ({:.4} years)\n", m.days, m.years));
    output.push_str(&format!("CAGR:               {}\n", format_pct(m.cagr_pct)));
    output.push_str(&format!(
        "Absolute Return:    {:.2}%\n",
        m.absolute_return_pct
    ));
    output.push_str(&format!("Max Drawdown:       {:.2}%\n", m.max_drawdown_pct));
    output.push_str(&format!(
        "Current Drawdown:   {:.2}%\n",
        m.current_drawdown_pct
    ));
    output.push_str(&format!(
        "Peak Drawdown:      {:.2}% ({} periods)\n",
        m.running_max_drawdown_pct, m.max_drawdown_duration
    ));
    output.push_str(&format!("Sharpe Ratio:       {:.2}\n", m.sharpe));
    output
}

fn symbol_list(symbols: &[String]) -> String {
    if symbols.is_empty() {
        "-".to_string()
    } else {
        symbols.join(", ")
    }
}

fn render_diffs(diffs: &[RebalanceDiff]) -> String {
    let mut output = String::new();
    for diff in diffs {
        output.push_str(&format!("{} on {}\n", diff.strategy, diff.date));
        if !diff.present {
            output.push_str("  no rebalance on this date\n");
            continue;
        }
        match diff.previous_date {
            Some(prev) => output.push_str(&format!("  compared with {}\n", prev)),
            None => output.push_str("  first rebalance\n"),
        }
        output.push_str(&format!("  Added:   {}\n", symbol_list(&diff.added)));
        output.push_str(&format!("  Held:    {}\n", symbol_list(&diff.held)));
        output.push_str(&format!("  Removed: {}\n", symbol_list(&diff.removed)));
    }
    output
}

fn render_dates(strategy: StrategyKind, dates: &[NaiveDate]) -> String {
    let mut output = format!("Recent rebalance dates: {}\n", strategy);
    if dates.is_empty() {
        output.push_str("  none\n");
    }
    for date in dates {
        output.push_str(&format!("  {}\n", date));
    }
    output
}

fn render_trades(
    strategy: StrategyKind,
    as_of: NaiveDate,
    trades: &[TradeEvaluation],
    summary: &JournalSummary,
) -> String {
    let mut output = format!("Trade journal: {} (as of {})\n", strategy, as_of);
    if trades.is_empty() {
        output.push_str("No trades found.\n");
        return output;
    }

    output.push_str(&format!(
        "{:<14} {:<8} {:<10} {:>6} {:>10}\n",
        "Symbol", "Status", "Entry", "Days", "Return"
    ));
    for t in trades {
        let marker = if t.marked_to_market { "*" } else { "" };
        output.push_str(&format!(
            "{:<14} {:<8} {:<10} {:>6} {:>10}{}\n",
            t.symbol,
            t.status.to_string(),
            t.entry_date.to_string(),
            t.holding_days,
            format_pct(t.return_pct),
            marker
        ));
    }
    if trades.iter().any(|t| t.marked_to_market) {
        output.push_str("* marked to the latest close\n");
    }

    output.push_str(&format!(
        "\nTrades: {}  Won: {}  Lost: {}  Breakeven: {}  Win Rate: {:.2}%\n",
        summary.trades, summary.won, summary.lost, summary.breakeven, summary.win_rate
    ));
    output.push_str(&format!(
        "Avg Return: {:.2}%  Best: {}  Worst: {}  Avg Days: {:.2}\n",
        summary.avg_return_pct,
        format_pct(summary.best_return_pct),
        format_pct(summary.worst_return_pct),
        summary.avg_holding_days
    ));
    output
}

fn render_bars(
    symbol: &str,
    timeframe: &str,
    bars: &[OhlcvBar],
    latest: Option<&BarSummary>,
) -> String {
    let mut output = format!("{} {} bars\n", symbol, timeframe);
    if let Some(s) = latest {
        output.push_str(&format!(
            "Latest {}: O {:.2} H {:.2} L {:.2} C {:.2} V {} ({:+.2}%)\n",
            s.date, s.open, s.high, s.low, s.close, s.volume, s.change_pct
        ));
    }
    output.push_str(&format!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>12}\n",
        "Date", "Open", "High", "Low", "Close", "Volume"
    ));
    for b in bars {
        output.push_str(&format!(
            "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12}\n",
            b.date.to_string(),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    output
}

fn render_info(symbols: &[SymbolRange]) -> String {
    if symbols.is_empty() {
        return "No data found.\n".to_string();
    }
    let mut output = format!("{:<14} {:<10} {:<10} {:>6}\n", "Symbol", "First", "Last", "Bars");
    for r in symbols {
        output.push_str(&format!(
            "{:<14} {:<10} {:<10} {:>6}\n",
            r.symbol,
            r.first.to_string(),
            r.last.to_string(),
            r.bars
        ));
    }
    output
}

impl ReportPort for TextReport {
    fn render(&self, report: &Report<'_>) -> Result<String, EngineError> {
        let text = match report {
            Report::Ranking {
                strategy,
                rows,
                skipped,
            } => render_ranking(*strategy, rows, skipped),
            Report::Metrics { strategy, metrics } => render_metrics(*strategy, metrics),
            Report::Diffs { diffs } => render_diffs(diffs),
            Report::Dates { strategy, dates } => render_dates(*strategy, dates),
            Report::Trades {
                strategy,
                as_of,
                trades,
                summary,
            } => render_trades(*strategy, *as_of, trades, summary),
            Report::Bars {
                symbol,
                timeframe,
                bars,
                latest,
            } => render_bars(symbol, timeframe, bars, *latest),
            Report::Info { symbols } => render_info(symbols),
        };
        Ok(text.trim_end().to_string())
    }
}
