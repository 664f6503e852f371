//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReport;
use crate::adapters::text_report::TextReport;
use crate::domain::config_validation::{
    validate_data_config, validate_metrics_config, validate_ranking_config, DataSource,
};
use crate::domain::error::EngineError;
use crate::domain::filter::Filter;
use crate::domain::filter_parser;
use crate::domain::metrics::{compute_metrics, MetricsConfig, PortfolioMetrics};
use crate::domain::momentum::{score_universe, ScoreBoard, SkipReason, SkippedSymbol};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::ranking::{rank, sort_ranked, RankedScore, SortKey};
use crate::domain::rebalance::{diff, diff_all, recent_dates, DEFAULT_RECENT_DATES};
use crate::domain::strategy::StrategyKind;
use crate::domain::timeframe::{resample, BarSummary, Timeframe};
use crate::domain::trade::{
    evaluate, filter_trades, JournalSummary, StatusFilter, TradeEvaluation, TradeStatus,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::{Report, ReportPort, SymbolRange};
use crate::ports::{DataPort, PortfolioPort, Store, TradePort};

#[derive(Parser, Debug)]
#[command(
    name = "momentum-ranker",
    about = "Momentum scoring and portfolio analytics"
)]
pub struct Cli {
    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score and rank every symbol in the store
    Rank {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<String>,
        /// Rows to keep; zero or negative keeps all
        #[arg(long, allow_hyphen_values = true)]
        top_n: Option<i64>,
        /// Filter expression, e.g. AND(ABOVE(smoothed, 50), TREND(UP))
        #[arg(short, long)]
        filter: Option<String>,
        /// Keep symbols containing this text
        #[arg(long)]
        search: Option<String>,
        /// Re-sort the ranked rows by symbol, smoothed, score21, score63 or trend
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        asc: bool,
        /// Ignore bars after this date
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Portfolio performance metrics for one strategy
    Metrics {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Added, held and removed symbols at a rebalance date
    Diff {
        #[arg(short, long)]
        config: PathBuf,
        /// Every strategy when omitted
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Most recent rebalance dates
    Dates {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long, default_value_t = DEFAULT_RECENT_DATES)]
        limit: usize,
    },
    /// Evaluate the trade journal
    Trades {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<String>,
        /// open, closed or all
        #[arg(long, default_value = "all")]
        status: String,
        /// Evaluation date; defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Show stored bars for a symbol
    Bars {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        /// daily, weekly or monthly
        #[arg(short, long, default_value = "daily")]
        timeframe: String,
        /// Show only the most recent bars
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Parse a filter expression and print its normalized form
    CheckFilter { expression: String },
    /// Copy a CSV store into a SQLite database
    #[cfg(feature = "sqlite")]
    Import {
        #[arg(long)]
        csv_dir: PathBuf,
        #[arg(long)]
        db: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(cli, &mut out)
}

/// Dispatch `cli`, writing reports to `out` and diagnostics to stderr.
pub fn run_with_output(cli: Cli, out: &mut dyn Write) -> ExitCode {
    let json = cli.json;
    let result = match cli.command {
        Command::Rank {
            config,
            strategy,
            top_n,
            filter,
            search,
            sort,
            asc,
            as_of,
        } => run_rank(
            &config,
            RankArgs {
                strategy,
                top_n,
                filter,
                search,
                sort,
                ascending: asc,
                as_of,
            },
            json,
            out,
        ),
        Command::Metrics {
            config,
            strategy,
            from,
            to,
        } => run_metrics(&config, strategy.as_deref(), from, to, json, out),
        Command::Diff {
            config,
            strategy,
            date,
        } => run_diff(&config, strategy.as_deref(), date, json, out),
        Command::Dates {
            config,
            strategy,
            limit,
        } => run_dates(&config, strategy.as_deref(), limit, json, out),
        Command::Trades {
            config,
            strategy,
            status,
            as_of,
        } => run_trades(&config, strategy.as_deref(), &status, as_of, json, out),
        Command::Bars {
            config,
            symbol,
            timeframe,
            limit,
        } => run_bars(&config, &symbol, &timeframe, limit, json, out),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref(), json, out),
        Command::CheckFilter { expression } => run_check_filter(&expression, out),
        #[cfg(feature = "sqlite")]
        Command::Import { csv_dir, db } => run_import(&csv_dir, &db),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Filter errors already printed their caret context.
            if !matches!(e, EngineError::FilterParse(_)) {
                eprintln!("error: {e}");
            }
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, EngineError> {
    tracing::info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Open the store named by the `[data]` section.
pub fn open_store(source: &DataSource) -> Result<Box<dyn Store>, EngineError> {
    match source {
        DataSource::Csv { dir } => {
            if !dir.is_dir() {
                return Err(EngineError::unavailable(format!(
                    "data directory {} does not exist",
                    dir.display()
                )));
            }
            tracing::debug!("Using CSV store at {}", dir.display());
            Ok(Box::new(CsvAdapter::new(dir.clone())))
        }
        #[cfg(feature = "sqlite")]
        DataSource::Sqlite { path, pool_size } => {
            use crate::adapters::sqlite_adapter::SqliteAdapter;

            tracing::debug!("Using SQLite store at {}", path.display());
            let adapter = SqliteAdapter::open(path, *pool_size)?;
            adapter.initialize_schema()?;
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "sqlite"))]
        DataSource::Sqlite { .. } => Err(EngineError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: "built without sqlite support".into(),
        }),
    }
}

fn open_configured_store(config: &dyn ConfigPort) -> Result<Box<dyn Store>, EngineError> {
    let source = validate_data_config(config)?;
    open_store(&source)
}

/// Strategy from the command line, else from `[ranking] strategy`.
pub fn resolve_strategy(
    arg: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<StrategyKind, EngineError> {
    match arg {
        Some(s) => s.parse(),
        None => Ok(validate_ranking_config(config)?.strategy),
    }
}

fn emit(report: &Report<'_>, json: bool, out: &mut dyn Write) -> Result<(), EngineError> {
    if json {
        JsonReport { pretty: true }.write(report, out)
    } else {
        TextReport.write(report, out)
    }
}

/// Parse a filter argument, printing the caret context on failure.
fn parse_filter_arg(text: &str) -> Result<Filter, EngineError> {
    filter_parser::parse(text).map_err(|e| {
        eprintln!("{}", e.display_with_context(text));
        EngineError::FilterParse(e)
    })
}

/// Fetch every stored symbol and score it. Fetch failures become skips.
pub fn score_store(
    data: &dyn DataPort,
    strategy: StrategyKind,
    as_of: Option<NaiveDate>,
) -> Result<ScoreBoard, EngineError> {
    let symbols = data.list_symbols()?;
    tracing::info!("Scoring {} symbol(s) with {}", symbols.len(), strategy);

    let mut universe: BTreeMap<String, Vec<OhlcvBar>> = BTreeMap::new();
    let mut failed: Vec<(String, SkipReason)> = Vec::new();
    for symbol in symbols {
        match data.fetch_ohlcv(&symbol, None, as_of) {
            Ok(bars) => {
                universe.insert(symbol, bars);
            }
            Err(e) => {
                tracing::warn!("failed to load {}: {}", symbol, e);
                failed.push((symbol, e.into()));
            }
        }
    }

    let mut board = score_universe(&universe, strategy);
    for (symbol, reason) in failed {
        board.skip(&symbol, reason);
    }
    if !board.skipped.is_empty() {
        tracing::info!("Skipped {} symbol(s)", board.skipped.len());
    }
    Ok(board)
}

#[derive(Debug)]
pub struct RankingOutcome {
    pub strategy: StrategyKind,
    pub rows: Vec<RankedScore>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Score the store and rank the results.
pub fn rank_store(
    data: &dyn DataPort,
    strategy: StrategyKind,
    top_n: Option<usize>,
    filter: Option<&Filter>,
    as_of: Option<NaiveDate>,
) -> Result<RankingOutcome, EngineError> {
    let board = score_store(data, strategy, as_of)?;
    let rows = rank(board.scores, top_n, filter);
    Ok(RankingOutcome {
        strategy,
        rows,
        skipped: board.skipped,
    })
}

struct RankArgs {
    strategy: Option<String>,
    top_n: Option<i64>,
    filter: Option<String>,
    search: Option<String>,
    sort: Option<String>,
    ascending: bool,
    as_of: Option<NaiveDate>,
}

fn run_rank(
    config_path: &Path,
    args: RankArgs,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let settings = validate_ranking_config(&config)?;
    let strategy = match args.strategy.as_deref() {
        Some(s) => s.parse()?,
        None => settings.strategy,
    };
    let top_n = match args.top_n {
        Some(n) => usize::try_from(n).ok().filter(|n| *n > 0),
        None => settings.top_n,
    };
    let sort_key: Option<SortKey> = args.sort.as_deref().map(str::parse).transpose()?;

    let mut filters = Vec::new();
    if let Some(text) = args.filter.as_deref() {
        filters.push(parse_filter_arg(text)?);
    }
    if let Some(term) = args.search.as_deref() {
        filters.push(Filter::search(term));
    }
    let filter = match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(Filter::And(filters)),
    };

    let store = open_configured_store(&config)?;
    let mut outcome = rank_store(store.data(), strategy, top_n, filter.as_ref(), args.as_of)?;
    if let Some(key) = sort_key {
        sort_ranked(&mut outcome.rows, key, args.ascending);
    }

    emit(
        &Report::Ranking {
            strategy,
            rows: &outcome.rows,
            skipped: &outcome.skipped,
        },
        json,
        out,
    )
}

/// Load a strategy's value series and compute its metrics.
pub fn portfolio_metrics(
    portfolio: &dyn PortfolioPort,
    strategy: StrategyKind,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    config: &MetricsConfig,
) -> Result<PortfolioMetrics, EngineError> {
    let points = portfolio.fetch_portfolio_values(strategy)?;
    tracing::debug!("{} portfolio value point(s) for {}", points.len(), strategy);
    compute_metrics(&points, from, to, config)
}

fn run_metrics(
    config_path: &Path,
    strategy: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let strategy = resolve_strategy(strategy, &config)?;
    let settings = validate_metrics_config(&config)?;
    let from = from.or(settings.from);
    let to = to.or(settings.to);
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(EngineError::invalid(format!(
                "--from {} is after --to {}",
                f, t
            )));
        }
    }

    let store = open_configured_store(&config)?;
    let metrics = portfolio_metrics(store.portfolio(), strategy, from, to, &settings.config)?;
    emit(
        &Report::Metrics {
            strategy,
            metrics: &metrics,
        },
        json,
        out,
    )
}

fn run_diff(
    config_path: &Path,
    strategy: Option<&str>,
    date: NaiveDate,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let store = open_configured_store(&config)?;
    let diffs = match strategy {
        Some(s) => vec![diff(store.rebalance(), s.parse()?, date)?],
        None => diff_all(store.rebalance(), date)?,
    };
    emit(&Report::Diffs { diffs: &diffs }, json, out)
}

fn run_dates(
    config_path: &Path,
    strategy: Option<&str>,
    limit: usize,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let strategy = resolve_strategy(strategy, &config)?;
    let store = open_configured_store(&config)?;
    let dates = recent_dates(store.rebalance(), strategy, limit)?;
    emit(
        &Report::Dates {
            strategy,
            dates: &dates,
        },
        json,
        out,
    )
}

fn latest_close(
    data: &dyn DataPort,
    symbol: &str,
    as_of: NaiveDate,
) -> Result<Option<f64>, EngineError> {
    Ok(data
        .fetch_ohlcv(symbol, None, Some(as_of))?
        .last()
        .map(|bar| bar.close))
}

/// Evaluate the journal as of `as_of`. Open trades are marked to the
/// latest close on or before that date; trades entered later are left out.
pub fn evaluate_journal(
    trades: &dyn TradePort,
    data: &dyn DataPort,
    strategy: StrategyKind,
    status: StatusFilter,
    as_of: NaiveDate,
) -> Result<Vec<TradeEvaluation>, EngineError> {
    let records = filter_trades(trades.fetch_trades(strategy, status)?, status);
    records
        .iter()
        .filter(|t| t.entry_date <= as_of)
        .map(|t| {
            let mark = match t.status {
                TradeStatus::Open => latest_close(data, &t.symbol, as_of)?,
                TradeStatus::Closed => None,
            };
            evaluate(t, as_of, mark)
        })
        .collect()
}

fn run_trades(
    config_path: &Path,
    strategy: Option<&str>,
    status: &str,
    as_of: Option<NaiveDate>,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let strategy = resolve_strategy(strategy, &config)?;
    let status: StatusFilter = status.parse()?;
    let as_of = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());

    let store = open_configured_store(&config)?;
    let evaluations = evaluate_journal(store.trades(), store.data(), strategy, status, as_of)?;
    let summary = JournalSummary::compute(&evaluations);
    emit(
        &Report::Trades {
            strategy,
            as_of,
            trades: &evaluations,
            summary: &summary,
        },
        json,
        out,
    )
}

/// Bars for `symbol` in `timeframe`, trimmed to the last `limit`, plus the
/// latest daily session summary.
pub fn symbol_bars(
    data: &dyn DataPort,
    symbol: &str,
    timeframe: Timeframe,
    limit: Option<usize>,
) -> Result<(Vec<OhlcvBar>, Option<BarSummary>), EngineError> {
    let daily = data.fetch_ohlcv(symbol, None, None)?;
    if daily.is_empty() {
        return Err(EngineError::InsufficientData {
            subject: symbol.to_string(),
            have: 0,
            need: 1,
        });
    }
    let latest = BarSummary::latest(symbol, &daily)?;
    let mut bars = resample(symbol, &daily, timeframe)?;
    if let Some(n) = limit {
        let start = bars.len().saturating_sub(n);
        bars.drain(..start);
    }
    Ok((bars, latest))
}

fn run_bars(
    config_path: &Path,
    symbol: &str,
    timeframe: &str,
    limit: Option<usize>,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), EngineError> {
    let timeframe: Timeframe = timeframe.parse()?;
    let config = load_config(config_path)?;
    let store = open_configured_store(&config)?;
    let (bars, latest) = symbol_bars(store.data(), symbol, timeframe, limit)?;
    emit(
        &Report::Bars {
            symbol,
            timeframe: timeframe.to_string(),
            bars: &bars,
            latest: latest.as_ref(),
        },
        json,
        out,
    )
}

/// Stored ranges for `symbol`, or for every symbol when `None`. Symbols
/// without bars are left out.
pub fn collect_ranges(
    data: &dyn DataPort,
    symbol: Option<&str>,
) -> Result<Vec<SymbolRange>, EngineError> {
    let symbols = match symbol {
        Some(s) => vec![s.to_string()],
        None => data.list_symbols()?,
    };

    let mut ranges = Vec::new();
    for symbol in symbols {
        match data.get_data_range(&symbol)? {
            Some((first, last, bars)) => ranges.push(SymbolRange {
                symbol,
                first,
                last,
                bars,
            }),
            None => tracing::warn!("{}: no data found", symbol),
        }
    }
    Ok(ranges)
}

fn run_info(
    config_path: &Path,
    symbol: Option<&str>,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let store = open_configured_store(&config)?;
    let ranges = collect_ranges(store.data(), symbol)?;
    emit(&Report::Info { symbols: &ranges }, json, out)
}

fn run_check_filter(expression: &str, out: &mut dyn Write) -> Result<(), EngineError> {
    let filter = parse_filter_arg(expression)?;
    writeln!(out, "{}", filter)?;
    Ok(())
}

#[cfg(feature = "sqlite")]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub symbols: usize,
    pub bars: usize,
    pub rebalance_rows: usize,
    pub portfolio_points: usize,
    pub trades: usize,
}

/// Copy every CSV table into `db`. The schema is created if missing and
/// existing rows with the same keys are replaced.
#[cfg(feature = "sqlite")]
pub fn import_csv(
    csv: &CsvAdapter,
    db: &crate::adapters::sqlite_adapter::SqliteAdapter,
) -> Result<ImportSummary, EngineError> {
    db.initialize_schema()?;
    let mut summary = ImportSummary::default();

    for symbol in csv.list_symbols()? {
        let bars = csv.fetch_ohlcv(&symbol, None, None)?;
        tracing::debug!("Importing {} bar(s) for {}", bars.len(), symbol);
        db.insert_bars(&bars)?;
        summary.symbols += 1;
        summary.bars += bars.len();
    }

    let rows = csv.read_rebalance_rows()?;
    db.insert_rebalance_rows(&rows)?;
    summary.rebalance_rows = rows.len();

    let points = csv.read_portfolio_values()?;
    db.insert_portfolio_values(&points)?;
    summary.portfolio_points = points.len();

    let trades = csv.read_trades()?;
    db.insert_trades(&trades)?;
    summary.trades = trades.len();

    Ok(summary)
}

#[cfg(feature = "sqlite")]
fn run_import(csv_dir: &Path, db_path: &Path) -> Result<(), EngineError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::domain::config_validation::DEFAULT_POOL_SIZE;

    if !csv_dir.is_dir() {
        return Err(EngineError::unavailable(format!(
            "data directory {} does not exist",
            csv_dir.display()
        )));
    }
    let csv = CsvAdapter::new(csv_dir.to_path_buf());
    let db = SqliteAdapter::open(db_path, DEFAULT_POOL_SIZE)?;
    let summary = import_csv(&csv, &db)?;
    tracing::info!(
        "Imported {} symbol(s), {} bar(s), {} rebalance row(s), {} value point(s), {} trade(s) into {}",
        summary.symbols,
        summary.bars,
        summary.rebalance_rows,
        summary.portfolio_points,
        summary.trades,
        db_path.display()
    );
    Ok(())
}
