//! Configuration validation.
//!
//! Each section is checked before use and turned into a typed settings value.

use crate::domain::error::EngineError;
use crate::domain::metrics::{MetricsConfig, DEFAULT_PERIODS_PER_YEAR};
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;

pub const DEFAULT_POOL_SIZE: u32 = 4;
pub const DEFAULT_TOP_N: i64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv { dir: PathBuf },
    Sqlite { path: PathBuf, pool_size: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingSettings {
    pub strategy: StrategyKind,
    /// `None` keeps every ranked row.
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSettings {
    pub config: MetricsConfig,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> EngineError {
    EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<DataSource, EngineError> {
    let source = config
        .get_string("data", "source")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "csv".to_string());

    match source.as_str() {
        "csv" => Ok(DataSource::Csv {
            dir: PathBuf::from(config.require_string("data", "csv_dir")?),
        }),
        "sqlite" => {
            let path = PathBuf::from(config.require_string("sqlite", "path")?);
            let pool_size = config.get_int("sqlite", "pool_size", i64::from(DEFAULT_POOL_SIZE));
            if !(1..=64).contains(&pool_size) {
                return Err(invalid(
                    "sqlite",
                    "pool_size",
                    "pool_size must be between 1 and 64",
                ));
            }
            Ok(DataSource::Sqlite {
                path,
                pool_size: pool_size as u32,
            })
        }
        other => Err(invalid(
            "data",
            "source",
            format!("unknown source '{}', expected csv or sqlite", other),
        )),
    }
}

pub fn validate_ranking_config(config: &dyn ConfigPort) -> Result<RankingSettings, EngineError> {
    let strategy = match config.get_string("ranking", "strategy") {
        None => StrategyKind::CloseBased,
        Some(s) => s
            .parse::<StrategyKind>()
            .map_err(|e| invalid("ranking", "strategy", e.to_string()))?,
    };

    let top_n = config.get_int("ranking", "top_n", DEFAULT_TOP_N);
    Ok(RankingSettings {
        strategy,
        top_n: usize::try_from(top_n).ok().filter(|n| *n > 0),
    })
}

pub fn validate_metrics_config(config: &dyn ConfigPort) -> Result<MetricsSettings, EngineError> {
    let periods_per_year = config.get_double("metrics", "periods_per_year", DEFAULT_PERIODS_PER_YEAR);
    if !(periods_per_year.is_finite() && periods_per_year > 0.0) {
        return Err(invalid(
            "metrics",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }

    let from = parse_optional_date(config, "metrics", "from")?;
    let to = parse_optional_date(config, "metrics", "to")?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(invalid("metrics", "from", "from must not be after to"));
        }
    }

    Ok(MetricsSettings {
        config: MetricsConfig { periods_per_year },
        from,
        to,
    })
}

fn parse_optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, EngineError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid(section, key, format!("invalid {} format, expected YYYY-MM-DD", key))),
    }
}
