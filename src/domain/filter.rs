//! Score filter AST and evaluation.
//!
//! Filters are built by [`crate::domain::filter_parser::parse`] from text such
//! as `AND(ABOVE(smoothed, 60), TREND(UP), NOT(SYMBOL("BANK")))`, or directly
//! in code. Evaluation is a pure predicate over one [`ScoreResult`].

use crate::domain::momentum::{ScoreResult, Trend};
use std::fmt;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Smoothed,
    Score21,
    Score63,
}

impl Field {
    pub fn value(&self, score: &ScoreResult) -> f64 {
        match self {
            Field::Smoothed => score.score_smoothed,
            Field::Score21 => score.score_21,
            Field::Score63 => score.score_63,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Smoothed => write!(f, "smoothed"),
            Field::Score21 => write!(f, "score21"),
            Field::Score63 => write!(f, "score63"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Above { field: Field, value: f64 },
    Below { field: Field, value: f64 },
    AtLeast { field: Field, value: f64 },
    AtMost { field: Field, value: f64 },
    Equals { field: Field, value: f64 },
    Between { field: Field, lower: f64, upper: f64 },
    /// Case-insensitive substring match on the symbol.
    SymbolContains(String),
    TrendIs(Trend),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// The search-box filter: substring match on the symbol.
    pub fn search(term: &str) -> Self {
        Filter::SymbolContains(term.trim().to_string())
    }

    pub fn matches(&self, score: &ScoreResult) -> bool {
        match self {
            Filter::Above { field, value } => field.value(score) > *value,
            Filter::Below { field, value } => field.value(score) < *value,
            Filter::AtLeast { field, value } => field.value(score) >= *value,
            Filter::AtMost { field, value } => field.value(score) <= *value,
            Filter::Equals { field, value } => (field.value(score) - value).abs() < EPSILON,
            Filter::Between {
                field,
                lower,
                upper,
            } => {
                let v = field.value(score);
                v >= *lower && v <= *upper
            }
            Filter::SymbolContains(term) => score
                .symbol
                .to_lowercase()
                .contains(&term.to_lowercase()),
            Filter::TrendIs(trend) => score.trend == *trend,
            Filter::And(filters) => filters.iter().all(|f| f.matches(score)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(score)),
            Filter::Not(filter) => !filter.matches(score),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, filters: &[Filter]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", filter)?;
    }
    write!(f, ")")
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Above { field, value } => write!(f, "ABOVE({}, {})", field, value),
            Filter::Below { field, value } => write!(f, "BELOW({}, {})", field, value),
            Filter::AtLeast { field, value } => write!(f, "AT_LEAST({}, {})", field, value),
            Filter::AtMost { field, value } => write!(f, "AT_MOST({}, {})", field, value),
            Filter::Equals { field, value } => write!(f, "EQUALS({}, {})", field, value),
            Filter::Between {
                field,
                lower,
                upper,
            } => write!(f, "BETWEEN({}, {}, {})", field, lower, upper),
            Filter::SymbolContains(term) => write!(f, "SYMBOL(\"{}\")", term),
            Filter::TrendIs(trend) => write!(f, "TREND({})", trend.to_string().to_uppercase()),
            Filter::And(filters) => write_list(f, "AND", filters),
            Filter::Or(filters) => write_list(f, "OR", filters),
            Filter::Not(filter) => write!(f, "NOT({})", filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::StrategyKind;

    fn sample(symbol: &str, s21: f64, s63: f64, smoothed: f64, trend: Trend) -> ScoreResult {
        ScoreResult {
            symbol: symbol.into(),
            strategy: StrategyKind::CloseBased,
            score_21: s21,
            score_63: s63,
            score_smoothed: smoothed,
            trend,
        }
    }

    #[test]
    fn comparisons_against_fields() {
        let s = sample("TCS", 80.0, 40.0, 64.0, Trend::Up);
        assert!(Filter::Above { field: Field::Smoothed, value: 60.0 }.matches(&s));
        assert!(!Filter::Above { field: Field::Smoothed, value: 64.0 }.matches(&s));
        assert!(Filter::AtLeast { field: Field::Smoothed, value: 64.0 }.matches(&s));
        assert!(Filter::Below { field: Field::Score63, value: 50.0 }.matches(&s));
        assert!(Filter::AtMost { field: Field::Score21, value: 80.0 }.matches(&s));
        assert!(Filter::Equals { field: Field::Score21, value: 80.0 }.matches(&s));
    }

    #[test]
    fn between_is_inclusive() {
        let s = sample("TCS", 80.0, 40.0, 64.0, Trend::Up);
        let f = Filter::Between {
            field: Field::Score63,
            lower: 40.0,
            upper: 50.0,
        };
        assert!(f.matches(&s));
        let f = Filter::Between {
            field: Field::Score63,
            lower: 40.01,
            upper: 50.0,
        };
        assert!(!f.matches(&s));
    }

    #[test]
    fn symbol_search_is_case_insensitive() {
        let s = sample("HDFCBANK", 0.0, 0.0, 0.0, Trend::Flat);
        assert!(Filter::search("bank").matches(&s));
        assert!(Filter::search(" HDFC ").matches(&s));
        assert!(!Filter::search("icici").matches(&s));
    }

    #[test]
    fn trend_and_composites() {
        let up = sample("INFY", 70.0, 50.0, 62.0, Trend::Up);
        let down = sample("WIPRO", 30.0, 50.0, 38.0, Trend::Down);
        let f = Filter::And(vec![
            Filter::TrendIs(Trend::Up),
            Filter::Above { field: Field::Smoothed, value: 50.0 },
        ]);
        assert!(f.matches(&up));
        assert!(!f.matches(&down));

        let f = Filter::Or(vec![
            Filter::TrendIs(Trend::Down),
            Filter::search("infy"),
        ]);
        assert!(f.matches(&up));
        assert!(f.matches(&down));

        let f = Filter::Not(Box::new(Filter::TrendIs(Trend::Up)));
        assert!(!f.matches(&up));
        assert!(f.matches(&down));
    }

    #[test]
    fn display_renders_filter_language() {
        let f = Filter::And(vec![
            Filter::Above { field: Field::Smoothed, value: 60.5 },
            Filter::TrendIs(Trend::Up),
            Filter::Not(Box::new(Filter::search("BANK"))),
        ]);
        assert_eq!(
            f.to_string(),
            "AND(ABOVE(smoothed, 60.5), TREND(UP), NOT(SYMBOL(\"BANK\")))"
        );
    }
}
