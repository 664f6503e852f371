//! JSON reports via serde.

use crate::domain::error::EngineError;
use crate::ports::report_port::{Report, ReportPort};

pub struct JsonReport {
    pub pretty: bool,
}

impl ReportPort for JsonReport {
    fn render(&self, report: &Report<'_>) -> Result<String, EngineError> {
        let result = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        result.map_err(|e| EngineError::invalid(format!("JSON serialization failed: {}", e)))
    }
}
