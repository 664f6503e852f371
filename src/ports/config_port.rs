//! Configuration access port trait.

use crate::domain::error::EngineError;

/// Sectioned key/value configuration, e.g. an INI file.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// Trimmed value of a key that must be present and non-blank.
    fn require_string(&self, section: &str, key: &str) -> Result<String, EngineError> {
        match self.get_string(section, key) {
            Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(EngineError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            }),
        }
    }
}
