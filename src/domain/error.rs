//! Domain error types.

/// A parse error with position information for filter parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    ///
    /// `position` is a byte offset; the caret column counts characters.
    pub fn display_with_context(&self, input: &str) -> String {
        let column = input
            .get(..self.position)
            .map_or(self.position, |prefix| prefix.chars().count());
        let caret = " ".repeat(column) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for the engine and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Fewer bars or points than a computation needs. Expected for new
    /// listings and thin data; callers branch on it.
    #[error("insufficient data for {subject}: have {have}, need {need}")]
    InsufficientData {
        subject: String,
        have: usize,
        need: usize,
    },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A store collaborator could not supply data.
    #[error("data unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    FilterParse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        EngineError::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, EngineError::InsufficientData { .. })
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Unavailable { .. } => 3,
            EngineError::FilterParse(_) => 4,
            EngineError::InsufficientData { .. } => 5,
            EngineError::InvalidInput { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
