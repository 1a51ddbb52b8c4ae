//! Domain error types.
//!
//! Structural preconditions raise; formula-level arithmetic never does — it
//! degrades to documented sentinel values instead.

/// Per-symbol scoring failure. Excludes the symbol from the current run
/// without aborting the batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScoreError {
    #[error("insufficient data for {symbol}: missing {missing} metric")]
    InsufficientData { symbol: String, missing: String },
}

/// Top-level error type for stocksift.
#[derive(Debug, thiserror::Error)]
pub enum SiftError {
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

    #[error("invalid weight profile: {reason}")]
    InvalidWeights { reason: String },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("no scorable symbols in universe ({skipped} skipped)")]
    EmptyUniverse { skipped: usize },

    #[error("insufficient history: {days} trading days, need {minimum}")]
    InsufficientHistory { days: usize, minimum: usize },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SiftError> for std::process::ExitCode {
    fn from(err: &SiftError) -> Self {
        let code: u8 = match err {
            SiftError::Io(_) => 1,
            SiftError::ConfigParse { .. }
            | SiftError::ConfigMissing { .. }
            | SiftError::ConfigInvalid { .. } => 2,
            SiftError::Data { .. } => 3,
            SiftError::InvalidWeights { .. } | SiftError::UnknownStrategy { .. } => 4,
            SiftError::EmptyUniverse { .. } | SiftError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strategy_message() {
        let err = SiftError::UnknownStrategy {
            name: "no_such".into(),
        };
        assert_eq!(err.to_string(), "unknown strategy: no_such");
    }

    #[test]
    fn insufficient_history_message() {
        let err = SiftError::InsufficientHistory {
            days: 7,
            minimum: 20,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history: 7 trading days, need 20"
        );
    }

    #[test]
    fn score_error_message() {
        let err = ScoreError::InsufficientData {
            symbol: "600000".into(),
            missing: "oscillator".into(),
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for 600000: missing oscillator metric"
        );
    }
}
