//! Domain error types.

/// Top-level error type for quantdash.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("insufficient data for {operation}: have {have} points, need {need}")]
    InsufficientData {
        operation: String,
        have: usize,
        need: usize,
    },

    #[error("no overlapping dates across {assets} assets")]
    NoOverlap { assets: usize },

    #[error("empty series after aligning {context}")]
    EmptySeries { context: String },

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

    #[error("price data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        QuantError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        QuantError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn insufficient(operation: &str, have: usize, need: usize) -> Self {
        QuantError::InsufficientData {
            operation: operation.to_string(),
            have,
            need,
        }
    }
}

impl From<&QuantError> for std::process::ExitCode {
    fn from(err: &QuantError) -> Self {
        let code: u8 = match err {
            QuantError::Io(_) => 1,
            QuantError::ConfigParse { .. }
            | QuantError::ConfigMissing { .. }
            | QuantError::ConfigInvalid { .. } => 2,
            QuantError::Data { .. } => 3,
            QuantError::InvalidParameter { .. } => 4,
            QuantError::InsufficientData { .. }
            | QuantError::NoOverlap { .. }
            | QuantError::EmptySeries { .. } => 5,
            QuantError::InvalidInput { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = QuantError::insufficient("volatility", 1, 2);
        assert_eq!(
            err.to_string(),
            "insufficient data for volatility: have 1 points, need 2"
        );

        let err = QuantError::ConfigInvalid {
            section: "backtest".into(),
            key: "lookback".into(),
            reason: "must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [backtest] lookback: must be positive"
        );
    }

    #[test]
    fn exit_codes_group_by_kind() {
        use std::process::ExitCode;

        let cases = [
            (QuantError::invalid_parameter("lookback", "zero"), ExitCode::from(4)),
            (QuantError::invalid_input("unsorted"), ExitCode::from(6)),
            (QuantError::NoOverlap { assets: 2 }, ExitCode::from(5)),
            (
                QuantError::ConfigMissing {
                    section: "data".into(),
                    key: "directory".into(),
                },
                ExitCode::from(2),
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(
                format!("{:?}", ExitCode::from(&err)),
                format!("{expected:?}")
            );
        }
    }
}
