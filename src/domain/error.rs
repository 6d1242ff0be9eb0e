//! Domain error types.

/// Top-level error type for liontrader.
#[derive(Debug, thiserror::Error)]
pub enum LionError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("corrupt ledger at line {line}: {reason}")]
    LedgerCorrupt { line: u64, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&LionError> for std::process::ExitCode {
    fn from(err: &LionError) -> Self {
        let code: u8 = match err {
            LionError::Io(_) => 1,
            LionError::ConfigParse { .. } | LionError::ConfigInvalid { .. } => 2,
            LionError::LedgerCorrupt { .. } => 3,
            LionError::Data { .. } | LionError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_corrupt_message_names_line() {
        let err = LionError::LedgerCorrupt {
            line: 4,
            reason: "invalid shares value".into(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt ledger at line 4: invalid shares value"
        );
    }

    #[test]
    fn config_invalid_message() {
        let err = LionError::ConfigInvalid {
            section: "allocation".into(),
            key: "target_pct".into(),
            reason: "must be between 0 and 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [allocation] target_pct: must be between 0 and 1"
        );
    }
}
