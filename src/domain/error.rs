//! Domain error types.

/// Top-level error type for signalforge.
#[derive(Debug, thiserror::Error)]
pub enum SignalForgeError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error("exchange request failed: {reason}")]
    Exchange { reason: String },

    #[error("malformed candle for {symbol}: {reason}")]
    MalformedCandle { symbol: String, reason: String },

    #[error("no candle data for {symbol} ({granularity})")]
    NoData { symbol: String, granularity: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("export error: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SignalForgeError> for std::process::ExitCode {
    fn from(err: &SignalForgeError) -> Self {
        let code: u8 = match err {
            SignalForgeError::Io(_) | SignalForgeError::Export { .. } => 1,
            SignalForgeError::ConfigParse { .. }
            | SignalForgeError::ConfigMissing { .. }
            | SignalForgeError::ConfigInvalid { .. } => 2,
            SignalForgeError::Database { .. } | SignalForgeError::DatabaseQuery { .. } => 3,
            SignalForgeError::Exchange { .. } | SignalForgeError::MalformedCandle { .. } => 4,
            SignalForgeError::NoData { .. } | SignalForgeError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_database() {
        let err = SignalForgeError::Database {
            reason: "pool exhausted".into(),
        };
        assert_eq!(err.to_string(), "database error: pool exhausted");
    }

    #[test]
    fn error_display_config_missing() {
        let err = SignalForgeError::ConfigMissing {
            section: "sqlite".into(),
            key: "path".into(),
        };
        assert_eq!(err.to_string(), "missing config key [sqlite] path");
    }

    #[test]
    fn error_display_insufficient_data() {
        let err = SignalForgeError::InsufficientData {
            symbol: "BTCUSDT".into(),
            bars: 10,
            minimum: 50,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for BTCUSDT: have 10 bars, need 50"
        );
    }

    #[test]
    fn exit_codes_by_class() {
        use std::process::ExitCode;

        let config_err = SignalForgeError::ConfigMissing {
            section: "a".into(),
            key: "b".into(),
        };
        let db_err = SignalForgeError::Database { reason: "x".into() };
        let http_err = SignalForgeError::Exchange { reason: "x".into() };
        let data_err = SignalForgeError::NoData {
            symbol: "BTCUSDT".into(),
            granularity: "1d".into(),
        };

        // ExitCode has no accessor, so just verify the conversions compile
        // and are distinct classes by matching the source variants.
        let _: ExitCode = (&config_err).into();
        let _: ExitCode = (&db_err).into();
        let _: ExitCode = (&http_err).into();
        let _: ExitCode = (&data_err).into();
    }
}
