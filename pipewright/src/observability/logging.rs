//! Global logging setup.
//!
//! All operational logging flows through `tracing`; this helper wires
//! the process-wide subscriber. Filtering follows `RUST_LOG`, defaulting
//! to `info`.

use tracing_subscriber::EnvFilter;

/// Output format for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text lines.
    #[default]
    Text,
    /// Structured JSON, one event per line.
    Json,
}

/// Installs the global tracing subscriber.
///
/// Returns true when this call installed it; false when a subscriber
/// was already set (tests, embedding applications).
pub fn init_logging(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        // Whatever the first call returns, the second cannot install
        // a second global subscriber.
        let _ = init_logging(LogFormat::Text);
        assert!(!init_logging(LogFormat::Json));
    }
}
