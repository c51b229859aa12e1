//! Utilities for logging.

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Install a global subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Returns false if a
/// global subscriber was already set.
pub fn configure_global_logger(default_level: Level, format: LogFormat) -> bool {
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter(default_level))
        .with_file(true)
        .with_line_number(true);

    let res = match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };

    res.is_ok()
}

/// Install a subscriber writing through the test harness' captured output.
///
/// Safe to call from every test, only the first call has an effect.
pub fn init_test() {
    let subscriber = FmtSubscriber::builder()
        .with_test_writer()
        .with_env_filter(env_filter(Level::ERROR))
        .with_file(true)
        .with_line_number(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_test_is_repeatable() {
        init_test();
        init_test();
        assert!(!configure_global_logger(Level::INFO, LogFormat::Json));
    }
}
