//! Tracing subscriber setup shared by every binary.

use crate::config::{LogFormat, LoggingConfig};

/// Install the global tracing subscriber from configuration. Safe to call
/// more than once per process; later calls keep the first subscriber.
pub fn init_logging(config: &LoggingConfig) {
    let level = config.level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(level);
    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
