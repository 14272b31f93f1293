use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs the process-wide `tracing` subscriber. Idempotent: a second
/// call is a harmless no-op, since `tracing_subscriber`'s global
/// dispatcher can only ever be set once per process.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed, skipping re-init");
    }
}
