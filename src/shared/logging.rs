use super::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// tracing の購読者を初期化する（二重初期化は無視）
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter.as_str()));

    let result = if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(false)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if result.is_ok() {
        tracing::info!(json = config.json, "logging initialized");
    }
}
