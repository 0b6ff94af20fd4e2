//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with environment-based
//! filtering and a console layer. Library crates log through the `log`
//! macros; the subscriber's `log` bridge picks those up too.

use tellus_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter: info everywhere, quiet wgpu internals.
const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

/// Initialize logging for the process.
///
/// `RUST_LOG` wins when set; otherwise the config's `debug.log_level`
/// (when non-empty) or the default filter applies.
///
/// # Examples
///
/// ```no_run
/// use tellus_config::Config;
/// use tellus_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(&config));
/// ```
pub fn init_logging(config: Option<&Config>) {
    let filter_str = match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();

    tracing::info!("logging initialized with filter '{filter_str}'");
}
