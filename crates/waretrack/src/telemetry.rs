use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ConfigError;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global tracing subscriber and bridges `log` records into it.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `Ok(false)`
/// when logging was already initialized by an earlier call.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let configured = EnvFilter::try_new(&config.level)
        .map_err(|e| ConfigError::Logging(format!("Invalid log filter: {}", e)))?;
    if INITIALIZED.load(Ordering::SeqCst) {
        return Ok(false);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or(configured);

    let registry = Registry::default().with(filter);
    let installed = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            ),
        ),
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().with_target(true)))
        }
    };
    installed.map_err(|e| ConfigError::Logging(e.to_string()))?;
    INITIALIZED.store(true, Ordering::SeqCst);

    tracing_log::LogTracer::init().map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::info!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(true)
}
