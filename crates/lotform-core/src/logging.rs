//! Logging setup for host applications.
//!
//! Library code only emits `tracing` events; nothing here runs unless the
//! host calls [`init_logging`].
//!
//! # Log Levels
//!
//! - `warn`: skipped document keys, pointer resets, schema drift
//! - `info`: lot lifecycle, snapshot load and export
//! - `debug`: reconciliation counts, step validation results
//! - `trace`: field writes (values redacted unless `log_values` is set)

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

static LOG_VALUES_ENABLED: AtomicBool = AtomicBool::new(false);

/// Placeholder logged instead of field values.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Returns true if field values may be logged.
pub fn log_values_enabled() -> bool {
    LOG_VALUES_ENABLED.load(Ordering::Relaxed)
}

/// Field value for a log line. Form data can hold personal details, so
/// values are redacted unless explicitly enabled.
pub fn redact_value(value: &Value) -> String {
    if log_values_enabled() {
        value.to_string()
    } else {
        REDACTED_VALUE.to_string()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    /// Include the module path in each line.
    pub with_target: bool,
    pub with_ansi: bool,
    pub format: LogFormat,
    /// Whether field values may appear in logs.
    pub log_values: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_target: false,
            with_ansi: true,
            format: LogFormat::default(),
            log_values: false,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }

    #[must_use]
    pub fn with_log_values(mut self, enable: bool) -> Self {
        self.log_values = enable;
        self
    }
}

/// Install a global subscriber writing to stderr.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    init_logging_with_writer(config, std::io::stderr)
}

/// Install a global subscriber with a custom writer.
pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W) -> Result<(), TryInitError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    LOG_VALUES_ENABLED.store(config.log_values, Ordering::Release);
    let filter = build_env_filter(config.level);

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(config.with_target),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_ansi(config.with_ansi)
                    .with_target(config.with_target),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(config.with_ansi)
                    .with_target(config.with_target),
            )
            .try_init(),
    }
}

/// `RUST_LOG` wins; otherwise the engine crates log at `level` and
/// everything else at `warn`.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!(
            "warn,lotform_core={level},lotform_model={level},lotform_persistence={level},\
             lotform_schema={level},lotform_state={level},lotform_validate={level}"
        ))
    })
}
