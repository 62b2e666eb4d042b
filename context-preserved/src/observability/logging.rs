//! Subscriber setup that shows the emitting thread's MDC on every event.

use crate::context::{mdc, DisplayContext};
use crate::errors::LoggingError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{Format, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `context_preserved=debug`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Prefix text lines with the MDC of the thread that emitted them.
    #[serde(default = "default_true")]
    pub include_context: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            include_context: default_true(),
        }
    }
}

impl LoggingConfig {
    /// Sets the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Enables or disables the MDC prefix.
    #[must_use]
    pub fn with_include_context(mut self, include: bool) -> Self {
        self.include_context = include;
        self
    }
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns `LoggingError::InvalidFilter` if any directive is malformed.
pub fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive.to_string(),
        message: e.to_string(),
    })
}

/// Installs the global subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.level` when set.
///
/// # Errors
///
/// Returns `LoggingError::InvalidFilter` for a malformed level, or
/// `LoggingError::AlreadyInitialized` if a global subscriber exists.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.level)?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match (config.format, config.include_context) {
        (LogFormat::Json, _) => builder.json().try_init(),
        (LogFormat::Text, true) => builder.event_format(MdcFormat::new(Format::default())).try_init(),
        (LogFormat::Text, false) => builder.try_init(),
    };
    installed.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

/// Event formatter that writes the current thread's MDC before delegating to
/// an inner formatter.
///
/// Output looks like `{request_id=r-1, user=alice} 2024-... INFO target: message`.
/// Nothing is prefixed when the MDC is absent or empty.
#[derive(Debug, Clone, Default)]
pub struct MdcFormat<F = Format> {
    inner: F,
}

impl<F> MdcFormat<F> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<S, N, F> FormatEvent<S, N> for MdcFormat<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: FormatEvent<S, N>,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        mdc::with_current(|context| match context {
            Some(map) if !map.is_empty() => write!(writer, "{} ", DisplayContext(map)),
            _ => Ok(()),
        })?;
        self.inner.format_event(ctx, writer, event)
    }
}
