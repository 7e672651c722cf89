//! Subscriber setup for the `tracing` events emitted by the search.
//!
//! Only available with the `structured-logging` feature:
//!
//! ```toml
//! [dependencies]
//! harmonia-bn = { version = "0.1", features = ["structured-logging"] }
//! ```
//!
//! ```no_run
//! use harmonia_bn::logging::{LogFormat, LogLevel, LoggingBuilder};
//!
//! LoggingBuilder::new()
//!     .with_format(LogFormat::Json)
//!     .with_level(LogLevel::Debug)
//!     .init()
//!     .expect("logging already initialized");
//! ```
//!
//! Events are written to stderr. `RUST_LOG` takes precedence over the
//! configured level unless an explicit filter is given with
//! [`LoggingBuilder::with_env_filter`].

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{BnError, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human-readable output with colors.
    #[default]
    Pretty,
    /// Single-line output without colors.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Includes per-edge cycle rejections.
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration of the global subscriber.
#[derive(Debug, Clone, Default)]
pub struct LoggingBuilder {
    format: LogFormat,
    level: LogLevel,
    env_filter: Option<String>,
    with_targets: bool,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Use a filter directive such as `"harmonia_bn=trace"` instead of the
    /// level.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Include module paths in log lines.
    pub fn with_targets(mut self, enabled: bool) -> Self {
        self.with_targets = enabled;
        self
    }

    /// Install the global subscriber. Fails if one is already installed.
    pub fn init(self) -> Result<()> {
        let env_filter = match self.env_filter {
            Some(filter) => EnvFilter::try_new(&filter)
                .map_err(|e| BnError::Logging(format!("Invalid env filter '{}': {}", filter, e)))?,
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        };

        let registry = tracing_subscriber::registry().with(env_filter);
        let installed = match self.format {
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(self.with_targets)
                        .pretty(),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(self.with_targets)
                        .with_ansi(false)
                        .compact(),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(self.with_targets)
                        .json(),
                )
                .try_init(),
        };

        installed.map_err(|e| BnError::Logging(format!("Failed to initialize tracing: {}", e)))
    }
}

/// Install a subscriber with the given format and level.
pub fn init_tracing(format: LogFormat, level: LogLevel) -> Result<()> {
    LoggingBuilder::new()
        .with_format(format)
        .with_level(level)
        .init()
}
