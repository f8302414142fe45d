//! Logging setup for the `errchain` binary.
//!
//! Classification emits `tracing` events (`debug` on a match, `trace` for each
//! visited node). The binary installs a stderr subscriber so that diagnosis
//! output on stdout stays machine-readable.

use tracing_subscriber::{fmt, EnvFilter};

/// Log level configuration for the logging middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    /// Warnings only (default; classification itself never warns)
    #[default]
    Warn,
    Error,
    /// Disable logging entirely
    Off,
}

impl LogLevel {
    fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl From<u8> for LogLevel {
    /// Convert verbosity count to log level.
    /// 0 = Warn, 1 = Debug (shows matches), 2+ = Trace (shows every node)
    fn from(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Configuration for the logging middleware.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub with_timestamps: bool,
    /// Whether to include the target (module path)
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            with_timestamps: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.with_timestamps = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Create a configuration from verbosity level (0 = warn, 1 = debug, 2+ = trace).
    pub fn from_verbosity(verbosity: u8) -> Self {
        Self::default().with_level(LogLevel::from(verbosity))
    }

    /// The filter directive applied when `RUST_LOG` is unset.
    ///
    /// Only this crate's events are raised to the configured level; everything
    /// else stays at `warn`.
    pub fn directive(&self) -> String {
        match self.level {
            LogLevel::Off => "off".to_string(),
            level => format!("warn,errchain={}", level.as_directive()),
        }
    }
}

/// Initialize the logging middleware with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr.
/// Calling this more than once leaves the first subscriber in place.
pub fn init_logging(config: LoggingConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.directive())
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    // An already installed global subscriber is not an error for a CLI.
    let _ = if config.with_timestamps {
        subscriber.try_init()
    } else {
        subscriber.without_time().try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_verbosity() {
        assert_eq!(LogLevel::from(0), LogLevel::Warn);
        assert_eq!(LogLevel::from(1), LogLevel::Debug);
        assert_eq!(LogLevel::from(2), LogLevel::Trace);
        assert_eq!(LogLevel::from(10), LogLevel::Trace);
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Debug)
            .with_timestamps(true)
            .with_target(false);

        assert_eq!(config.level, LogLevel::Debug);
        assert!(config.with_timestamps);
        assert!(!config.with_target);
    }

    #[test]
    fn test_directive_scopes_to_crate() {
        assert_eq!(
            LoggingConfig::from_verbosity(2).directive(),
            "warn,errchain=trace"
        );
        assert_eq!(LoggingConfig::default().directive(), "warn,errchain=warn");
        assert_eq!(
            LoggingConfig::new().with_level(LogLevel::Off).directive(),
            "off"
        );
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig::from_verbosity(1));
    }
}
