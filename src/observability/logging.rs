//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binary
//! - Bridge engine log lines into tracing
//! - Map engine log levels onto subscriber filters

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::engine::{EngineLogger, LogLevel};

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(level: LogLevel) -> String {
    let level = match level {
        LogLevel::Critical => "error",
        other => other.as_str(),
    };
    format!("engine_builder={level},engine={level}")
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

/// Logger sink that forwards engine output to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger;

impl EngineLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!(target: "engine", "{}", message),
            LogLevel::Debug => tracing::debug!(target: "engine", "{}", message),
            LogLevel::Info => tracing::info!(target: "engine", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "engine", "{}", message),
            LogLevel::Error | LogLevel::Critical => {
                tracing::error!(target: "engine", "{}", message)
            }
            LogLevel::Off => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_maps_to_error_filter() {
        assert_eq!(
            default_directive(LogLevel::Critical),
            "engine_builder=error,engine=error"
        );
        assert_eq!(default_directive(LogLevel::Debug), "engine_builder=debug,engine=debug");
    }

    #[test]
    fn default_directive_parses() {
        for level in [LogLevel::Trace, LogLevel::Info, LogLevel::Off] {
            assert!(EnvFilter::try_new(default_directive(level)).is_ok());
        }
    }
}
