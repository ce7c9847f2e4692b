//! Engine and platform collaborators.
//!
//! # Data Flow
//! ```text
//! Bootstrapper
//!     → Platform::load_native_resources (may block)
//!     → Platform::attach_network_monitor (bound to one EngineRef)
//!     → NetworkEngine::start (non-blocking, reports through StartCompletion)
//!
//! Platform network change
//!     → EngineRef::notify
//!     → NetworkEngine::on_network_change (only the engine it was attached to)
//! ```
//!
//! # Design Decisions
//! - Traits are the seam: the real engine and OS hooks live behind them
//! - `embedded.rs` and `platform.rs` are in-process implementations used by the
//!   binary and the tests
//! - Log lines from the engine flow through `EngineLogger`, not stdout

pub mod embedded;
pub mod platform;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::lifecycle::handle::{EngineRef, StartCompletion};

pub use embedded::EmbeddedEngine;
pub use platform::LocalPlatform;

/// Engine log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Critical,
    Off,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level {0:?}")]
pub struct ParseLogLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            "off" => Ok(Self::Off),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

/// Sink for the engine's log lines.
pub trait EngineLogger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Connectivity event reported by the platform's network monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkChange {
    DefaultNetworkAvailable,
    DefaultNetworkUnavailable,
    DefaultNetworkChanged(NetworkType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Wlan,
    Wwan,
    Generic,
}

/// Process-level context the platform hooks need.
#[derive(Debug, Clone, Default)]
pub struct PlatformContext {
    /// Name reported in logs.
    pub app_name: String,
    /// Directory that must hold the engine's native resources, if any.
    pub resource_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("native resources not found at {0}")]
    ResourceMissing(PathBuf),

    #[error("engine {0} already has a network monitor attached")]
    MonitorAlreadyAttached(String),

    #[error("{0}")]
    Other(String),
}

/// Registration returned by [`Platform::attach_network_monitor`].
pub trait NetworkMonitor: Send + Sync {
    /// Stop delivering events. Called once, when the engine is released.
    fn detach(&self);
}

/// OS-facing hooks run before the engine starts.
pub trait Platform: Send + Sync {
    /// Load native resources. May block.
    fn load_native_resources(&self, context: &PlatformContext) -> Result<(), PlatformError>;

    /// Route future network-change events to `engine` and nothing else.
    fn attach_network_monitor(
        &self,
        context: &PlatformContext,
        engine: EngineRef,
    ) -> Result<Box<dyn NetworkMonitor>, PlatformError>;
}

/// The networking engine being brought up.
pub trait NetworkEngine: Send + Sync {
    /// Begin startup and return without blocking.
    ///
    /// The engine reports exactly one outcome through `completion`, from any thread.
    fn start(
        &self,
        config: Arc<EngineConfig>,
        logger: Arc<dyn EngineLogger>,
        log_level: LogLevel,
        completion: StartCompletion,
    );

    /// Release every native resource. Called at most once.
    fn terminate(&self);

    fn on_network_change(&self, _change: NetworkChange) {}
}

/// Creates a fresh engine for each bootstrap attempt.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn NetworkEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Box<dyn NetworkEngine> + Send + Sync,
{
    fn create(&self) -> Box<dyn NetworkEngine> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_levels() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("critical".parse::<LogLevel>(), Ok(LogLevel::Critical));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_level_round_trips_through_display() {
        for level in [LogLevel::Trace, LogLevel::Error, LogLevel::Off] {
            assert_eq!(level.to_string().parse::<LogLevel>(), Ok(level));
        }
    }
}
