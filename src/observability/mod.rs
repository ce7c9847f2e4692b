//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Builder, bootstrapper, handle:
//!     → tracing macros (structured fields, engine id on every line)
//!     → metrics.rs (bootstrap outcomes, state transitions)
//!
//! Engine:
//!     → EngineLogger sink (logging.rs::TracingLogger)
//!     → same tracing subscriber, under the `engine` target
//! ```
//!
//! # Design Decisions
//! - The binary installs the subscriber; the library only emits
//! - Engine log lines are re-emitted through tracing so one filter governs both
//! - Metrics go through the `metrics` facade; no exporter is installed here

pub mod logging;
pub mod metrics;
