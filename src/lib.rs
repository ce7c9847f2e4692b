//! Configuration assembly and bootstrap for a networking engine.
//!
//! Collects the engine's tunables into an immutable [`EngineConfig`] snapshot
//! and drives the startup sequence that turns it into a running [`EngineHandle`].
//!
//! ```text
//! EngineBuilder ──build()──▶ Arc<EngineConfig>
//!                                  │
//!                                  ▼
//! Bootstrapper::bootstrap: load native resources → attach network monitor → start engine
//!                                  │
//!                                  ▼
//!                 EngineHandle (Starting → Running | Stopped)
//! ```

pub mod config;
pub mod engine;
pub mod filters;
pub mod lifecycle;
pub mod observability;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{EngineBuilder, EngineConfig};
pub use lifecycle::{Bootstrapper, EngineHandle, EngineState};
