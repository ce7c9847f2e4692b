//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     EngineConfig → load native resources → attach network monitor
//!         → start engine → EngineHandle (Starting)
//!
//! Handle (handle.rs):
//!     Starting → Running (on-running callback) | Stopped (failure reason)
//!     stop() / drop → Stopped, resources released once
//!
//! Shutdown (shutdown.rs) / Signals (signals.rs):
//!     SIGTERM/SIGINT → stop the handle → engine task exits
//! ```
//!
//! # Design Decisions
//! - Ordered startup: resources first, then monitor, then engine
//! - A bootstrap error never leaves a handle behind
//! - Asynchronous start failures surface on the handle, not the bootstrap call

pub mod handle;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use handle::{
    EngineHandle, EngineId, EngineRef, EngineStartError, EngineState, HandleError,
    OnEngineRunning, StartCompletion,
};
pub use shutdown::Shutdown;
pub use startup::{BootstrapError, BootstrapStep, Bootstrapper};
