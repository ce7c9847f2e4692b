//! Native filter chain assembly.
//!
//! # Data Flow
//! ```text
//! builder.add_native_filter(name, typed_config)
//!     → chain.rs (name checked, payload stored untouched)
//!     → EngineSettings::native_filters (ordered)
//!     → EngineConfig snapshot (frozen)
//!     → engine request path, executed in insertion order
//! ```
//!
//! # Design Decisions
//! - The payload is opaque here; its schema belongs to the filter implementation
//! - Insertion order is execution order and is never re-sorted
//! - Test-only filters live in `crate::testing`, not on the production path

pub mod chain;

pub use chain::{FilterChain, FilterConfig};
