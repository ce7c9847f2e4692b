//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! typed setters (builder.rs)      config file (TOML)
//!     │                               → loader.rs (parse & deserialize)
//!     │                               → EngineBuilder::from_settings
//!     ▼                                        │
//! validation.rs (per-field, at set time) ◀─────┘
//!     → EngineSettings registry (schema.rs, mutable, single writer)
//!     → EngineBuilder::build (user agent defaulting, error report)
//!     → EngineConfig snapshot (snapshot.rs, immutable)
//!     → shared via Arc with the bootstrapper and the engine's threads
//! ```
//!
//! # Design Decisions
//! - Snapshot is immutable once built; a new configuration means a new engine
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Trust verification can only be downgraded through `crate::testing`

pub mod builder;
pub mod loader;
pub mod schema;
pub mod snapshot;
pub mod validation;

pub use builder::{default_user_agent, EngineBuilder};
pub use loader::{load_builder, load_settings, ConfigError};
pub use schema::{EngineSettings, QuicHint, TrustChainVerification};
pub use snapshot::EngineConfig;
pub use validation::{ValidationError, ValidationErrors};
