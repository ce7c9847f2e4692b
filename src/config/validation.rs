//! Configuration validation.
//!
//! # Responsibilities
//! - Check each tunable against its documented domain (non-negative timeouts,
//!   positive limits, non-empty names)
//! - Validate sections loaded from disk with the same rules the setters use
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - No cross-field checks; semantic checks (e.g. QUIC hint reachability) belong to the engine
//! - Validation is pure: `&EngineSettings → Result<(), ValidationErrors>`

use std::fmt;

use thiserror::Error;

use crate::config::schema::{EngineSettings, QuicHint};

/// A single tunable received a value outside its domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },

    #[error("{field} must be at least {min} (got {value})")]
    BelowMinimum {
        field: &'static str,
        value: i64,
        min: i64,
    },

    #[error("{field} exceeds the supported maximum of {max} (got {value})")]
    AboveMaximum {
        field: &'static str,
        value: i64,
        max: i64,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("invalid QUIC hint {host:?}:{port}")]
    InvalidQuicHint { host: String, port: u16 },
}

impl ValidationError {
    /// Name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Negative { field, .. }
            | Self::BelowMinimum { field, .. }
            | Self::AboveMaximum { field, .. }
            | Self::Empty { field } => field,
            Self::InvalidQuicHint { .. } => "quic_hints",
        }
    }
}

/// Every validation failure collected for one build or load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any error was recorded against `field`.
    pub fn contains_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: ")?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Check a count of seconds or milliseconds and narrow it to `u32`.
pub fn non_negative(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::AboveMaximum {
        field,
        value,
        max: i64::from(u32::MAX),
    })
}

/// Like [`non_negative`] but also rejects zero.
pub fn positive(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field, value });
    }
    if value == 0 {
        return Err(ValidationError::BelowMinimum {
            field,
            value,
            min: 1,
        });
    }
    non_negative(field, value)
}

pub fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}

pub fn quic_hint(hint: &QuicHint) -> Result<(), ValidationError> {
    if hint.host.trim().is_empty() || hint.port == 0 {
        return Err(ValidationError::InvalidQuicHint {
            host: hint.host.clone(),
            port: hint.port,
        });
    }
    Ok(())
}

/// Validate settings that did not come through the typed setters (e.g. a TOML file).
///
/// Unsigned fields cannot be negative once deserialized, so this covers the
/// positive-only limits, names and hints.
pub fn validate_settings(settings: &EngineSettings) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if settings.http.max_connections_per_host == 0 {
        errors.push(ValidationError::BelowMinimum {
            field: "max_connections_per_host",
            value: 0,
            min: 1,
        });
    }

    if let Some(ua) = &settings.identity.user_agent {
        if let Err(e) = non_empty("user_agent", ua) {
            errors.push(e);
        }
    }

    for hint in &settings.quic.hints {
        if let Err(e) = quic_hint(hint) {
            errors.push(e);
        }
    }

    if settings.runtime_guards.keys().any(|k| k.trim().is_empty()) {
        errors.push(ValidationError::Empty {
            field: "runtime_guard",
        });
    }

    for filter in settings.native_filters.iter() {
        if let Err(e) = non_empty("native_filter", filter.name()) {
            errors.push(e);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors::new(errors))
    }
}
