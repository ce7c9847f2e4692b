//! Ordered list of named filter descriptors.

use serde::{Deserialize, Serialize};

use crate::config::validation::{non_empty, ValidationError};

/// One processing stage: the name the engine dispatches on, plus its serialized config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct FilterConfig {
    name: String,
    typed_config: String,
}

impl FilterConfig {
    /// Create a descriptor. The name must be non-empty; the payload is not inspected.
    pub fn new(
        name: impl Into<String>,
        typed_config: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        non_empty("native_filter", &name)?;
        Ok(Self {
            name,
            typed_config: typed_config.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn typed_config(&self) -> &str {
        &self.typed_config
    }
}

/// Filters in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FilterChain(Vec<FilterConfig>);

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage after every stage already present.
    pub fn push(&mut self, filter: FilterConfig) {
        tracing::debug!(filter = %filter.name, position = self.0.len(), "Native filter added");
        self.0.push(filter);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterConfig> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(FilterConfig::name).collect()
    }
}

impl<'a> IntoIterator for &'a FilterChain {
    type Item = &'a FilterConfig;
    type IntoIter = std::slice::Iter<'a, FilterConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
