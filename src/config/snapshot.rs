//! Frozen configuration handed to the engine.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::schema::{EngineSettings, TrustChainVerification};
use crate::filters::FilterChain;

/// Immutable snapshot of every tunable, taken by [`EngineBuilder::build`].
///
/// Only constructed by the builder and only handed out behind an `Arc`, so the
/// engine's threads can read it without synchronization.
///
/// [`EngineBuilder::build`]: crate::config::EngineBuilder::build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    settings: EngineSettings,
    user_agent: String,
}

impl EngineConfig {
    pub(crate) fn new(settings: EngineSettings, user_agent: String) -> Self {
        Self {
            settings,
            user_agent,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Effective user agent (explicit or synthesized).
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn runtime_guards(&self) -> &BTreeMap<String, bool> {
        &self.settings.runtime_guards
    }

    pub fn runtime_guard(&self, name: &str) -> Option<bool> {
        self.settings.runtime_guards.get(name).copied()
    }

    pub fn native_filters(&self) -> &FilterChain {
        &self.settings.native_filters
    }

    pub fn trust_chain_verification(&self) -> TrustChainVerification {
        self.settings.tls.trust_chain_verification
    }

    /// Render the snapshot for logs or diagnostics.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
