//! Test-only builder surface.
//!
//! Compiled only under `cfg(test)` or the `test-support` feature, so production
//! builds have no path that downgrades TLS verification or injects test filters.

use crate::config::schema::TrustChainVerification;
use crate::config::EngineBuilder;

/// Filter that lets integration tests observe requests inside the engine.
pub const TEST_READ_FILTER_NAME: &str = "envoy.filters.http.test_read";

pub const TEST_READ_FILTER_CONFIG: &str =
    "[type.googleapis.com/envoymobile.test.integration.filters.http.test_read.TestRead] {}";

impl EngineBuilder {
    /// Skip TLS certificate verification.
    pub fn mock_cert_verifier_for_testing(mut self) -> Self {
        tracing::warn!("TLS trust chain verification disabled for testing");
        self.settings.tls.trust_chain_verification = TrustChainVerification::AcceptUntrusted;
        self
    }

    /// Append the test-read filter to the native filter chain.
    pub fn add_url_interceptors_for_testing(self) -> Self {
        self.add_native_filter(TEST_READ_FILTER_NAME, TEST_READ_FILTER_CONFIG)
    }
}
