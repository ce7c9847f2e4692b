//! Fluent configuration builder.
//!
//! Setters take ownership and hand the builder back so calls chain. Each setter
//! validates its own input on the spot; rejected values leave the field untouched
//! and the error is reported by [`EngineBuilder::build`]. A later valid write to
//! the same field clears its error, matching last-write-wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::schema::{EngineSettings, IdentitySettings, QuicHint};
use crate::config::snapshot::EngineConfig;
use crate::config::validation::{
    non_empty, non_negative, positive, quic_hint, validate_settings, ValidationError,
    ValidationErrors,
};
use crate::filters::FilterConfig;

/// Synthesize a user agent from the application identity and host platform.
pub fn default_user_agent(identity: &IdentitySettings) -> String {
    format!(
        "{}/{} ({}; {}) {}/{}",
        identity.app_id,
        identity.app_version,
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    )
}

/// Fields whose errors belong to one list entry rather than a scalar value.
fn is_entry_field(field: &str) -> bool {
    matches!(
        field,
        "quic_hints" | "quic_canonical_suffix" | "native_filter" | "runtime_guard"
    )
}

/// Mutable setting registry plus the errors its setters have recorded.
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    pub(crate) settings: EngineSettings,
    /// Errors for scalar fields, replaced or cleared by later writes.
    field_errors: BTreeMap<&'static str, ValidationError>,
    /// Errors for rejected list entries (filters, hints, guards).
    entry_errors: Vec<ValidationError>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from settings loaded elsewhere (e.g. a TOML file).
    ///
    /// Invalid values are recorded exactly like a rejected setter call, so they
    /// can still be overridden before [`build`](Self::build).
    pub fn from_settings(settings: EngineSettings) -> Self {
        let mut builder = Self {
            settings,
            ..Self::default()
        };
        if let Err(errors) = validate_settings(&builder.settings) {
            for error in errors.into_inner() {
                if is_entry_field(error.field()) {
                    builder.entry_errors.push(error);
                } else {
                    builder.field_errors.insert(error.field(), error);
                }
            }
        }
        builder
    }

    /// Current registry contents.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Errors recorded so far, in field order followed by rejected entries.
    pub fn validation_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.field_errors.values().chain(self.entry_errors.iter())
    }

    fn check<T>(&mut self, field: &'static str, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.field_errors.remove(field);
                Some(value)
            }
            Err(error) => {
                tracing::warn!(field, error = %error, "Rejected configuration value");
                self.field_errors.insert(field, error);
                None
            }
        }
    }

    fn reject_entry(&mut self, error: ValidationError) {
        tracing::warn!(field = error.field(), error = %error, "Rejected configuration entry");
        self.entry_errors.push(error);
    }

    // Timeouts

    pub fn connect_timeout_secs(mut self, secs: i64) -> Self {
        if let Some(v) = self.check("connect_timeout_secs", non_negative("connect_timeout_secs", secs)) {
            self.settings.timeouts.connect_secs = v;
        }
        self
    }

    pub fn stream_idle_timeout_secs(mut self, secs: i64) -> Self {
        if let Some(v) = self.check(
            "stream_idle_timeout_secs",
            non_negative("stream_idle_timeout_secs", secs),
        ) {
            self.settings.timeouts.stream_idle_secs = v;
        }
        self
    }

    pub fn per_try_idle_timeout_secs(mut self, secs: i64) -> Self {
        if let Some(v) = self.check(
            "per_try_idle_timeout_secs",
            non_negative("per_try_idle_timeout_secs", secs),
        ) {
            self.settings.timeouts.per_try_idle_secs = v;
        }
        self
    }

    // DNS

    pub fn dns_refresh_secs(mut self, secs: i64) -> Self {
        if let Some(v) = self.check("dns_refresh_secs", non_negative("dns_refresh_secs", secs)) {
            self.settings.dns.refresh_secs = v;
        }
        self
    }

    /// Backoff applied after a failed resolution: starts at `base`, capped at `max`.
    pub fn dns_failure_refresh_secs(mut self, base: i64, max: i64) -> Self {
        if let Some(v) = self.check(
            "dns_failure_refresh_base_secs",
            non_negative("dns_failure_refresh_base_secs", base),
        ) {
            self.settings.dns.failure_refresh_base_secs = v;
        }
        if let Some(v) = self.check(
            "dns_failure_refresh_max_secs",
            non_negative("dns_failure_refresh_max_secs", max),
        ) {
            self.settings.dns.failure_refresh_max_secs = v;
        }
        self
    }

    /// Deadline within which a DNS query must succeed or fail. Default 5s.
    pub fn dns_query_timeout_secs(mut self, secs: i64) -> Self {
        if let Some(v) = self.check(
            "dns_query_timeout_secs",
            non_negative("dns_query_timeout_secs", secs),
        ) {
            self.settings.dns.query_timeout_secs = v;
        }
        self
    }

    /// Minimum time before a DNS entry is refreshed, even if its TTL is shorter. Default 60s.
    pub fn min_dns_refresh_secs(mut self, secs: i64) -> Self {
        if let Some(v) = self.check("min_dns_refresh_secs", non_negative("min_dns_refresh_secs", secs)) {
            self.settings.dns.min_refresh_secs = v;
        }
        self
    }

    pub fn dns_preresolve_hostnames<I, S>(mut self, hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.dns.preresolve_hostnames = hostnames.into_iter().map(Into::into).collect();
        self
    }

    pub fn dns_fallback_nameservers<I, S>(mut self, nameservers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.dns.fallback_nameservers = nameservers.into_iter().map(Into::into).collect();
        self
    }

    /// Enable the persistent DNS cache, saved every `save_interval_secs`.
    pub fn enable_dns_cache(mut self, enable: bool, save_interval_secs: i64) -> Self {
        self.settings.dns.cache_enabled = enable;
        if let Some(v) = self.check(
            "dns_cache_save_interval_secs",
            non_negative("dns_cache_save_interval_secs", save_interval_secs),
        ) {
            self.settings.dns.cache_save_interval_secs = v;
        }
        self
    }

    pub fn enable_dns_filter_unroutable_families(mut self, enable: bool) -> Self {
        self.settings.dns.filter_unroutable_families = enable;
        self
    }

    /// Drain connections after a DNS refresh changes the host address mapping. Off by default.
    pub fn enable_drain_post_dns_refresh(mut self, enable: bool) -> Self {
        self.settings.dns.drain_post_refresh = enable;
        self
    }

    // HTTP

    pub fn enable_gzip_decompression(mut self, enable: bool) -> Self {
        self.settings.http.gzip_decompression = enable;
        self
    }

    pub fn enable_brotli_decompression(mut self, enable: bool) -> Self {
        self.settings.http.brotli_decompression = enable;
        self
    }

    pub fn h2_keepalive_idle_interval_ms(mut self, millis: i64) -> Self {
        if let Some(v) = self.check(
            "h2_keepalive_idle_interval_ms",
            non_negative("h2_keepalive_idle_interval_ms", millis),
        ) {
            self.settings.http.h2_keepalive_idle_interval_ms = v;
        }
        self
    }

    pub fn h2_keepalive_timeout_secs(mut self, secs: i64) -> Self {
        if let Some(v) = self.check(
            "h2_keepalive_timeout_secs",
            non_negative("h2_keepalive_timeout_secs", secs),
        ) {
            self.settings.http.h2_keepalive_timeout_secs = v;
        }
        self
    }

    pub fn max_connections_per_host(mut self, max: i64) -> Self {
        if let Some(v) = self.check("max_connections_per_host", positive("max_connections_per_host", max)) {
            self.settings.http.max_connections_per_host = v;
        }
        self
    }

    // QUIC

    pub fn enable_quic(mut self, enable: bool) -> Self {
        self.settings.quic.enabled = enable;
        self
    }

    pub fn quic_connection_options(mut self, options: impl Into<String>) -> Self {
        self.settings.quic.connection_options = options.into();
        self
    }

    pub fn quic_client_connection_options(mut self, options: impl Into<String>) -> Self {
        self.settings.quic.client_connection_options = options.into();
        self
    }

    /// Attempt `host:port` over HTTP/3 without waiting for alt-svc discovery.
    pub fn add_quic_hint(mut self, host: impl Into<String>, port: u16) -> Self {
        let hint = QuicHint {
            host: host.into(),
            port,
        };
        match quic_hint(&hint) {
            Ok(()) => self.settings.quic.hints.push(hint),
            Err(e) => self.reject_entry(e),
        }
        self
    }

    pub fn add_quic_canonical_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        match non_empty("quic_canonical_suffix", &suffix) {
            Ok(()) => self.settings.quic.canonical_suffixes.push(suffix),
            Err(e) => self.reject_entry(e),
        }
        self
    }

    // Network

    pub fn enable_socket_tagging(mut self, enable: bool) -> Self {
        self.settings.network.socket_tagging = enable;
        self
    }

    pub fn enable_interface_binding(mut self, enable: bool) -> Self {
        self.settings.network.interface_binding = enable;
        self
    }

    pub fn enable_proxying(mut self, enable: bool) -> Self {
        self.settings.network.proxying = enable;
        self
    }

    pub fn enable_port_migration(mut self, enable: bool) -> Self {
        self.settings.network.port_migration = enable;
        self
    }

    // TLS

    pub fn enable_platform_certificates_validation(mut self, enable: bool) -> Self {
        self.settings.tls.platform_certificates_validation = enable;
        self
    }

    // Identity

    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.settings.identity.app_version = version.into();
        self
    }

    pub fn app_id(mut self, id: impl Into<String>) -> Self {
        self.settings.identity.app_id = id.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        if self.check("user_agent", non_empty("user_agent", &user_agent)).is_some() {
            self.settings.identity.user_agent = Some(user_agent);
        }
        self
    }

    pub fn node_id(mut self, id: impl Into<String>) -> Self {
        self.settings.identity.node.id = id.into();
        self
    }

    pub fn node_locality(
        mut self,
        region: impl Into<String>,
        zone: impl Into<String>,
        sub_zone: impl Into<String>,
    ) -> Self {
        let node = &mut self.settings.identity.node;
        node.region = region.into();
        node.zone = zone.into();
        node.sub_zone = sub_zone.into();
        self
    }

    // Runtime guards and filters

    /// Set a reloadable runtime feature flag. For
    /// `envoy.reloadable_features.http_allow_partial_urls_in_referer`, pass
    /// `"http_allow_partial_urls_in_referer"`.
    pub fn runtime_guard(mut self, feature: impl Into<String>, value: bool) -> Self {
        let feature = feature.into();
        match non_empty("runtime_guard", &feature) {
            Ok(()) => {
                self.settings.runtime_guards.insert(feature, value);
            }
            Err(e) => self.reject_entry(e),
        }
        self
    }

    /// Append a native filter; filters run in the order they were added.
    pub fn add_native_filter(mut self, name: impl Into<String>, typed_config: impl Into<String>) -> Self {
        match FilterConfig::new(name, typed_config) {
            Ok(filter) => self.settings.native_filters.push(filter),
            Err(e) => self.reject_entry(e),
        }
        self
    }

    /// Freeze the registry into a snapshot.
    ///
    /// Fails with every recorded validation error. When no user agent was set,
    /// one is synthesized from the application identity.
    pub fn build(&self) -> Result<Arc<EngineConfig>, ValidationErrors> {
        let errors: Vec<ValidationError> = self.validation_errors().cloned().collect();
        if !errors.is_empty() {
            tracing::error!(count = errors.len(), "Engine configuration rejected");
            return Err(ValidationErrors::new(errors));
        }

        let user_agent = match &self.settings.identity.user_agent {
            Some(ua) => ua.clone(),
            None => default_user_agent(&self.settings.identity),
        };

        tracing::debug!(
            user_agent = %user_agent,
            runtime_guards = self.settings.runtime_guards.len(),
            native_filters = self.settings.native_filters.len(),
            quic = self.settings.quic.enabled,
            "Engine configuration built"
        );

        Ok(Arc::new(EngineConfig::new(self.settings.clone(), user_agent)))
    }
}
