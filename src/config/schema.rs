//! Configuration schema definitions.
//!
//! This module defines every tunable the engine accepts, grouped by concern.
//! All types derive Serde traits so the registry can be seeded from a config file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::filters::FilterChain;

/// Identity value used when the application does not provide one.
pub const UNSPECIFIED: &str = "unspecified";

/// Root of the setting registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineSettings {
    /// Connection and stream timeouts.
    pub timeouts: TimeoutSettings,

    /// DNS resolution and caching policy.
    pub dns: DnsSettings,

    /// HTTP/1 and HTTP/2 behavior.
    pub http: HttpSettings,

    /// QUIC / HTTP/3 behavior.
    pub quic: QuicSettings,

    /// Socket-level toggles.
    pub network: NetworkSettings,

    /// TLS trust policy.
    pub tls: TlsSettings,

    /// Application and node identity.
    pub identity: IdentitySettings,

    /// Reloadable runtime feature flags, keyed by name.
    pub runtime_guards: BTreeMap<String, bool>,

    /// Native filter chain, in execution order.
    pub native_filters: FilterChain,
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u32,

    /// Idle timeout for an open stream in seconds.
    pub stream_idle_secs: u32,

    /// Idle timeout for a single upstream try in seconds.
    pub per_try_idle_secs: u32,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            connect_secs: 30,
            stream_idle_secs: 15,
            per_try_idle_secs: 15,
        }
    }
}

/// DNS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsSettings {
    /// Default refresh interval in seconds.
    pub refresh_secs: u32,

    /// Base of the failure backoff in seconds.
    pub failure_refresh_base_secs: u32,

    /// Cap of the failure backoff in seconds.
    pub failure_refresh_max_secs: u32,

    /// Per-query deadline in seconds.
    pub query_timeout_secs: u32,

    /// Lower bound on the refresh interval regardless of record TTL, in seconds.
    pub min_refresh_secs: u32,

    /// Hostnames resolved at startup, in priority order.
    pub preresolve_hostnames: Vec<String>,

    /// Persist the DNS cache between runs.
    pub cache_enabled: bool,

    /// How often the DNS cache is persisted, in seconds.
    pub cache_save_interval_secs: u32,

    /// Nameservers used when the system resolver has none, in priority order.
    pub fallback_nameservers: Vec<String>,

    /// Drop address families with no route.
    pub filter_unroutable_families: bool,

    /// Drain connections when a refresh changes a host's addresses.
    pub drain_post_refresh: bool,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            refresh_secs: 60,
            failure_refresh_base_secs: 2,
            failure_refresh_max_secs: 10,
            query_timeout_secs: 5,
            min_refresh_secs: 60,
            preresolve_hostnames: Vec::new(),
            cache_enabled: false,
            cache_save_interval_secs: 1,
            fallback_nameservers: Vec::new(),
            filter_unroutable_families: true,
            drain_post_refresh: false,
        }
    }
}

/// HTTP configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSettings {
    pub gzip_decompression: bool,

    pub brotli_decompression: bool,

    /// HTTP/2 keepalive ping interval for idle connections, in milliseconds.
    pub h2_keepalive_idle_interval_ms: u32,

    /// HTTP/2 keepalive ping timeout in seconds.
    pub h2_keepalive_timeout_secs: u32,

    /// Maximum concurrent connections to a single host (at least 1).
    pub max_connections_per_host: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            gzip_decompression: true,
            brotli_decompression: false,
            h2_keepalive_idle_interval_ms: 1,
            h2_keepalive_timeout_secs: 10,
            max_connections_per_host: 7,
        }
    }
}

/// A host known to speak QUIC, attempted over HTTP/3 without discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct QuicHint {
    pub host: String,
    pub port: u16,
}

/// QUIC configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct QuicSettings {
    pub enabled: bool,

    /// Comma-separated QUIC connection option tags.
    pub connection_options: String,

    /// Comma-separated client-only QUIC connection option tags.
    pub client_connection_options: String,

    /// Hosts to attempt over HTTP/3 directly, in order.
    pub hints: Vec<QuicHint>,

    /// Suffixes whose hosts share alternate-protocol state (e.g. ".example.com").
    pub canonical_suffixes: Vec<String>,
}

/// Socket-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub socket_tagging: bool,

    /// Bind sockets to the active network interface.
    pub interface_binding: bool,

    /// Honor the platform proxy settings.
    pub proxying: bool,

    /// Migrate QUIC connections to a new port on path degradation.
    pub port_migration: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            socket_tagging: true,
            interface_binding: false,
            proxying: false,
            port_migration: false,
        }
    }
}

/// Whether TLS peer identity is actually checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrustChainVerification {
    /// Validate the peer certificate chain (production behavior).
    #[default]
    VerifyTrustChain,
    /// Accept any peer certificate. Only reachable through the test-only builder surface.
    AcceptUntrusted,
}

/// TLS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Validate certificates with the platform verifier instead of the bundled one.
    pub platform_certificates_validation: bool,

    /// Never read from a file: a config file cannot downgrade verification.
    #[serde(skip_deserializing)]
    pub trust_chain_verification: TrustChainVerification,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            platform_certificates_validation: true,
            trust_chain_verification: TrustChainVerification::VerifyTrustChain,
        }
    }
}

/// Node locality reported to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeSettings {
    pub id: String,
    pub region: String,
    pub zone: String,
    pub sub_zone: String,
}

/// Application identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub app_version: String,

    pub app_id: String,

    /// Explicit user agent; synthesized from the fields above when absent.
    pub user_agent: Option<String>,

    pub node: NodeSettings,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            app_version: UNSPECIFIED.to_string(),
            app_id: UNSPECIFIED.to_string(),
            user_agent: None,
            node: NodeSettings::default(),
        }
    }
}
