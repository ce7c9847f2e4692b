//! In-process reference engine.
//!
//! # Responsibilities
//! - Run startup on a tokio task so `start` never blocks the caller
//! - Reject snapshots that are well-formed but semantically unusable
//! - Exit its task when terminated
//!
//! # Design Decisions
//! - Semantic checks live here, not in the builder: the engine fails fast
//! - Log lines go through the supplied `EngineLogger`, filtered by the requested level

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::EngineConfig;
use crate::engine::{EngineLogger, LogLevel, NetworkChange, NetworkEngine};
use crate::lifecycle::handle::StartCompletion;
use crate::lifecycle::shutdown::Shutdown;

/// Engine that runs inside the current process on a tokio runtime.
#[derive(Debug)]
pub struct EmbeddedEngine {
    runtime: Handle,
    shutdown: Shutdown,
    network_changes: Arc<AtomicU64>,
}

impl EmbeddedEngine {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            shutdown: Shutdown::new(),
            network_changes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter of network changes this engine has received.
    pub fn network_changes(&self) -> Arc<AtomicU64> {
        self.network_changes.clone()
    }
}

/// Checks the engine applies to a snapshot before reporting running.
pub fn check_config(config: &EngineConfig) -> Result<(), String> {
    let settings = config.settings();

    if settings.dns.failure_refresh_base_secs > settings.dns.failure_refresh_max_secs {
        return Err(format!(
            "dns failure refresh base ({}s) exceeds max ({}s)",
            settings.dns.failure_refresh_base_secs, settings.dns.failure_refresh_max_secs
        ));
    }

    if !settings.quic.enabled && !settings.quic.hints.is_empty() {
        return Err("QUIC hints configured while QUIC is disabled".to_string());
    }

    if let Some(suffix) = settings
        .quic
        .canonical_suffixes
        .iter()
        .find(|suffix| !suffix.starts_with('.'))
    {
        return Err(format!("QUIC canonical suffix {suffix:?} must start with '.'"));
    }

    Ok(())
}

fn emit(logger: &dyn EngineLogger, threshold: LogLevel, level: LogLevel, message: &str) {
    if threshold != LogLevel::Off && level >= threshold {
        logger.log(level, message);
    }
}

impl NetworkEngine for EmbeddedEngine {
    fn start(
        &self,
        config: Arc<EngineConfig>,
        logger: Arc<dyn EngineLogger>,
        log_level: LogLevel,
        completion: StartCompletion,
    ) {
        let shutdown = self.shutdown.clone();
        let mut terminated = shutdown.subscribe();

        self.runtime.spawn(async move {
            let engine_id = completion.engine_id();
            emit(
                logger.as_ref(),
                log_level,
                LogLevel::Info,
                &format!("{engine_id} initializing, user agent {:?}", config.user_agent()),
            );

            if let Err(reason) = check_config(&config) {
                emit(logger.as_ref(), log_level, LogLevel::Error, &reason);
                completion.failed(reason);
                return;
            }

            for host in &config.settings().dns.preresolve_hostnames {
                emit(
                    logger.as_ref(),
                    log_level,
                    LogLevel::Debug,
                    &format!("{engine_id} preresolving {host}"),
                );
            }
            for filter in config.native_filters() {
                emit(
                    logger.as_ref(),
                    log_level,
                    LogLevel::Debug,
                    &format!("{engine_id} installing filter {}", filter.name()),
                );
            }

            if shutdown.is_triggered() || !completion.running() {
                return;
            }

            let _ = terminated.recv().await;
            emit(logger.as_ref(), log_level, LogLevel::Info, &format!("{engine_id} terminated"));
        });
    }

    fn terminate(&self) {
        self.shutdown.trigger();
    }

    fn on_network_change(&self, change: NetworkChange) {
        self.network_changes.fetch_add(1, Ordering::Relaxed);
        tracing::info!(target: "engine", change = ?change, "Network change received");
    }
}
