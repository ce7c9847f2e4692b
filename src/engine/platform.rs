//! In-process platform hooks.
//!
//! # Responsibilities
//! - Check that the native resource directory exists before engine construction
//! - Keep a registry of attached engines keyed by engine id
//! - Fan platform network changes out to exactly the attached engines

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::engine::{NetworkChange, NetworkMonitor, Platform, PlatformContext, PlatformError};
use crate::lifecycle::handle::{EngineId, EngineRef};
use crate::observability::metrics;

type MonitorTable = Arc<DashMap<EngineId, EngineRef>>;

/// Platform implementation for hosts without OS connectivity callbacks.
#[derive(Debug, Default)]
pub struct LocalPlatform {
    loaded: AtomicBool,
    monitors: MonitorTable,
}

impl LocalPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of engines currently receiving network events.
    pub fn attached(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_attached(&self, id: EngineId) -> bool {
        self.monitors.contains_key(&id)
    }

    /// Deliver a network change to every attached engine. Returns how many received it.
    pub fn broadcast(&self, change: NetworkChange) -> usize {
        // Collect first so no shard lock is held while engines run their handlers.
        let targets: Vec<EngineRef> = self.monitors.iter().map(|e| e.value().clone()).collect();
        let delivered = targets.iter().filter(|engine| engine.notify(change)).count();

        tracing::info!(change = ?change, delivered, "Network change broadcast");
        metrics::record_network_changes(delivered);
        delivered
    }
}

impl Platform for LocalPlatform {
    fn load_native_resources(&self, context: &PlatformContext) -> Result<(), PlatformError> {
        if let Some(dir) = &context.resource_dir {
            if !dir.is_dir() {
                return Err(PlatformError::ResourceMissing(dir.clone()));
            }
        }

        if self.loaded.swap(true, Ordering::AcqRel) {
            tracing::debug!("Native resources already loaded");
        } else {
            tracing::info!(
                app = %context.app_name,
                resource_dir = ?context.resource_dir,
                "Native resources loaded"
            );
        }
        Ok(())
    }

    fn attach_network_monitor(
        &self,
        _context: &PlatformContext,
        engine: EngineRef,
    ) -> Result<Box<dyn NetworkMonitor>, PlatformError> {
        let id = engine.id();
        match self.monitors.entry(id) {
            Entry::Occupied(_) => return Err(PlatformError::MonitorAlreadyAttached(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(engine);
            }
        }

        tracing::debug!(engine = %id, "Network monitor attached");
        Ok(Box::new(LocalMonitor {
            id,
            monitors: self.monitors.clone(),
        }))
    }
}

struct LocalMonitor {
    id: EngineId,
    monitors: MonitorTable,
}

impl NetworkMonitor for LocalMonitor {
    fn detach(&self) {
        if self.monitors.remove(&self.id).is_some() {
            tracing::debug!(engine = %self.id, "Network monitor detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_resource_dir_fails_load() {
        let platform = LocalPlatform::new();
        let context = PlatformContext {
            app_name: "test".into(),
            resource_dir: Some("/nonexistent/engine-resources".into()),
        };
        assert!(matches!(
            platform.load_native_resources(&context),
            Err(PlatformError::ResourceMissing(_))
        ));
    }

    #[test]
    fn load_without_resource_dir_succeeds_repeatedly() {
        let platform = LocalPlatform::new();
        let context = PlatformContext::default();
        assert!(platform.load_native_resources(&context).is_ok());
        assert!(platform.load_native_resources(&context).is_ok());
    }

    #[test]
    fn existing_resource_dir_loads() {
        let platform = LocalPlatform::new();
        let context = PlatformContext {
            app_name: "test".into(),
            resource_dir: Some(std::env::temp_dir()),
        };
        assert!(platform.load_native_resources(&context).is_ok());
    }
}
