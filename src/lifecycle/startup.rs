//! Startup orchestration.
//!
//! # Responsibilities
//! - Load native resources before any engine exists outside this module
//! - Attach the network monitor to the specific engine being started
//! - Start the engine and hand back a handle in the Starting state
//!
//! # Design Decisions
//! - Fail fast: a failed load or attach is fatal and no handle escapes
//! - Steps run in order, never concurrently
//! - Only the load step may block; start returns immediately

use std::sync::Arc;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::engine::{EngineFactory, EngineLogger, LogLevel, Platform, PlatformContext, PlatformError};
use crate::lifecycle::handle::{EngineCore, EngineHandle, EngineRef, StartCompletion};
use crate::observability::metrics;

/// Synchronous bootstrap step that failed.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to load native resources: {0}")]
    ResourceLoad(#[source] PlatformError),

    #[error("failed to attach network monitor: {0}")]
    MonitorAttach(#[source] PlatformError),
}

impl BootstrapError {
    pub fn step(&self) -> BootstrapStep {
        match self {
            Self::ResourceLoad(_) => BootstrapStep::LoadNativeResources,
            Self::MonitorAttach(_) => BootstrapStep::AttachNetworkMonitor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    LoadNativeResources,
    AttachNetworkMonitor,
    StartEngine,
}

/// Turns configuration snapshots into running engines.
pub struct Bootstrapper {
    platform: Arc<dyn Platform>,
    factory: Arc<dyn EngineFactory>,
    context: PlatformContext,
}

impl Bootstrapper {
    pub fn new(
        platform: Arc<dyn Platform>,
        factory: Arc<dyn EngineFactory>,
        context: PlatformContext,
    ) -> Self {
        Self {
            platform,
            factory,
            context,
        }
    }

    /// Bring up a new engine with `config`.
    ///
    /// Returns a handle in the Starting state; `on_running` fires once, on the
    /// engine's thread, just before the handle reports Running. A stop issued
    /// from another thread while it runs waits for it to return. Startup failures
    /// after this returns are reported through the handle, not here.
    pub fn bootstrap<F>(
        &self,
        config: Arc<EngineConfig>,
        logger: Arc<dyn EngineLogger>,
        log_level: LogLevel,
        on_running: F,
    ) -> Result<EngineHandle, BootstrapError>
    where
        F: FnOnce() + Send + 'static,
    {
        tracing::info!(app = %self.context.app_name, "Bootstrapping engine");

        if let Err(e) = self.platform.load_native_resources(&self.context) {
            tracing::error!(error = %e, "Native resource load failed");
            metrics::record_bootstrap("resource_load_failed");
            return Err(BootstrapError::ResourceLoad(e));
        }
        tracing::debug!(step = ?BootstrapStep::LoadNativeResources, "Bootstrap step complete");

        // The engine is only constructed once its native resources are in place.
        let core = EngineCore::new(self.factory.create());
        let engine_id = core.id();

        match self
            .platform
            .attach_network_monitor(&self.context, EngineRef::new(&core))
        {
            Ok(monitor) => core.set_monitor(monitor),
            Err(e) => {
                tracing::error!(engine = %engine_id, error = %e, "Network monitor attach failed");
                metrics::record_bootstrap("monitor_attach_failed");
                return Err(BootstrapError::MonitorAttach(e));
            }
        }
        tracing::debug!(engine = %engine_id, step = ?BootstrapStep::AttachNetworkMonitor, "Bootstrap step complete");

        let handle = EngineHandle::new(core.clone(), config.clone());
        let completion = StartCompletion::new(core.clone(), Box::new(on_running));
        core.engine().start(config, logger, log_level, completion);
        tracing::debug!(engine = %engine_id, step = ?BootstrapStep::StartEngine, log_level = %log_level, "Engine start requested");
        metrics::record_bootstrap("started");

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineBuilder;
    use crate::engine::{NetworkEngine, NetworkMonitor};
    use crate::lifecycle::handle::EngineState;
    use crate::observability::logging::TracingLogger;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Calls {
        attach: AtomicUsize,
        start: AtomicUsize,
        detach: AtomicUsize,
        terminate: AtomicUsize,
    }

    struct ScriptedPlatform {
        calls: Arc<Calls>,
        fail_attach: bool,
    }

    struct Registration(Arc<Calls>);

    impl NetworkMonitor for Registration {
        fn detach(&self) {
            self.0.detach.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Platform for ScriptedPlatform {
        fn load_native_resources(&self, _context: &PlatformContext) -> Result<(), PlatformError> {
            Ok(())
        }

        fn attach_network_monitor(
            &self,
            _context: &PlatformContext,
            _engine: EngineRef,
        ) -> Result<Box<dyn NetworkMonitor>, PlatformError> {
            self.calls.attach.fetch_add(1, Ordering::SeqCst);
            if self.fail_attach {
                return Err(PlatformError::Other("no connectivity service".into()));
            }
            Ok(Box::new(Registration(self.calls.clone())))
        }
    }

    /// Holds the completion until the test decides the outcome.
    struct ManualEngine {
        calls: Arc<Calls>,
        pending: Arc<Mutex<Option<StartCompletion>>>,
    }

    impl NetworkEngine for ManualEngine {
        fn start(
            &self,
            _config: Arc<EngineConfig>,
            _logger: Arc<dyn EngineLogger>,
            _log_level: LogLevel,
            completion: StartCompletion,
        ) {
            self.calls.start.fetch_add(1, Ordering::SeqCst);
            *self.pending.lock().unwrap() = Some(completion);
        }

        fn terminate(&self) {
            self.calls.terminate.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn bootstrapper(
        fail_attach: bool,
    ) -> (Bootstrapper, Arc<Calls>, Arc<Mutex<Option<StartCompletion>>>) {
        let calls = Arc::new(Calls::default());
        let pending = Arc::new(Mutex::new(None));
        let platform = Arc::new(ScriptedPlatform {
            calls: calls.clone(),
            fail_attach,
        });
        let factory_calls = calls.clone();
        let factory_pending = pending.clone();
        let factory = move || -> Box<dyn NetworkEngine> {
            Box::new(ManualEngine {
                calls: factory_calls.clone(),
                pending: factory_pending.clone(),
            })
        };
        (
            Bootstrapper::new(platform, Arc::new(factory), PlatformContext::default()),
            calls,
            pending,
        )
    }

    #[test]
    fn attach_failure_skips_start() {
        let (bootstrapper, calls, _) = bootstrapper(true);
        let config = EngineBuilder::new().build().unwrap();

        let err = bootstrapper
            .bootstrap(config, Arc::new(TracingLogger), LogLevel::Info, || {})
            .unwrap_err();

        assert_eq!(err.step(), BootstrapStep::AttachNetworkMonitor);
        assert_eq!(calls.attach.load(Ordering::SeqCst), 1);
        assert_eq!(calls.start.load(Ordering::SeqCst), 0);
        assert_eq!(calls.terminate.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn returns_starting_handle_without_blocking() {
        let (bootstrapper, calls, pending) = bootstrapper(false);
        let config = EngineBuilder::new().build().unwrap();

        let handle = bootstrapper
            .bootstrap(config.clone(), Arc::new(TracingLogger), LogLevel::Debug, || {})
            .unwrap();

        assert_eq!(handle.state(), EngineState::Starting);
        assert!(Arc::ptr_eq(handle.config(), &config));
        assert_eq!(calls.start.load(Ordering::SeqCst), 1);

        let completion = pending.lock().unwrap().take().unwrap();
        assert_eq!(completion.engine_id(), handle.id());
        completion.running();
        assert_eq!(handle.state(), EngineState::Running);
    }

    #[test]
    fn stop_detaches_monitor_and_terminates_once() {
        let (bootstrapper, calls, pending) = bootstrapper(false);
        let config = EngineBuilder::new().build().unwrap();
        let handle = bootstrapper
            .bootstrap(config, Arc::new(TracingLogger), LogLevel::Info, || {})
            .unwrap();

        handle.stop();
        handle.stop();
        drop(pending.lock().unwrap().take());
        drop(handle);

        assert_eq!(calls.detach.load(Ordering::SeqCst), 1);
        assert_eq!(calls.terminate.load(Ordering::SeqCst), 1);
    }
}
