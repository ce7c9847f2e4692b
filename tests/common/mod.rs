//! Shared mock collaborators for bootstrap integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use engine_builder::config::EngineConfig;
use engine_builder::engine::{
    EngineLogger, LogLevel, NetworkChange, NetworkEngine, NetworkMonitor, Platform,
    PlatformContext, PlatformError,
};
use engine_builder::lifecycle::{Bootstrapper, EngineId, EngineRef, StartCompletion};

/// Call counters shared by every mock created from one harness.
#[derive(Default)]
pub struct CallLog {
    pub load: AtomicUsize,
    pub construct: AtomicUsize,
    pub attach: AtomicUsize,
    pub start: AtomicUsize,
    pub terminate: AtomicUsize,
    pub detach: AtomicUsize,
    pub on_running: AtomicUsize,
    /// Step names in the order they happened.
    pub events: Mutex<Vec<&'static str>>,
    /// Engine that received each network change.
    pub deliveries: Mutex<Vec<EngineId>>,
}

impl CallLog {
    pub fn record(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFailure {
    None,
    Load,
    Attach,
}

pub struct MockPlatform {
    calls: Arc<CallLog>,
    failure: PlatformFailure,
    attached: Mutex<Vec<EngineRef>>,
}

impl MockPlatform {
    pub fn attached(&self) -> Vec<EngineRef> {
        self.attached.lock().unwrap().clone()
    }
}

struct MockMonitor(Arc<CallLog>);

impl NetworkMonitor for MockMonitor {
    fn detach(&self) {
        self.0.detach.fetch_add(1, Ordering::SeqCst);
    }
}

impl Platform for MockPlatform {
    fn load_native_resources(&self, _context: &PlatformContext) -> Result<(), PlatformError> {
        self.calls.load.fetch_add(1, Ordering::SeqCst);
        self.calls.record("load");
        if self.failure == PlatformFailure::Load {
            return Err(PlatformError::ResourceMissing("/missing/libengine.so".into()));
        }
        Ok(())
    }

    fn attach_network_monitor(
        &self,
        _context: &PlatformContext,
        engine: EngineRef,
    ) -> Result<Box<dyn NetworkMonitor>, PlatformError> {
        self.calls.attach.fetch_add(1, Ordering::SeqCst);
        self.calls.record("attach");
        if self.failure == PlatformFailure::Attach {
            return Err(PlatformError::Other("connectivity service unavailable".into()));
        }
        self.attached.lock().unwrap().push(engine);
        Ok(Box::new(MockMonitor(self.calls.clone())))
    }
}

/// What the mock engine does with its start completion.
#[derive(Debug, Clone, Copy)]
pub enum StartBehavior {
    /// Report running from a background thread.
    Succeed,
    /// Report failure from a background thread.
    Fail(&'static str),
    /// Keep the completion until the test takes it.
    Hold,
    /// Report running after a delay.
    SucceedAfter(Duration),
}

pub struct MockEngine {
    calls: Arc<CallLog>,
    behavior: StartBehavior,
    pending: Arc<Mutex<Option<StartCompletion>>>,
    id: OnceLock<EngineId>,
}

impl NetworkEngine for MockEngine {
    fn start(
        &self,
        _config: Arc<EngineConfig>,
        logger: Arc<dyn EngineLogger>,
        _log_level: LogLevel,
        completion: StartCompletion,
    ) {
        let _ = self.id.set(completion.engine_id());
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        self.calls.record("start");
        logger.log(LogLevel::Info, "mock engine starting");

        match self.behavior {
            StartBehavior::Succeed => {
                std::thread::spawn(move || {
                    completion.running();
                });
            }
            StartBehavior::SucceedAfter(delay) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    completion.running();
                });
            }
            StartBehavior::Fail(reason) => {
                std::thread::spawn(move || completion.failed(reason));
            }
            StartBehavior::Hold => {
                *self.pending.lock().unwrap() = Some(completion);
            }
        }
    }

    fn terminate(&self) {
        self.calls.terminate.fetch_add(1, Ordering::SeqCst);
        self.calls.record("terminate");
    }

    fn on_network_change(&self, _change: NetworkChange) {
        if let Some(id) = self.id.get() {
            self.calls.deliveries.lock().unwrap().push(*id);
        }
    }
}

/// Logger sink that keeps every line.
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().unwrap().clone()
    }
}

impl EngineLogger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

/// One platform, one engine factory, shared counters.
pub struct Harness {
    pub calls: Arc<CallLog>,
    pub platform: Arc<MockPlatform>,
    pub pending: Arc<Mutex<Option<StartCompletion>>>,
    behavior: StartBehavior,
}

impl Harness {
    pub fn new(failure: PlatformFailure, behavior: StartBehavior) -> Self {
        let calls = Arc::new(CallLog::default());
        let platform = Arc::new(MockPlatform {
            calls: calls.clone(),
            failure,
            attached: Mutex::new(Vec::new()),
        });
        Self {
            calls,
            platform,
            pending: Arc::new(Mutex::new(None)),
            behavior,
        }
    }

    pub fn bootstrapper(&self) -> Bootstrapper {
        let calls = self.calls.clone();
        let pending = self.pending.clone();
        let behavior = self.behavior;
        let factory = move || -> Box<dyn NetworkEngine> {
            calls.construct.fetch_add(1, Ordering::SeqCst);
            calls.record("construct");
            Box::new(MockEngine {
                calls: calls.clone(),
                behavior,
                pending: pending.clone(),
                id: OnceLock::new(),
            })
        };
        Bootstrapper::new(
            self.platform.clone(),
            Arc::new(factory),
            PlatformContext {
                app_name: "integration".into(),
                resource_dir: None,
            },
        )
    }

    /// Callback that counts and logs its invocations.
    pub fn on_running(&self) -> impl FnOnce() + Send + 'static {
        let calls = self.calls.clone();
        move || {
            calls.on_running.fetch_add(1, Ordering::SeqCst);
            calls.record("on_running");
        }
    }

    pub fn take_pending(&self) -> StartCompletion {
        self.pending
            .lock()
            .unwrap()
            .take()
            .expect("engine did not hold its completion")
    }
}
