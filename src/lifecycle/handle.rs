//! Engine handle and startup completion.
//!
//! # States
//! - Starting: engine accepted the snapshot, initialization in progress
//! - Running: engine reported success, requests may be issued
//! - Stopped: terminal; either stopped by the holder or failed to start
//!
//! # State Transitions
//! ```text
//! Starting → Running: StartCompletion::running (on-running callback fires first)
//! Starting → Stopped: StartCompletion::failed, completion dropped unreported, or stop()
//! Running  → Stopped: stop() or handle dropped
//! ```
//!
//! # Design Decisions
//! - State lives in a watch channel so holders can poll or await it
//! - A stop during Starting wins: the late running report is ignored
//! - Transitions are serialized, so a stop issued while the on-running callback
//!   runs waits for Running and then stops; the callback never fires for an
//!   engine that does not reach Running
//! - Native resources are released exactly once, whichever path stops the engine

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread::{self, ThreadId};

use thiserror::Error;
use tokio::sync::watch;

use crate::config::EngineConfig;
use crate::engine::{NetworkChange, NetworkEngine, NetworkMonitor};
use crate::observability::metrics;

/// Global atomic counter for engine IDs.
static ENGINE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineId(u64);

impl EngineId {
    pub(crate) fn next() -> Self {
        Self(ENGINE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Starting,
    Running,
    Stopped,
}

/// Single-shot notification fired when the engine reaches Running.
pub type OnEngineRunning = Box<dyn FnOnce() + Send + 'static>;

/// Asynchronous startup failed after the handle was returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("engine failed to start: {reason}")]
pub struct EngineStartError {
    pub reason: String,
}

/// The handle cannot serve requests in its current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("engine {0} is not running yet")]
    NotReady(EngineId),

    #[error("engine {id} is stopped")]
    Stopped { id: EngineId, reason: Option<String> },
}

/// State shared by the handle, the completion and any engine references.
pub(crate) struct EngineCore {
    id: EngineId,
    engine: Box<dyn NetworkEngine>,
    state: watch::Sender<EngineState>,
    failure: OnceLock<String>,
    monitor: OnceLock<Box<dyn NetworkMonitor>>,
    released: AtomicBool,
    /// Held across every state transition, including the on-running callback.
    transition: Mutex<()>,
    /// Thread currently running the on-running callback.
    activating: Mutex<Option<ThreadId>>,
    /// Stop requested from inside the on-running callback.
    stop_deferred: AtomicBool,
}

impl EngineCore {
    pub(crate) fn new(engine: Box<dyn NetworkEngine>) -> Arc<Self> {
        let (state, _) = watch::channel(EngineState::Starting);
        Arc::new(Self {
            id: EngineId::next(),
            engine,
            state,
            failure: OnceLock::new(),
            monitor: OnceLock::new(),
            released: AtomicBool::new(false),
            transition: Mutex::new(()),
            activating: Mutex::new(None),
            stop_deferred: AtomicBool::new(false),
        })
    }

    pub(crate) fn id(&self) -> EngineId {
        self.id
    }

    pub(crate) fn engine(&self) -> &dyn NetworkEngine {
        self.engine.as_ref()
    }

    fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub(crate) fn set_monitor(&self, monitor: Box<dyn NetworkMonitor>) {
        if let Err(extra) = self.monitor.set(monitor) {
            tracing::warn!(engine = %self.id, "Second network monitor for engine, detaching it");
            extra.detach();
        }
    }

    // The guarded data is `()`, so a poisoned lock carries no broken state.
    fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_activating(&self, thread: Option<ThreadId>) {
        *self.activating.lock().unwrap_or_else(PoisonError::into_inner) = thread;
    }

    fn activating_on_current_thread(&self) -> bool {
        *self.activating.lock().unwrap_or_else(PoisonError::into_inner) == Some(thread::current().id())
    }

    fn mark_running(&self, on_running: Option<OnEngineRunning>) -> bool {
        let published = {
            let _transition = self.lock_transitions();
            if self.state() != EngineState::Starting {
                tracing::debug!(engine = %self.id, state = ?self.state(), "Ignoring running report");
                return false;
            }

            if let Some(callback) = on_running {
                let _activation = Activation::enter(self);
                callback();
            }

            self.state.send_if_modified(|state| {
                if *state == EngineState::Starting {
                    *state = EngineState::Running;
                    true
                } else {
                    false
                }
            })
        };

        if published {
            tracing::info!(engine = %self.id, "Engine running");
            metrics::record_engine_transition(EngineState::Running);
        }

        if self.stop_deferred.load(Ordering::SeqCst) {
            tracing::debug!(engine = %self.id, "Applying stop requested by on-running callback");
            self.stop();
        }
        published
    }

    fn fail(&self, reason: String) {
        let _transition = self.lock_transitions();
        if self.state() != EngineState::Starting {
            tracing::debug!(engine = %self.id, reason = %reason, "Ignoring late start failure");
            return;
        }
        tracing::error!(engine = %self.id, reason = %reason, "Engine failed to start");

        // Resources go first so observers of Stopped never see them still held.
        self.release();

        // Only one report leaves Starting under the transition lock.
        if self.failure.set(reason).is_err() {
            tracing::debug!(engine = %self.id, "Start failure already recorded");
        }
        self.state.send_replace(EngineState::Stopped);
        metrics::record_engine_transition(EngineState::Stopped);
    }

    fn stop(&self) -> bool {
        if self.activating_on_current_thread() {
            // Waiting here would deadlock on our own transition lock.
            return !self.stop_deferred.swap(true, Ordering::SeqCst);
        }

        let transition = self.lock_transitions();
        let stopped = self.state.send_if_modified(|state| {
            if *state == EngineState::Stopped {
                false
            } else {
                *state = EngineState::Stopped;
                true
            }
        });

        self.release();
        drop(transition);
        if stopped {
            tracing::info!(engine = %self.id, "Engine stopped");
            metrics::record_engine_transition(EngineState::Stopped);
        }
        stopped
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(monitor) = self.monitor.get() {
            monitor.detach();
        }
        self.engine.terminate();
        tracing::debug!(engine = %self.id, "Engine resources released");
    }
}

/// Marks the current thread as running the on-running callback until dropped.
struct Activation<'a>(&'a EngineCore);

impl<'a> Activation<'a> {
    fn enter(core: &'a EngineCore) -> Self {
        core.set_activating(Some(thread::current().id()));
        Self(core)
    }
}

impl Drop for Activation<'_> {
    fn drop(&mut self) {
        self.0.set_activating(None);
    }
}

/// Weak reference to one specific engine, used to route network events.
#[derive(Clone)]
pub struct EngineRef {
    id: EngineId,
    core: Weak<EngineCore>,
}

impl EngineRef {
    pub(crate) fn new(core: &Arc<EngineCore>) -> Self {
        Self {
            id: core.id,
            core: Arc::downgrade(core),
        }
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    /// True while the engine exists and has not stopped.
    pub fn is_alive(&self) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| core.state() != EngineState::Stopped)
    }

    /// Deliver a network change to this engine. Returns false if it is gone or stopped.
    pub fn notify(&self, change: NetworkChange) -> bool {
        let Some(core) = self.core.upgrade() else {
            return false;
        };
        if core.state() == EngineState::Stopped {
            return false;
        }
        tracing::debug!(engine = %self.id, change = ?change, "Delivering network change");
        core.engine().on_network_change(change);
        true
    }
}

impl fmt::Debug for EngineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRef")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// One-time startup report handed to [`NetworkEngine::start`].
///
/// Consumed by [`running`](Self::running) or [`failed`](Self::failed). Dropping it
/// without reporting counts as a failure, so a handle never hangs in Starting.
pub struct StartCompletion {
    core: Arc<EngineCore>,
    on_running: Option<OnEngineRunning>,
    reported: bool,
}

impl StartCompletion {
    pub(crate) fn new(core: Arc<EngineCore>, on_running: OnEngineRunning) -> Self {
        Self {
            core,
            on_running: Some(on_running),
            reported: false,
        }
    }

    pub fn engine_id(&self) -> EngineId {
        self.core.id
    }

    /// Report successful startup. Returns false if the engine was stopped first.
    pub fn running(mut self) -> bool {
        self.reported = true;
        let on_running = self.on_running.take();
        self.core.mark_running(on_running)
    }

    /// Report that startup failed.
    pub fn failed(mut self, reason: impl Into<String>) {
        self.reported = true;
        self.core.fail(reason.into());
    }
}

impl Drop for StartCompletion {
    fn drop(&mut self) {
        if !self.reported {
            self.core
                .fail("engine dropped its start completion without reporting".to_string());
        }
    }
}

impl fmt::Debug for StartCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartCompletion")
            .field("engine", &self.core.id)
            .field("reported", &self.reported)
            .finish()
    }
}

/// A started engine. Owns the engine exclusively; dropping the handle stops it.
pub struct EngineHandle {
    core: Arc<EngineCore>,
    config: Arc<EngineConfig>,
}

impl EngineHandle {
    pub(crate) fn new(core: Arc<EngineCore>, config: Arc<EngineConfig>) -> Self {
        Self { core, config }
    }

    pub fn id(&self) -> EngineId {
        self.core.id
    }

    pub fn state(&self) -> EngineState {
        self.core.state()
    }

    /// Why startup failed, once the engine has stopped for that reason.
    pub fn failure_reason(&self) -> Option<&str> {
        self.core.failure.get().map(String::as_str)
    }

    /// The snapshot this engine was started with.
    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    pub fn engine_ref(&self) -> EngineRef {
        EngineRef::new(&self.core)
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.core.state.subscribe()
    }

    /// Wait until the engine leaves Starting.
    pub async fn wait_running(&self) -> Result<(), EngineStartError> {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|state| *state != EngineState::Starting).await {
            Ok(state) => *state,
            Err(_) => EngineState::Stopped,
        };

        match state {
            EngineState::Running => Ok(()),
            _ => Err(EngineStartError {
                reason: self
                    .failure_reason()
                    .unwrap_or("engine was stopped")
                    .to_string(),
            }),
        }
    }

    /// Gate for issuing requests: only a Running engine accepts them.
    pub fn ensure_running(&self) -> Result<(), HandleError> {
        match self.state() {
            EngineState::Running => Ok(()),
            EngineState::Starting => Err(HandleError::NotReady(self.id())),
            EngineState::Stopped => Err(HandleError::Stopped {
                id: self.id(),
                reason: self.failure_reason().map(str::to_string),
            }),
        }
    }

    /// Stop the engine and release its resources. Safe to call repeatedly.
    ///
    /// Returns true only for the call that performed the transition.
    pub fn stop(&self) -> bool {
        self.core.stop()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.core.stop();
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("id", &self.core.id)
            .field("state", &self.state())
            .field("failure", &self.failure_reason())
            .finish()
    }
}
