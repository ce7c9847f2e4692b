//! End-to-end bootstrap with the in-process platform and engine.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use engine_builder::config::EngineBuilder;
use engine_builder::engine::{
    EmbeddedEngine, LocalPlatform, LogLevel, NetworkChange, NetworkEngine, NetworkType,
    PlatformContext,
};
use engine_builder::lifecycle::{BootstrapError, Bootstrapper, EngineState};

mod common;

use common::RecordingLogger;

fn bootstrapper(platform: Arc<LocalPlatform>, context: PlatformContext) -> Bootstrapper {
    let runtime = tokio::runtime::Handle::current();
    let factory = move || -> Box<dyn NetworkEngine> { Box::new(EmbeddedEngine::new(runtime.clone())) };
    Bootstrapper::new(platform, Arc::new(factory), context)
}

#[tokio::test]
async fn embedded_engine_runs_and_stops() {
    let platform = Arc::new(LocalPlatform::new());
    let runtime = tokio::runtime::Handle::current();
    let received: Arc<Mutex<Option<Arc<AtomicU64>>>> = Arc::new(Mutex::new(None));
    let slot = received.clone();
    let factory = move || -> Box<dyn NetworkEngine> {
        let engine = EmbeddedEngine::new(runtime.clone());
        *slot.lock().unwrap() = Some(engine.network_changes());
        Box::new(engine)
    };
    let bootstrapper = Bootstrapper::new(platform.clone(), Arc::new(factory), PlatformContext::default());
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();

    let config = EngineBuilder::new()
        .dns_preresolve_hostnames(["api.example.com"])
        .add_native_filter("envoy.filters.http.buffer", "{}")
        .build()
        .unwrap();
    let logger = Arc::new(RecordingLogger::default());

    let handle = bootstrapper
        .bootstrap(config, logger.clone(), LogLevel::Debug, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    handle.wait_running().await.unwrap();

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(platform.is_attached(handle.id()));
    assert_eq!(
        platform.broadcast(NetworkChange::DefaultNetworkChanged(NetworkType::Wwan)),
        1
    );
    let changes = received.lock().unwrap().clone().unwrap();
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    let lines = logger.lines();
    assert!(lines.iter().any(|(_, line)| line.contains("preresolving api.example.com")));
    assert!(lines
        .iter()
        .any(|(_, line)| line.contains("installing filter envoy.filters.http.buffer")));

    handle.stop();
    assert_eq!(platform.attached(), 0);
    assert_eq!(platform.broadcast(NetworkChange::DefaultNetworkAvailable), 0);
    assert_eq!(changes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn engine_log_level_filters_sink_output() {
    let platform = Arc::new(LocalPlatform::new());
    let bootstrapper = bootstrapper(platform, PlatformContext::default());
    let config = EngineBuilder::new()
        .dns_preresolve_hostnames(["api.example.com"])
        .build()
        .unwrap();
    let logger = Arc::new(RecordingLogger::default());

    let handle = bootstrapper
        .bootstrap(config, logger.clone(), LogLevel::Info, || {})
        .unwrap();
    handle.wait_running().await.unwrap();

    let lines = logger.lines();
    assert!(!lines.is_empty());
    assert!(lines.iter().all(|(level, _)| *level >= LogLevel::Info));
}

#[tokio::test]
async fn engine_rejects_semantically_invalid_snapshot() {
    let platform = Arc::new(LocalPlatform::new());
    let bootstrapper = bootstrapper(platform.clone(), PlatformContext::default());
    let config = EngineBuilder::new()
        .add_quic_hint("www.example.com", 443)
        .build()
        .unwrap();

    let handle = bootstrapper
        .bootstrap(config, Arc::new(RecordingLogger::default()), LogLevel::Info, || {
            panic!("must not report running");
        })
        .unwrap();

    let err = handle.wait_running().await.unwrap_err();
    assert!(err.reason.contains("QUIC"));
    assert_eq!(handle.state(), EngineState::Stopped);
    assert_eq!(platform.attached(), 0);
}

#[tokio::test]
async fn missing_resources_produce_no_handle() {
    let platform = Arc::new(LocalPlatform::new());
    let context = PlatformContext {
        app_name: "integration".into(),
        resource_dir: Some("/nonexistent/engine-resources".into()),
    };
    let bootstrapper = bootstrapper(platform.clone(), context);
    let config = EngineBuilder::new().build().unwrap();

    let result = bootstrapper.bootstrap(config, Arc::new(RecordingLogger::default()), LogLevel::Info, || {});

    assert!(matches!(result, Err(BootstrapError::ResourceLoad(_))));
    assert_eq!(platform.attached(), 0);
}
