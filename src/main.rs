//! Engine bootstrap CLI.
//!
//! Loads engine settings from an optional TOML file, freezes them into a
//! snapshot, brings up the embedded engine and keeps it running until SIGINT
//! or SIGTERM.
//!
//! ```text
//! settings.toml ─▶ EngineBuilder ─▶ EngineConfig ─▶ Bootstrapper ─▶ EngineHandle
//!                                                   │
//!                                   LocalPlatform ◀─┘ (resources, network monitor)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use engine_builder::config::{load_builder, EngineBuilder};
use engine_builder::engine::{EmbeddedEngine, LocalPlatform, LogLevel, NetworkEngine, PlatformContext};
use engine_builder::lifecycle::signals::shutdown_signal;
use engine_builder::lifecycle::Bootstrapper;
use engine_builder::observability::logging::{self, TracingLogger};

#[derive(Parser)]
#[command(name = "engine-builder")]
#[command(about = "Assemble an engine configuration and run the embedded engine", long_about = None)]
struct Cli {
    /// TOML settings file; built-in defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Engine log level (trace, debug, info, warn, error, critical, off)
    #[arg(short, long, default_value = "info")]
    log_level: LogLevel,

    /// Directory holding the engine's native resources
    #[arg(long)]
    resource_dir: Option<PathBuf>,

    /// Print the effective configuration snapshot as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    tracing::info!("engine-builder v{} starting", env!("CARGO_PKG_VERSION"));

    let builder = match &cli.config {
        Some(path) => load_builder(path)?,
        None => EngineBuilder::new(),
    };
    let config = builder.build()?;

    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    tracing::info!(
        user_agent = %config.user_agent(),
        connect_timeout_secs = config.settings().timeouts.connect_secs,
        dns_refresh_secs = config.settings().dns.refresh_secs,
        quic = config.settings().quic.enabled,
        native_filters = config.native_filters().len(),
        "Configuration built"
    );

    let platform = Arc::new(LocalPlatform::new());
    let runtime = tokio::runtime::Handle::current();
    let factory = move || -> Box<dyn NetworkEngine> { Box::new(EmbeddedEngine::new(runtime.clone())) };
    let context = PlatformContext {
        app_name: config.settings().identity.app_id.clone(),
        resource_dir: cli.resource_dir,
    };
    let bootstrapper = Bootstrapper::new(platform.clone(), Arc::new(factory), context);

    let handle = bootstrapper.bootstrap(config, Arc::new(TracingLogger), cli.log_level, || {
        tracing::info!("Engine reported running");
    })?;
    handle.wait_running().await?;

    tracing::info!(
        engine = %handle.id(),
        monitors = platform.attached(),
        "Engine ready, waiting for shutdown signal"
    );

    shutdown_signal().await;
    handle.stop();

    tracing::info!("Shutdown complete");
    Ok(())
}
