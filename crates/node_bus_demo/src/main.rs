//! Node bus demo host.
//!
//! Loads the configuration, registers the configured events and the sample
//! nodes, then lets a worker thread drive the canvas while the main thread
//! pumps relayed batches. Finishes with an undo/redo round and the bus
//! statistics.

mod cli;
mod config;
mod nodes;

use anyhow::{anyhow, bail, Context};
use cli::CliArgs;
use config::{AppConfig, LoggingSettings};
use node_bus::{
    channel_relay, params, MainThreadRelay, NodeBus, RelayPump, CORE_NODE_ID, UNDO_REQUESTED,
};
use nodes::{CanvasState, CANVAS, USER};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PUMP_INTERVAL: Duration = Duration::from_millis(20);

// ============================================================================
// Logging Setup
// ============================================================================

/// Initialize logging system
fn setup_logging(config: &LoggingSettings) {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_names(true),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_names(true),
            )
            .init();
    }

    info!("🔧 Logging initialized with level: {}", log_level);
}

// ============================================================================
// Application
// ============================================================================

struct Application {
    config: AppConfig,
    bus: Arc<NodeBus>,
    canvas: Arc<Mutex<CanvasState>>,
}

impl Application {
    fn new(config: AppConfig) -> anyhow::Result<Self> {
        let bus = Arc::new(NodeBus::new());
        let registered = config
            .register_events(&bus)
            .context("registering configured events")?;
        info!("📋 {} event schema(s) loaded from configuration", registered);

        for required in ["PAINT", "RESIZE"] {
            if !bus.is_event_registered(required) {
                bail!("the configuration has to define the '{required}' event");
            }
        }

        let canvas = Arc::new(Mutex::new(CanvasState::default()));
        nodes::register_demo_nodes(&bus, Arc::clone(&canvas))?;

        Ok(Self {
            config,
            bus,
            canvas,
        })
    }

    fn run(self) -> anyhow::Result<()> {
        let (relay, pump) = channel_relay();
        let relay: Arc<dyn MainThreadRelay> = Arc::new(relay);
        self.bus.start(Some(self.config.bus.clone()), Some(relay))?;

        self.drive_from_worker(&pump)?;
        info!("🎨 Canvas after worker: {:?}", *self.canvas.lock());

        self.bus.undo()?;
        self.bus.redo()?;
        self.bus.clear_undo_redo()?;

        let stats = self.bus.stats();
        info!("📊 Node bus statistics:");
        info!("  - Events dispatched: {}", stats.events_dispatched);
        info!("  - Batches executed: {}", stats.batches_executed);
        info!("  - Undo batches recorded: {}", stats.undo_batches_recorded);
        info!(
            "  - Broadcasts without receivers: {}",
            stats.broadcasts_without_receivers
        );
        info!("🎨 Final canvas: {:?}", *self.canvas.lock());

        self.bus.shutdown();
        Ok(())
    }

    /// Publishes from a worker thread. Every batch is relayed and executes
    /// here, on the designated thread, as the pump receives it.
    fn drive_from_worker(&self, pump: &RelayPump) -> anyhow::Result<()> {
        let bus = Arc::clone(&self.bus);
        let worker = thread::Builder::new()
            .name("worker".to_string())
            .spawn(move || -> node_bus::Result<()> {
                for color in ["red", "green", "blue"] {
                    bus.publish("PAINT", USER, CANVAS, params! { "color" => color })?;
                }
                bus.publish(
                    "RESIZE",
                    USER,
                    CANVAS,
                    params! { "width" => 1920, "height" => 1080 },
                )?;
                bus.publish(UNDO_REQUESTED, USER, CORE_NODE_ID, params!())
            })?;

        pump_until_finished(&self.bus, pump, worker)
    }
}

/// Executes relayed batches until `worker` has finished and nothing is
/// pending. The worker is always joined, also when a batch fails here.
fn pump_until_finished(
    bus: &NodeBus,
    pump: &RelayPump,
    worker: JoinHandle<node_bus::Result<()>>,
) -> anyhow::Result<()> {
    let mut pumped = Ok(());
    while !worker.is_finished() || pump.pending() > 0 {
        if let Err(e) = pump.pump_one(bus, PUMP_INTERVAL) {
            pumped = Err(e);
            break;
        }
    }

    // The worker never blocks on the relay, so joining cannot hang.
    let dispatched = worker
        .join()
        .map_err(|_| anyhow!("worker thread panicked"))?;
    pumped.context("executing a relayed batch failed")?;
    dispatched.context("worker dispatch failed")
}

fn display_banner() {
    info!("🚀 Node Bus Demo v{}", env!("CARGO_PKG_VERSION"));
    info!("🧩 Nodes: {}, {}, {}", USER, CANVAS, nodes::STATUS_BAR);
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let mut config = AppConfig::load_from_file(&args.config_path)?;
    config.apply_overrides(&args);
    if let Err(e) = config.validate() {
        bail!("Configuration validation failed: {}", e);
    }

    setup_logging(&config.logging);
    display_banner();

    let app = Application::new(config)?;
    if let Err(e) = app.run() {
        error!("❌ Demo failed: {:?}", e);
        return Err(e);
    }

    info!("✅ Demo completed successfully");
    Ok(())
}
