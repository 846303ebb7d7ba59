/// Core NodeBus implementation
use super::stats::BusStats;
use crate::config::BusConfig;
use crate::error::{BusError, Result};
use crate::gate::{MainThreadRelay, ThreadGate};
use crate::history::UndoRedoStacks;
use crate::node::{Compensation, NodeBuilder};
use crate::registry::NodeRegistry;
use crate::schema::SchemaRegistry;
use crate::sink::{EventSink, TracingSink};
use crate::types::{
    EventDescription, EventParameter, ParameterType, BUS_STARTED, CLEAR_UNDO_REDO_REQUESTED,
    CORE_NODE_ID, REDO_REQUESTED, UNDO_REDO_COUNTERS, UNDO_REQUESTED,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{info, warn};

/// The event bus: schema and node registries, the dispatch engine, the
/// undo/redo history and the thread gate, owned by one object.
///
/// A bus is created on (or bound to) its designated thread. Every dispatch
/// executes there. Calls from other threads go through the configured
/// [`MainThreadRelay`] or fail with [`BusError::NotOnMainThread`].
///
/// The bus is `Send + Sync` and is usually shared as `Arc<NodeBus>`. No
/// internal lock is held while a handler runs, so handlers may publish,
/// broadcast, register nodes or request undo themselves.
///
/// # Examples
///
/// ```rust
/// use node_bus::{params, Compensation, EventParameter, NodeBuilder, NodeBus, Severity};
///
/// let bus = NodeBus::new();
/// bus.register_event("PAINT", [EventParameter::new("color")], Severity::Info)?;
/// bus.register_node("USER", NodeBuilder::new())?;
/// bus.register_node(
///     "CANVAS",
///     NodeBuilder::new().on("PAINT", &["color"], |delivery| {
///         let color: String = delivery.parameter("color")?;
///         assert_eq!(color, "red");
///         Ok(Compensation::none())
///     }),
/// )?;
/// bus.start(None, None)?;
/// bus.publish("PAINT", "USER", "CANVAS", params! { "color" => "red" })?;
/// # Ok::<(), node_bus::BusError>(())
/// ```
pub struct NodeBus {
    pub(super) schemas: SchemaRegistry,
    pub(super) nodes: RwLock<NodeRegistry>,
    pub(super) history: Mutex<UndoRedoStacks>,
    pub(super) config: RwLock<BusConfig>,
    pub(super) started: AtomicBool,
    pub(super) gate: ThreadGate,
    pub(super) sink: Arc<dyn EventSink>,
    /// Nesting depth of batch execution on the designated thread
    pub(super) batch_depth: AtomicUsize,
    pub(super) stats: Mutex<BusStats>,
}

impl std::fmt::Debug for NodeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeBus")
            .field("events", &self.schemas.len())
            .field("history", &self.history.try_lock().map(|stacks| stacks.depths()))
            .field("started", &self.started.load(Ordering::SeqCst))
            .field("designated_thread", &self.gate.designated())
            .field("relay", &self.gate.has_relay())
            .finish_non_exhaustive()
    }
}

impl NodeBus {
    /// Creates a bus whose designated thread is the calling thread.
    pub fn new() -> Self {
        Self::bound_to(thread::current().id())
    }

    /// Creates a bus that dispatches on `designated`.
    pub fn bound_to(designated: ThreadId) -> Self {
        let bus = Self {
            schemas: SchemaRegistry::new(),
            nodes: RwLock::new(NodeRegistry::default()),
            history: Mutex::new(UndoRedoStacks::default()),
            config: RwLock::new(BusConfig::default()),
            started: AtomicBool::new(false),
            gate: ThreadGate::new(designated),
            sink: Arc::new(TracingSink),
            batch_depth: AtomicUsize::new(0),
            stats: Mutex::new(BusStats::default()),
        };
        bus.install_core_node();
        bus
    }

    /// Replaces the destination of event log lines.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Registers the reserved events and the core node that serves undo,
    /// redo and clear requests.
    fn install_core_node(&self) {
        for event_id in [
            BUS_STARTED,
            UNDO_REQUESTED,
            REDO_REQUESTED,
            CLEAR_UNDO_REDO_REQUESTED,
        ] {
            self.schemas.insert_reserved(event_id, []);
        }
        self.schemas.insert_reserved(
            UNDO_REDO_COUNTERS,
            [
                EventParameter::new("undo_counter")
                    .with_type(ParameterType::Int)
                    .with_description("Number of undo batches."),
                EventParameter::new("redo_counter")
                    .with_type(ParameterType::Int)
                    .with_description("Number of redo batches."),
            ],
        );

        let core = NodeBuilder::new()
            .on(UNDO_REQUESTED, &[], |delivery| {
                delivery.bus().undo()?;
                Ok(Compensation::none())
            })
            .on(REDO_REQUESTED, &[], |delivery| {
                delivery.bus().redo()?;
                Ok(Compensation::none())
            })
            .on(CLEAR_UNDO_REDO_REQUESTED, &[], |delivery| {
                delivery.bus().clear_undo_redo()?;
                Ok(Compensation::none())
            });
        self.nodes.write().commit(CORE_NODE_ID, core);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Validates and installs the configuration, installs the relay and
    /// broadcasts [`BUS_STARTED`]. `None` selects the default configuration.
    pub fn start(
        &self,
        config: Option<BusConfig>,
        relay: Option<Arc<dyn MainThreadRelay>>,
    ) -> Result<()> {
        let config = config.unwrap_or_default();
        config.validate()?;

        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BusError::AlreadyStarted);
        }

        info!(
            "🚀 Starting node bus (log level {}, history capacity {})",
            config.log_level, config.maximum_undo_events
        );
        *self.config.write() = config;
        self.gate.set_relay(relay);

        self.broadcast(BUS_STARTED, CORE_NODE_ID, crate::Parameters::new())
    }

    /// Full teardown: empties the history without broadcasting, unregisters
    /// every node except the core node, forgets the relay and restores the
    /// default configuration. Event schemas stay registered. The bus can be
    /// started again afterwards.
    pub fn shutdown(&self) {
        self.history.lock().clear();

        {
            let mut nodes = self.nodes.write();
            let node_ids: Vec<String> = nodes
                .node_ids()
                .filter(|node_id| *node_id != CORE_NODE_ID)
                .map(str::to_string)
                .collect();
            for node_id in node_ids {
                if let Err(error) = nodes.unregister(&node_id) {
                    warn!("⚠️ Failed to unregister node '{}': {}", node_id, error);
                }
            }
        }

        self.gate.set_relay(None);
        *self.config.write() = BusConfig::default();
        self.started.store(false, Ordering::SeqCst);
        info!("🛑 Node bus shut down");
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Whether [`start`](Self::start) has run since construction or the last
    /// [`shutdown`](Self::shutdown).
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> BusConfig {
        self.config.read().clone()
    }

    /// Snapshot of the dispatch counters.
    pub fn stats(&self) -> BusStats {
        self.stats.lock().clone()
    }

    /// The thread every dispatch runs on.
    pub fn designated_thread(&self) -> ThreadId {
        self.gate.designated()
    }

    /// Whether the calling thread may dispatch inline.
    pub fn is_designated_thread(&self) -> bool {
        self.gate.is_designated()
    }

    /// Whether an event schema with this identifier exists.
    pub fn is_event_registered(&self, event_id: &str) -> bool {
        self.schemas.contains(event_id)
    }

    /// The registered schema of an event.
    pub fn event_description(&self, event_id: &str) -> Option<Arc<EventDescription>> {
        self.schemas.get(event_id)
    }

    /// Whether a node with this identifier is registered.
    pub fn is_node_registered(&self, node_id: &str) -> bool {
        self.nodes.read().contains(node_id)
    }

    /// Current subscribers of an event, sorted.
    pub fn subscribers(&self, event_id: &str) -> Vec<String> {
        self.nodes.read().subscribers(event_id)
    }

    /// Number of batches on the undo stack.
    pub fn undo_depth(&self) -> usize {
        self.history.lock().depths().0
    }

    /// Number of batches on the redo stack.
    pub fn redo_depth(&self) -> usize {
        self.history.lock().depths().1
    }
}

impl Default for NodeBus {
    fn default() -> Self {
        Self::new()
    }
}
