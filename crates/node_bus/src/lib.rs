//! # Node Bus
//!
//! An in-process publish/subscribe event bus for independently developed
//! components ("nodes"). Nodes exchange schema-checked events without holding
//! references to each other, and every state-changing dispatch can be undone
//! and redone as one atomic batch.
//!
//! ## Core Features
//!
//! - **Schemas**: every event is registered once with a set of named,
//!   optionally typed parameters and a severity
//! - **Explicit handler tables**: nodes declare their handlers with
//!   [`NodeBuilder`], validated against the schemas at registration
//! - **Publish and broadcast**: directed delivery to one subscriber, or one
//!   event per current subscriber
//! - **Undo/redo**: handlers return compensating events, which are stored as
//!   bounded batches and replayed on request
//! - **Thread affinity**: dispatch only runs on one designated thread, other
//!   threads hand their batches to a [`MainThreadRelay`]
//!
//! ## Quick Start Example
//!
//! ```rust
//! use node_bus::*;
//! use std::sync::{Arc, Mutex};
//!
//! let bus = NodeBus::new();
//! bus.register_event("PAINT", [EventParameter::new("color")], Severity::Info)?;
//! bus.register_node("USER", NodeBuilder::new())?;
//!
//! let color = Arc::new(Mutex::new(String::from("white")));
//! let canvas = Arc::clone(&color);
//! bus.register_node(
//!     "CANVAS",
//!     NodeBuilder::new().on("PAINT", &["color"], move |delivery| {
//!         let new_color: String = delivery.parameter("color")?;
//!         let old_color = std::mem::replace(&mut *canvas.lock().unwrap(), new_color);
//!         Ok(Compensation::one(UndoAction::new(
//!             "PAINT",
//!             params! { "color" => old_color },
//!         )))
//!     }),
//! )?;
//!
//! bus.start(None, None)?;
//! bus.publish("PAINT", "USER", "CANVAS", params! { "color" => "red" })?;
//! assert_eq!(*color.lock().unwrap(), "red");
//!
//! bus.undo()?;
//! assert_eq!(*color.lock().unwrap(), "white");
//! assert_eq!((bus.undo_depth(), bus.redo_depth()), (0, 1));
//! # Ok::<(), BusError>(())
//! ```
//!
//! ## Architecture Overview
//!
//! - [`SchemaRegistry`] holds event descriptions
//! - the node registry holds node identifiers and handler bindings
//! - [`NodeBus`] builds, validates and executes batches and owns the history
//! - the thread gate decides whether a batch runs inline or goes to the relay
//!
//! Every dispatched event is written as one line to an [`EventSink`]
//! ([`TracingSink`] by default).

pub mod config;
pub mod error;
pub mod format;
pub mod gate;
pub mod history;
pub mod node;
pub mod schema;
pub mod sink;
pub mod system;
pub mod types;

mod registry;

pub use config::{BusConfig, MINIMUM_ID_LOGGING_LENGTH};
pub use error::{BusError, ErrorCategory, Result};
pub use gate::{channel_relay, ChannelRelay, MainThreadRelay, RelayPump, RelayedBatch};
pub use history::Batch;
pub use node::{Compensation, Delivery, HandlerBinding, HandlerFn, NodeBuilder, UndoAction};
pub use schema::SchemaRegistry;
pub use sink::{EventSink, MemorySink, TracingSink, EVENT_TARGET};
pub use system::{BusStats, NodeBus};
pub use types::{
    BatchKind, Event, EventDescription, EventParameter, ParameterType, Parameters, Severity,
    BROADCAST_RECEIVER, BUS_STARTED, CLEAR_UNDO_REDO_REQUESTED, CORE_NODE_ID, REDO_REQUESTED,
    SENDER_ID_PARAMETER, UNDO_REDO_COUNTERS, UNDO_REQUESTED,
};

// Re-exported for the `params!` macro and for handler code.
pub use serde_json;
