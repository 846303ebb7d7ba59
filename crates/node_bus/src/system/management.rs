/// Undo/redo history management
use super::core::NodeBus;
use crate::error::{BusError, Result};
use crate::params;
use crate::types::{
    BatchKind, Event, Parameters, CLEAR_UNDO_REDO_REQUESTED, CORE_NODE_ID, REDO_REQUESTED,
    UNDO_REDO_COUNTERS, UNDO_REQUESTED,
};
use tracing::debug;

impl NodeBus {
    /// Records compensations for a change that did not come from a
    /// dispatched event. Clears the redo history like any new action, then
    /// broadcasts the counters. Only allowed on the designated thread.
    pub fn add_undo_events(&self, batch: Vec<Event>) -> Result<()> {
        if !self.gate.is_designated() {
            return Err(BusError::NotOnMainThread {
                operation: "add undo events",
                hint: ", history changes are not relayed",
            });
        }
        let capacity = self.config.read().history_capacity();
        self.history.lock().record(BatchKind::Action, batch, capacity);
        self.stats.lock().undo_batches_recorded += 1;
        self.publish_undo_redo_counters()
    }

    /// Replays the most recent undo batch. Does nothing if there is none.
    /// The replay's own compensations become the next redo batch.
    ///
    /// Off the designated thread an [`UNDO_REQUESTED`] request is relayed
    /// instead, so the stack is only popped once it runs there.
    pub fn undo(&self) -> Result<()> {
        if !self.gate.is_designated() {
            return self.relay_request(UNDO_REQUESTED, "undo");
        }
        let Some(batch) = self.history.lock().pop_undo() else {
            debug!("↩️ Nothing to undo");
            return Ok(());
        };
        debug!("↩️ Undoing batch of {} event(s)", batch.len());
        self.publish_events_in_main_thread(batch, BatchKind::Undo)
    }

    /// Replays the most recent redo batch. Does nothing if there is none.
    /// The remaining redo history is kept. Relayed like [`undo`](Self::undo).
    pub fn redo(&self) -> Result<()> {
        if !self.gate.is_designated() {
            return self.relay_request(REDO_REQUESTED, "redo");
        }
        let Some(batch) = self.history.lock().pop_redo() else {
            debug!("↪️ Nothing to redo");
            return Ok(());
        };
        debug!("↪️ Redoing batch of {} event(s)", batch.len());
        self.publish_events_in_main_thread(batch, BatchKind::Redo)
    }

    /// Empties both history stacks and broadcasts the counters. Relayed like
    /// [`undo`](Self::undo).
    pub fn clear_undo_redo(&self) -> Result<()> {
        if !self.gate.is_designated() {
            return self.relay_request(CLEAR_UNDO_REDO_REQUESTED, "clear the undo history");
        }
        self.history.lock().clear();
        self.publish_undo_redo_counters()
    }

    /// Broadcasts [`UNDO_REDO_COUNTERS`] with the current stack depths.
    pub fn publish_undo_redo_counters(&self) -> Result<()> {
        let (undo_counter, redo_counter) = self.history.lock().depths();
        self.broadcast(
            UNDO_REDO_COUNTERS,
            CORE_NODE_ID,
            params! {
                "undo_counter" => undo_counter,
                "redo_counter" => redo_counter,
            },
        )
    }

    /// Hands a request event addressed to the core node to the relay.
    fn relay_request(&self, request: &str, operation: &'static str) -> Result<()> {
        let Some(relay) = self.gate.relay() else {
            return Err(BusError::NotOnMainThread {
                operation,
                hint: ", with no main thread relay set",
            });
        };
        let event = self.build_event(request, CORE_NODE_ID, CORE_NODE_ID, Parameters::new())?;
        debug!("📨 Forwarding '{}' to the main thread", request);
        relay.relay(vec![event], BatchKind::Action)
    }
}
