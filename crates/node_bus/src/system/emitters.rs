/// Event dispatch: building, publishing, broadcasting and executing batches
use super::core::NodeBus;
use crate::config::BusConfig;
use crate::error::{quoted_list, BusError, Result};
use crate::format::event_line;
use crate::node::Delivery;
use crate::types::{
    BatchKind, Event, EventDescription, Parameters, BROADCAST_RECEIVER,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Marks one batch execution. The outermost scope on the designated thread
/// writes the separator line, nested scopes only track depth.
struct BatchScope<'a> {
    depth: &'a AtomicUsize,
}

impl<'a> BatchScope<'a> {
    fn enter(bus: &'a NodeBus, batch: &[Event], config: &BusConfig) -> Self {
        if bus.batch_depth.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(first) = batch
                .iter()
                .find(|event| event.severity() >= config.log_level)
            {
                bus.sink.record(first.severity(), "");
            }
        }
        Self {
            depth: &bus.batch_depth,
        }
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

impl NodeBus {
    /// Sends an event to one subscribed node.
    ///
    /// Checks, in this order, that the event is registered, that sender and
    /// receiver are registered nodes and that the receiver subscribes to the
    /// event. Nothing is dispatched if any check fails.
    pub fn publish(
        &self,
        event_id: &str,
        sender_id: &str,
        receiver_id: &str,
        parameters: Parameters,
    ) -> Result<()> {
        let description = self.schemas.require(event_id)?;
        {
            let nodes = self.nodes.read();
            if !nodes.contains(sender_id) {
                return Err(BusError::UnknownSender {
                    sender: sender_id.to_string(),
                    event: event_id.to_string(),
                });
            }
            if !nodes.contains(receiver_id) {
                return Err(BusError::UnknownReceiver {
                    sender: sender_id.to_string(),
                    receiver: receiver_id.to_string(),
                    event: event_id.to_string(),
                });
            }
            if !nodes.is_subscribed(event_id, receiver_id) {
                return Err(BusError::ReceiverNotSubscribed {
                    sender: sender_id.to_string(),
                    receiver: receiver_id.to_string(),
                    event: event_id.to_string(),
                });
            }
        }

        let event = assemble(event_id, description, sender_id, receiver_id, parameters)?;
        self.publish_events(vec![event], BatchKind::Action)
    }

    /// Sends an event to every node currently subscribed to it.
    ///
    /// The subscriber set is snapshotted once. An echo line addressed to
    /// `BROADCAST` is always logged, even when nobody listens, and the batch
    /// is only submitted if there is at least one receiver.
    pub fn broadcast(&self, event_id: &str, sender_id: &str, parameters: Parameters) -> Result<()> {
        let description = self.schemas.require(event_id)?;
        let receivers = {
            let nodes = self.nodes.read();
            if !nodes.contains(sender_id) {
                return Err(BusError::UnknownSender {
                    sender: sender_id.to_string(),
                    event: event_id.to_string(),
                });
            }
            nodes.subscribers(event_id)
        };

        let echo = assemble(
            event_id,
            description,
            sender_id,
            BROADCAST_RECEIVER,
            parameters,
        )?;
        let batch: Vec<Event> = receivers
            .iter()
            .map(|receiver_id| echo.addressed_to(receiver_id))
            .collect();

        let config = self.config();
        self.log_event(&echo, &config);

        if batch.is_empty() {
            self.stats.lock().broadcasts_without_receivers += 1;
            debug!(
                "📭 Node '{}' broadcast event '{}', but it echoed in the void",
                sender_id, event_id
            );
            return Ok(());
        }

        debug!(
            "📤 Broadcasting '{}' from '{}' to {} receiver(s)",
            event_id,
            sender_id,
            batch.len()
        );
        self.publish_events(batch, BatchKind::Action)
    }

    /// Builds an event after checking that the parameter names equal the
    /// event's parameter names exactly.
    pub fn build_event(
        &self,
        event_id: &str,
        sender_id: &str,
        receiver_id: &str,
        parameters: Parameters,
    ) -> Result<Event> {
        let description = self.schemas.require(event_id)?;
        assemble(event_id, description, sender_id, receiver_id, parameters)
    }

    /// Submits a batch. On the designated thread the batch runs inline,
    /// anywhere else it is handed to the relay together with `kind`.
    pub fn publish_events(&self, batch: Vec<Event>, kind: BatchKind) -> Result<()> {
        if self.gate.is_designated() {
            return self.publish_events_in_main_thread(batch, kind);
        }
        match self.gate.relay() {
            Some(relay) => relay.relay(batch, kind),
            None => Err(BusError::NotOnMainThread {
                operation: "publish events",
                hint: ", with no main thread relay set",
            }),
        }
    }

    /// Executes a batch on the designated thread. Relays call this once they
    /// are back on that thread. Fails immediately anywhere else.
    ///
    /// Events run in order. The compensations of all events are collected,
    /// reversed and stored as one batch on the history stack `kind` selects.
    /// The first failing event aborts the rest of the batch and nothing is
    /// recorded for it.
    pub fn publish_events_in_main_thread(&self, batch: Vec<Event>, kind: BatchKind) -> Result<()> {
        if !self.gate.is_designated() {
            return Err(BusError::NotOnMainThread {
                operation: "publish events",
                hint: " directly, relays have to re-enter on the designated thread",
            });
        }

        let config = self.config();
        let _scope = BatchScope::enter(self, &batch, &config);

        let mut undo_events = Vec::new();
        for event in &batch {
            self.log_event(event, &config);
            self.execute(event, &mut undo_events)?;
        }
        undo_events.reverse();

        let produced = !undo_events.is_empty();
        if produced {
            self.history
                .lock()
                .record(kind, undo_events, config.history_capacity());
        }
        {
            let mut stats = self.stats.lock();
            stats.batches_executed += 1;
            if produced {
                stats.undo_batches_recorded += 1;
            }
        }

        if produced || kind.is_replay() {
            self.publish_undo_redo_counters()?;
        }
        Ok(())
    }

    /// Runs the handler bound to the event's receiver and drains the
    /// compensations it returns into `undo_events`.
    fn execute(&self, event: &Event, undo_events: &mut Vec<Event>) -> Result<()> {
        let handler = self
            .nodes
            .read()
            .handler(event.id(), event.receiver_id())
            .ok_or_else(|| BusError::HandlerNotSubscribed {
                receiver: event.receiver_id().to_string(),
                event: event.id().to_string(),
            })?;

        trace!(
            "⚙️ Executing '{}' on '{}'",
            event.id(),
            event.receiver_id()
        );
        let delivery = Delivery::new(self, event, handler.wants_sender_id);
        let compensation = (handler.callable)(&delivery)?;

        for action in compensation {
            let (undo_id, undo_parameters) = action?.into_parts();
            undo_events.push(self.build_event(
                &undo_id,
                event.receiver_id(),
                event.receiver_id(),
                undo_parameters,
            )?);
        }

        self.stats.lock().events_dispatched += 1;
        Ok(())
    }

    pub(super) fn log_event(&self, event: &Event, config: &BusConfig) {
        if event.severity() < config.log_level {
            return;
        }
        let line = event_line(event, config, self.schemas.longest_id());
        self.sink.record(event.severity(), &line);
    }
}

fn assemble(
    event_id: &str,
    description: Arc<EventDescription>,
    sender_id: &str,
    receiver_id: &str,
    parameters: Parameters,
) -> Result<Event> {
    {
        let expected = description.parameter_names();
        let provided: BTreeSet<&str> = parameters.keys().map(String::as_str).collect();
        if expected != provided {
            return Err(BusError::EventParameterMismatch {
                event: event_id.to_string(),
                expected: quoted_list(expected),
                provided: quoted_list(provided),
            });
        }
    }

    Ok(Event::new(
        event_id.to_string(),
        description,
        sender_id.to_string(),
        receiver_id.to_string(),
        parameters,
    ))
}
