//! # Thread Affinity
//!
//! Dispatch only ever runs on one designated thread. [`ThreadGate`] answers
//! "is this the designated thread" and holds the optional
//! [`MainThreadRelay`] that batches submitted from other threads are handed
//! to. The gate never blocks or queues anything itself.
//!
//! [`channel_relay`] provides a relay backed by a `crossbeam` channel: any
//! thread sends batches through the [`ChannelRelay`], the designated thread
//! drains them with [`RelayPump::drain`].

use crate::error::{BusError, Result};
use crate::system::NodeBus;
use crate::types::{BatchKind, Event};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{debug, warn};

/// Carries a batch onto the designated thread and resubmits it there with
/// [`NodeBus::publish_events_in_main_thread`].
pub trait MainThreadRelay: Send + Sync {
    fn relay(&self, batch: Vec<Event>, kind: BatchKind) -> Result<()>;
}

pub(crate) struct ThreadGate {
    designated: ThreadId,
    relay: RwLock<Option<Arc<dyn MainThreadRelay>>>,
}

impl ThreadGate {
    pub(crate) fn new(designated: ThreadId) -> Self {
        Self {
            designated,
            relay: RwLock::new(None),
        }
    }

    pub(crate) fn designated(&self) -> ThreadId {
        self.designated
    }

    pub(crate) fn is_designated(&self) -> bool {
        thread::current().id() == self.designated
    }

    pub(crate) fn set_relay(&self, relay: Option<Arc<dyn MainThreadRelay>>) {
        *self.relay.write() = relay;
    }

    pub(crate) fn relay(&self) -> Option<Arc<dyn MainThreadRelay>> {
        self.relay.read().clone()
    }

    pub(crate) fn has_relay(&self) -> bool {
        self.relay.read().is_some()
    }
}

// ============================================================================
// Channel relay
// ============================================================================

/// One batch waiting for the designated thread.
#[derive(Debug, Clone)]
pub struct RelayedBatch {
    pub batch: Vec<Event>,
    pub kind: BatchKind,
}

/// Sending half of [`channel_relay`]. Clone it into every thread that
/// dispatches.
#[derive(Debug, Clone)]
pub struct ChannelRelay {
    sender: Sender<RelayedBatch>,
}

impl MainThreadRelay for ChannelRelay {
    fn relay(&self, batch: Vec<Event>, kind: BatchKind) -> Result<()> {
        debug!("📨 Relaying batch of {} event(s) ({:?})", batch.len(), kind);
        self.sender
            .send(RelayedBatch { batch, kind })
            .map_err(|_| BusError::RelayFailed("the relay pump has been dropped".to_string()))
    }
}

/// Receiving half of [`channel_relay`], owned by the designated thread.
#[derive(Debug)]
pub struct RelayPump {
    receiver: Receiver<RelayedBatch>,
}

impl RelayPump {
    /// Number of batches waiting.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Executes every batch queued so far and returns how many ran. Stops at
    /// the first failing batch, later batches stay queued.
    pub fn drain(&self, bus: &NodeBus) -> Result<usize> {
        let mut executed = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(relayed) => {
                    bus.publish_events_in_main_thread(relayed.batch, relayed.kind)?;
                    executed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(executed),
            }
        }
    }

    /// Waits up to `timeout` for one batch and executes it. Returns whether a
    /// batch ran.
    pub fn pump_one(&self, bus: &NodeBus, timeout: Duration) -> Result<bool> {
        match self.receiver.recv_timeout(timeout) {
            Ok(relayed) => {
                bus.publish_events_in_main_thread(relayed.batch, relayed.kind)?;
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                warn!("⚠️ Every channel relay has been dropped");
                Ok(false)
            }
        }
    }
}

/// Creates a connected relay and pump.
pub fn channel_relay() -> (ChannelRelay, RelayPump) {
    let (sender, receiver) = channel::unbounded();
    (ChannelRelay { sender }, RelayPump { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl MainThreadRelay for Nothing {
        fn relay(&self, _batch: Vec<Event>, _kind: BatchKind) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_gate_recognizes_threads() {
        let gate = Arc::new(ThreadGate::new(thread::current().id()));
        assert!(gate.is_designated());

        let remote = Arc::clone(&gate);
        let off_thread = thread::spawn(move || remote.is_designated())
            .join()
            .unwrap();
        assert!(!off_thread);
    }

    #[test]
    fn test_relay_can_be_replaced() {
        let gate = ThreadGate::new(thread::current().id());
        assert!(!gate.has_relay());
        gate.set_relay(Some(Arc::new(Nothing)));
        assert!(gate.relay().is_some());
        gate.set_relay(None);
        assert!(!gate.has_relay());
    }

    #[test]
    fn test_relay_fails_without_pump() {
        let (relay, pump) = channel_relay();
        relay.relay(Vec::new(), BatchKind::Undo).unwrap();
        assert_eq!(pump.pending(), 1);

        drop(pump);
        let error = relay.relay(Vec::new(), BatchKind::Action).unwrap_err();
        assert!(matches!(error, BusError::RelayFailed(_)));
    }
}
