//! Destinations for event log lines.

use crate::types::Severity;
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

/// `tracing` target under which [`TracingSink`] writes event lines.
pub const EVENT_TARGET: &str = "node_bus::events";

/// Receives one formatted line per dispatched event, plus an empty separator
/// line at the start of every outermost batch.
pub trait EventSink: Send + Sync {
    fn record(&self, severity: Severity, line: &str);
}

/// Forwards event lines to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, severity: Severity, line: &str) {
        match severity {
            Severity::Trace => trace!(target: EVENT_TARGET, "{}", line),
            Severity::Debug => debug!(target: EVENT_TARGET, "{}", line),
            Severity::Info => info!(target: EVENT_TARGET, "{}", line),
            Severity::Warn => warn!(target: EVENT_TARGET, "{}", line),
            Severity::Error => error!(target: EVENT_TARGET, "{}", line),
        }
    }
}

/// Keeps every line in memory. Useful for tests and for hosts that render
/// the event log themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Severity, String)> {
        self.records.lock().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn record(&self, severity: Severity, line: &str) {
        self.records.lock().push((severity, line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.record(Severity::Info, "");
        sink.record(Severity::Warn, "first");
        sink.record(Severity::Info, "second");

        assert_eq!(sink.lines(), ["", "first", "second"]);
        assert_eq!(sink.records()[1].0, Severity::Warn);

        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_every_level() {
        let sink = TracingSink;
        for severity in [
            Severity::Trace,
            Severity::Debug,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
        ] {
            sink.record(severity, "line");
        }
    }
}
