/// Counters describing what the bus has done since construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Events whose handler ran to completion
    pub events_dispatched: u64,
    /// Batches that ran to completion, nested ones included
    pub batches_executed: u64,
    /// Broadcasts that found no subscriber
    pub broadcasts_without_receivers: u64,
    /// Compensation batches pushed onto either history stack
    pub undo_batches_recorded: u64,
}
