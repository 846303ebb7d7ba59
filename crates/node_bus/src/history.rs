//! Undo/redo history.
//!
//! Two stacks of batches. The most recent batch sits at the back of each
//! deque; capacity eviction drops from the front, so the oldest batch goes
//! first.

use crate::types::{BatchKind, Event};
use std::collections::VecDeque;

/// One compensation batch, replayed as a unit.
pub type Batch = Vec<Event>;

#[derive(Debug, Default)]
pub(crate) struct UndoRedoStacks {
    undo: VecDeque<Batch>,
    redo: VecDeque<Batch>,
}

impl UndoRedoStacks {
    /// Stores the compensations of an executed batch on the stack `kind`
    /// selects. `capacity` of `None` means unbounded.
    pub(crate) fn record(&mut self, kind: BatchKind, batch: Batch, capacity: Option<usize>) {
        match kind {
            BatchKind::Action => {
                self.redo.clear();
                push_bounded(&mut self.undo, batch, capacity);
            }
            BatchKind::Redo => push_bounded(&mut self.undo, batch, capacity),
            BatchKind::Undo => push_bounded(&mut self.redo, batch, capacity),
        }
    }

    pub(crate) fn pop_undo(&mut self) -> Option<Batch> {
        self.undo.pop_back()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<Batch> {
        self.redo.pop_back()
    }

    pub(crate) fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// `(undo depth, redo depth)`
    pub(crate) fn depths(&self) -> (usize, usize) {
        (self.undo.len(), self.redo.len())
    }

    #[cfg(test)]
    pub(crate) fn oldest_undo(&self) -> Option<&Batch> {
        self.undo.front()
    }
}

fn push_bounded(stack: &mut VecDeque<Batch>, batch: Batch, capacity: Option<usize>) {
    stack.push_back(batch);
    if let Some(capacity) = capacity {
        while stack.len() > capacity {
            stack.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;
    use crate::types::{EventDescription, EventParameter, Severity};
    use std::sync::Arc;

    fn marker(step: usize) -> Batch {
        let description = Arc::new(EventDescription::new(
            [EventParameter::new("step")].into_iter().collect(),
            Severity::Info,
        ));
        vec![Event::new(
            "STEP".to_string(),
            description,
            "NODE".to_string(),
            "NODE".to_string(),
            params! { "step" => step },
        )]
    }

    fn step_of(batch: &Batch) -> u64 {
        batch[0].parameters()["step"].as_u64().unwrap()
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let mut stacks = UndoRedoStacks::default();
        for step in 0..=5 {
            stacks.record(BatchKind::Action, marker(step), Some(5));
        }
        assert_eq!(stacks.depths(), (5, 0));
        assert_eq!(step_of(stacks.oldest_undo().unwrap()), 1);
        assert_eq!(step_of(&stacks.pop_undo().unwrap()), 5);
    }

    #[test]
    fn test_unbounded_never_evicts() {
        let mut stacks = UndoRedoStacks::default();
        for step in 0..100_000 {
            stacks.record(BatchKind::Action, marker(step), None);
        }
        assert_eq!(stacks.depths(), (100_000, 0));
        assert_eq!(step_of(stacks.oldest_undo().unwrap()), 0);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut stacks = UndoRedoStacks::default();
        stacks.record(BatchKind::Action, marker(0), Some(0));
        assert_eq!(stacks.depths(), (0, 0));
    }

    #[test]
    fn test_action_clears_redo_but_redo_replay_does_not() {
        let mut stacks = UndoRedoStacks::default();
        stacks.record(BatchKind::Undo, marker(1), None);
        stacks.record(BatchKind::Undo, marker(2), None);
        assert_eq!(stacks.depths(), (0, 2));

        stacks.record(BatchKind::Redo, marker(3), None);
        assert_eq!(stacks.depths(), (1, 2));

        stacks.record(BatchKind::Action, marker(4), None);
        assert_eq!(stacks.depths(), (2, 0));

        stacks.clear();
        assert_eq!(stacks.depths(), (0, 0));
        assert!(stacks.pop_redo().is_none());
    }
}
