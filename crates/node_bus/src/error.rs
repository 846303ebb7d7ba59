//! # Error Types
//!
//! Every failure the bus can report is a [`BusError`]. None of them are
//! transient: each one points at a programming error in the calling node,
//! the schema declarations or the host configuration, and nothing is retried
//! internally.
//!
//! Variants are grouped by [`ErrorCategory`], which tells the caller what was
//! left untouched when the error surfaced.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BusError>;

/// Coarse classification of [`BusError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad configuration handed to `start`. Fatal, never recovered.
    Configuration,
    /// A registration call was rejected. The registries are unchanged.
    Registration,
    /// A publish or broadcast was rejected before anything was dispatched.
    DispatchPrecondition,
    /// A batch failed while executing. Events executed before the failure
    /// stay executed, the rest of the batch is skipped.
    Execution,
    /// Dispatch was attempted off the designated thread.
    Threading,
}

/// Errors produced by the node bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Attempted to register event '{event}' twice.")]
    DuplicateEvent { event: String },

    #[error("Attempted to register event '{event}', but the severity {value} is not a known log level.")]
    InvalidSeverity { event: String, value: String },

    #[error("Attempted to register event '{event}', but {detail}.")]
    InvalidParameterShape { event: String, detail: String },

    #[error("Attempted to register event '{event}', but parameter {index} has an invalid name, has to be a non-empty string.")]
    InvalidParameterName { event: String, index: usize },

    #[error("Attempted to register event '{event}', but parameter {index} has an invalid type {value}.")]
    InvalidParameterType {
        event: String,
        index: usize,
        value: String,
    },

    #[error("Attempted to register event '{event}', but parameter {index} has an invalid description, has to be a string.")]
    InvalidParameterDescription { event: String, index: usize },

    #[error("Attempted to register event '{event}', but parameter '{parameter}' is configured twice.")]
    DuplicateParameter { event: String, parameter: String },

    #[error("Attempted to register event '{event}', but parameter '{parameter}' is a reserved name.")]
    ReservedParameterName { event: String, parameter: String },

    #[error("Event '{event}' is not registered.")]
    UnknownEvent { event: String },

    #[error("Attempted to register node '{node}', but a node with that identifier is already registered.")]
    DuplicateNode { node: String },

    #[error("Node '{node}' is not registered.")]
    UnknownNode { node: String },

    #[error("Attempted to unregister node '{node}', but it belongs to the node bus itself.")]
    ReservedNode { node: String },

    #[error("Node '{node}' declares two handlers for event '{event}'.")]
    DuplicateHandler { node: String, event: String },

    #[error("Node '{node}' handles event '{event}', but the parameters do not match. Event requires: [{expected}], handler provides: [{provided}].")]
    HandlerParameterMismatch {
        node: String,
        event: String,
        expected: String,
        provided: String,
    },

    #[error("Node '{node}' handles event '{event}' and requests the sender id, but the handler does not declare a 'sender_id' slot.")]
    MissingSenderIdDeclaration { node: String, event: String },

    #[error("Event '{event}' cannot be constructed, event requires: [{expected}], provided are: [{provided}].")]
    EventParameterMismatch {
        event: String,
        expected: String,
        provided: String,
    },

    #[error("Node '{sender}' attempted to dispatch event '{event}', but the sender node is not registered.")]
    UnknownSender { sender: String, event: String },

    #[error("Node '{sender}' attempted to publish event '{event}' to node '{receiver}', but the receiver node is not registered.")]
    UnknownReceiver {
        sender: String,
        receiver: String,
        event: String,
    },

    #[error("Node '{sender}' attempted to publish event '{event}' to node '{receiver}', but the receiver is not subscribed to that event.")]
    ReceiverNotSubscribed {
        sender: String,
        receiver: String,
        event: String,
    },

    #[error("Attempted to deliver event '{event}' to node '{receiver}', but the node is no longer subscribed to that event.")]
    HandlerNotSubscribed { receiver: String, event: String },

    #[error("Undo event has to be a pair of event identifier and parameters: {detail}.")]
    MalformedUndoEvent { detail: String },

    #[error("Undo event parameters have an invalid type, should be a map, is: '{found}'.")]
    InvalidUndoParameterContainer { found: String },

    #[error("Attempted to {operation} outside of the main thread{hint}.")]
    NotOnMainThread {
        operation: &'static str,
        hint: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("The node bus has already been started.")]
    AlreadyStarted,

    #[error("Main thread relay failed: {0}")]
    RelayFailed(String),

    #[error("Handler failed: {0}")]
    HandlerFailed(String),
}

impl BusError {
    /// Convenience constructor for errors raised by node handlers themselves.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::HandlerFailed(message.into())
    }

    /// Returns which part of the taxonomy this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfiguration(_) | Self::AlreadyStarted => ErrorCategory::Configuration,
            Self::DuplicateEvent { .. }
            | Self::InvalidSeverity { .. }
            | Self::InvalidParameterShape { .. }
            | Self::InvalidParameterName { .. }
            | Self::InvalidParameterType { .. }
            | Self::InvalidParameterDescription { .. }
            | Self::DuplicateParameter { .. }
            | Self::ReservedParameterName { .. }
            | Self::DuplicateNode { .. }
            | Self::UnknownNode { .. }
            | Self::ReservedNode { .. }
            | Self::DuplicateHandler { .. }
            | Self::HandlerParameterMismatch { .. }
            | Self::MissingSenderIdDeclaration { .. } => ErrorCategory::Registration,
            Self::UnknownEvent { .. }
            | Self::EventParameterMismatch { .. }
            | Self::UnknownSender { .. }
            | Self::UnknownReceiver { .. }
            | Self::ReceiverNotSubscribed { .. } => ErrorCategory::DispatchPrecondition,
            Self::HandlerNotSubscribed { .. }
            | Self::MalformedUndoEvent { .. }
            | Self::InvalidUndoParameterContainer { .. }
            | Self::HandlerFailed(_) => ErrorCategory::Execution,
            Self::NotOnMainThread { .. } | Self::RelayFailed(_) => ErrorCategory::Threading,
        }
    }
}

/// Renders a set of names as `'a', 'b'` for error messages.
pub(crate) fn quoted_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_list() {
        assert_eq!(quoted_list(["color", "size"]), "'color', 'size'");
        assert_eq!(quoted_list(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            BusError::InvalidConfiguration("width".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            BusError::DuplicateNode { node: "A".into() }.category(),
            ErrorCategory::Registration
        );
        assert_eq!(
            BusError::UnknownEvent { event: "E".into() }.category(),
            ErrorCategory::DispatchPrecondition
        );
        assert_eq!(
            BusError::MalformedUndoEvent { detail: "x".into() }.category(),
            ErrorCategory::Execution
        );
        assert_eq!(
            BusError::NotOnMainThread {
                operation: "publish events",
                hint: ""
            }
            .category(),
            ErrorCategory::Threading
        );
    }

    #[test]
    fn test_reserved_node_is_a_registration_error() {
        let error = BusError::ReservedNode {
            node: "NODE_BUS".into(),
        };
        assert_eq!(error.category(), ErrorCategory::Registration);
        assert!(error.to_string().contains("'NODE_BUS'"));
    }

    #[test]
    fn test_messages_name_identifiers() {
        let error = BusError::ReceiverNotSubscribed {
            sender: "USER".into(),
            receiver: "CANVAS".into(),
            event: "PAINT".into(),
        };
        let message = error.to_string();
        assert!(message.contains("'USER'"));
        assert!(message.contains("'CANVAS'"));
        assert!(message.contains("'PAINT'"));
    }
}
