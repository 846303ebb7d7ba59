//! # Core Type Definitions
//!
//! The data model shared by every part of the bus: severities, parameter
//! type tags, event schemas and the events built from them.
//!
//! - [`Severity`] - log level attached to every event description
//! - [`ParameterType`] - optional, descriptive type tag of a parameter
//! - [`EventParameter`] - one named parameter of an event schema
//! - [`EventDescription`] - the immutable schema of a registered event
//! - [`Event`] - one message addressed from a sender node to a receiver node
//! - [`BatchKind`] - whether a batch is a fresh action or a history replay

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Reserved identifiers
// ============================================================================

/// Identifier of the built-in node owned by the bus.
pub const CORE_NODE_ID: &str = "NODE_BUS";

/// Broadcast once by `start`.
pub const BUS_STARTED: &str = "BUS_STARTED";
/// Handled by the core node, undoes the most recent batch.
pub const UNDO_REQUESTED: &str = "UNDO_REQUESTED";
/// Handled by the core node, redoes the most recently undone batch.
pub const REDO_REQUESTED: &str = "REDO_REQUESTED";
/// Handled by the core node, empties both history stacks.
pub const CLEAR_UNDO_REDO_REQUESTED: &str = "CLEAR_UNDO_REDO_REQUESTED";
/// Broadcast whenever the history depths may have changed.
pub const UNDO_REDO_COUNTERS: &str = "UNDO_REDO_COUNTERS";

/// Parameter slot through which a handler receives the sender identifier.
/// Event schemas may not use it.
pub const SENDER_ID_PARAMETER: &str = "sender_id";

/// Receiver column shown for the echo line of a broadcast.
pub const BROADCAST_RECEIVER: &str = "BROADCAST";

/// Map of parameter name to value carried by an event.
pub type Parameters = BTreeMap<String, Value>;

// ============================================================================
// Severity
// ============================================================================

/// Log level of an event. Events below the configured threshold are not
/// written to the event sink.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

// ============================================================================
// Parameter type tags
// ============================================================================

/// Descriptive type tag of an event parameter.
///
/// Tags are shown in log lines next to the actual type of the value. They
/// are never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Bool,
    Int,
    Float,
    Str,
    List,
    #[serde(alias = "dict")]
    Map,
    Any,
}

impl ParameterType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Map => "dict",
            Self::Any => "any",
        }
    }

    /// Name of the actual type of a parameter value, in the same vocabulary
    /// as the tags.
    pub fn name_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(number) if number.is_f64() => "float",
            Value::Number(_) => "int",
            Value::String(_) => "str",
            Value::Array(_) => "list",
            Value::Object(_) => "dict",
        }
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(Self::Bool),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "str" | "string" => Ok(Self::Str),
            "list" => Ok(Self::List),
            "dict" | "map" => Ok(Self::Map),
            "any" => Ok(Self::Any),
            other => Err(format!("unknown parameter type '{other}'")),
        }
    }
}

// ============================================================================
// Event schema
// ============================================================================

/// One named parameter of an event schema.
///
/// Equality and ordering only look at the name, so a set of parameters can
/// never hold two parameters with the same name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventParameter {
    name: String,
    #[serde(rename = "type", default)]
    parameter_type: Option<ParameterType>,
    #[serde(default)]
    description: String,
}

impl EventParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_type: None,
            description: String::new(),
        }
    }

    pub fn with_type(mut self, parameter_type: ParameterType) -> Self {
        self.parameter_type = Some(parameter_type);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_type(&self) -> Option<ParameterType> {
        self.parameter_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for EventParameter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EventParameter {}

impl PartialOrd for EventParameter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventParameter {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl std::hash::Hash for EventParameter {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Immutable schema of a registered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescription {
    parameters: BTreeSet<EventParameter>,
    severity: Severity,
}

impl EventDescription {
    pub(crate) fn new(parameters: BTreeSet<EventParameter>, severity: Severity) -> Self {
        Self {
            parameters,
            severity,
        }
    }

    /// Parameters sorted by name.
    pub fn parameters(&self) -> &BTreeSet<EventParameter> {
        &self.parameters
    }

    pub fn parameter_names(&self) -> BTreeSet<&str> {
        self.parameters.iter().map(EventParameter::name).collect()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }
}

// ============================================================================
// Events
// ============================================================================

/// One message addressed from a sender node to a receiver node.
///
/// Events are only built by [`NodeBus::build_event`](crate::NodeBus::build_event),
/// which guarantees that the parameter names equal the schema's parameter
/// names.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    id: String,
    description: Arc<EventDescription>,
    sender_id: String,
    receiver_id: String,
    parameters: Parameters,
}

impl Event {
    pub(crate) fn new(
        id: String,
        description: Arc<EventDescription>,
        sender_id: String,
        receiver_id: String,
        parameters: Parameters,
    ) -> Self {
        Self {
            id,
            description,
            sender_id,
            receiver_id,
            parameters,
        }
    }

    /// Same event, delivered to another receiver.
    pub(crate) fn addressed_to(&self, receiver_id: &str) -> Self {
        Self {
            receiver_id: receiver_id.to_string(),
            ..self.clone()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &EventDescription {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.description.severity()
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

/// Where a batch comes from, and therefore which history stack receives the
/// compensations it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// A fresh action. Compensations go onto the undo stack and invalidate
    /// the redo stack.
    Action,
    /// Replay of an undo batch. Compensations go onto the redo stack.
    Undo,
    /// Replay of a redo batch. Compensations go onto the undo stack, the
    /// remaining redo history is kept.
    Redo,
}

impl BatchKind {
    pub fn is_undo(&self) -> bool {
        matches!(self, Self::Undo)
    }

    pub fn is_replay(&self) -> bool {
        !matches!(self, Self::Action)
    }
}

/// Builds a [`Parameters`] map from `name => value` pairs.
///
/// ```rust
/// use node_bus::params;
///
/// let parameters = params! { "color" => "red", "width" => 3 };
/// assert_eq!(parameters["color"], "red");
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Parameters::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut parameters = $crate::Parameters::new();
        $(
            parameters.insert(($name).to_string(), $crate::serde_json::Value::from($value));
        )+
        parameters
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameters_compare_by_name() {
        let plain = EventParameter::new("color");
        let typed = EventParameter::new("color")
            .with_type(ParameterType::Str)
            .with_description("Fill color");
        assert_eq!(plain, typed);

        let mut set = BTreeSet::new();
        assert!(set.insert(plain));
        assert!(!set.insert(typed));
    }

    #[test]
    fn test_severity_ordering_and_parsing() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Error > Severity::Warn);
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warn);
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn test_actual_type_names() {
        assert_eq!(ParameterType::name_of(&json!(21)), "int");
        assert_eq!(ParameterType::name_of(&json!(2.5)), "float");
        assert_eq!(ParameterType::name_of(&json!("21")), "str");
        assert_eq!(ParameterType::name_of(&json!({"a": 1})), "dict");
        assert_eq!(ParameterType::name_of(&json!(null)), "null");
    }

    #[test]
    fn test_params_macro() {
        let parameters = params! { "undo_counter" => 2usize, "label" => "x" };
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters["undo_counter"], json!(2));
        assert!(params!().is_empty());
    }

    #[test]
    fn test_batch_kind_flags() {
        assert!(BatchKind::Undo.is_undo());
        assert!(!BatchKind::Redo.is_undo());
        assert!(BatchKind::Redo.is_replay());
        assert!(!BatchKind::Action.is_replay());
    }
}
