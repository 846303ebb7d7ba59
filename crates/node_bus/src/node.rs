//! # Node Declarations
//!
//! A node is declared as an explicit table of handler bindings built with
//! [`NodeBuilder`] and handed to [`NodeBus::register_node`]. Each binding
//! names the event it handles, the parameter slots the handler consumes and
//! whether the sender identifier should be injected.
//!
//! Handlers receive a [`Delivery`] and return a [`Compensation`]: a lazily
//! drained sequence of [`UndoAction`]s that, replayed later, revert what the
//! handler just did.
//!
//! ```rust
//! use node_bus::{params, Compensation, NodeBuilder, UndoAction};
//!
//! let canvas = NodeBuilder::new().on("PAINT", &["color"], |delivery| {
//!     let color: String = delivery.parameter("color")?;
//!     Ok(Compensation::one(UndoAction::new(
//!         "PAINT",
//!         params! { "color" => format!("not {color}") },
//!     )))
//! });
//! assert_eq!(canvas.bindings().len(), 1);
//! ```

use crate::error::{BusError, Result};
use crate::system::NodeBus;
use crate::types::{Event, Parameters, ParameterType, SENDER_ID_PARAMETER};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Signature of every event handler.
pub type HandlerFn = dyn Fn(&Delivery<'_>) -> Result<Compensation> + Send + Sync;

/// Slot name stripped from declared handler slots, kept for handlers that
/// mirror method signatures.
pub const SELF_SLOT: &str = "self";

// ============================================================================
// Bindings
// ============================================================================

/// One `event -> handler` entry of a node declaration.
#[derive(Clone)]
pub struct HandlerBinding {
    event_id: String,
    declared: Vec<String>,
    wants_sender_id: bool,
    handler: Arc<HandlerFn>,
}

impl HandlerBinding {
    pub fn new<F>(event_id: &str, declared: &[&str], wants_sender_id: bool, handler: F) -> Self
    where
        F: Fn(&Delivery<'_>) -> Result<Compensation> + Send + Sync + 'static,
    {
        Self {
            event_id: event_id.to_string(),
            declared: declared.iter().map(|slot| slot.to_string()).collect(),
            wants_sender_id,
            handler: Arc::new(handler),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Slot names as declared, including any `self` / `sender_id` slots.
    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    /// Declared slots that must match the event's parameter names.
    pub fn parameter_slots(&self) -> impl Iterator<Item = &str> {
        self.declared
            .iter()
            .map(String::as_str)
            .filter(|slot| *slot != SELF_SLOT && *slot != SENDER_ID_PARAMETER)
    }

    pub fn declares_sender_id(&self) -> bool {
        self.declared.iter().any(|slot| slot == SENDER_ID_PARAMETER)
    }

    pub fn wants_sender_id(&self) -> bool {
        self.wants_sender_id
    }

    pub(crate) fn handler(&self) -> &Arc<HandlerFn> {
        &self.handler
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("event_id", &self.event_id)
            .field("declared", &self.declared)
            .field("wants_sender_id", &self.wants_sender_id)
            .finish_non_exhaustive()
    }
}

/// Builder for the handler table of one node.
#[derive(Debug, Clone, Default)]
pub struct NodeBuilder {
    bindings: Vec<HandlerBinding>,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles `event_id` with a handler consuming the `declared` parameter
    /// slots.
    pub fn on<F>(self, event_id: &str, declared: &[&str], handler: F) -> Self
    where
        F: Fn(&Delivery<'_>) -> Result<Compensation> + Send + Sync + 'static,
    {
        self.binding(HandlerBinding::new(event_id, declared, false, handler))
    }

    /// Like [`on`](Self::on), and additionally injects the sender identifier.
    /// `declared` has to contain a `"sender_id"` slot.
    pub fn on_with_sender<F>(self, event_id: &str, declared: &[&str], handler: F) -> Self
    where
        F: Fn(&Delivery<'_>) -> Result<Compensation> + Send + Sync + 'static,
    {
        self.binding(HandlerBinding::new(event_id, declared, true, handler))
    }

    pub fn binding(mut self, binding: HandlerBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn bindings(&self) -> &[HandlerBinding] {
        &self.bindings
    }

    pub(crate) fn into_bindings(self) -> Vec<HandlerBinding> {
        self.bindings
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// What a handler sees of the event it is handling.
pub struct Delivery<'a> {
    bus: &'a NodeBus,
    event: &'a Event,
    include_sender: bool,
}

impl<'a> Delivery<'a> {
    pub(crate) fn new(bus: &'a NodeBus, event: &'a Event, include_sender: bool) -> Self {
        Self {
            bus,
            event,
            include_sender,
        }
    }

    /// The bus, for handlers that dispatch further events.
    pub fn bus(&self) -> &'a NodeBus {
        self.bus
    }

    pub fn event_id(&self) -> &str {
        self.event.id()
    }

    pub fn receiver_id(&self) -> &str {
        self.event.receiver_id()
    }

    /// The sender identifier, if the handler was bound with
    /// [`NodeBuilder::on_with_sender`].
    pub fn sender_id(&self) -> Option<&str> {
        self.include_sender.then(|| self.event.sender_id())
    }

    pub fn parameters(&self) -> &Parameters {
        self.event.parameters()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.event.parameters().get(name)
    }

    /// Deserializes one parameter value.
    pub fn parameter<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.get(name).ok_or_else(|| {
            BusError::handler(format!(
                "event '{}' carries no parameter '{}'",
                self.event_id(),
                name
            ))
        })?;
        serde_json::from_value(value.clone()).map_err(|error| {
            BusError::handler(format!(
                "parameter '{}' of event '{}' is a {}: {}",
                name,
                self.event_id(),
                ParameterType::name_of(value),
                error
            ))
        })
    }
}

// ============================================================================
// Compensations
// ============================================================================

/// One compensating event a node addresses to itself.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoAction {
    event_id: String,
    parameters: Parameters,
}

impl UndoAction {
    pub fn new(event_id: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            event_id: event_id.into(),
            parameters,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub(crate) fn into_parts(self) -> (String, Parameters) {
        (self.event_id, self.parameters)
    }
}

/// Accepts exactly `[event_id, {parameters}]`.
impl TryFrom<Value> for UndoAction {
    type Error = BusError;

    fn try_from(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(BusError::MalformedUndoEvent {
                    detail: format!("found a {}", ParameterType::name_of(&other)),
                })
            }
        };
        let [event_id, parameters]: [Value; 2] = items.try_into().map_err(|items: Vec<Value>| {
            BusError::MalformedUndoEvent {
                detail: format!("found a list of {} element(s)", items.len()),
            }
        })?;
        let event_id = match event_id {
            Value::String(event_id) => event_id,
            other => {
                return Err(BusError::MalformedUndoEvent {
                    detail: format!(
                        "the event identifier is a {}",
                        ParameterType::name_of(&other)
                    ),
                })
            }
        };
        match parameters {
            Value::Object(map) => Ok(Self::new(event_id, map.into_iter().collect())),
            other => Err(BusError::InvalidUndoParameterContainer {
                found: ParameterType::name_of(&other).to_string(),
            }),
        }
    }
}

/// The compensations returned by a handler.
///
/// The sequence is drained exactly once, after the handler returns. Errors
/// yielded while draining abort the batch.
#[derive(Default)]
pub struct Compensation {
    actions: Option<Box<dyn Iterator<Item = Result<UndoAction>>>>,
}

impl Compensation {
    /// Nothing to undo.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn one(action: UndoAction) -> Self {
        Self::of([action])
    }

    pub fn of<I>(actions: I) -> Self
    where
        I: IntoIterator<Item = UndoAction>,
        I::IntoIter: 'static,
    {
        Self::lazy(actions.into_iter().map(Ok))
    }

    /// Compensations computed on demand while the batch harvests them.
    pub fn lazy<I>(actions: I) -> Self
    where
        I: IntoIterator<Item = Result<UndoAction>>,
        I::IntoIter: 'static,
    {
        Self {
            actions: Some(Box::new(actions.into_iter())),
        }
    }

    /// Compensations in their loose `[event_id, {parameters}]` form.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self::lazy(values.into_iter().map(UndoAction::try_from))
    }

    pub fn is_none(&self) -> bool {
        self.actions.is_none()
    }
}

impl Iterator for Compensation {
    type Item = Result<UndoAction>;

    fn next(&mut self) -> Option<Self::Item> {
        self.actions.as_mut()?.next()
    }
}

impl fmt::Debug for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compensation")
            .field("present", &self.actions.is_some())
            .finish()
    }
}
