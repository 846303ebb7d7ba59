/// Event and node registration methods
use super::core::NodeBus;
use crate::error::{BusError, Result};
use crate::node::NodeBuilder;
use crate::types::{EventParameter, Severity, CORE_NODE_ID};
use serde_json::Value;

impl NodeBus {
    /// Registers an event schema. Identifiers are permanent, registering the
    /// same identifier twice fails with
    /// [`BusError::DuplicateEvent`](crate::BusError::DuplicateEvent).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use node_bus::{EventParameter, NodeBus, ParameterType, Severity};
    ///
    /// let bus = NodeBus::new();
    /// bus.register_event(
    ///     "RESIZE",
    ///     [
    ///         EventParameter::new("width").with_type(ParameterType::Int),
    ///         EventParameter::new("height").with_type(ParameterType::Int),
    ///     ],
    ///     Severity::Debug,
    /// )?;
    /// assert!(bus.is_event_registered("RESIZE"));
    /// # Ok::<(), node_bus::BusError>(())
    /// ```
    pub fn register_event(
        &self,
        event_id: &str,
        parameters: impl IntoIterator<Item = EventParameter>,
        severity: Severity,
    ) -> Result<()> {
        self.schemas.register(event_id, parameters, severity)?;
        Ok(())
    }

    /// Registers an event from a declarative definition, as loaded from a
    /// configuration file. See
    /// [`SchemaRegistry::register_from_value`](crate::SchemaRegistry::register_from_value)
    /// for the accepted shapes.
    pub fn register_event_from_value(&self, event_id: &str, definition: &Value) -> Result<()> {
        self.schemas.register_from_value(event_id, definition)?;
        Ok(())
    }

    /// Registers a node and all of its handlers. Every binding is validated
    /// before anything is committed.
    pub fn register_node(&self, node_id: &str, node: NodeBuilder) -> Result<()> {
        self.nodes.write().register(&self.schemas, node_id, node)
    }

    /// Removes a node and every handler it owns. The core node
    /// [`CORE_NODE_ID`] cannot be removed.
    pub fn unregister_node(&self, node_id: &str) -> Result<()> {
        if node_id == CORE_NODE_ID {
            return Err(BusError::ReservedNode {
                node: node_id.to_string(),
            });
        }
        self.nodes.write().unregister(node_id)
    }
}
