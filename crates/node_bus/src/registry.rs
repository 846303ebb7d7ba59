//! Node registry: the set of live node identifiers plus the handler table.
//!
//! The handler table doubles as the subscription table. A node is subscribed
//! to an event exactly when a handler entry exists for the pair.

use crate::error::{quoted_list, BusError, Result};
use crate::node::{HandlerFn, NodeBuilder};
use crate::schema::SchemaRegistry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A bound handler, cloned out of the registry before it is invoked so no
/// lock is held while it runs.
#[derive(Clone)]
pub(crate) struct RegisteredHandler {
    pub(crate) callable: Arc<HandlerFn>,
    pub(crate) wants_sender_id: bool,
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("wants_sender_id", &self.wants_sender_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub(crate) struct NodeRegistry {
    node_ids: BTreeSet<String>,
    /// event id -> node id -> handler
    handlers: HashMap<String, BTreeMap<String, RegisteredHandler>>,
}

impl NodeRegistry {
    /// Validates every binding of `node` and only then commits the node and
    /// all of its handlers.
    pub(crate) fn register(
        &mut self,
        schemas: &SchemaRegistry,
        node_id: &str,
        node: NodeBuilder,
    ) -> Result<()> {
        if self.node_ids.contains(node_id) {
            return Err(BusError::DuplicateNode {
                node: node_id.to_string(),
            });
        }

        let mut seen = BTreeSet::new();
        for binding in node.bindings() {
            let event_id = binding.event_id();
            if !seen.insert(event_id) {
                return Err(BusError::DuplicateHandler {
                    node: node_id.to_string(),
                    event: event_id.to_string(),
                });
            }

            let description = schemas.require(event_id)?;

            if binding.wants_sender_id() && !binding.declares_sender_id() {
                return Err(BusError::MissingSenderIdDeclaration {
                    node: node_id.to_string(),
                    event: event_id.to_string(),
                });
            }

            let expected = description.parameter_names();
            let provided: BTreeSet<&str> = binding.parameter_slots().collect();
            if expected != provided {
                return Err(BusError::HandlerParameterMismatch {
                    node: node_id.to_string(),
                    event: event_id.to_string(),
                    expected: quoted_list(expected),
                    provided: quoted_list(provided),
                });
            }
        }

        self.commit(node_id, node);
        info!("🧩 Registered node '{}'", node_id);
        Ok(())
    }

    /// Records a node without validating its bindings.
    pub(crate) fn commit(&mut self, node_id: &str, node: NodeBuilder) {
        self.node_ids.insert(node_id.to_string());
        for binding in node.into_bindings() {
            debug!(
                "📝 Registered handler for '{}' on node '{}'",
                binding.event_id(),
                node_id
            );
            let handler = RegisteredHandler {
                callable: Arc::clone(binding.handler()),
                wants_sender_id: binding.wants_sender_id(),
            };
            self.handlers
                .entry(binding.event_id().to_string())
                .or_default()
                .insert(node_id.to_string(), handler);
        }
    }

    /// Removes the node and every handler keyed by it.
    pub(crate) fn unregister(&mut self, node_id: &str) -> Result<()> {
        if !self.node_ids.remove(node_id) {
            return Err(BusError::UnknownNode {
                node: node_id.to_string(),
            });
        }
        self.handlers.retain(|_, subscribers| {
            subscribers.remove(node_id);
            !subscribers.is_empty()
        });
        info!("🗑️ Unregistered node '{}'", node_id);
        Ok(())
    }

    pub(crate) fn contains(&self, node_id: &str) -> bool {
        self.node_ids.contains(node_id)
    }

    pub(crate) fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.node_ids.iter().map(String::as_str)
    }

    pub(crate) fn is_subscribed(&self, event_id: &str, node_id: &str) -> bool {
        self.handlers
            .get(event_id)
            .is_some_and(|subscribers| subscribers.contains_key(node_id))
    }

    /// Snapshot of the subscribers of an event, sorted by identifier.
    pub(crate) fn subscribers(&self, event_id: &str) -> Vec<String> {
        self.handlers
            .get(event_id)
            .map(|subscribers| subscribers.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn handler(&self, event_id: &str, node_id: &str) -> Option<RegisteredHandler> {
        self.handlers.get(event_id)?.get(node_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Compensation;
    use crate::types::{EventParameter, Severity};

    fn schemas() -> SchemaRegistry {
        let schemas = SchemaRegistry::new();
        schemas
            .register(
                "PAINT",
                [EventParameter::new("color"), EventParameter::new("width")],
                Severity::Info,
            )
            .unwrap();
        schemas.register("CLEAR", [], Severity::Info).unwrap();
        schemas
    }

    fn noop(_: &crate::node::Delivery<'_>) -> Result<Compensation> {
        Ok(Compensation::none())
    }

    #[test]
    fn test_matching_parameter_sets() {
        let schemas = schemas();
        let mut registry = NodeRegistry::default();

        registry
            .register(
                &schemas,
                "CANVAS",
                NodeBuilder::new()
                    .on("PAINT", &["width", "color"], noop)
                    .on("CLEAR", &[], noop),
            )
            .unwrap();

        assert!(registry.contains("CANVAS"));
        assert!(registry.is_subscribed("PAINT", "CANVAS"));
        assert!(registry.is_subscribed("CLEAR", "CANVAS"));
    }

    #[test]
    fn test_mismatching_parameter_sets() {
        let schemas = schemas();
        let mut registry = NodeRegistry::default();

        for declared in [
            &["color"][..],
            &["color", "width", "height"][..],
            &["colour", "width"][..],
        ] {
            let error = registry
                .register(&schemas, "CANVAS", NodeBuilder::new().on("PAINT", declared, noop))
                .unwrap_err();
            assert!(matches!(error, BusError::HandlerParameterMismatch { .. }));
        }
        assert!(!registry.contains("CANVAS"));
    }

    #[test]
    fn test_failed_registration_commits_nothing() {
        let schemas = schemas();
        let mut registry = NodeRegistry::default();

        let error = registry
            .register(
                &schemas,
                "CANVAS",
                NodeBuilder::new()
                    .on("CLEAR", &[], noop)
                    .on("MISSING", &[], noop),
            )
            .unwrap_err();
        assert!(matches!(error, BusError::UnknownEvent { .. }));
        assert!(!registry.contains("CANVAS"));
        assert!(registry.subscribers("CLEAR").is_empty());
    }

    #[test]
    fn test_sender_id_declaration() {
        let schemas = schemas();
        let mut registry = NodeRegistry::default();

        let error = registry
            .register(
                &schemas,
                "CANVAS",
                NodeBuilder::new().on_with_sender("CLEAR", &[], noop),
            )
            .unwrap_err();
        assert!(matches!(error, BusError::MissingSenderIdDeclaration { .. }));

        registry
            .register(
                &schemas,
                "CANVAS",
                NodeBuilder::new().on_with_sender("CLEAR", &["self", "sender_id"], noop),
            )
            .unwrap();
        assert!(registry.handler("CLEAR", "CANVAS").unwrap().wants_sender_id);
    }

    #[test]
    fn test_duplicate_node_and_handler() {
        let schemas = schemas();
        let mut registry = NodeRegistry::default();

        let error = registry
            .register(
                &schemas,
                "CANVAS",
                NodeBuilder::new().on("CLEAR", &[], noop).on("CLEAR", &[], noop),
            )
            .unwrap_err();
        assert!(matches!(error, BusError::DuplicateHandler { .. }));

        registry
            .register(&schemas, "CANVAS", NodeBuilder::new())
            .unwrap();
        let error = registry
            .register(&schemas, "CANVAS", NodeBuilder::new())
            .unwrap_err();
        assert!(matches!(error, BusError::DuplicateNode { .. }));
    }

    #[test]
    fn test_unregister_leaves_other_nodes() {
        let schemas = schemas();
        let mut registry = NodeRegistry::default();
        for node in ["A", "B"] {
            registry
                .register(&schemas, node, NodeBuilder::new().on("CLEAR", &[], noop))
                .unwrap();
        }

        registry.unregister("A").unwrap();
        assert!(!registry.contains("A"));
        assert!(registry.handler("CLEAR", "A").is_none());
        assert_eq!(registry.subscribers("CLEAR"), ["B"]);

        let error = registry.unregister("A").unwrap_err();
        assert!(matches!(error, BusError::UnknownNode { .. }));
    }
}
