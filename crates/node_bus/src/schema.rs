//! # Schema Registry
//!
//! Holds the immutable [`EventDescription`] of every registered event. The
//! table is insert-only: descriptions live for as long as the bus does.

use crate::error::{BusError, Result};
use crate::types::{
    EventDescription, EventParameter, ParameterType, Severity, SENDER_ID_PARAMETER,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Registry of event schemas, keyed by event identifier.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    descriptions: DashMap<String, Arc<EventDescription>>,
    /// Length (in chars) of the longest registered identifier, used to
    /// center identifiers in event log lines.
    longest_id: AtomicUsize,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed event schema.
    pub fn register(
        &self,
        event_id: &str,
        parameters: impl IntoIterator<Item = EventParameter>,
        severity: Severity,
    ) -> Result<Arc<EventDescription>> {
        self.ensure_unregistered(event_id)?;

        let mut checked = BTreeSet::new();
        for (index, parameter) in parameters.into_iter().enumerate() {
            if parameter.name().is_empty() {
                return Err(BusError::InvalidParameterName {
                    event: event_id.to_string(),
                    index,
                });
            }
            Self::accept_parameter(event_id, &mut checked, parameter)?;
        }

        self.insert(event_id, EventDescription::new(checked, severity))
    }

    /// Registers an event from a loosely-typed definition such as
    /// `{"severity": "warn", "parameters": ["color", ["width", "int"]]}`.
    ///
    /// Each parameter may be a bare name, a one to three element array
    /// `[name, type, description]` (a two element array holds either a type
    /// or a description) or an object with `name`, `type` and `description`
    /// keys. Both top-level keys are optional.
    pub fn register_from_value(
        &self,
        event_id: &str,
        definition: &Value,
    ) -> Result<Arc<EventDescription>> {
        self.ensure_unregistered(event_id)?;

        let severity = match definition.get("severity") {
            None | Some(Value::Null) => Severity::default(),
            Some(Value::String(level)) => {
                level
                    .parse::<Severity>()
                    .map_err(|_| BusError::InvalidSeverity {
                        event: event_id.to_string(),
                        value: format!("'{level}'"),
                    })?
            }
            Some(other) => {
                return Err(BusError::InvalidSeverity {
                    event: event_id.to_string(),
                    value: other.to_string(),
                })
            }
        };

        let raw_parameters = match definition.get("parameters") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) => {
                return Err(BusError::InvalidParameterShape {
                    event: event_id.to_string(),
                    detail: format!(
                        "the parameters have to be a list, found {}",
                        ParameterType::name_of(other)
                    ),
                })
            }
        };

        let mut checked = BTreeSet::new();
        for (index, raw) in raw_parameters.iter().enumerate() {
            let parameter = parse_parameter(event_id, index, raw)?;
            Self::accept_parameter(event_id, &mut checked, parameter)?;
        }

        self.insert(event_id, EventDescription::new(checked, severity))
    }

    /// Installs one of the bus's own events, bypassing validation.
    pub(crate) fn insert_reserved(
        &self,
        event_id: &str,
        parameters: impl IntoIterator<Item = EventParameter>,
    ) {
        let description = EventDescription::new(parameters.into_iter().collect(), Severity::Info);
        self.descriptions
            .insert(event_id.to_string(), Arc::new(description));
        self.longest_id
            .fetch_max(event_id.chars().count(), Ordering::Relaxed);
    }

    pub fn get(&self, event_id: &str) -> Option<Arc<EventDescription>> {
        self.descriptions
            .get(event_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Looks up a description, failing with [`BusError::UnknownEvent`].
    pub fn require(&self, event_id: &str) -> Result<Arc<EventDescription>> {
        self.get(event_id).ok_or_else(|| BusError::UnknownEvent {
            event: event_id.to_string(),
        })
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.descriptions.contains_key(event_id)
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    pub fn longest_id(&self) -> usize {
        self.longest_id.load(Ordering::Relaxed)
    }

    fn ensure_unregistered(&self, event_id: &str) -> Result<()> {
        if self.contains(event_id) {
            return Err(BusError::DuplicateEvent {
                event: event_id.to_string(),
            });
        }
        Ok(())
    }

    fn accept_parameter(
        event_id: &str,
        checked: &mut BTreeSet<EventParameter>,
        parameter: EventParameter,
    ) -> Result<()> {
        if checked.contains(&parameter) {
            return Err(BusError::DuplicateParameter {
                event: event_id.to_string(),
                parameter: parameter.name().to_string(),
            });
        }
        if parameter.name() == SENDER_ID_PARAMETER {
            return Err(BusError::ReservedParameterName {
                event: event_id.to_string(),
                parameter: parameter.name().to_string(),
            });
        }
        checked.insert(parameter);
        Ok(())
    }

    /// Commits a validated description. A concurrent registration of the
    /// same identifier loses with [`BusError::DuplicateEvent`].
    fn insert(
        &self,
        event_id: &str,
        description: EventDescription,
    ) -> Result<Arc<EventDescription>> {
        let description = Arc::new(description);
        match self.descriptions.entry(event_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(BusError::DuplicateEvent {
                    event: event_id.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&description));
            }
        }
        self.longest_id
            .fetch_max(event_id.chars().count(), Ordering::Relaxed);

        debug!(
            "📋 Registered event '{}' with {} parameter(s) at {}",
            event_id,
            description.parameters().len(),
            description.severity()
        );
        Ok(description)
    }
}

// ============================================================================
// Declarative parameter parsing
// ============================================================================

fn parse_parameter(event_id: &str, index: usize, raw: &Value) -> Result<EventParameter> {
    match raw {
        Value::String(_) => parse_name(event_id, index, raw).map(EventParameter::new),
        Value::Array(items) => match items.as_slice() {
            [name] => parse_name(event_id, index, name).map(EventParameter::new),
            [name, Value::String(second)] => {
                let parameter = EventParameter::new(parse_name(event_id, index, name)?);
                Ok(match second.parse::<ParameterType>() {
                    Ok(parameter_type) => parameter.with_type(parameter_type),
                    Err(_) => parameter.with_description(second.as_str()),
                })
            }
            [name, parameter_type] => {
                let parameter = EventParameter::new(parse_name(event_id, index, name)?);
                with_type(event_id, index, parameter, parameter_type)
            }
            [name, parameter_type, description] => {
                let parameter = EventParameter::new(parse_name(event_id, index, name)?);
                let parameter = with_type(event_id, index, parameter, parameter_type)?;
                with_description(event_id, index, parameter, description)
            }
            _ => Err(BusError::InvalidParameterShape {
                event: event_id.to_string(),
                detail: format!(
                    "parameter {index} has {} elements, has to have between one and three",
                    items.len()
                ),
            }),
        },
        Value::Object(fields) => {
            let name = match fields.get("name") {
                Some(name) => parse_name(event_id, index, name)?,
                None => {
                    return Err(BusError::InvalidParameterName {
                        event: event_id.to_string(),
                        index,
                    })
                }
            };
            let mut parameter = EventParameter::new(name);
            if let Some(parameter_type) = fields.get("type") {
                parameter = with_type(event_id, index, parameter, parameter_type)?;
            }
            if let Some(description) = fields.get("description") {
                parameter = with_description(event_id, index, parameter, description)?;
            }
            Ok(parameter)
        }
        other => Err(BusError::InvalidParameterShape {
            event: event_id.to_string(),
            detail: format!(
                "parameter {index} is a {}, has to be a name, a list or a table",
                ParameterType::name_of(other)
            ),
        }),
    }
}

fn parse_name(event_id: &str, index: usize, raw: &Value) -> Result<String> {
    match raw {
        Value::String(name) if !name.is_empty() => Ok(name.clone()),
        _ => Err(BusError::InvalidParameterName {
            event: event_id.to_string(),
            index,
        }),
    }
}

fn with_type(
    event_id: &str,
    index: usize,
    parameter: EventParameter,
    raw: &Value,
) -> Result<EventParameter> {
    match raw {
        Value::Null => Ok(parameter),
        Value::String(tag) => tag
            .parse::<ParameterType>()
            .map(|parameter_type| parameter.with_type(parameter_type))
            .map_err(|_| BusError::InvalidParameterType {
                event: event_id.to_string(),
                index,
                value: format!("'{tag}'"),
            }),
        other => Err(BusError::InvalidParameterType {
            event: event_id.to_string(),
            index,
            value: other.to_string(),
        }),
    }
}

fn with_description(
    event_id: &str,
    index: usize,
    parameter: EventParameter,
    raw: &Value,
) -> Result<EventParameter> {
    match raw {
        Value::String(description) => Ok(parameter.with_description(description.as_str())),
        _ => Err(BusError::InvalidParameterDescription {
            event: event_id.to_string(),
            index,
        }),
    }
}
