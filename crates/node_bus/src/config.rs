//! Bus configuration.
//!
//! Set once by [`NodeBus::start`](crate::NodeBus::start) and read-only
//! afterwards. Until then [`BusConfig::default`] is in effect.

use crate::error::{BusError, Result};
use crate::types::Severity;
use serde::{Deserialize, Serialize};

/// Smallest accepted width of the sender and receiver columns in event log
/// lines.
pub const MINIMUM_ID_LOGGING_LENGTH: usize = 10;

/// Runtime configuration of a [`NodeBus`](crate::NodeBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Events below this severity are not written to the event sink.
    pub log_level: Severity,
    /// Append `| name: 'value'` for each parameter to event log lines.
    pub log_event_parameters: bool,
    /// Show `(declared type / actual type)` next to each logged parameter.
    pub log_parameter_type_info: bool,
    /// Width of the sender and receiver columns.
    pub id_maximum_logging_length: usize,
    /// Logged parameter values longer than this are cut and end in `...`.
    pub event_parameter_maximum_logging_length: Option<usize>,
    /// Cut node identifiers to the column width instead of letting them
    /// overflow it.
    pub truncate_identifiers: bool,
    /// Capacity of each history stack in batches. Negative means unbounded.
    pub maximum_undo_events: i64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            log_level: Severity::Info,
            log_event_parameters: true,
            log_parameter_type_info: false,
            id_maximum_logging_length: 40,
            event_parameter_maximum_logging_length: None,
            truncate_identifiers: false,
            maximum_undo_events: 1000,
        }
    }
}

impl BusConfig {
    pub fn validate(&self) -> Result<()> {
        if self.id_maximum_logging_length < MINIMUM_ID_LOGGING_LENGTH {
            return Err(BusError::InvalidConfiguration(format!(
                "id_maximum_logging_length has to be at least {}, is {}",
                MINIMUM_ID_LOGGING_LENGTH, self.id_maximum_logging_length
            )));
        }
        if self.event_parameter_maximum_logging_length == Some(0) {
            return Err(BusError::InvalidConfiguration(
                "event_parameter_maximum_logging_length has to be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// History capacity, `None` when unbounded.
    pub fn history_capacity(&self) -> Option<usize> {
        usize::try_from(self.maximum_undo_events).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BusConfig::default();
        assert_eq!(config.log_level, Severity::Info);
        assert!(config.log_event_parameters);
        assert!(!config.log_parameter_type_info);
        assert_eq!(config.id_maximum_logging_length, 40);
        assert_eq!(config.maximum_undo_events, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_column_width_lower_bound() {
        let mut config = BusConfig {
            id_maximum_logging_length: 9,
            ..BusConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BusError::InvalidConfiguration(_))
        ));

        config.id_maximum_logging_length = MINIMUM_ID_LOGGING_LENGTH;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_history_capacity() {
        let mut config = BusConfig::default();
        assert_eq!(config.history_capacity(), Some(1000));
        config.maximum_undo_events = -1;
        assert_eq!(config.history_capacity(), None);
        config.maximum_undo_events = 0;
        assert_eq!(config.history_capacity(), Some(0));
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let config: BusConfig =
            serde_json::from_str(r#"{"log_level": "warning", "maximum_undo_events": -1}"#)
                .unwrap();
        assert_eq!(config.log_level, Severity::Warn);
        assert_eq!(config.maximum_undo_events, -1);
        assert_eq!(config.id_maximum_logging_length, 40);
    }
}
