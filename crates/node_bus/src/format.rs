//! Rendering of dispatched events as one log line each.
//!
//! ```text
//!       USER ---- PAINT ----> CANVAS     | color: 'red'
//! ```
//!
//! The sender is right-aligned and the receiver left-aligned in columns of
//! `id_maximum_logging_length` chars. The event identifier is centered in a
//! dash arrow sized for the longest registered identifier.

use crate::config::BusConfig;
use crate::types::{Event, ParameterType};
use serde_json::Value;
use std::fmt::Write;

/// Formats one event line. `event_column` is the char length of the longest
/// registered event identifier. Trailing whitespace is removed.
pub fn event_line(event: &Event, config: &BusConfig, event_column: usize) -> String {
    let width = config.id_maximum_logging_length;
    let sender = column_id(event.sender_id(), width, config.truncate_identifiers);
    let receiver = column_id(event.receiver_id(), width, config.truncate_identifiers);

    let remaining = event_column.saturating_sub(event.id().chars().count());
    let mut line = format!(
        "{sender:>width$} --{} {} {}-> {receiver:<width$}",
        "-".repeat(remaining / 2),
        event.id(),
        "-".repeat(remaining - remaining / 2),
    );

    if config.log_event_parameters {
        for parameter in event.description().parameters() {
            let Some(value) = event.parameters().get(parameter.name()) else {
                continue;
            };
            line.push_str(" | ");
            line.push_str(parameter.name());
            if config.log_parameter_type_info {
                if let Some(declared) = parameter.parameter_type() {
                    let _ = write!(
                        line,
                        " ({} / {})",
                        declared.name(),
                        ParameterType::name_of(value)
                    );
                }
            }
            let _ = write!(
                line,
                ": '{}'",
                logged_value(value, config.event_parameter_maximum_logging_length)
            );
        }
    }

    line.truncate(line.trim_end().len());
    line
}

fn column_id(id: &str, width: usize, truncate: bool) -> &str {
    if !truncate {
        return id;
    }
    match id.char_indices().nth(width) {
        Some((cut, _)) => &id[..cut],
        None => id,
    }
}

fn logged_value(value: &Value, limit: Option<usize>) -> String {
    let rendered = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    match limit {
        Some(limit) => match rendered.char_indices().nth(limit) {
            Some((cut, _)) => format!("{}...", &rendered[..cut]),
            None => rendered,
        },
        None => rendered,
    }
}
