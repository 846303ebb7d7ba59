//! Configuration management for the node bus demo.
//!
//! The TOML file holds the bus configuration, logging settings and the
//! declarative event schemas registered at startup.

use crate::cli::CliArgs;
use anyhow::Context;
use node_bus::{BusConfig, NodeBus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Node bus settings, passed to `NodeBus::start`
    #[serde(default)]
    pub bus: BusConfig,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Event schemas keyed by event identifier, e.g.
    /// `[events.PAINT]` with `severity` and `parameters`
    #[serde(default)]
    pub events: BTreeMap<String, Value>,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut events = BTreeMap::new();
        events.insert(
            "PAINT".to_string(),
            json!({
                "severity": "info",
                "parameters": [["color", "str", "Color applied to the canvas."]],
            }),
        );
        events.insert(
            "RESIZE".to_string(),
            json!({
                "severity": "debug",
                "parameters": [["width", "int"], ["height", "int"]],
            }),
        );

        Self {
            bus: BusConfig::default(),
            logging: LoggingSettings::default(),
            events,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, a default configuration file is written to
    /// `path` and the default configuration is returned.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, toml_content)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file values.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(max_undo) = args.max_undo {
            self.bus.maximum_undo_events = max_undo;
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        self.bus.validate().map_err(|error| error.to_string())?;

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LOG_LEVELS:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }

    /// Registers every configured event schema. Returns how many were
    /// registered.
    pub fn register_events(&self, bus: &NodeBus) -> node_bus::Result<usize> {
        for (event_id, definition) in &self.events {
            bus.register_event_from_value(event_id, definition)?;
        }
        Ok(self.events.len())
    }
}
