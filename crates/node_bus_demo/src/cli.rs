//! Command-line interface handling for the node bus demo.
//!
//! Arguments are parsed with `clap` and override values from the
//! configuration file.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

/// Default configuration file, created on first run.
pub const DEFAULT_CONFIG_PATH: &str = "node_bus.toml";

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the undo history capacity
    pub max_undo: Option<i64>,
}

impl CliArgs {
    /// Parses the process arguments.
    pub fn parse() -> Self {
        Self::from_matches(Self::command().get_matches())
    }

    fn command() -> Command {
        Command::new("Node Bus Demo")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Drives a node bus from a worker thread with undo and redo")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value(DEFAULT_CONFIG_PATH),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("max-undo")
                    .short('u')
                    .long("max-undo")
                    .value_name("COUNT")
                    .help("Undo history capacity, negative for unbounded")
                    .allow_negative_numbers(true)
                    .value_parser(clap::value_parser!(i64)),
            )
    }

    fn from_matches(matches: clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            max_undo: matches.get_one::<i64>("max-undo").copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::from_matches(CliArgs::command().get_matches_from(args))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["node_bus_demo"]);
        assert_eq!(args.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(args.log_level, None);
        assert!(!args.json_logs);
        assert_eq!(args.max_undo, None);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "node_bus_demo",
            "--config",
            "custom.toml",
            "-l",
            "debug",
            "--json-logs",
            "--max-undo",
            "-1",
        ]);
        assert_eq!(args.config_path, PathBuf::from("custom.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.max_undo, Some(-1));
    }
}
