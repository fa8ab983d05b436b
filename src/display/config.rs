//! Display configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::DEFAULT_MAX_OUTPUT_LINES;

/// Shortest accepted redraw or poll interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Rendering density for one display session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Only the phase in progress, then a one-line completion summary
    #[default]
    Minimal,
    /// Closed phases condensed to one line each, current phase expanded
    Default,
    /// Every phase expanded
    Verbose,
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::Default => write!(f, "default"),
            Self::Verbose => write!(f, "verbose"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "default" => Ok(Self::Default),
            "verbose" => Ok(Self::Verbose),
            other => Err(Error::config(format!("unknown display mode: {other}"))),
        }
    }
}

/// Stream the display draws on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTarget {
    #[default]
    Stdout,
    Stderr,
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

impl FromStr for OutputTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            other => Err(Error::config(format!("unknown output target: {other}"))),
        }
    }
}

/// Configuration for a [`LiveDisplay`](super::LiveDisplay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Rendering density
    pub mode: DisplayMode,
    /// Leave the final frame on screen at stop (otherwise erase it)
    pub persist: bool,
    /// Show model-request lines in expanded phases (verbose mode when unset)
    pub show_model_nodes: Option<bool>,
    /// Redraw period
    pub refresh_interval: Duration,
    /// Longest wait for the next event before re-checking for shutdown
    pub poll_interval: Duration,
    /// Subprocess output lines kept per node
    pub max_output_lines: usize,
    /// Output stream
    pub target: OutputTarget,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Minimal,
            persist: true,
            show_model_nodes: None,
            refresh_interval: Duration::from_millis(100),
            poll_interval: Duration::from_millis(100),
            max_output_lines: DEFAULT_MAX_OUTPUT_LINES,
            target: OutputTarget::Stdout,
        }
    }
}

impl DisplayConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `LIVETREE_MODE`, `LIVETREE_TRANSIENT`, `LIVETREE_REFRESH_MS` and
    /// `LIVETREE_TARGET`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(mode) = lookup("LIVETREE_MODE") {
            config.mode = mode.parse()?;
        }
        if let Some(transient) = lookup("LIVETREE_TRANSIENT") {
            config.persist = !parse_flag(&transient).ok_or_else(|| {
                Error::config(format!("invalid LIVETREE_TRANSIENT: {transient}"))
            })?;
        }
        if let Some(refresh) = lookup("LIVETREE_REFRESH_MS") {
            let millis: u64 = refresh
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("invalid LIVETREE_REFRESH_MS: {refresh}")))?;
            if millis == 0 {
                return Err(Error::config("LIVETREE_REFRESH_MS must be positive"));
            }
            config.refresh_interval = Duration::from_millis(millis);
        }
        if let Some(target) = lookup("LIVETREE_TARGET") {
            config.target = target.parse()?;
        }
        Ok(config)
    }

    /// Set display mode.
    pub fn mode(mut self, mode: DisplayMode) -> Self {
        self.mode = mode;
        self
    }

    /// Keep the final frame on screen at stop.
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Erase everything drawn at stop.
    pub fn transient(self) -> Self {
        self.persist(false)
    }

    /// Force model-request lines on or off.
    pub fn show_model_nodes(mut self, show: bool) -> Self {
        self.show_model_nodes = Some(show);
        self
    }

    /// Set redraw period.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Set event poll wait.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Set subprocess output bound.
    pub fn max_output_lines(mut self, max: usize) -> Self {
        self.max_output_lines = max;
        self
    }

    /// Set output stream.
    pub fn target(mut self, target: OutputTarget) -> Self {
        self.target = target;
        self
    }

    /// Whether expanded phases include the model-request line.
    pub fn shows_model_nodes(&self) -> bool {
        self.show_model_nodes
            .unwrap_or(self.mode == DisplayMode::Verbose)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = DisplayConfig::default();
        assert_eq!(config.mode, DisplayMode::Minimal);
        assert!(config.persist);
        assert_eq!(config.refresh_interval, Duration::from_millis(100));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.max_output_lines, 200);
        assert_eq!(config.target, OutputTarget::Stdout);
        assert!(!config.shows_model_nodes());
    }

    #[test]
    fn test_config_builder() {
        let config = DisplayConfig::new()
            .mode(DisplayMode::Verbose)
            .transient()
            .refresh_interval(Duration::ZERO)
            .max_output_lines(10)
            .target(OutputTarget::Stderr);

        assert_eq!(config.mode, DisplayMode::Verbose);
        assert!(!config.persist);
        assert_eq!(config.refresh_interval, MIN_INTERVAL);
        assert_eq!(config.max_output_lines, 10);
        assert!(config.shows_model_nodes());
        assert!(!config.show_model_nodes(false).shows_model_nodes());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("VERBOSE".parse::<DisplayMode>().unwrap(), DisplayMode::Verbose);
        assert_eq!(" default ".parse::<DisplayMode>().unwrap(), DisplayMode::Default);
        assert!(matches!(
            "loud".parse::<DisplayMode>(),
            Err(Error::Config(_))
        ));
        assert_eq!(DisplayMode::Minimal.to_string(), "minimal");
        assert_eq!(
            serde_json::to_string(&DisplayMode::Verbose).unwrap(),
            "\"verbose\""
        );
    }

    #[test]
    fn test_from_env_values() {
        let config = DisplayConfig::from_lookup(lookup(&[
            ("LIVETREE_MODE", "verbose"),
            ("LIVETREE_TRANSIENT", "1"),
            ("LIVETREE_REFRESH_MS", "250"),
            ("LIVETREE_TARGET", "stderr"),
        ]))
        .unwrap();

        assert_eq!(config.mode, DisplayMode::Verbose);
        assert!(!config.persist);
        assert_eq!(config.refresh_interval, Duration::from_millis(250));
        assert_eq!(config.target, OutputTarget::Stderr);
    }

    #[test]
    fn test_from_env_unset_keeps_defaults() {
        let config = DisplayConfig::from_lookup(lookup(&[("LIVETREE_TRANSIENT", "false")])).unwrap();
        assert_eq!(config.mode, DisplayMode::Minimal);
        assert!(config.persist);
    }

    #[test]
    fn test_from_env_rejects_invalid_values() {
        assert!(DisplayConfig::from_lookup(lookup(&[("LIVETREE_REFRESH_MS", "0")])).is_err());
        assert!(DisplayConfig::from_lookup(lookup(&[("LIVETREE_REFRESH_MS", "soon")])).is_err());
        assert!(DisplayConfig::from_lookup(lookup(&[("LIVETREE_TARGET", "printer")])).is_err());
        assert!(matches!(
            DisplayConfig::from_lookup(lookup(&[("LIVETREE_TRANSIENT", "maybe")])),
            Err(Error::Config(_))
        ));
        assert!(DisplayConfig::from_lookup(lookup(&[("LIVETREE_TRANSIENT", "")])).is_err());
    }

    #[test]
    fn test_from_env_transient_flags() {
        for (value, persist) in [("yes", false), ("ON", false), ("no", true), ("off", true)] {
            let config =
                DisplayConfig::from_lookup(lookup(&[("LIVETREE_TRANSIENT", value)])).unwrap();
            assert_eq!(config.persist, persist, "LIVETREE_TRANSIENT={value}");
        }
    }
}
