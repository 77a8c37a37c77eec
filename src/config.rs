//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.valprobe.toml` files.

use crate::cli::OutputFormat;
use crate::provider::TransportConfig;
use crate::tools::ToolDefaults;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".valprobe.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Query defaults.
    #[serde(default)]
    pub query: QueryConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Data provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Report endpoint URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// `source` tag sent with each request.
    #[serde(default = "default_source")]
    pub source: String,

    /// `client` tag sent with each request.
    #[serde(default = "default_client")]
    pub client: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            source: default_source(),
            client: default_client(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    TransportConfig::default().base_url
}

fn default_timeout() -> u64 {
    10
}

fn default_source() -> String {
    "HSF10".to_string()
}

fn default_client() -> String {
    "PC".to_string()
}

fn default_user_agent() -> String {
    TransportConfig::default().user_agent
}

/// Defaults for queries that omit the indicator or cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Indicator code (1 = P/E TTM).
    #[serde(default = "default_indicator")]
    pub default_indicator: i64,

    /// Statistics cycle code (3 = 5 years).
    #[serde(default = "default_cycle")]
    pub default_cycle: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_indicator: default_indicator(),
            default_cycle: default_cycle(),
        }
    }
}

fn default_indicator() -> i64 {
    1
}

fn default_cycle() -> i64 {
    3
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Decimal places for numeric cells.
    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
        }
    }
}

fn default_decimals() -> usize {
    4
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.valprobe.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base_url) = args.base_url {
            self.provider.base_url = base_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.provider.timeout_seconds = timeout;
        }

        if let Some(indicator) = args.indicator {
            self.query.default_indicator = indicator;
        }
        if let Some(period) = args.period {
            self.query.default_cycle = period;
        }

        if let Some(format) = args.format {
            self.general.format = format;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Transport settings for the provider client.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.provider.base_url.clone(),
            timeout_seconds: self.provider.timeout_seconds,
            source: self.provider.source.clone(),
            client: self.provider.client.clone(),
            user_agent: self.provider.user_agent.clone(),
        }
    }

    /// Defaults handed to the tool executor.
    pub fn tool_defaults(&self) -> ToolDefaults {
        ToolDefaults {
            indicator: self.query.default_indicator,
            cycle: self.query.default_cycle,
            decimals: self.report.decimals,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert_eq!(config.provider.timeout_seconds, 10);
        assert_eq!(config.provider.source, "HSF10");
        assert_eq!(config.query.default_indicator, 1);
        assert_eq!(config.query.default_cycle, 3);
        assert_eq!(config.report.decimals, 4);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
format = "json"

[provider]
base_url = "http://localhost:9000/get"
timeout_seconds = 3

[query]
default_cycle = 4
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.provider.base_url, "http://localhost:9000/get");
        assert_eq!(config.provider.timeout_seconds, 3);
        assert_eq!(config.provider.client, "PC");
        assert_eq!(config.query.default_indicator, 1);
        assert_eq!(config.query.default_cycle, 4);
        assert_eq!(config.report.decimals, 4);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[provider]"));
        assert!(toml_str.contains("[query]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.base_url, Config::default().provider.base_url);
        assert_eq!(parsed.query.default_cycle, 3);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join(CONFIG_FILE), "[report]\ndecimals = 2\n").unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.report.decimals, 2);

        std::fs::write(dir.path().join(CONFIG_FILE), "[report\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        config.query.default_cycle = 4;

        let args = Args::try_parse_from([
            "valprobe",
            "-s",
            "300059.SZ",
            "-i",
            "2",
            "--timeout",
            "30",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.query.default_indicator, 2);
        assert_eq!(config.query.default_cycle, 4);
        assert_eq!(config.provider.timeout_seconds, 30);
        assert_eq!(config.general.format, OutputFormat::Json);
        assert!(config.general.verbose);

        let transport = config.transport_config();
        assert_eq!(transport.timeout_seconds, 30);
        assert_eq!(transport.source, "HSF10");

        let defaults = config.tool_defaults();
        assert_eq!((defaults.indicator, defaults.cycle, defaults.decimals), (2, 4, 4));
    }
}
