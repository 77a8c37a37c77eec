//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// valprobe - valuation snapshot for listed securities
///
/// Fetch the latest value of a valuation ratio together with its
/// 30th/50th/70th historical percentiles, rendered as markdown or JSON.
///
/// Examples:
///   valprobe --security 300059.SZ
///   valprobe -s 600519.SH --indicator 2 --period 4 --format json
///   valprobe --list-tools
///   valprobe --tool-call '{"function":{"name":"get_valuation_analysis","arguments":{"security_code":"300059.SZ"}}}'
///   valprobe --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Security code including the exchange suffix (e.g. 300059.SZ)
    #[arg(
        short,
        long,
        value_name = "CODE",
        required_unless_present_any = ["init_config", "list_tools", "tool_call"]
    )]
    pub security: Option<String>,

    /// Valuation indicator: 1 = P/E (TTM), 2 = P/B (MRQ), 3 = P/S (TTM), 4 = P/CF (TTM)
    ///
    /// Defaults to the config file's default_indicator (1).
    #[arg(short, long, value_name = "CODE")]
    pub indicator: Option<i64>,

    /// Percentile lookback: 1 = 1 year, 2 = 3 years, 3 = 5 years, 4 = 10 years
    ///
    /// Defaults to the config file's default_cycle (3).
    #[arg(short, long, value_name = "CODE")]
    pub period: Option<i64>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Provider endpoint URL
    #[arg(long, value_name = "URL", env = "VALPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .valprobe.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the function-calling tool definitions as JSON and exit
    #[arg(long)]
    pub list_tools: bool,

    /// Execute one tool call given as JSON and print its output
    #[arg(long, value_name = "JSON", conflicts_with = "list_tools")]
    pub tool_call: Option<String>,

    /// Generate a default .valprobe.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.init_config || self.list_tools {
            return Ok(());
        }

        if let Some(ref security) = self.security {
            validate_security_code(security)?;
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Security codes are ASCII alphanumerics with an optional exchange suffix.
fn validate_security_code(code: &str) -> Result<(), String> {
    if code.is_empty() {
        return Err("Security code must not be empty".to_string());
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
        return Err(format!(
            "Security code may only contain letters, digits and '.': {}",
            code
        ));
    }
    Ok(())
}
