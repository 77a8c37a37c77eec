//! valprobe - valuation snapshot CLI
//!
//! Fetches the current value of a valuation ratio for a listed security
//! together with its historical percentile band, and exposes the same
//! lookup as a function-calling tool for LLM clients.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, bad arguments, etc.)
//!   2 - The data provider reported an error, or no data was found

mod cli;
mod config;
mod models;
mod provider;
mod report;
mod tools;
mod valuation;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use models::{ValuationOutcome, ValuationQuery};
use provider::HttpTransport;
use std::path::Path;
use std::sync::Arc;
use tools::{ToolCall, ToolExecutor};
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use valuation::ValuationAggregator;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config and --list-tools early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }
    if args.list_tools {
        let definitions = serde_json::to_string_pretty(&tools::get_tool_definitions())?;
        println!("{}", definitions);
        return Ok(());
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config)?;

    info!("valprobe v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Config: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Valuation lookup failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .valprobe.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to change the provider endpoint, query defaults, and more.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the verbosity flags when set.
///
/// Logs go to stderr; stdout only carries the rendered report.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Run one lookup or tool call. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let transport =
        HttpTransport::new(config.transport_config()).context("Failed to build HTTP client")?;
    let aggregator = ValuationAggregator::new(transport);
    let executor = ToolExecutor::new(Arc::new(aggregator), config.tool_defaults());

    if let Some(ref raw) = args.tool_call {
        return run_tool_call(&executor, raw, &args, &config).await;
    }

    let security = args
        .security
        .as_deref()
        .context("--security is required for a lookup")?;
    let query = ValuationQuery::new(
        security,
        config.query.default_indicator,
        config.query.default_cycle,
    );

    info!(
        "Looking up {} ({}, {})",
        query.security_id, query.indicator_type, query.date_range
    );

    let outcome = executor.lookup(&query).await;
    if let Some(record) = outcome.as_ref().and_then(ValuationOutcome::record) {
        debug!("Merged record: {:?}", record);
    }

    let body = match config.general.format {
        OutputFormat::Json => match outcome {
            Some(ref outcome) => report::generate_json_report(outcome)?,
            None => "null".to_string(),
        },
        OutputFormat::Markdown => {
            tools::render_outcome(security, outcome.as_ref(), config.report.decimals)
                .text()
                .to_string()
        }
    };

    write_output(args.output.as_deref(), &body)?;

    Ok(exit_code(outcome.as_ref()))
}

/// Handle --tool-call: dispatch a JSON tool call as an LLM client would.
async fn run_tool_call(
    executor: &ToolExecutor,
    raw: &str,
    args: &Args,
    config: &Config,
) -> Result<i32> {
    let call: ToolCall = serde_json::from_str(raw).context("Invalid --tool-call JSON")?;
    let result = executor.execute(&call).await;

    let body = match config.general.format {
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::Markdown => result.text().to_string(),
    };

    write_output(args.output.as_deref(), &body)?;

    Ok(if result.success { 0 } else { 2 })
}

fn exit_code(outcome: Option<&ValuationOutcome>) -> i32 {
    match outcome {
        Some(outcome) if !outcome.is_error() => 0,
        _ => 2,
    }
}

/// Write the rendered report to a file, or stdout when no path is given.
fn write_output(path: Option<&Path>, body: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to: {}", path.display());
        }
        None => println!("{}", body.trim_end()),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    Ok(Config::load_default()?.unwrap_or_default())
}
