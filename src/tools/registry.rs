//! Tool definitions and dispatch for LLM tool-calling clients.
//!
//! Exposes valuation lookups as a function tool with a JSON-schema
//! parameter description, and renders results as text an LLM can quote.

use crate::models::{IndicatorType, StatisticsCycle, ValuationOutcome, ValuationQuery};
use crate::report::generate_markdown_report;
use crate::valuation::ValuationSource;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Name of the valuation lookup tool.
pub const VALUATION_TOOL: &str = "get_valuation_analysis";

/// Tool definition in the OpenAI/Ollama function-calling shape.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call made by the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    /// Text to hand back to the caller: the output, or the error line.
    pub fn text(&self) -> &str {
        if self.success {
            &self.output
        } else {
            self.error.as_deref().unwrap_or_default()
        }
    }
}

/// Query defaults applied when a tool call omits the optional codes.
#[derive(Debug, Clone, Copy)]
pub struct ToolDefaults {
    pub indicator: i64,
    pub cycle: i64,
    pub decimals: usize,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            indicator: IndicatorType::PeTtm.code(),
            cycle: StatisticsCycle::FiveYears.code(),
            decimals: 4,
        }
    }
}

/// Executes tool calls against a valuation source.
pub struct ToolExecutor {
    source: Arc<dyn ValuationSource>,
    defaults: ToolDefaults,
}

impl ToolExecutor {
    pub fn new(source: Arc<dyn ValuationSource>, defaults: ToolDefaults) -> Self {
        Self { source, defaults }
    }

    /// Execute a tool call and return the result.
    pub async fn execute(&self, tool_call: &ToolCall) -> ToolResult {
        let name = &tool_call.function.name;
        let args = &tool_call.function.arguments;

        debug!("Executing tool: {} with args: {:?}", name, args);

        match name.as_str() {
            VALUATION_TOOL => self.get_valuation_analysis(args).await,
            _ => ToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    /// Run a lookup and render it for display.
    pub async fn analyze(&self, query: &ValuationQuery) -> ToolResult {
        info!(
            "Valuation analysis: {}, indicator {}, cycle {}",
            query.security_id,
            query.indicator_type.code(),
            query.date_range.code()
        );

        let outcome = self.source.valuation_analysis(query).await;
        render_outcome(&query.security_id, outcome.as_ref(), self.defaults.decimals)
    }

    /// Raw lookup, for callers that render on their own.
    pub async fn lookup(&self, query: &ValuationQuery) -> Option<ValuationOutcome> {
        self.source.valuation_analysis(query).await
    }

    async fn get_valuation_analysis(&self, args: &Value) -> ToolResult {
        match self.parse_query(args) {
            Ok(query) => self.analyze(&query).await,
            Err(message) => ToolResult::error(message),
        }
    }

    fn parse_query(&self, args: &Value) -> Result<ValuationQuery, String> {
        let security = args
            .get("security_code")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Missing required parameter: security_code".to_string())?;

        let indicator = optional_code(args, "indicator_type")?.unwrap_or(self.defaults.indicator);
        let cycle = optional_code(args, "date_range")?.unwrap_or(self.defaults.cycle);

        Ok(ValuationQuery::new(security, indicator, cycle))
    }
}

/// Read an optional integer code; numeric strings are accepted.
fn optional_code(args: &Value, name: &str) -> Result<Option<i64>, String> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("Invalid parameter: {} must be an integer", name)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("Invalid parameter: {} must be an integer", name)),
        Some(_) => Err(format!("Invalid parameter: {} must be an integer", name)),
    }
}

/// Turn a lookup outcome into tool output.
pub fn render_outcome(
    security: &str,
    outcome: Option<&ValuationOutcome>,
    decimals: usize,
) -> ToolResult {
    match outcome {
        None => ToolResult::error(format!(
            "No valuation data found for security '{}'",
            security
        )),
        Some(ValuationOutcome::Error { error: message }) => {
            error!("Valuation lookup failed for {}: {}", security, message);
            ToolResult::error(format!("Failed to fetch valuation data: {}", message))
        }
        Some(ValuationOutcome::Success(record)) => {
            ToolResult::success(generate_markdown_report(record, decimals))
        }
    }
}

fn code_table<T: std::fmt::Display>(entries: impl Iterator<Item = (i64, T)>) -> String {
    entries
        .map(|(code, label)| format!("{} = {}", code, label))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Get the tool definitions for function-calling clients.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    let indicator_codes: Vec<i64> = IndicatorType::ALL.iter().map(|i| i.code()).collect();
    let cycle_codes: Vec<i64> = StatisticsCycle::ALL.iter().map(|c| c.code()).collect();

    vec![ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDefinition {
            name: VALUATION_TOOL.to_string(),
            description: "Get valuation analysis for a listed security: the latest value of a valuation ratio and its 30th/50th/70th historical percentiles over a lookback window. Returns a markdown table.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "security_code": {
                        "type": "string",
                        "description": "Security code including the exchange suffix, e.g. 300059.SZ or 600519.SH"
                    },
                    "indicator_type": {
                        "type": "integer",
                        "enum": indicator_codes,
                        "default": IndicatorType::default().code(),
                        "description": format!(
                            "Valuation indicator: {}",
                            code_table(IndicatorType::ALL.iter().map(|i| (i.code(), i)))
                        )
                    },
                    "date_range": {
                        "type": "integer",
                        "enum": cycle_codes,
                        "default": StatisticsCycle::default().code(),
                        "description": format!(
                            "Percentile lookback window: {}",
                            code_table(StatisticsCycle::ALL.iter().map(|c| (c.code(), c)))
                        )
                    }
                },
                "required": ["security_code"]
            }),
        },
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CurrentValuationPoint, PercentileStats, ValuationRecord};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Source that answers with a fixed outcome and records the queries.
    struct StubSource {
        outcome: Option<ValuationOutcome>,
        seen: Mutex<Vec<ValuationQuery>>,
    }

    impl StubSource {
        fn new(outcome: Option<ValuationOutcome>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ValuationSource for StubSource {
        async fn valuation_analysis(&self, query: &ValuationQuery) -> Option<ValuationOutcome> {
            self.seen.lock().unwrap().push(query.clone());
            self.outcome.clone()
        }
    }

    fn sample_record() -> ValuationRecord {
        ValuationRecord::merge(
            CurrentValuationPoint {
                security_id: Some("600519.SH".to_string()),
                trade_date: Some("2024-06-28 00:00:00".to_string()),
                indicator_value: Some(8.5),
                indicator_label: Some("P/B (MRQ)".to_string()),
            },
            PercentileStats {
                cycle_label: Some("3 years".to_string()),
                p30: Some(7.0),
                p50: Some(9.0),
                p70: Some(11.0),
            },
        )
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            function: FunctionCall {
                name: name.to_string(),
                arguments,
            },
        }
    }

    #[test]
    fn test_tool_definitions() {
        let tools = get_tool_definitions();
        assert_eq!(tools.len(), 1);

        let function = &tools[0].function;
        assert_eq!(function.name, VALUATION_TOOL);
        assert_eq!(function.parameters["required"], json!(["security_code"]));
        assert_eq!(
            function.parameters["properties"]["indicator_type"]["enum"],
            json!([1, 2, 3, 4])
        );
        assert_eq!(function.parameters["properties"]["indicator_type"]["default"], 1);
        assert_eq!(function.parameters["properties"]["date_range"]["default"], 3);

        let description = function.parameters["properties"]["indicator_type"]["description"]
            .as_str()
            .unwrap();
        assert!(description.contains("2 = P/B (MRQ)"));
    }

    #[test]
    fn test_success_renders_table() {
        let source = StubSource::new(Some(ValuationOutcome::Success(sample_record())));
        let executor = ToolExecutor::new(source.clone(), ToolDefaults::default());

        let result = tokio_test::block_on(executor.execute(&call(
            VALUATION_TOOL,
            json!({"security_code": "600519.SH", "indicator_type": 2, "date_range": "2"}),
        )));

        assert!(result.success);
        assert!(result.output.contains("**Valuation Analysis**"));
        assert!(result.output.contains("| 600519.SH | 2024-06-28 | P/B (MRQ) | 8.5000 |"));

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen[0], ValuationQuery::new("600519.SH", 2, 2));
    }

    #[test]
    fn test_defaults_apply() {
        let source = StubSource::new(Some(ValuationOutcome::Success(sample_record())));
        let executor = ToolExecutor::new(source.clone(), ToolDefaults::default());

        tokio_test::block_on(
            executor.execute(&call(VALUATION_TOOL, json!({"security_code": " 300059.SZ "}))),
        );

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen[0], ValuationQuery::new("300059.SZ", 1, 3));
    }

    #[test]
    fn test_error_outcome_is_prefixed() {
        let source = StubSource::new(Some(ValuationOutcome::error("rate limited")));
        let executor = ToolExecutor::new(source, ToolDefaults::default());

        let result = tokio_test::block_on(
            executor.execute(&call(VALUATION_TOOL, json!({"security_code": "300059.SZ"}))),
        );

        assert!(!result.success);
        assert_eq!(result.text(), "Failed to fetch valuation data: rate limited");
    }

    #[test]
    fn test_absent_outcome_is_not_found() {
        let executor = ToolExecutor::new(StubSource::new(None), ToolDefaults::default());

        let result = tokio_test::block_on(
            executor.execute(&call(VALUATION_TOOL, json!({"security_code": "300059.SZ"}))),
        );

        assert!(!result.success);
        assert_eq!(
            result.text(),
            "No valuation data found for security '300059.SZ'"
        );
    }

    #[test]
    fn test_parameter_validation() {
        let source = StubSource::new(None);
        let executor = ToolExecutor::new(source.clone(), ToolDefaults::default());

        let missing = tokio_test::block_on(executor.execute(&call(VALUATION_TOOL, json!({}))));
        assert_eq!(
            missing.error.as_deref(),
            Some("Missing required parameter: security_code")
        );

        let invalid = tokio_test::block_on(executor.execute(&call(
            VALUATION_TOOL,
            json!({"security_code": "300059.SZ", "indicator_type": "pe"}),
        )));
        assert_eq!(
            invalid.error.as_deref(),
            Some("Invalid parameter: indicator_type must be an integer")
        );

        let fractional = tokio_test::block_on(executor.execute(&call(
            VALUATION_TOOL,
            json!({"security_code": "300059.SZ", "date_range": 2.5}),
        )));
        assert!(!fractional.success);

        assert!(source.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_tool() {
        let executor = ToolExecutor::new(StubSource::new(None), ToolDefaults::default());
        let result = tokio_test::block_on(executor.execute(&call("read_file", json!({}))));
        assert_eq!(result.text(), "Unknown tool: read_file");
    }

    #[test]
    fn test_tool_call_deserializes() {
        let call: ToolCall = serde_json::from_value(json!({
            "function": {"name": VALUATION_TOOL, "arguments": {"security_code": "300059.SZ"}}
        }))
        .unwrap();
        assert_eq!(call.function.name, VALUATION_TOOL);
        assert_eq!(call.function.arguments["security_code"], "300059.SZ");
    }
}
