//! Response envelope and row types for the report endpoint.
//!
//! Every report answers with the same wrapper:
//! `{ code, success, message, result: { data: [...] } }`. Rows are decoded
//! into typed structs here so nothing downstream indexes raw JSON.

use serde::{de, Deserialize, Deserializer};

/// Message used when the provider fails without saying why.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Shared response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: Option<i64>,
    pub success: Option<bool>,
    pub message: Option<String>,
    pub result: Option<ResultPage<T>>,
}

/// The `result` object of a successful response.
///
/// `data` is `None` when the key is missing and `Some(None)` when it is null.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResultPage<T> {
    #[serde(default, deserialize_with = "deserialize_present")]
    pub data: Option<Option<Vec<T>>>,
}

fn deserialize_present<'de, D, V>(deserializer: D) -> Result<Option<Option<V>>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    Option::<V>::deserialize(deserializer).map(Some)
}

impl<T> ApiEnvelope<T> {
    /// A response counts as successful only with `code == 0`, `success == true`
    /// and a `result` object carrying a `data` key.
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
            && self.success == Some(true)
            && self
                .result
                .as_ref()
                .is_some_and(|page| page.data.is_some())
    }

    /// Unwraps the rows, or returns the provider's failure message.
    pub fn into_rows(self) -> Result<Vec<T>, String> {
        if !self.is_success() {
            return Err(self
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()));
        }

        Ok(self
            .result
            .and_then(|page| page.data)
            .flatten()
            .unwrap_or_default())
    }
}

/// One row of the trend report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrendRow {
    #[serde(rename = "SECUCODE", default)]
    pub security_code: Option<String>,
    #[serde(rename = "TRADE_DATE", default)]
    pub trade_date: Option<String>,
    #[serde(rename = "INDICATOR_VALUE", default)]
    pub indicator_value: Option<f64>,
}

/// One row of the percentile report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PercentileRow {
    #[serde(
        rename = "STATISTICS_CYCLE",
        default,
        deserialize_with = "deserialize_code"
    )]
    pub statistics_cycle: Option<i64>,
    #[serde(rename = "INDEX_TYPE", default, deserialize_with = "deserialize_code")]
    pub index_type: Option<i64>,
    #[serde(rename = "PERCENTILE_THIRTY", default)]
    pub percentile_thirty: Option<f64>,
    #[serde(rename = "PERCENTILE_FIFTY", default)]
    pub percentile_fifty: Option<f64>,
    #[serde(rename = "PERCENTILE_SEVENTY", default)]
    pub percentile_seventy: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CodeRepr {
    Number(i64),
    Float(f64),
    Text(String),
}

/// Enum codes arrive as JSON integers, floats or numeric strings.
/// Floats are truncated toward zero.
fn deserialize_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<CodeRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(CodeRepr::Number(code)) => Ok(Some(code)),
        Some(CodeRepr::Float(code)) if code.is_finite() => Ok(Some(code.trunc() as i64)),
        Some(CodeRepr::Float(code)) => Err(de::Error::custom(format!(
            "invalid enum code: {}",
            code
        ))),
        Some(CodeRepr::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid enum code: {:?}", text)))
        }
    }
}
