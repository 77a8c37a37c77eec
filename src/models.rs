//! Data models for valuation lookups.
//!
//! This module contains the query, the two partial records produced by the
//! provider queries, and the merged outcome handed to the tool layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Valuation indicator requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndicatorType {
    /// Price / earnings, trailing twelve months
    #[default]
    PeTtm,
    /// Price / book, most recent quarter
    PbMrq,
    /// Price / sales, trailing twelve months
    PsTtm,
    /// Price / cash flow, trailing twelve months
    PcTtm,
    /// Code outside the provider's documented set
    Unknown(i64),
}

impl IndicatorType {
    /// All documented indicators, in code order.
    pub const ALL: [IndicatorType; 4] = [Self::PeTtm, Self::PbMrq, Self::PsTtm, Self::PcTtm];

    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::PeTtm,
            2 => Self::PbMrq,
            3 => Self::PsTtm,
            4 => Self::PcTtm,
            other => Self::Unknown(other),
        }
    }

    /// Provider code for this indicator.
    pub const fn code(&self) -> i64 {
        match self {
            Self::PeTtm => 1,
            Self::PbMrq => 2,
            Self::PsTtm => 3,
            Self::PcTtm => 4,
            Self::Unknown(code) => *code,
        }
    }

    /// Display label, or a placeholder carrying the raw code.
    pub fn label(&self) -> String {
        match self {
            Self::PeTtm => "P/E (TTM)".to_string(),
            Self::PbMrq => "P/B (MRQ)".to_string(),
            Self::PsTtm => "P/S (TTM)".to_string(),
            Self::PcTtm => "P/CF (TTM)".to_string(),
            Self::Unknown(code) => format!("Unknown indicator ({})", code),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lookback window for the percentile statistics.
///
/// The provider calls this `DATETYPE` on the trend report and
/// `STATISTICS_CYCLE` on the percentile report; both use the same codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatisticsCycle {
    OneYear,
    ThreeYears,
    #[default]
    FiveYears,
    TenYears,
    /// Code outside the provider's documented set
    Unknown(i64),
}

impl StatisticsCycle {
    /// All documented cycles, in code order.
    pub const ALL: [StatisticsCycle; 4] = [
        Self::OneYear,
        Self::ThreeYears,
        Self::FiveYears,
        Self::TenYears,
    ];

    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::OneYear,
            2 => Self::ThreeYears,
            3 => Self::FiveYears,
            4 => Self::TenYears,
            other => Self::Unknown(other),
        }
    }

    /// Provider code for this cycle.
    pub const fn code(&self) -> i64 {
        match self {
            Self::OneYear => 1,
            Self::ThreeYears => 2,
            Self::FiveYears => 3,
            Self::TenYears => 4,
            Self::Unknown(code) => *code,
        }
    }

    /// Display label, or a placeholder carrying the raw code.
    pub fn label(&self) -> String {
        match self {
            Self::OneYear => "1 year".to_string(),
            Self::ThreeYears => "3 years".to_string(),
            Self::FiveYears => "5 years".to_string(),
            Self::TenYears => "10 years".to_string(),
            Self::Unknown(code) => format!("Unknown cycle ({})", code),
        }
    }
}

impl fmt::Display for StatisticsCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single valuation lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuationQuery {
    /// Exchange-qualified code, e.g. `300059.SZ`.
    pub security_id: String,
    pub indicator_type: IndicatorType,
    pub date_range: StatisticsCycle,
}

impl ValuationQuery {
    pub fn new(security_id: impl Into<String>, indicator: i64, cycle: i64) -> Self {
        Self {
            security_id: security_id.into(),
            indicator_type: IndicatorType::from_code(indicator),
            date_range: StatisticsCycle::from_code(cycle),
        }
    }
}

/// Latest reading of the indicator, taken from the trend report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentValuationPoint {
    #[serde(rename = "security_code")]
    pub security_id: Option<String>,
    /// Provider timestamp text; only the date part is meaningful.
    pub trade_date: Option<String>,
    pub indicator_value: Option<f64>,
    #[serde(rename = "indicator_type")]
    pub indicator_label: Option<String>,
}

impl CurrentValuationPoint {
    /// Parses the date portion of `trade_date`.
    pub fn trade_day(&self) -> Option<NaiveDate> {
        let raw = self.trade_date.as_deref()?;
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Historical percentile levels for the requested lookback window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentileStats {
    #[serde(rename = "statistics_cycle")]
    pub cycle_label: Option<String>,
    #[serde(rename = "percentile_30")]
    pub p30: Option<f64>,
    #[serde(rename = "percentile_50")]
    pub p50: Option<f64>,
    #[serde(rename = "percentile_70")]
    pub p70: Option<f64>,
}

impl PercentileStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Union of the current reading and the percentile statistics.
///
/// Both halves flatten into one object; their key sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    #[serde(flatten)]
    pub current: CurrentValuationPoint,
    #[serde(flatten)]
    pub percentile: PercentileStats,
}

impl ValuationRecord {
    pub fn merge(current: CurrentValuationPoint, percentile: PercentileStats) -> Self {
        Self {
            current,
            percentile,
        }
    }

    /// True when neither query produced a row.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.percentile.is_empty()
    }
}

/// Result of one aggregation: a merged record or a single error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValuationOutcome {
    Success(ValuationRecord),
    Error { error: String },
}

impl ValuationOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn record(&self) -> Option<&ValuationRecord> {
        match self {
            Self::Success(record) => Some(record),
            Self::Error { .. } => None,
        }
    }
}
