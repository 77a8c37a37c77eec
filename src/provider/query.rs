//! Report query construction.
//!
//! Both valuation reports are served by the same tabular endpoint; a query is
//! a report name plus column, filter, sort and paging parameters.

use crate::models::ValuationQuery;

/// Report holding the daily indicator series.
pub const TREND_REPORT: &str = "RPT_CUSTOM_DMSK_TREND";

/// Report holding the historical percentile levels.
pub const PERCENTILE_REPORT: &str = "RPT_STOCKVALUATIONTANTILE";

/// Columns requested from the percentile report.
pub const PERCENTILE_COLUMNS: [&str; 6] = [
    "SECUCODE",
    "STATISTICS_CYCLE",
    "INDEX_TYPE",
    "PERCENTILE_THIRTY",
    "PERCENTILE_FIFTY",
    "PERCENTILE_SEVENTY",
];

/// Conjunctive exact-match filter, rendered as `(COL=value)(COL="value")...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quoted clause: `(COLUMN="value")`.
    pub fn eq_text(mut self, column: &str, value: impl AsRef<str>) -> Self {
        self.clauses
            .push(format!("({}=\"{}\")", column, value.as_ref()));
        self
    }

    /// Adds an unquoted numeric clause: `(COLUMN=value)`.
    pub fn eq_number(mut self, column: &str, value: i64) -> Self {
        self.clauses.push(format!("({}={})", column, value));
        self
    }

    pub fn render(&self) -> String {
        self.clauses.concat()
    }
}

/// Sort direction as the provider encodes it in `sortTypes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
}

impl SortOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "1",
        }
    }
}

/// Column selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    All,
    List(Vec<String>),
}

impl Columns {
    fn as_param(&self) -> String {
        match self {
            Columns::All => "ALL".to_string(),
            Columns::List(cols) => cols.join(","),
        }
    }
}

/// A fully described request against the report endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub report_name: String,
    pub columns: Columns,
    pub filter: Filter,
    pub sort: Option<(String, SortOrder)>,
    pub page_number: u32,
    /// `None` leaves the page size empty, which the provider treats as
    /// "no cap" on the trend report and as its default elsewhere.
    pub page_size: Option<u32>,
}

impl ReportQuery {
    /// Current-value query: full trend series for the security, oldest first.
    pub fn trend(query: &ValuationQuery) -> Self {
        Self {
            report_name: TREND_REPORT.to_string(),
            columns: Columns::All,
            filter: Filter::new()
                .eq_text("SECUCODE", &query.security_id)
                .eq_number("INDICATORTYPE", query.indicator_type.code())
                .eq_number("DATETYPE", query.date_range.code()),
            sort: Some(("TRADE_DATE".to_string(), SortOrder::Ascending)),
            page_number: 1,
            page_size: None,
        }
    }

    /// Percentile query, in the report's default ordering.
    pub fn percentile(query: &ValuationQuery) -> Self {
        Self {
            report_name: PERCENTILE_REPORT.to_string(),
            columns: Columns::List(PERCENTILE_COLUMNS.iter().map(|c| c.to_string()).collect()),
            filter: Filter::new()
                .eq_text("SECUCODE", &query.security_id)
                .eq_text("INDEX_TYPE", query.indicator_type.code().to_string())
                .eq_text("STATISTICS_CYCLE", query.date_range.code().to_string()),
            sort: None,
            page_number: 1,
            page_size: None,
        }
    }

    /// Query-string parameters, excluding the per-client `source`/`client` tags.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let (sort_columns, sort_types) = match &self.sort {
            Some((column, order)) => (column.clone(), order.as_param().to_string()),
            None => (String::new(), String::new()),
        };

        vec![
            ("reportName", self.report_name.clone()),
            ("columns", self.columns.as_param()),
            ("quoteColumns", String::new()),
            ("filter", self.filter.render()),
            ("pageNumber", self.page_number.to_string()),
            (
                "pageSize",
                self.page_size.map(|s| s.to_string()).unwrap_or_default(),
            ),
            ("sortTypes", sort_types),
            ("sortColumns", sort_columns),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params_map(query: &ReportQuery) -> HashMap<&'static str, String> {
        query.to_params().into_iter().collect()
    }

    #[test]
    fn test_filter_rendering() {
        let filter = Filter::new()
            .eq_text("SECUCODE", "688041.SH")
            .eq_number("INDICATORTYPE", 2);
        assert_eq!(filter.render(), "(SECUCODE=\"688041.SH\")(INDICATORTYPE=2)");
        assert_eq!(Filter::new().render(), "");
    }

    #[test]
    fn test_trend_query_params() {
        let query = ValuationQuery::new("300059.SZ", 1, 3);
        let params = params_map(&ReportQuery::trend(&query));

        assert_eq!(params["reportName"], TREND_REPORT);
        assert_eq!(params["columns"], "ALL");
        assert_eq!(
            params["filter"],
            "(SECUCODE=\"300059.SZ\")(INDICATORTYPE=1)(DATETYPE=3)"
        );
        assert_eq!(params["sortColumns"], "TRADE_DATE");
        assert_eq!(params["sortTypes"], "1");
        assert_eq!(params["pageNumber"], "1");
        assert_eq!(params["pageSize"], "");
    }

    #[test]
    fn test_percentile_query_params() {
        let query = ValuationQuery::new("000001.SZ", 2, 2);
        let params = params_map(&ReportQuery::percentile(&query));

        assert_eq!(params["reportName"], PERCENTILE_REPORT);
        assert_eq!(
            params["columns"],
            "SECUCODE,STATISTICS_CYCLE,INDEX_TYPE,PERCENTILE_THIRTY,PERCENTILE_FIFTY,PERCENTILE_SEVENTY"
        );
        assert_eq!(
            params["filter"],
            "(SECUCODE=\"000001.SZ\")(INDEX_TYPE=\"2\")(STATISTICS_CYCLE=\"2\")"
        );
        assert_eq!(params["sortColumns"], "");
        assert_eq!(params["sortTypes"], "");
        assert_eq!(params["pageNumber"], "1");
    }

    #[test]
    fn test_unknown_codes_pass_through() {
        let query = ValuationQuery::new("300059.SZ", 7, 9);
        let params = params_map(&ReportQuery::trend(&query));
        assert!(params["filter"].contains("(INDICATORTYPE=7)(DATETYPE=9)"));
    }

    #[test]
    fn test_sort_order_params() {
        assert_eq!(SortOrder::Ascending.as_param(), "1");
    }
}
