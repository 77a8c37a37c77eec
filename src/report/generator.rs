//! Markdown and JSON rendering of valuation results.

use crate::models::{CurrentValuationPoint, ValuationOutcome, ValuationRecord};
use anyhow::Result;

/// Placeholder for absent values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Column headers of the valuation table.
pub const VALUATION_HEADERS: [&str; 8] = [
    "Security",
    "Trade date",
    "Indicator",
    "Value",
    "Statistics cycle",
    "30th percentile",
    "Median (50th)",
    "70th percentile",
];

/// Generate the markdown section for a merged record.
pub fn generate_markdown_report(record: &ValuationRecord, decimals: usize) -> String {
    let mut output = String::new();

    output.push_str("**Valuation Analysis**\n\n");
    output.push_str(&markdown_table(
        &VALUATION_HEADERS,
        &[valuation_row(record, decimals)],
    ));

    output
}

/// Cells for one record, in [`VALUATION_HEADERS`] order.
fn valuation_row(record: &ValuationRecord, decimals: usize) -> Vec<String> {
    let current = &record.current;
    let percentile = &record.percentile;

    vec![
        text_cell(current.security_id.as_deref()),
        date_cell(current),
        text_cell(current.indicator_label.as_deref()),
        number_cell(current.indicator_value, decimals),
        text_cell(percentile.cycle_label.as_deref()),
        number_cell(percentile.p30, decimals),
        number_cell(percentile.p50, decimals),
        number_cell(percentile.p70, decimals),
    ]
}

fn text_cell(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

/// Render the trade date as `YYYY-MM-DD`; unparseable text keeps its first 10 characters.
fn date_cell(point: &CurrentValuationPoint) -> String {
    match (point.trade_day(), point.trade_date.as_deref()) {
        (Some(day), _) => day.format("%Y-%m-%d").to_string(),
        (None, Some(raw)) if !raw.is_empty() => raw.get(..10).unwrap_or(raw).to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn number_cell(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Render a GitHub-flavoured markdown table.
pub fn markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = String::new();

    if headers.is_empty() {
        return table;
    }

    table.push_str("| ");
    table.push_str(
        &headers
            .iter()
            .map(|h| escape_cell(h))
            .collect::<Vec<_>>()
            .join(" | "),
    );
    table.push_str(" |\n");

    table.push('|');
    for _ in headers {
        table.push_str(":---|");
    }
    table.push('\n');

    for row in rows {
        let cells: Vec<String> = (0..headers.len())
            .map(|i| row.get(i).map(|c| escape_cell(c)).unwrap_or_default())
            .collect();
        table.push_str("| ");
        table.push_str(&cells.join(" | "));
        table.push_str(" |\n");
    }

    table
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

/// Generate a JSON report.
pub fn generate_json_report(outcome: &ValuationOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PercentileStats;

    fn create_test_record() -> ValuationRecord {
        ValuationRecord::merge(
            CurrentValuationPoint {
                security_id: Some("300059.SZ".to_string()),
                trade_date: Some("2024-06-28 00:00:00".to_string()),
                indicator_value: Some(27.86141),
                indicator_label: Some("P/E (TTM)".to_string()),
            },
            PercentileStats {
                cycle_label: Some("5 years".to_string()),
                p30: Some(25.0187),
                p50: Some(31.4476),
                p70: Some(41.2209),
            },
        )
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_record(), 4);

        assert!(markdown.starts_with("**Valuation Analysis**\n\n"));
        assert!(markdown.contains("| Security | Trade date | Indicator | Value |"));
        assert!(markdown.contains(
            "| 300059.SZ | 2024-06-28 | P/E (TTM) | 27.8614 | 5 years | 25.0187 | 31.4476 | 41.2209 |"
        ));
    }

    #[test]
    fn test_missing_values_render_as_na() {
        let record = ValuationRecord::merge(
            CurrentValuationPoint::default(),
            PercentileStats {
                cycle_label: Some("3 years".to_string()),
                p30: Some(1.0),
                p50: None,
                p70: Some(3.0),
            },
        );

        let markdown = generate_markdown_report(&record, 2);

        assert!(markdown.contains("| N/A | N/A | N/A | N/A | 3 years | 1.00 | N/A | 3.00 |"));
    }

    #[test]
    fn test_markdown_table_shape() {
        let table = markdown_table(
            &["A", "B"],
            &[vec!["1".to_string(), "x|y".to_string()], vec!["2".to_string()]],
        );
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "| A | B |");
        assert_eq!(lines[1], "|:---|:---|");
        assert_eq!(lines[2], "| 1 | x\\|y |");
        assert_eq!(lines[3], "| 2 |  |");
        assert!(markdown_table(&[], &[]).is_empty());
    }

    #[test]
    fn test_date_cell() {
        let point = |date: Option<&str>| CurrentValuationPoint {
            trade_date: date.map(String::from),
            ..Default::default()
        };

        assert_eq!(date_cell(&point(Some("2024-01-01T09:30:00"))), "2024-01-01");
        assert_eq!(date_cell(&point(Some("2024-01"))), "2024-01");
        assert_eq!(date_cell(&point(Some(""))), NOT_AVAILABLE);
        assert_eq!(date_cell(&point(None)), NOT_AVAILABLE);
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&ValuationOutcome::Success(create_test_record())).unwrap();
        assert!(json.contains("\"security_code\""));
        assert!(json.contains("\"percentile_70\""));

        let json = generate_json_report(&ValuationOutcome::error("timeout")).unwrap();
        assert!(json.contains("\"error\": \"timeout\""));
    }
}
