//! Two-stage valuation aggregation.
//!
//! The latest indicator reading comes from the trend report and the
//! percentile levels from the percentile report. The two partial records are
//! merged into one [`ValuationRecord`], or the whole lookup fails with a
//! single message.

use crate::models::{
    CurrentValuationPoint, PercentileStats, StatisticsCycle, ValuationOutcome, ValuationQuery,
    ValuationRecord,
};
use crate::provider::{fetch_rows, FetchError, PercentileRow, ReportQuery, Transport, TrendRow};
use crate::valuation::ValuationSource;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Label used when the percentile row carries no cycle code, or code 0.
pub const UNKNOWN_CYCLE: &str = "Unknown";

/// Fetches and merges valuation data through a [`Transport`].
pub struct ValuationAggregator<T: Transport> {
    transport: T,
}

impl<T: Transport> ValuationAggregator<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Run both queries and merge their results.
    ///
    /// Never fails: provider and transport errors become
    /// [`ValuationOutcome::Error`]. A failed current-value query means the
    /// percentile query is not issued.
    pub async fn aggregate(&self, query: &ValuationQuery) -> ValuationOutcome {
        info!(
            "Fetching valuation for {}: {}, {}",
            query.security_id, query.indicator_type, query.date_range
        );

        match self.try_aggregate(query).await {
            Ok(record) => {
                if record.is_empty() {
                    info!("No valuation rows for {}", query.security_id);
                }
                ValuationOutcome::Success(record)
            }
            Err(e) => {
                warn!("Valuation lookup for {} failed: {}", query.security_id, e);
                ValuationOutcome::error(e.to_string())
            }
        }
    }

    async fn try_aggregate(&self, query: &ValuationQuery) -> Result<ValuationRecord, FetchError> {
        debug!("Requesting current value series");
        let trend: Vec<TrendRow> = fetch_rows(&self.transport, &ReportQuery::trend(query)).await?;
        let current = current_point(query, trend);

        debug!("Requesting percentile statistics");
        let rows: Vec<PercentileRow> =
            fetch_rows(&self.transport, &ReportQuery::percentile(query)).await?;
        let percentile = percentile_stats(query, rows);

        Ok(ValuationRecord::merge(current, percentile))
    }
}

#[async_trait]
impl<T: Transport> ValuationSource for ValuationAggregator<T> {
    async fn valuation_analysis(&self, query: &ValuationQuery) -> Option<ValuationOutcome> {
        Some(self.aggregate(query).await)
    }
}

/// Latest reading: rows arrive sorted by trade date ascending.
fn current_point(query: &ValuationQuery, rows: Vec<TrendRow>) -> CurrentValuationPoint {
    debug!("Trend report returned {} rows", rows.len());

    let Some(latest) = rows.into_iter().last() else {
        return CurrentValuationPoint::default();
    };

    CurrentValuationPoint {
        security_id: latest.security_code,
        trade_date: latest.trade_date,
        indicator_value: latest.indicator_value,
        indicator_label: Some(query.indicator_type.label()),
    }
}

/// Percentile levels from the first row; the cycle label follows the code the
/// provider returned rather than the requested one.
fn percentile_stats(query: &ValuationQuery, rows: Vec<PercentileRow>) -> PercentileStats {
    if rows.len() > 1 {
        warn!(
            "Percentile report returned {} rows for {}; using the first",
            rows.len(),
            query.security_id
        );
    }

    let Some(first) = rows.into_iter().next() else {
        return PercentileStats::default();
    };

    if let Some(code) = first.statistics_cycle {
        if code != query.date_range.code() {
            warn!(
                "Requested cycle {} but provider returned {}",
                query.date_range.code(),
                code
            );
        }
    }
    if let Some(code) = first.index_type {
        if code != query.indicator_type.code() {
            warn!(
                "Requested indicator {} but provider returned {}",
                query.indicator_type.code(),
                code
            );
        }
    }

    let cycle_label = match first.statistics_cycle {
        Some(code) if code != 0 => StatisticsCycle::from_code(code).label(),
        _ => UNKNOWN_CYCLE.to_string(),
    };

    PercentileStats {
        cycle_label: Some(cycle_label),
        p30: first.percentile_thirty,
        p50: first.percentile_fifty,
        p70: first.percentile_seventy,
    }
}
