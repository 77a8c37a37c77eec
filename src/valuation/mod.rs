//! Valuation lookups.
//!
//! The tool layer talks to a [`ValuationSource`]; the provider-backed
//! implementation is [`ValuationAggregator`].

pub mod aggregator;

pub use aggregator::ValuationAggregator;

use crate::models::{ValuationOutcome, ValuationQuery};
use async_trait::async_trait;

/// Anything that can answer a valuation query.
///
/// `None` means the source has no data for the security at all, which the
/// tool layer reports differently from a fetch error.
#[async_trait]
pub trait ValuationSource: Send + Sync {
    async fn valuation_analysis(&self, query: &ValuationQuery) -> Option<ValuationOutcome>;
}
