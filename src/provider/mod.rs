//! Remote valuation data provider.
//!
//! Query construction, transport and envelope decoding for the tabular
//! report endpoint.

pub mod envelope;
pub mod query;
pub mod transport;

pub use envelope::{ApiEnvelope, PercentileRow, TrendRow};
pub use query::ReportQuery;
pub use transport::{HttpTransport, Transport, TransportConfig, TransportError};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Why a report query produced no rows.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider answered but flagged failure; carries its message verbatim.
    #[error("{0}")]
    Provider(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Issue `query` and decode the envelope into typed rows.
pub async fn fetch_rows<T>(transport: &dyn Transport, query: &ReportQuery) -> Result<Vec<T>, FetchError>
where
    T: DeserializeOwned,
{
    let body = transport.get_json(query).await?;
    let envelope: ApiEnvelope<T> =
        serde_json::from_value(body).map_err(TransportError::Decode)?;
    envelope.into_rows().map_err(FetchError::Provider)
}
