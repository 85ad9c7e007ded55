//! Upstream data sources
//!
//! - [`datastore`]: NEA hawker closure records from the data.gov.sg datastore API
//! - [`stations`]: MRT/LRT station points from the sg-rail GeoJSON

pub mod datastore;
pub mod stations;

pub use datastore::DatastoreClient;
pub use stations::StationsClient;

use crate::error::HcError;
use std::time::Duration;

const USER_AGENT: &str = concat!("sgdata/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client configuration
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, HcError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| HcError::Network(e.to_string()))
}
