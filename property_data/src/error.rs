use thiserror::Error;

use crate::DataSourceTag;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("Could not initialize {0} client: {1}")]
    Initialization(DataSourceTag, String),
    #[error("No credentials are configured for {0}")]
    MissingCredentials(DataSourceTag),
    #[error("Request to {0} failed: {1}")]
    RequestError(DataSourceTag, String),
    #[error("{provider} returned HTTP {status}. {message}")]
    QueryError { provider: DataSourceTag, status: u16, message: String },
    #[error("Could not deserialize {0} response: {1}")]
    JsonError(DataSourceTag, String),
    #[error("{provider} did not respond within {millis}ms")]
    Timeout { provider: DataSourceTag, millis: u128 },
}
