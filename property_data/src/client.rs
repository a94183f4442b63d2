use std::{future::Future, sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client,
};
use serde::de::DeserializeOwned;

use crate::{DataSourceError, DataSourceTag};

/// Thin JSON-over-HTTP wrapper shared by the provider clients.
#[derive(Clone)]
pub(crate) struct RestClient {
    provider: DataSourceTag,
    base_url: String,
    client: Arc<Client>,
}

impl RestClient {
    /// Creates a client that sends `auth_header: auth_value` with every request.
    pub fn new(
        provider: DataSourceTag,
        base_url: &str,
        auth_header: &'static str,
        auth_value: &str,
    ) -> Result<Self, DataSourceError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val =
            HeaderValue::from_str(auth_value).map_err(|e| DataSourceError::Initialization(provider, e.to_string()))?;
        headers.insert(auth_header, val);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| DataSourceError::Initialization(provider, e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { provider, base_url, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T, DataSourceError> {
        let url = self.url(path);
        trace!("🏠️ GET {url} ({})", self.provider);
        let mut req = self.client.get(url);
        if !params.is_empty() {
            req = req.query(params);
        }
        let response = req.send().await.map_err(|e| DataSourceError::RequestError(self.provider, e.to_string()))?;
        if response.status().is_success() {
            trace!("🏠️ {} query successful. {}", self.provider, response.status());
            response.json::<T>().await.map_err(|e| DataSourceError::JsonError(self.provider, e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(DataSourceError::QueryError { provider: self.provider, status, message })
        }
    }
}

/// Runs `fut`, cancelling it if it has not completed within `limit`.
pub(crate) async fn with_timeout<T, F>(provider: DataSourceTag, limit: Duration, fut: F) -> Result<T, DataSourceError>
where F: Future<Output = Result<T, DataSourceError>> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DataSourceError::Timeout { provider, millis: limit.as_millis() }),
    }
}
