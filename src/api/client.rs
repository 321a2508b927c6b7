//! HTTP client for the dashboard API.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::operations::{OperationHistory, OperationLogEntry, parse_operation_log};
use super::types::{EnvironmentRecord, Machine};
use crate::error::{Error, Result};
use crate::session::current_access_token;
use crate::storage::DurableStore;

/// HTTP client for the dashboard API.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use smartfarm_dash::api::DashboardClient;
/// use smartfarm_dash::storage::FileStore;
///
/// # async fn example() -> smartfarm_dash::Result<()> {
/// let storage = Arc::new(FileStore::new(".smartfarm/storage.json"));
/// let client = DashboardClient::new("http://localhost:8000", storage)?;
/// let records = client.environment().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DashboardClient {
    base_url: Url,
    http: reqwest::Client,
    storage: Arc<dyn DurableStore>,
}

impl DashboardClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the API (e.g., "http://localhost:8000")
    /// * `storage` - Durable storage holding the access token
    pub fn new(base_url: impl AsRef<str>, storage: Arc<dyn DurableStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Self::with_client(base_url, http, storage)
    }

    /// Create a new client with a custom reqwest client.
    pub fn with_client(
        base_url: impl AsRef<str>,
        http: reqwest::Client,
        storage: Arc<dyn DurableStore>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            base_url,
            http,
            storage,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Environment sensor history.
    pub async fn environment(&self) -> Result<Vec<EnvironmentRecord>> {
        self.get("/envir").await
    }

    /// Registered control machines.
    pub async fn machines(&self) -> Result<Vec<Machine>> {
        self.get("/machine").await
    }

    /// Operation log of one machine.
    pub async fn operation_log(&self, device: &str) -> Result<Vec<OperationLogEntry>> {
        let mut url = self.base_url.join("/manual/log")?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(device);
        }
        let body = self.send(url).await?.text().await?;
        Ok(parse_operation_log(&body))
    }

    /// Daily operation totals, from one machine or summed over every machine.
    pub async fn operation_history(&self, device: Option<&str>) -> Result<OperationHistory> {
        let devices = match device {
            Some(device) => vec![device.to_owned()],
            None => self
                .machines()
                .await?
                .into_iter()
                .map(|machine| machine.device)
                .collect(),
        };

        let logs =
            futures::future::try_join_all(devices.iter().map(|d| self.operation_log(d))).await?;
        Ok(logs.iter().flatten().collect())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path)?;
        Ok(self.send(url).await?.json().await?)
    }

    async fn send(&self, url: Url) -> Result<reqwest::Response> {
        let token = current_access_token(self.storage.as_ref(), Utc::now()).await?;
        debug!(name: "api.request", url = %url, "GET");

        let response = self.http.get(url).bearer_auth(token).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(Error::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
