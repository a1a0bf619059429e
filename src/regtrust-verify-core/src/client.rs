//! HTTP registry client.
//!
//! Fetches object exports from the registrar's export API so the engine
//! can verify them against their signed approval chains.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use crate::config::VerifyConfig;
use crate::error::VerifyError;
use crate::store::{ObjectStore, StoreError};
use crate::types::ObjectType;

/// Registry client for fetching object exports.
pub struct RegistryClient {
    /// HTTP client.
    client: Client,
    /// Base URL for the export API.
    base_url: String,
}

impl RegistryClient {
    /// Create a new registry client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for the export API (e.g., `https://registrar.example.net`)
    /// * `timeout` - Request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, VerifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))  // Quick fail on unreachable hosts
            .user_agent(format!("RegTrust/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VerifyError::Store(StoreError::Backend {
                message: format!("Failed to create registry client: {}", e),
            }))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from a config.
    pub fn from_config(config: &VerifyConfig) -> Result<Self, VerifyError> {
        Self::new(&config.endpoint, config.timeout)
    }

    async fn get_bytes(
        &self,
        url: String,
        object_type: ObjectType,
        id: i64,
    ) -> Result<Vec<u8>, StoreError> {
        debug!("Fetching export from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("Registry request failed: {}", e),
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound { object_type, id });
        }
        if !response.status().is_success() {
            return Err(StoreError::Backend {
                message: format!("Registry HTTP error: {}", response.status()),
            });
        }

        let body = response.bytes().await.map_err(|e| StoreError::Backend {
            message: format!("Failed to read export body: {}", e),
        })?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ObjectStore for RegistryClient {
    #[instrument(skip(self))]
    async fn fetch(&self, object_type: ObjectType, id: i64) -> Result<Vec<u8>, StoreError> {
        let url = format!("{}/api/{}/{}", self.base_url, object_type.as_str(), id);
        self.get_bytes(url, object_type, id).await
    }

    #[instrument(skip(self))]
    async fn fetch_at(
        &self,
        object_type: ObjectType,
        id: i64,
        timestamp: i64,
    ) -> Result<Vec<u8>, StoreError> {
        let url = format!(
            "{}/api/{}/{}/at/{}",
            self.base_url,
            object_type.as_str(),
            id,
            timestamp
        );
        self.get_bytes(url, object_type, id).await
    }
}
